use super::OffsetRewriter;
use crate::jvm::verifier::VerifierFrame;
use crate::util::Offset;
use std::collections::{BTreeMap, BTreeSet};

/// Snapshots of the frame at interesting offsets, along with the offsets that will need an
/// explicit frame in the `StackMapTable`
///
/// There is at most one snapshot per offset. Recording a second one at the same offset replaces
/// the first. Both the snapshots and the required offsets are kept in increasing offset order,
/// which is the order in which frames get encoded.
#[derive(Debug, Default, Clone)]
pub struct FrameRegistry {
    frames: BTreeMap<Offset, VerifierFrame>,
    required: BTreeSet<Offset>,
}

impl FrameRegistry {
    pub fn new() -> FrameRegistry {
        FrameRegistry::default()
    }

    /// Store a copy of `frame` as the snapshot at `offset`
    ///
    /// Returns the snapshot that was previously at that offset, if any.
    pub fn record_snapshot(
        &mut self,
        offset: Offset,
        frame: &VerifierFrame,
    ) -> Option<VerifierFrame> {
        let mut snapshot = frame.clone();
        snapshot.pc = Some(offset);
        self.frames.insert(offset, snapshot)
    }

    /// Note that `offset` needs a frame
    pub fn mark_frame_required(&mut self, offset: Offset) {
        let _ = self.required.insert(offset);
    }

    /// Returns whether the offset was marked as required
    pub fn unmark_frame_required(&mut self, offset: Offset) -> bool {
        self.required.remove(&offset)
    }

    pub fn frame_at(&self, offset: Offset) -> Option<&VerifierFrame> {
        self.frames.get(&offset)
    }

    pub fn is_required(&self, offset: Offset) -> bool {
        self.required.contains(&offset)
    }

    /// Snapshots, in increasing offset order
    pub fn snapshots(&self) -> impl DoubleEndedIterator<Item = (Offset, &VerifierFrame)> {
        self.frames.iter().map(|(offset, frame)| (*offset, frame))
    }

    /// Required offsets, in increasing order
    pub fn required_offsets(&self) -> impl DoubleEndedIterator<Item = Offset> + '_ {
        self.required.iter().copied()
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl OffsetRewriter for FrameRegistry {
    fn relabel(&mut self, old: Offset, new: Offset, jump_frame: &VerifierFrame) {
        if old == new {
            return;
        }

        let old_frame = self.frames.remove(&old);
        let was_required = self.required.remove(&old);
        if old_frame.is_none() && !was_required {
            return;
        }

        // Whatever was at `new` predates the rewrite, so the frame at the jump takes over
        let _ = self.record_snapshot(new, jump_frame);
        if was_required {
            self.mark_frame_required(new);
        }
        log::debug!(
            "moved frame from offset {} to offset {} (required: {})",
            old.0,
            new.0,
            was_required
        );
    }

    fn retire(&mut self, offset: Offset) {
        let _ = self.frames.remove(&offset);
        let _ = self.required.remove(&offset);
        log::debug!("retired frame at offset {}", offset.0);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::verifier::{Frame, VerificationType};

    fn frame_with_stack(stack: Vec<crate::jvm::verifier::VType>) -> VerifierFrame {
        Frame {
            pc: None,
            locals: Default::default(),
            stack: stack.into_iter().collect(),
        }
    }

    #[test]
    fn snapshot_per_offset() {
        let mut registry = FrameRegistry::new();
        let first = frame_with_stack(vec![VerificationType::Integer]);
        let second = frame_with_stack(vec![VerificationType::Long]);

        assert_eq!(registry.record_snapshot(Offset(4), &first), None);
        let replaced = registry.record_snapshot(Offset(4), &second);
        assert_eq!(replaced.map(|f| f.stack_for_encoding()), Some(first.stack_for_encoding()));

        assert_eq!(registry.len(), 1);
        let stored = registry.frame_at(Offset(4)).unwrap();
        assert_eq!(stored.pc, Some(Offset(4)));
        assert!(stored.has_same_types(&second));
    }

    #[test]
    fn snapshots_are_ordered() {
        let mut registry = FrameRegistry::new();
        let frame = frame_with_stack(vec![]);
        for offset in [9, 2, 5] {
            registry.record_snapshot(Offset(offset), &frame);
            registry.mark_frame_required(Offset(offset));
            registry.mark_frame_required(Offset(offset));
        }

        let offsets: Vec<Offset> = registry.snapshots().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![Offset(2), Offset(5), Offset(9)]);
        let required: Vec<Offset> = registry.required_offsets().collect();
        assert_eq!(required, vec![Offset(2), Offset(5), Offset(9)]);

        assert!(registry.unmark_frame_required(Offset(5)));
        assert!(!registry.unmark_frame_required(Offset(5)));
        assert!(!registry.is_required(Offset(5)));
        assert!(registry.frame_at(Offset(5)).is_some());
    }

    #[test]
    fn relabel_prefers_jump_frame() {
        let mut registry = FrameRegistry::new();
        let stale = frame_with_stack(vec![VerificationType::Float]);
        let jump = frame_with_stack(vec![VerificationType::Integer]);

        registry.record_snapshot(Offset(10), &stale);
        registry.mark_frame_required(Offset(10));
        registry.record_snapshot(Offset(7), &stale);

        registry.relabel(Offset(10), Offset(7), &jump);
        assert!(registry.frame_at(Offset(10)).is_none());
        assert!(!registry.is_required(Offset(10)));
        assert!(registry.is_required(Offset(7)));
        assert!(registry.frame_at(Offset(7)).unwrap().has_same_types(&jump));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn relabel_nothing_is_noop() {
        let mut registry = FrameRegistry::new();
        let frame = frame_with_stack(vec![]);
        registry.relabel(Offset(3), Offset(0), &frame);
        assert!(registry.is_empty());
        assert!(!registry.is_required(Offset(0)));
    }

    #[test]
    fn retire_drops_everything() {
        let mut registry = FrameRegistry::new();
        let frame = frame_with_stack(vec![]);
        registry.record_snapshot(Offset(3), &frame);
        registry.mark_frame_required(Offset(3));
        registry.retire(Offset(3));
        assert!(registry.is_empty());
        assert_eq!(registry.required_offsets().count(), 0);
    }
}
