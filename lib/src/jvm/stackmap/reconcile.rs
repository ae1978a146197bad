use crate::jvm::code::{LabelKind, SynLabel};
use crate::jvm::verifier::VerifierFrame;
use crate::jvm::Error;
use crate::util::Offset;
use std::collections::{BTreeMap, HashMap};

/// Interface through which a jump optimizer moves frame bookkeeping around
///
/// Whenever the optimizer changes which offset a jump lands on, the frame state recorded for the
/// old offset has to follow it. Anything that owns frames keyed by offset can implement this.
pub trait OffsetRewriter {
    /// Move everything recorded at `old` over to `new`
    ///
    /// If `new` already has a frame, it is replaced with `jump_frame` (the frame that was live when
    /// the jump was taken). Nothing is left behind at `old`.
    fn relabel(&mut self, old: Offset, new: Offset, jump_frame: &VerifierFrame);

    /// Forget everything recorded at an offset that is no longer reachable
    fn retire(&mut self, offset: Offset);
}

/// Where a label ended up
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Referenced but not placed yet
    Unresolved,

    /// Placed at an offset
    Placed(Offset),

    /// Every jump to this label goes to another label instead
    Delegated(SynLabel),
}

#[derive(Debug)]
struct LabelState {
    kind: LabelKind,
    resolution: Resolution,

    /// Offsets of the branch instructions jumping to this label
    jumps: Vec<Offset>,

    /// Frame expected at the label, set by the first jump to reach it
    frame: Option<VerifierFrame>,
}

impl LabelState {
    fn new(kind: LabelKind) -> LabelState {
        LabelState {
            kind,
            resolution: Resolution::Unresolved,
            jumps: vec![],
            frame: None,
        }
    }
}

/// Bookkeeping for every label of a method body
///
/// Labels that have never been mentioned are implicitly unresolved standard labels.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: HashMap<SynLabel, LabelState>,

    /// Labels placed at each offset, in increasing label order
    placed: BTreeMap<Offset, Vec<SynLabel>>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable::default()
    }

    /// Declare the kind of a label (this is a no-op on labels that already have state)
    pub fn declare(&mut self, label: SynLabel, kind: LabelKind) {
        let _ = self
            .labels
            .entry(label)
            .or_insert_with(|| LabelState::new(kind));
    }

    fn state_mut(&mut self, label: SynLabel) -> &mut LabelState {
        self.labels
            .entry(label)
            .or_insert_with(|| LabelState::new(LabelKind::Standard))
    }

    pub fn kind(&self, label: SynLabel) -> LabelKind {
        self.labels
            .get(&label)
            .map(|state| state.kind)
            .unwrap_or_default()
    }

    pub fn resolution(&self, label: SynLabel) -> Resolution {
        self.labels
            .get(&label)
            .map(|state| state.resolution)
            .unwrap_or(Resolution::Unresolved)
    }

    /// Follow delegations until reaching a label that is unresolved or placed
    pub fn resolve(&self, mut label: SynLabel) -> SynLabel {
        while let Resolution::Delegated(target) = self.resolution(label) {
            label = target;
        }
        label
    }

    pub fn placed_at(&self, label: SynLabel) -> Option<Offset> {
        match self.resolution(label) {
            Resolution::Placed(offset) => Some(offset),
            _ => None,
        }
    }

    /// Labels placed at an offset, in increasing label order
    pub fn labels_at(&self, offset: Offset) -> Vec<SynLabel> {
        self.placed.get(&offset).cloned().unwrap_or_default()
    }

    fn index_placed(&mut self, label: SynLabel, offset: Offset) {
        let labels = self.placed.entry(offset).or_default();
        if let Err(idx) = labels.binary_search(&label) {
            labels.insert(idx, label);
        }
    }

    fn unindex_placed(&mut self, label: SynLabel, offset: Offset) {
        if let Some(labels) = self.placed.get_mut(&offset) {
            labels.retain(|other| *other != label);
            if labels.is_empty() {
                let _ = self.placed.remove(&offset);
            }
        }
    }

    pub fn add_jump(&mut self, label: SynLabel, from: Offset) {
        self.state_mut(label).jumps.push(from);
    }

    /// Returns whether there was such a jump
    pub fn remove_jump(&mut self, label: SynLabel, from: Offset) -> bool {
        let jumps = &mut self.state_mut(label).jumps;
        match jumps.iter().position(|jump| *jump == from) {
            Some(idx) => {
                let _ = jumps.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn has_jumps(&self, label: SynLabel) -> bool {
        self.labels
            .get(&label)
            .map_or(false, |state| !state.jumps.is_empty())
    }

    /// Mark a label as placed
    pub fn place(&mut self, label: SynLabel, offset: Offset) -> Result<(), Error> {
        let state = self.state_mut(label);
        match state.resolution {
            Resolution::Unresolved => {
                state.resolution = Resolution::Placed(offset);
                self.index_placed(label, offset);
                Ok(())
            }
            Resolution::Placed(_) => Err(Error::LabelAlreadyPlaced(label)),
            Resolution::Delegated(_) => Err(Error::LabelDelegated(label)),
        }
    }

    pub fn frame(&self, label: SynLabel) -> Option<&VerifierFrame> {
        self.labels
            .get(&label)
            .and_then(|state| state.frame.as_ref())
    }

    pub fn set_frame(&mut self, label: SynLabel, frame: VerifierFrame) {
        self.state_mut(label).frame = Some(frame);
    }

    pub fn take_frame(&mut self, label: SynLabel) -> Option<VerifierFrame> {
        self.labels
            .get_mut(&label)
            .and_then(|state| state.frame.take())
    }

    /// Drop locals at or above `slot` from the frames expected at labels not placed yet
    pub fn trim_pending_frames(&mut self, slot: u16) {
        for state in self.labels.values_mut() {
            if state.resolution != Resolution::Unresolved {
                continue;
            }
            if let Some(frame) = state.frame.as_mut() {
                frame.remove_locals_from(slot);
            }
        }
    }

    /// Redirect every jump to `from` onto `to`
    ///
    /// Returns the offsets of the redirected jumps and the frame that was expected at `from`.
    pub fn delegate(
        &mut self,
        from: SynLabel,
        to: SynLabel,
    ) -> (Vec<Offset>, Option<VerifierFrame>) {
        let from_state = self.state_mut(from);
        let previous = std::mem::replace(&mut from_state.resolution, Resolution::Delegated(to));
        let jumps = std::mem::take(&mut from_state.jumps);
        let frame = from_state.frame.take();
        if let Resolution::Placed(offset) = previous {
            self.unindex_placed(from, offset);
        }

        self.state_mut(to).jumps.extend(jumps.iter().copied());
        (jumps, frame)
    }

    /// Move every label placed at `from` so it is placed at `to`
    pub fn move_labels(&mut self, from: Offset, to: Offset) {
        if from == to {
            return;
        }
        for label in self.placed.remove(&from).unwrap_or_default() {
            self.state_mut(label).resolution = Resolution::Placed(to);
            self.index_placed(label, to);
        }
    }

    /// Labels that have jumps to them but haven't been placed, in increasing label order
    pub fn unplaced_referenced(&self) -> Vec<SynLabel> {
        let mut labels: Vec<SynLabel> = self
            .labels
            .iter()
            .filter(|(_, state)| {
                state.resolution == Resolution::Unresolved
                    && (!state.jumps.is_empty() || state.frame.is_some())
            })
            .map(|(label, _)| *label)
            .collect();
        labels.sort();
        labels
    }
}
