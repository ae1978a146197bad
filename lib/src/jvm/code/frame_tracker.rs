use crate::jvm::code::{
    BranchInstruction, Instruction, LabelGenerator, LabelKind, SynLabel, SynLabelGenerator,
};
use crate::jvm::stackmap::{FrameRegistry, LabelTable, OffsetRewriter, Resolution};
use crate::jvm::verifier::*;
use crate::jvm::{
    BinaryName, Error, FieldType, FrameErrorKind, MethodAccessFlags, MethodDescriptor, RefType,
    RenderDescriptor, UnqualifiedName,
};
use crate::util::{Offset, Width};
use crate::TrackerSettings;

/// Method whose body is being emitted
#[derive(Clone, Debug)]
pub struct MethodSignature {
    /// Class declaring the method
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub access_flags: MethodAccessFlags,
}

impl MethodSignature {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }
}

/// Outcome of placing a label
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LabelPlacement {
    /// Label is at the given offset
    Placed(Offset),

    /// The `goto` at `goto_at` jumped to the very next instruction, so the label took its place
    ///
    /// The caller must delete the 3 bytes of that `goto` from the code.
    ElidedGoto { goto_at: Offset },
}

/// Handle for a lexical scope opened with [`FrameTracker::open_scope`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScopeToken {
    /// First local slot belonging to the scope
    pub lowest_slot: u16,
}

/// Everything needed to write out the `Code` attribute's frame-related parts
#[derive(Clone, Debug)]
pub struct FrameTable {
    /// Frames at every offset that needs one, in strictly increasing offset order
    pub frames: Vec<(Offset, VerifierFrame)>,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_length: u16,
}

/// Last instruction emitted, when it was a `goto`
#[derive(Debug)]
struct PendingGoto {
    at: Offset,
    target: SynLabel,

    /// Frame live when the jump was taken
    frame: VerifierFrame,
}

/// Follows along as an emitter writes out a method body from top to bottom, keeping the frame up
/// to date and recording the frames the `StackMapTable` will need.
///
/// ### Recording frames
///
/// Normally, figuring out what the right frame types are is a fixpoint iterative process, since
/// blocks jumping to the same offset need to have their output frames merged and then that
/// information must be propagated further through the CFG. We avoid this and instead take the
/// frame of whatever reaches a label first (a jump or a fall-through). Later arrivals are only
/// checked against that frame, never merged into it.
///
/// ### Tracking reachability
///
/// After an unconditional jump, a return, or a throw there is no live frame. Code emitted there
/// is rejected until a label that has already been jumped to is placed, since that is the only
/// way to find out what the frame should be. The offset right after such an instruction is
/// always marked as needing a frame.
///
/// ### Jump rewrites
///
/// Two rewrites are supported: dropping a `goto` to the very next instruction (done by
/// [`FrameTracker::place_label`]) and folding one label into another (with
/// [`FrameTracker::delegate_label`]). Both keep the registry in step through [`OffsetRewriter`].
pub struct FrameTracker {
    settings: TrackerSettings,
    method: MethodSignature,

    /// Offset of the next instruction
    position: Offset,

    /// Live frame (`None` when the current position is unreachable)
    current: Option<VerifierFrame>,

    registry: FrameRegistry,
    labels: LabelTable,
    label_generator: SynLabelGenerator,
    next_allocation: AllocationSite,
    max_stack: Offset,
    max_locals: Offset,
    last_goto: Option<PendingGoto>,
}

impl FrameTracker {
    /// Start tracking a new method body
    ///
    /// The entry frame has the receiver (unless the method is static) followed by the
    /// parameters in the locals, and an empty stack.
    pub fn new(method: MethodSignature, settings: TrackerSettings) -> Result<FrameTracker, Error> {
        let parameter_length = method.descriptor.parameter_length(!method.is_static());
        if parameter_length > 255 {
            return Err(Error::BadDescriptor(format!(
                "{} takes {} words of parameters (at most 255 are allowed)",
                method.descriptor.render(),
                parameter_length
            )));
        }

        // The initial local variables are just the parameters (including maybe "this")
        let mut entry_frame = VerifierFrame::default();
        let mut slot: u16 = 0;
        if !method.is_static() {
            let receiver = if method.name.is_init() && method.class != BinaryName::OBJECT {
                VerificationType::UninitializedThis
            } else {
                VerificationType::Object(RefType::Object(method.class.clone()))
            };
            entry_frame
                .set_local(slot, receiver)
                .map_err(|kind| entry_error(&method, kind))?;
            slot += 1;
        }
        for parameter in &method.descriptor.parameters {
            let typ = VType::from(parameter.clone());
            let width = typ.width() as u16;
            entry_frame
                .set_local(slot, typ)
                .map_err(|kind| entry_error(&method, kind))?;
            slot += width;
        }
        entry_frame.pc = Some(Offset(0));

        let mut max_locals = Offset(0);
        let mut max_stack = Offset(0);
        entry_frame.update_maximums(&mut max_locals, &mut max_stack);

        let mut registry = FrameRegistry::new();
        if settings.record_entry_frame {
            let _ = registry.record_snapshot(Offset(0), &entry_frame);
        }

        log::debug!(
            "tracking frames of {}.{}{}",
            method.class,
            method.name,
            method.descriptor.render()
        );

        Ok(FrameTracker {
            settings,
            method,
            position: Offset(0),
            current: Some(entry_frame),
            registry,
            labels: LabelTable::new(),
            label_generator: SynLabelGenerator::new(SynLabel::START),
            next_allocation: AllocationSite::default(),
            max_stack,
            max_locals,
            last_goto: None,
        })
    }

    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Offset at which the next instruction will go
    pub fn position(&self) -> Offset {
        self.position
    }

    /// Live frame, or `None` if the current position is unreachable
    pub fn current_frame(&self) -> Option<&VerifierFrame> {
        self.current.as_ref()
    }

    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for optimizers that rewrite offsets on their own
    pub fn registry_mut(&mut self) -> &mut FrameRegistry {
        &mut self.registry
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Generate a fresh standard label
    pub fn fresh_label(&mut self) -> SynLabel {
        self.label_generator.fresh_label()
    }

    /// Generate a fresh label of a given kind
    pub fn fresh_label_with_kind(&mut self, kind: LabelKind) -> SynLabel {
        let label = self.label_generator.fresh_label();
        self.labels.declare(label, kind);
        label
    }

    /// Query the expected frame for a label that has already been referred to and possibly even
    /// placed
    pub fn lookup_frame(&self, label: SynLabel) -> Option<&VerifierFrame> {
        let label = self.labels.resolve(label);
        match self.labels.placed_at(label) {
            Some(offset) => self.registry.frame_at(offset),
            None => self.labels.frame(label),
        }
    }

    /// Push a new (non-branching) instruction
    pub fn push_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        let offset = self.position;
        let frame = self
            .current
            .as_mut()
            .ok_or(Error::UnreachableCode(offset))?;

        let site = self.next_allocation;
        frame
            .apply_instruction(&insn, offset, site, &self.method.class)
            .map_err(|kind| Error::FrameError {
                instruction: format!("{:?}", insn),
                offset,
                kind,
            })?;
        if let Instruction::New(_) = insn {
            self.next_allocation = site.next();
        }
        frame.update_maximums(&mut self.max_locals, &mut self.max_stack);
        log::trace!("{:>5}: {:?} => {:?}", offset.0, insn, frame.stack);

        self.last_goto = None;
        self.advance(insn.width())
    }

    /// Push a new branch instruction
    ///
    /// Jump targets that have not been reached yet take the frame live at the jump. Returns,
    /// throws, and unconditional jumps make the following offset unreachable and mark it as
    /// needing a frame.
    pub fn push_branch_instruction(
        &mut self,
        insn: BranchInstruction<SynLabel>,
    ) -> Result<(), Error> {
        let offset = self.position;
        let frame = self
            .current
            .as_mut()
            .ok_or(Error::UnreachableCode(offset))?;
        frame
            .apply_branch_instruction(&insn)
            .map_err(|kind| Error::FrameError {
                instruction: format!("{:?}", insn),
                offset,
                kind,
            })?;
        log::trace!("{:>5}: {:?} => {:?}", offset.0, insn, frame.stack);
        let jump_frame = frame.clone();

        // Check that the jump targets have compatible frames
        for target in insn.jump_targets() {
            self.register_jump(target, offset, &jump_frame)?;
        }

        self.advance(insn.width_at(offset))?;
        if !insn.falls_through() {
            self.current = None;
            self.registry.mark_frame_required(self.position);
        }

        self.last_goto = match insn {
            BranchInstruction::Goto(target) => Some(PendingGoto {
                at: offset,
                target: self.labels.resolve(target),
                frame: jump_frame,
            }),
            _ => None,
        };
        Ok(())
    }

    /// Note a jump from `from` to `label`, checking or recording the frame expected there
    fn register_jump(
        &mut self,
        label: SynLabel,
        from: Offset,
        frame: &VerifierFrame,
    ) -> Result<(), Error> {
        let label = self.labels.resolve(label);
        self.labels.add_jump(label, from);

        if let Some(target_offset) = self.labels.placed_at(label) {
            self.registry.mark_frame_required(target_offset);
            let stored = self
                .registry
                .frame_at(target_offset)
                .ok_or(Error::MissingFrame(target_offset))?;
            check_merge(self.settings.strict_merges, label, stored, frame)
        } else if let Some(stored) = self.labels.frame(label) {
            check_merge(self.settings.strict_merges, label, stored, frame)
        } else {
            self.labels.set_frame(label, frame.clone());
            Ok(())
        }
    }

    fn advance(&mut self, width: usize) -> Result<(), Error> {
        self.position.0 += width;
        if self.position.0 > self.settings.max_code_length {
            Err(Error::MethodCodeOverflow(self.position))
        } else {
            Ok(())
        }
    }

    /// Place a label at the current position. This can fail if:
    ///
    ///   * the label was already placed or delegated
    ///   * the label was already jumped to from elsewhere, the frames don't match, and merges
    ///     are strict
    ///   * the label has never been jumped to and there is no fallthrough (so we have no way of
    ///     inferring the expected frame)
    ///
    /// If the previous instruction was a `goto` to this label, it may get dropped (see
    /// [`TrackerSettings::elide_redundant_gotos`]).
    pub fn place_label(&mut self, label: SynLabel) -> Result<LabelPlacement, Error> {
        match self.labels.resolution(label) {
            Resolution::Unresolved => (),
            Resolution::Placed(_) => return Err(Error::LabelAlreadyPlaced(label)),
            Resolution::Delegated(_) => return Err(Error::LabelDelegated(label)),
        }

        if let Some(goto) = self.take_redundant_goto(label) {
            return self.elide_goto(label, goto);
        }

        let offset = self.place_here(label)?;
        Ok(LabelPlacement::Placed(offset))
    }

    /// Take the last `goto` if it can be dropped in favour of placing `label`
    fn take_redundant_goto(&mut self, label: SynLabel) -> Option<PendingGoto> {
        if !self.settings.elide_redundant_gotos {
            return None;
        }
        let goto = self.last_goto.as_ref()?;
        if self.labels.resolve(goto.target) != label || self.position != Offset(goto.at.0 + 3) {
            return None;
        }

        // Case and handler labels are baked into tables that can't be shifted around
        if self.labels.kind(label) != LabelKind::Standard {
            return None;
        }
        let labels_here = self.labels.labels_at(self.position);
        if labels_here
            .iter()
            .any(|other| self.labels.kind(*other) != LabelKind::Standard)
        {
            return None;
        }

        // Labels already placed after the `goto` would now also be reached by fall-through
        if let Some(current) = self.current.as_ref() {
            if !current.has_same_types(&goto.frame) {
                return None;
            }
        }

        self.last_goto.take()
    }

    fn elide_goto(&mut self, label: SynLabel, goto: PendingGoto) -> Result<LabelPlacement, Error> {
        let old = self.position;
        let new = goto.at;
        let _ = self.labels.remove_jump(label, new);
        let was_required = self.registry.is_required(new);

        self.registry.relabel(old, new, &goto.frame);
        self.labels.move_labels(old, new);
        self.position = new;
        self.current = Some(goto.frame);
        log::debug!(
            "dropped goto {:?} at offset {} (it jumps to the next instruction)",
            label,
            new.0
        );

        let _ = self.place_here(label)?;

        // The offset only needs a frame if something other than the dropped `goto` jumps here
        let jumped_to = self
            .labels
            .labels_at(new)
            .iter()
            .any(|other| self.labels.has_jumps(*other));
        if !was_required && !jumped_to {
            let _ = self.registry.unmark_frame_required(new);
        }

        Ok(LabelPlacement::ElidedGoto { goto_at: new })
    }

    /// Place a label at the current position, without trying to drop a preceding `goto`
    fn place_here(&mut self, label: SynLabel) -> Result<Offset, Error> {
        let offset = self.position;
        let mut frame = match (self.labels.take_frame(label), self.current.take()) {
            (Some(expected), Some(live)) => {
                check_merge(self.settings.strict_merges, label, &expected, &live)?;
                expected
            }
            (Some(expected), None) => expected,
            (None, Some(live)) => live,
            (None, None) => return Err(Error::PlacingLabelBeforeReference(label)),
        };
        self.labels.place(label, offset)?;

        frame.pc = Some(offset);
        let _ = self.registry.record_snapshot(offset, &frame);
        if self.labels.has_jumps(label) || self.labels.kind(label) == LabelKind::Handler {
            self.registry.mark_frame_required(offset);
        }
        self.current = Some(frame);

        log::debug!("placed label {:?} at offset {}", label, offset.0);
        Ok(offset)
    }

    /// Make every jump to `from` a jump to `to` instead
    ///
    /// The frame live when those jumps were taken goes along with them. If `from` was already
    /// placed, the frame recorded there is dropped, unless some other label placed at the same
    /// offset still gets jumped to.
    pub fn delegate_label(&mut self, from: SynLabel, to: SynLabel) -> Result<(), Error> {
        let to = self.labels.resolve(to);
        for label in [from, to] {
            if self.labels.kind(label) != LabelKind::Standard {
                return Err(Error::NonStandardLabel(label));
            }
        }

        let from_offset = match self.labels.resolution(from) {
            Resolution::Delegated(_) => return Err(Error::LabelDelegated(from)),
            Resolution::Placed(offset) => Some(offset),
            Resolution::Unresolved => None,
        };
        if from == to {
            return Ok(());
        }
        if let Some(offset) = from_offset {
            let labels_there = self.labels.labels_at(offset);
            if let Some(blocker) = labels_there
                .iter()
                .find(|other| self.labels.kind(**other) != LabelKind::Standard)
            {
                return Err(Error::NonStandardLabel(*blocker));
            }
        }

        let (jumps, pending_frame) = self.labels.delegate(from, to);
        let carried = pending_frame.or_else(|| {
            from_offset.and_then(|offset| self.registry.frame_at(offset).cloned())
        });
        log::debug!(
            "delegated label {:?} to {:?} ({} jumps moved)",
            from,
            to,
            jumps.len()
        );

        if let Some(carried) = carried {
            if let Some(to_offset) = self.labels.placed_at(to) {
                if !jumps.is_empty() {
                    self.registry.mark_frame_required(to_offset);
                }
                let stored = self
                    .registry
                    .frame_at(to_offset)
                    .ok_or(Error::MissingFrame(to_offset))?;
                check_merge(self.settings.strict_merges, to, stored, &carried)?;
            } else if let Some(stored) = self.labels.frame(to) {
                check_merge(self.settings.strict_merges, to, stored, &carried)?;
            } else {
                self.labels.set_frame(to, carried);
            }
        }

        // Nothing jumps to the old offset anymore
        if let Some(offset) = from_offset {
            let labels_there = self.labels.labels_at(offset);
            if labels_there.is_empty() {
                self.registry.retire(offset);
            } else if !labels_there
                .iter()
                .any(|other| self.labels.has_jumps(*other))
            {
                let _ = self.registry.unmark_frame_required(offset);
            }
        }

        Ok(())
    }

    /// Start the protected range of an exception handler at the current position
    ///
    /// The handler is entered with the locals live here and just the exception on the stack.
    /// Without a `catch_type`, that exception is a `java/lang/Throwable`.
    pub fn begin_exception_range(
        &mut self,
        handler: SynLabel,
        catch_type: Option<BinaryName>,
    ) -> Result<(), Error> {
        let frame = self
            .current
            .as_ref()
            .ok_or(Error::UnreachableCode(self.position))?;
        match self.labels.resolution(handler) {
            Resolution::Unresolved => (),
            Resolution::Placed(_) => return Err(Error::LabelAlreadyPlaced(handler)),
            Resolution::Delegated(_) => return Err(Error::LabelDelegated(handler)),
        }
        self.labels.declare(handler, LabelKind::Handler);
        if self.labels.kind(handler) != LabelKind::Handler {
            return Err(Error::NonStandardLabel(handler));
        }

        let exception = catch_type.unwrap_or(BinaryName::THROWABLE);
        let mut handler_frame = VerifierFrame {
            pc: None,
            locals: frame.locals.clone(),
            stack: Default::default(),
        };
        handler_frame.push(VerificationType::Object(RefType::Object(exception)));
        handler_frame.update_maximums(&mut self.max_locals, &mut self.max_stack);

        match self.labels.frame(handler) {
            Some(stored) => check_merge(self.settings.strict_merges, handler, stored, &handler_frame),
            None => {
                self.labels.set_frame(handler, handler_frame);
                Ok(())
            }
        }
    }

    /// Open a lexical scope: locals set from here on can be dropped with
    /// [`FrameTracker::close_scope`]
    pub fn open_scope(&self) -> Result<ScopeToken, Error> {
        let frame = self
            .current
            .as_ref()
            .ok_or(Error::UnreachableCode(self.position))?;
        let word_len = frame.locals.word_len();
        let lowest_slot = u16::try_from(word_len)
            .map_err(|_| Error::MethodCodeMaxLocalsOverflow(Offset(word_len)))?;
        Ok(ScopeToken { lowest_slot })
    }

    /// Close a lexical scope, dropping its locals from the live frame and from the frames of
    /// labels that have not been placed yet
    pub fn close_scope(&mut self, scope: ScopeToken) {
        self.labels.trim_pending_frames(scope.lowest_slot);
        if let Some(goto) = self.last_goto.as_mut() {
            goto.frame.remove_locals_from(scope.lowest_slot);
        }

        if let Some(frame) = self.current.as_mut() {
            frame.remove_locals_from(scope.lowest_slot);
            if self.settings.frame_at_scope_exit {
                let _ = self.registry.record_snapshot(self.position, frame);
                self.registry.mark_frame_required(self.position);
            }
        }
    }

    /// Change the type of the top of the stack without changing the stack depth
    ///
    /// This is for when the emitter knows more about a value than the instructions show (eg.
    /// after calling a helper that returns `Object` but is known to return a `String`). The new
    /// type must have the same width as the one it replaces.
    pub fn retype_top(&mut self, field_type: FieldType<BinaryName>) -> Result<(), Error> {
        let offset = self.position;
        let frame_error = |kind: FrameErrorKind| Error::FrameError {
            instruction: format!("retype to {}", field_type.render()),
            offset,
            kind,
        };
        if let Some(frame) = self.current.as_mut() {
            let typ = VType::from(field_type.clone());
            let found_width = frame
                .stack
                .last()
                .ok_or_else(|| frame_error(FrameErrorKind::EmptyStack))?
                .width();
            if found_width != typ.width() {
                return Err(frame_error(FrameErrorKind::InvalidWidth(found_width)));
            }
            frame.replace_top(typ).map_err(frame_error)?;
        }
        Ok(())
    }

    /// Finish tracking, producing the frames to encode
    pub fn result(self) -> Result<FrameTable, Error> {
        let unplaced_labels = self.labels.unplaced_referenced();
        let falls_off_end = self.current.is_some();
        if falls_off_end || !unplaced_labels.is_empty() {
            return Err(Error::MethodCodeNotFinished {
                falls_off_end,
                unplaced_labels,
            });
        }

        let code_length =
            u16::try_from(self.position.0).map_err(|_| Error::MethodCodeOverflow(self.position))?;
        let max_stack = u16::try_from(self.max_stack.0)
            .map_err(|_| Error::MethodCodeMaxStackOverflow(self.max_stack))?;
        let max_locals = u16::try_from(self.max_locals.0)
            .map_err(|_| Error::MethodCodeMaxLocalsOverflow(self.max_locals))?;

        let mut frames = vec![];
        for offset in self.registry.required_offsets() {
            if offset >= self.position {
                break;
            }
            let frame = self
                .registry
                .frame_at(offset)
                .ok_or(Error::MissingFrame(offset))?;
            frames.push((offset, frame.clone()));
        }

        log::debug!(
            "finished {}.{}: {} frames, max_stack {}, max_locals {}, {} bytes",
            self.method.class,
            self.method.name,
            frames.len(),
            max_stack,
            max_locals,
            code_length
        );

        Ok(FrameTable {
            frames,
            max_stack,
            max_locals,
            code_length,
        })
    }
}

fn entry_error(method: &MethodSignature, kind: FrameErrorKind) -> Error {
    Error::BadDescriptor(format!(
        "parameters of {}{} don't fit in the locals: {}",
        method.name,
        method.descriptor.render(),
        kind
    ))
}

/// Check a frame arriving at a label against the frame already expected there
fn check_merge(
    strict: bool,
    label: SynLabel,
    stored: &VerifierFrame,
    arriving: &VerifierFrame,
) -> Result<(), Error> {
    if stored.has_same_types(arriving) {
        Ok(())
    } else if strict {
        Err(Error::IncompatibleFrames(
            label,
            stored.into_printable(),
            arriving.into_printable(),
        ))
    } else {
        log::warn!(
            "frame arriving at {:?} does not match the recorded one: expected {:?}, found {:?}",
            label,
            stored.into_printable(),
            arriving.into_printable()
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{EqComparison, InvokeType, MethodRef, OrdComparison};
    use crate::jvm::{Name, ParseDescriptor};
    use Instruction::*;
    use VerificationType::*;

    fn class(name: &str) -> BinaryName {
        BinaryName::from_string(String::from(name)).unwrap()
    }

    fn signature(name: &str, descriptor: &str, access_flags: MethodAccessFlags) -> MethodSignature {
        MethodSignature {
            class: class("me/Test"),
            name: UnqualifiedName::from_string(String::from(name)).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags,
        }
    }

    fn static_tracker(descriptor: &str) -> FrameTracker {
        FrameTracker::new(
            signature("run", descriptor, MethodAccessFlags::STATIC),
            TrackerSettings::new(),
        )
        .unwrap()
    }

    #[test]
    fn entry_frames() {
        let tracker = FrameTracker::new(
            signature("run", "(JLjava/lang/String;D)V", MethodAccessFlags::PUBLIC),
            TrackerSettings::new(),
        )
        .unwrap();
        let entry = tracker.registry().frame_at(Offset(0)).unwrap();
        assert_eq!(
            entry.locals_for_encoding(),
            vec![
                Object(RefType::Object(class("me/Test"))),
                Long,
                Object(RefType::Object(BinaryName::STRING)),
                Double
            ]
        );
        assert!(!tracker.registry().is_required(Offset(0)));

        let tracker = FrameTracker::new(
            signature("<init>", "(I)V", MethodAccessFlags::PUBLIC),
            TrackerSettings::new(),
        )
        .unwrap();
        assert_eq!(
            tracker.current_frame().unwrap().locals_for_encoding(),
            vec![UninitializedThis, Integer]
        );

        let mut settings = TrackerSettings::new();
        settings.record_entry_frame = false;
        let tracker = FrameTracker::new(
            signature("run", "()V", MethodAccessFlags::STATIC),
            settings,
        )
        .unwrap();
        assert!(tracker.registry().is_empty());
    }

    #[test]
    fn too_many_parameters() {
        let descriptor = format!("({})V", "J".repeat(128));
        assert!(matches!(
            FrameTracker::new(
                signature("run", &descriptor, MethodAccessFlags::STATIC),
                TrackerSettings::new()
            ),
            Err(Error::BadDescriptor(_))
        ));
    }

    #[test]
    fn unreachable_code() {
        let mut tracker = static_tracker("()V");
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        assert!(matches!(
            tracker.push_instruction(Nop),
            Err(Error::UnreachableCode(Offset(1)))
        ));
        let label = tracker.fresh_label();
        assert!(matches!(
            tracker.place_label(label),
            Err(Error::PlacingLabelBeforeReference(l)) if l == label
        ));
    }

    #[test]
    fn forward_branch() {
        let mut tracker = static_tracker("(I)I");
        let else_label = tracker.fresh_label();
        let end_label = tracker.fresh_label();

        tracker.push_instruction(ILoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, else_label))
            .unwrap();
        tracker.push_instruction(IConst1).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(end_label))
            .unwrap();
        assert_eq!(
            tracker.place_label(else_label).unwrap(),
            LabelPlacement::Placed(Offset(8))
        );
        tracker.push_instruction(IConst0).unwrap();
        assert_eq!(
            tracker.place_label(end_label).unwrap(),
            LabelPlacement::Placed(Offset(9))
        );
        tracker
            .push_branch_instruction(BranchInstruction::IReturn)
            .unwrap();

        let table = tracker.result().unwrap();
        assert_eq!(table.code_length, 10);
        assert_eq!(table.max_stack, 1);
        assert_eq!(table.max_locals, 1);
        let offsets: Vec<Offset> = table.frames.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![Offset(8), Offset(9)]);
        assert!(table.frames[0].1.stack.is_empty());
        assert_eq!(table.frames[1].1.stack_for_encoding(), vec![Integer]);
        assert_eq!(table.frames[1].1.pc, Some(Offset(9)));
    }

    #[test]
    fn backward_branch() {
        let mut tracker = static_tracker("(I)V");
        let top = tracker.fresh_label();
        tracker.place_label(top).unwrap();
        tracker.push_instruction(IInc(0, -1)).unwrap();
        tracker.push_instruction(ILoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::GT, top))
            .unwrap();
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();

        let table = tracker.result().unwrap();
        assert_eq!(table.frames.len(), 1);
        assert_eq!(table.frames[0].0, Offset(0));
        assert_eq!(table.frames[0].1.locals_for_encoding(), vec![Integer]);
    }

    #[test]
    fn merges() {
        let mut tracker = static_tracker("()V");
        let label = tracker.fresh_label();
        tracker.push_instruction(IConst0).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, label))
            .unwrap();
        tracker.push_instruction(FConst0).unwrap();

        // Lenient merge: the first frame (empty stack) stays
        tracker.place_label(label).unwrap();
        assert!(tracker.current_frame().unwrap().stack.is_empty());

        let mut settings = TrackerSettings::new();
        settings.strict_merges = true;
        let mut tracker = FrameTracker::new(
            signature("run", "()V", MethodAccessFlags::STATIC),
            settings,
        )
        .unwrap();
        let label = tracker.fresh_label();
        tracker.push_instruction(IConst0).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, label))
            .unwrap();
        tracker.push_instruction(FConst0).unwrap();
        assert!(matches!(
            tracker.place_label(label),
            Err(Error::IncompatibleFrames(l, _, _)) if l == label
        ));
    }

    #[test]
    fn redundant_goto() {
        let mut tracker = static_tracker("()V");
        let label = tracker.fresh_label();
        tracker.push_instruction(Nop).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(label))
            .unwrap();
        assert!(tracker.registry().is_required(Offset(4)));
        assert_eq!(
            tracker.place_label(label).unwrap(),
            LabelPlacement::ElidedGoto { goto_at: Offset(1) }
        );
        assert_eq!(tracker.position(), Offset(1));
        assert!(tracker.current_frame().is_some());
        assert!(!tracker.registry().is_required(Offset(1)));
        assert!(!tracker.registry().is_required(Offset(4)));

        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        let table = tracker.result().unwrap();
        assert_eq!(table.code_length, 2);
        assert!(table.frames.is_empty());
    }

    #[test]
    fn redundant_goto_out_of_scope() {
        let mut settings = TrackerSettings::new();
        settings.strict_merges = true;
        let mut tracker =
            FrameTracker::new(signature("run", "()V", MethodAccessFlags::STATIC), settings)
                .unwrap();
        let end = tracker.fresh_label();

        let scope = tracker.open_scope().unwrap();
        tracker.push_instruction(IConst0).unwrap();
        tracker.push_instruction(IStore(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(end))
            .unwrap();
        tracker.close_scope(scope);

        assert_eq!(
            tracker.place_label(end).unwrap(),
            LabelPlacement::ElidedGoto { goto_at: Offset(2) }
        );
        assert!(tracker.current_frame().unwrap().locals.is_empty());
        assert!(tracker
            .registry()
            .frame_at(Offset(2))
            .unwrap()
            .locals
            .is_empty());

        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        let table = tracker.result().unwrap();
        assert_eq!(table.code_length, 3);
        assert_eq!(table.max_locals, 1);
    }

    #[test]
    fn retype_keeps_width() {
        let mut tracker = static_tracker("()V");
        tracker.push_instruction(AConstNull).unwrap();
        tracker
            .retype_top(FieldType::object(BinaryName::STRING))
            .unwrap();
        assert!(matches!(
            tracker.retype_top(FieldType::long()),
            Err(Error::FrameError {
                kind: FrameErrorKind::InvalidWidth(1),
                ..
            })
        ));
        assert_eq!(
            tracker.current_frame().unwrap().stack_for_encoding(),
            vec![Object(RefType::Object(BinaryName::STRING))]
        );
    }

    #[test]
    fn redundant_goto_with_other_jumps() {
        let mut tracker = static_tracker("(I)V");
        let label = tracker.fresh_label();
        tracker.push_instruction(ILoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::NE, label))
            .unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(label))
            .unwrap();
        assert!(matches!(
            tracker.place_label(label).unwrap(),
            LabelPlacement::ElidedGoto { goto_at: Offset(4) }
        ));
        assert!(tracker.registry().is_required(Offset(4)));
        assert!(!tracker.registry().is_required(Offset(7)));
        assert!(tracker.registry().frame_at(Offset(7)).is_none());

        let mut settings = TrackerSettings::new();
        settings.elide_redundant_gotos = false;
        let mut tracker = FrameTracker::new(
            signature("run", "()V", MethodAccessFlags::STATIC),
            settings,
        )
        .unwrap();
        let label = tracker.fresh_label();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(label))
            .unwrap();
        assert_eq!(
            tracker.place_label(label).unwrap(),
            LabelPlacement::Placed(Offset(3))
        );
    }

    #[test]
    fn goto_before_case_label_stays() {
        let mut tracker = static_tracker("()V");
        let label = tracker.fresh_label_with_kind(LabelKind::Case);
        tracker
            .push_branch_instruction(BranchInstruction::Goto(label))
            .unwrap();
        assert_eq!(
            tracker.place_label(label).unwrap(),
            LabelPlacement::Placed(Offset(3))
        );
        assert!(tracker.registry().is_required(Offset(3)));
    }

    #[test]
    fn delegation() {
        let mut tracker = static_tracker("(I)V");
        let first = tracker.fresh_label();
        let second = tracker.fresh_label();
        tracker.push_instruction(ILoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, first))
            .unwrap();
        tracker.delegate_label(first, second).unwrap();
        assert!(matches!(
            tracker.place_label(first),
            Err(Error::LabelDelegated(l)) if l == first
        ));
        assert!(tracker.lookup_frame(first).is_some());

        let case = tracker.fresh_label_with_kind(LabelKind::Case);
        assert!(matches!(
            tracker.delegate_label(second, case),
            Err(Error::NonStandardLabel(l)) if l == case
        ));

        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        tracker.place_label(second).unwrap();
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        let table = tracker.result().unwrap();
        let offsets: Vec<Offset> = table.frames.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![Offset(5)]);
    }

    #[test]
    fn exception_handler() {
        let mut tracker = static_tracker("(I)V");
        let handler = tracker.fresh_label();
        let end = tracker.fresh_label();
        tracker
            .begin_exception_range(handler, Some(class("java/io/IOException")))
            .unwrap();
        tracker.push_instruction(Nop).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::Goto(end))
            .unwrap();
        tracker.place_label(handler).unwrap();
        assert_eq!(
            tracker.current_frame().unwrap().stack_for_encoding(),
            vec![Object(RefType::Object(class("java/io/IOException")))]
        );
        tracker.push_instruction(Pop).unwrap();
        tracker.place_label(end).unwrap();
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();

        let table = tracker.result().unwrap();
        let offsets: Vec<Offset> = table.frames.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![Offset(4), Offset(5)]);
        assert_eq!(table.max_stack, 1);
    }

    #[test]
    fn unplaced_labels() {
        let mut tracker = static_tracker("(Ljava/lang/Object;)V");
        let label = tracker.fresh_label();
        tracker.push_instruction(ALoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::IfNull(EqComparison::EQ, label))
            .unwrap();
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        match tracker.result() {
            Err(Error::MethodCodeNotFinished {
                falls_off_end,
                unplaced_labels,
            }) => {
                assert!(!falls_off_end);
                assert_eq!(unplaced_labels, vec![label]);
            }
            other => panic!("unexpected result {:?}", other),
        }

        let mut tracker = static_tracker("()V");
        tracker.push_instruction(Nop).unwrap();
        assert!(matches!(
            tracker.result(),
            Err(Error::MethodCodeNotFinished {
                falls_off_end: true,
                ..
            })
        ));
    }

    #[test]
    fn scopes() {
        let mut settings = TrackerSettings::new();
        settings.frame_at_scope_exit = true;
        let mut tracker = FrameTracker::new(
            signature("run", "(I)V", MethodAccessFlags::STATIC),
            settings,
        )
        .unwrap();
        let after = tracker.fresh_label();

        let scope = tracker.open_scope().unwrap();
        assert_eq!(scope.lowest_slot, 1);
        tracker.push_instruction(LConst0).unwrap();
        tracker.push_instruction(LStore(1)).unwrap();
        tracker.push_instruction(ILoad(0)).unwrap();
        tracker
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, after))
            .unwrap();
        tracker.close_scope(scope);

        assert_eq!(
            tracker.current_frame().unwrap().locals_for_encoding(),
            vec![Integer]
        );
        assert_eq!(
            tracker.lookup_frame(after).unwrap().locals_for_encoding(),
            vec![Integer]
        );
        assert!(tracker.registry().is_required(Offset(6)));

        tracker.place_label(after).unwrap();
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        let table = tracker.result().unwrap();
        assert_eq!(table.max_locals, 3);
        assert_eq!(table.frames.len(), 1);
    }

    #[test]
    fn constructor_body() {
        let mut tracker = FrameTracker::new(
            signature("<init>", "()V", MethodAccessFlags::PUBLIC),
            TrackerSettings::new(),
        )
        .unwrap();
        tracker.push_instruction(ALoad(0)).unwrap();
        tracker
            .push_instruction(Invoke(
                InvokeType::Special,
                MethodRef {
                    class: BinaryName::OBJECT,
                    name: UnqualifiedName::INIT,
                    descriptor: MethodDescriptor::parse("()V").unwrap(),
                },
            ))
            .unwrap();
        assert_eq!(
            tracker.current_frame().unwrap().locals_for_encoding(),
            vec![Object(RefType::Object(class("me/Test")))]
        );

        assert!(tracker.retype_top(FieldType::int()).is_err());
        tracker.push_branch_instruction(BranchInstruction::Return).unwrap();
        assert!(tracker.retype_top(FieldType::int()).is_ok());
    }

    #[test]
    fn code_overflow() {
        let mut settings = TrackerSettings::new();
        settings.max_code_length = 2;
        let mut tracker = FrameTracker::new(
            signature("run", "()V", MethodAccessFlags::STATIC),
            settings,
        )
        .unwrap();
        tracker.push_instruction(Nop).unwrap();
        tracker.push_instruction(Nop).unwrap();
        assert!(matches!(
            tracker.push_instruction(Nop),
            Err(Error::MethodCodeOverflow(Offset(3)))
        ));
    }
}
