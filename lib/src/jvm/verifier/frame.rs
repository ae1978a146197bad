use super::*;
use crate::jvm::{BinaryName, FrameErrorKind, RefType};
use crate::util::{Offset, OffsetVec, Width};

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// The live frame follows the emitter instruction by instruction, and clones of it are stored
/// as snapshots at merge points. A clone is fully independent of the frame it came from: the
/// only thing the two keep in common is the [`AllocationSite`] of uninitialized values, which is
/// what constructor completion matches on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<Cls, U> {
    /// Offset in the code this frame describes (unset while the frame is only pending for a
    /// label that has not been placed)
    pub pc: Option<Offset>,

    /// Local variables in scope
    pub locals: Locals<VerificationType<Cls, U>>,

    /// Types of values on the stack
    pub stack: OffsetVec<VerificationType<Cls, U>>,
}

/// Frame tracked while emitting code
pub type VerifierFrame = Frame<RefType<BinaryName>, UninitializedRef>;

impl<Cls, U> Default for Frame<Cls, U> {
    fn default() -> Self {
        Frame {
            pc: None,
            locals: Locals::default(),
            stack: OffsetVec::new(),
        }
    }
}

impl<Cls: Clone + Eq, U: Clone + Eq> Frame<Cls, U> {
    /// Push a type onto the stack (a category-2 type is still one entry)
    pub fn push(&mut self, typ: VerificationType<Cls, U>) {
        self.stack.push(typ);
    }

    /// Pop the top type off the stack
    pub fn pop(&mut self) -> Result<VerificationType<Cls, U>, FrameErrorKind> {
        self.stack
            .pop()
            .map(|(_, _, typ)| typ)
            .ok_or(FrameErrorKind::EmptyStack)
    }

    /// Pop `n` entries off the stack
    ///
    /// On underflow, the stack is left untouched.
    pub fn pop_n(&mut self, n: usize) -> Result<(), FrameErrorKind> {
        if self.stack.len() < n {
            return Err(FrameErrorKind::EmptyStack);
        }
        for _ in 0..n {
            let _ = self.stack.pop();
        }
        Ok(())
    }

    /// Pop the top type off the stack, checking its category
    pub fn pop_expecting_width(
        &mut self,
        expected_width: usize,
    ) -> Result<VerificationType<Cls, U>, FrameErrorKind> {
        let typ = self.pop()?;
        let found_width = typ.width();
        if found_width == expected_width {
            Ok(typ)
        } else {
            Err(FrameErrorKind::InvalidWidth(found_width))
        }
    }

    /// Retype the top of the stack without changing the depth
    pub fn replace_top(&mut self, typ: VerificationType<Cls, U>) -> Result<(), FrameErrorKind> {
        let _ = self.pop()?;
        self.push(typ);
        Ok(())
    }

    pub fn set_local(
        &mut self,
        slot: u16,
        typ: VerificationType<Cls, U>,
    ) -> Result<(), FrameErrorKind> {
        self.locals.set(slot, typ)
    }

    pub fn get_local(&self, slot: u16) -> Result<&VerificationType<Cls, U>, FrameErrorKind> {
        self.locals.get(slot)
    }

    /// Drop every local at or above `slot` (when a lexical scope closes)
    pub fn remove_locals_from(&mut self, slot: u16) {
        self.locals.remove_from(slot);
    }

    /// Do the two frames agree on the types of all locals and stack entries?
    ///
    /// Unlike `==`, this ignores the `pc` of the frames.
    pub fn has_same_types(&self, other: &Self) -> bool {
        self.locals == other.locals && self.stack == other.stack
    }

    /// Update the maximum locals and stack
    ///
    /// Only has an effect if the size of the locals or the size of the stack is greater than the
    /// previous maximum values.
    pub fn update_maximums(&self, max_locals: &mut Offset, max_stack: &mut Offset) {
        max_locals.0 = max_locals.0.max(self.locals.word_len());
        max_stack.0 = max_stack.0.max(self.stack.offset_len().0);
    }

    /// Locals as they get encoded in a stack map frame: gaps become `Top`, a category-2 value is
    /// one entry, and trailing gaps are dropped
    pub fn locals_for_encoding(&self) -> Vec<VerificationType<Cls, U>> {
        self.locals.to_dense(|| VerificationType::Top)
    }

    /// Stack entries from bottom to top, as they get encoded in a stack map frame
    pub fn stack_for_encoding(&self) -> Vec<VerificationType<Cls, U>> {
        self.stack.iter().map(|(_, _, typ)| typ.clone()).collect()
    }

    /// Replace every entry of the frame matching `is_target`
    fn replace_all(
        &mut self,
        is_target: impl Fn(&VerificationType<Cls, U>) -> bool,
        updated: VerificationType<Cls, U>,
    ) {
        let stack = std::mem::take(&mut self.stack);
        self.stack = stack
            .into_iter()
            .map(|(_, _, typ)| if is_target(&typ) { updated.clone() } else { typ })
            .collect();

        for typ in self.locals.values_mut() {
            if is_target(typ) {
                *typ = updated.clone();
            }
        }
    }
}

impl VerifierFrame {
    /// Replace the array reference on top of the stack with a value of its element type
    ///
    /// A `null` array has no element type to speak of, so `null_element` is pushed instead. This
    /// is the type the instruction loading the element statically produces.
    pub fn replace_with_element_type(&mut self, null_element: VType) -> Result<(), FrameErrorKind> {
        let element_type = match self.pop()? {
            VType::Null => null_element,
            VType::Object(array_type) => array_type
                .element_type()
                .map(VType::from)
                .ok_or(FrameErrorKind::NotArrayType)?,
            _ => return Err(FrameErrorKind::NotArrayType),
        };
        self.push(element_type);
        Ok(())
    }

    /// Mark the receiver of a completed `<init>` call as initialized
    ///
    /// Every entry in the locals and on the stack that came from the same allocation as
    /// `receiver` becomes an `Object` of the class being constructed. For `UninitializedThis`,
    /// that is `this_class`.
    pub fn initialize_receiver(
        &mut self,
        receiver: &VType,
        this_class: &BinaryName,
    ) -> Result<(), FrameErrorKind> {
        match receiver {
            VType::UninitializedThis => {
                let initialized = VType::Object(RefType::Object(this_class.clone()));
                self.replace_all(|typ| *typ == VType::UninitializedThis, initialized);
            }
            VType::Uninitialized(uninit) => {
                let initialized = VType::Object(RefType::Object(uninit.class.clone()));
                let site = uninit.site;
                self.replace_all(
                    |typ| matches!(typ, VType::Uninitialized(other) if other.site == site),
                    initialized,
                );
            }
            _ => return Err(FrameErrorKind::InvalidType),
        }
        Ok(())
    }

    /// Render the frame with plain strings, for error messages and listings
    pub fn into_printable(&self) -> Frame<String, String> {
        Frame {
            pc: self.pc,
            locals: self
                .locals
                .iter()
                .map(|(slot, typ)| (slot, typ.into_printable()))
                .collect(),
            stack: self
                .stack
                .iter()
                .map(|(_, _, typ)| typ.into_printable())
                .collect(),
        }
    }
}
