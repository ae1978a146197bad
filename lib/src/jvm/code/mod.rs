//! Bytecode as reported by an emitter, and frame tracking as it gets emitted
//!
//! ### Structure
//!
//! We split up the [list of bytecode instructions][0] into two groups:
//!
//!   - [`Instruction`] for straight-line instructions
//!   - [`BranchInstruction`] for instructions that may branch, return, or throw
//!
//! Instructions carry resolved operands ([`FieldRef`], [`MethodRef`], [`Constant`], etc.) instead
//! of constant pool indices, since those are what decide the effect on the frame.
//!
//! ### Frame tracking
//!
//! An emitter writes out method code from top to bottom and reports every instruction and label
//! to a [`FrameTracker`]. The tracker keeps the live frame up to date and records the frames the
//! `StackMapTable` will need, so no separate analysis pass over the finished code is needed.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se18/html/jvms-6.html#jvms-6.5

mod frame_tracker;
mod instructions;
mod label;
mod operands;

pub use frame_tracker::*;
pub use instructions::*;
pub use label::*;
pub use operands::*;
