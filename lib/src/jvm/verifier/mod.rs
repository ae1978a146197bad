//! Frame tracking utilities
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other
//! words: although the values on the stack and in the locals may obviously be different, the
//! types and order of the stack and local variables cannot. This information is referred to as the
//! _stack map frame_ (represented using [`Frame`]) and the set of stack map frames for all
//! possible jump targets in a method is the _stack map table_.
//!
//! The "types" used in frames (represented using [`VerificationType`]) are slightly augmented
//! to take into account initialization and null. A `long` or `double` takes up two words in the
//! locals and on the stack, but it is always recorded as exactly one entry.
//!
//! Rather than inferring frames after the fact (which is a fix-point over the control flow
//! graph), the frame is kept up to date as instructions are emitted: [`Frame::apply_instruction`]
//! and [`Frame::apply_branch_instruction`] mirror the stack and locals effect of each
//! instruction.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1

mod frame;
mod locals;
mod rules;
mod types;

pub use frame::*;
pub use locals::*;
pub use types::*;
