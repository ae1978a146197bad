//! Track JVM stack map frames while emitting method code
//!
//! ### Simple example
//!
//! Consider the following simple Java method:
//!
//! ```java,ignore,no_run
//! static int sign(int x) {
//!     return x < 0 ? -1 : 1;
//! }
//! ```
//!
//! Tracking the frames of analogous bytecode can be done as follows:
//!
//! ```
//! use stackmap::jvm::code::{
//!     BranchInstruction::*, FrameTracker, Instruction::*, MethodSignature, OrdComparison,
//! };
//! use stackmap::jvm::{
//!     BinaryName, Error, FieldType, MethodAccessFlags, MethodDescriptor, Name, UnqualifiedName,
//! };
//! use stackmap::TrackerSettings;
//!
//! # fn track_method() -> Result<(), Error> {
//! let method = MethodSignature {
//!     class: BinaryName::from_string(String::from("me/alec/Signs")).unwrap(),
//!     name: UnqualifiedName::from_string(String::from("sign")).unwrap(),
//!     descriptor: MethodDescriptor {
//!         parameters: vec![FieldType::int()],
//!         return_type: Some(FieldType::int()),
//!     },
//!     access_flags: MethodAccessFlags::STATIC,
//! };
//! let mut tracker = FrameTracker::new(method, TrackerSettings::new())?;
//!
//! let negative = tracker.fresh_label();
//! let end = tracker.fresh_label();
//! tracker.push_instruction(ILoad(0))?;
//! tracker.push_branch_instruction(If(OrdComparison::LT, negative))?;
//! tracker.push_instruction(IConst1)?;
//! tracker.push_branch_instruction(Goto(end))?;
//! tracker.place_label(negative)?;
//! tracker.push_instruction(IConstM1)?;
//! tracker.place_label(end)?;
//! tracker.push_branch_instruction(IReturn)?;
//!
//! // One frame at `negative` and one at `end`
//! let table = tracker.result()?;
//! assert_eq!(table.frames.len(), 2);
//! assert_eq!(table.max_stack, 1);
//! # Ok(())
//! # }
//! # track_method().unwrap();
//! ```

mod access_flags;
pub mod code;
mod descriptors;
mod errors;
mod names;
pub mod stackmap;
pub mod verifier;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
