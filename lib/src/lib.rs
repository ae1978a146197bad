//! Stack map frame tracking for JVM bytecode emitters
//!
//! Since Java 7, every method body in a class file must carry a `StackMapTable` attribute: the
//! types of the locals and of the operand stack at every offset that can be reached by a jump.
//! This crate computes that information _while_ bytecode is being emitted, instead of running a
//! separate data-flow analysis afterwards. See [`jvm::code::FrameTracker`] for the entry point.

pub mod jvm;
pub mod settings;
pub mod util;

pub use settings::TrackerSettings;
