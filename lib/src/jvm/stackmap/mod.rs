//! Recording of stack map frames and keeping them consistent across jump rewrites
//!
//! A [`FrameRegistry`] holds a snapshot of the frame at every offset that might need one, along
//! with the set of offsets where the `StackMapTable` _must_ have a frame: jump targets, exception
//! handlers, and instructions following an unconditional jump, return, or throw.
//!
//! Offsets are not always final when a frame gets recorded. When a redundant `goto` is dropped or
//! one label is folded into another, the registry is updated through [`OffsetRewriter`], while
//! the [`LabelTable`] tracks where each label ended up and which jumps refer to it.

mod reconcile;
mod registry;

pub use reconcile::*;
pub use registry::*;
