//! Core types for the untangle kernel.

pub mod atom;
pub mod segment;
pub mod edge;
pub mod removal;

pub use atom::{step_context, Atom, AtomCollection, AtomId, Context, Occurrence, Strand, WalkStep};
pub use segment::{Segment, SegmentId, COLOR_TAG};
pub use edge::{EdgeKey, Link, Orientation};
pub use removal::{RemovalCounts, RemovalLog, RemovalReason, RemovalRecord};
