// Domain layer: track geometry, snapshots and the viewer diff.

pub mod instruction;
pub mod projection;
pub mod track;

pub use instruction::{Instruction, diff};
pub use track::{Bound, Bounds, Direction, Position, Snapshot, Track, TrackId};
