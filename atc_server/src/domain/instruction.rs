// Viewer instructions and the snapshot diff that produces them.

use super::projection;
use super::track::{Bound, Direction, Position, Snapshot, TrackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Track entered the viewer's scene; animate `from` -> `to` over `duration` ticks.
    Create {
        id: TrackId,
        direction: Direction,
        from: Position,
        to: Position,
        duration: usize,
    },
    /// Reserved by the wire protocol; `diff` never produces it.
    Update {
        id: TrackId,
        direction: Direction,
        from: Position,
        to: Position,
        duration: usize,
    },
    Delete { id: TrackId },
}

impl Instruction {
    pub fn id(&self) -> TrackId {
        match self {
            Instruction::Create { id, .. }
            | Instruction::Update { id, .. }
            | Instruction::Delete { id } => *id,
        }
    }
}

/// Instructions that bring a viewer from `last` to `next`.
///
/// Creates (in track id order) come first, then Deletes. Tracks present in
/// both snapshots produce nothing: viewers extrapolate along the trajectory
/// sent with the Create.
pub fn diff(
    last: &Snapshot,
    next: &Snapshot,
    latitude: Bound,
    longitude: Bound,
) -> Vec<Instruction> {
    let mut out = Vec::new();

    for track in next.tracks() {
        if last.contains(&track.id) {
            continue;
        }
        let path = projection::positions(track, latitude, longitude, track.speed);
        let to = path.last().copied().unwrap_or(track.position);
        out.push(Instruction::Create {
            id: track.id,
            direction: track.direction,
            from: track.position,
            to,
            duration: path.len(),
        });
    }

    out.extend(
        last.ids()
            .filter(|id| !next.contains(id))
            .map(|id| Instruction::Delete { id: *id }),
    );

    out
}
