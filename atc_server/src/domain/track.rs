// Domain-level track entities and the snapshot published each tick.

use std::collections::BTreeMap;
use uuid::Uuid;

pub type TrackId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
}

impl Position {
    pub fn new(latitude: i32, longitude: i32, altitude: i32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Compass heading. Each value maps to a fixed unit step (see `projection`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub direction: Direction,
    // Grid units per tick, always >= 1.
    pub speed: i32,
    pub position: Position,
}

impl Track {
    /// Returns a copy of the track moved to `position`.
    pub fn at(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// Inclusive integer range for one axis of the simulation volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub lower: i32,
    pub upper: i32,
}

impl Bound {
    pub const fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// The three independent axis bounds of the simulation volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub latitude: Bound,
    pub longitude: Bound,
    pub altitude: Bound,
}

impl Bounds {
    /// Motion only checks the horizontal axes; altitude never changes in flight.
    pub fn contains_horizontal(&self, position: &Position) -> bool {
        self.latitude.contains(position.latitude) && self.longitude.contains(position.longitude)
    }
}

/// Authoritative population at one tick, keyed by track id.
///
/// Ordered by id so iteration (and therefore diff output) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tracks: BTreeMap<TrackId, Track>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.keys()
    }

    /// Adds `track`, returning the track it replaced, if any.
    pub fn insert(&mut self, track: Track) -> Option<Track> {
        self.tracks.insert(track.id, track)
    }
}

impl FromIterator<Track> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self {
            tracks: iter.into_iter().map(|t| (t.id, t)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_value_is_on_either_edge_then_bound_contains_it() {
        let bound = Bound::new(0, 50);

        assert!(bound.contains(0));
        assert!(bound.contains(50));
        assert!(!bound.contains(-1));
        assert!(!bound.contains(51));
    }

    #[test]
    fn when_altitude_is_out_of_range_then_horizontal_check_still_passes() {
        let bounds = Bounds {
            latitude: Bound::new(0, 50),
            longitude: Bound::new(0, 50),
            altitude: Bound::new(3, 20),
        };

        assert!(bounds.contains_horizontal(&Position::new(10, 10, 99)));
        assert!(!bounds.contains_horizontal(&Position::new(10, 51, 10)));
    }

    #[test]
    fn when_snapshot_built_with_duplicate_ids_then_last_track_wins() {
        let id = Uuid::from_u128(7);
        let first = Track {
            id,
            direction: Direction::N,
            speed: 1,
            position: Position::new(1, 1, 5),
        };
        let second = first.at(Position::new(2, 2, 5));

        let snapshot: Snapshot = [first, second.clone()].into_iter().collect();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&id), Some(&second));
    }
}
