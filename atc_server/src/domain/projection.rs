// Pure track geometry: single steps and full trajectories.

use super::track::{Bound, Direction, Position, Track};

/// Moves `track` one step along its heading at `speed`.
///
/// Latitude grows eastward and longitude grows northward; altitude is never
/// touched.
pub fn next_position(track: &Track, speed: i32) -> Position {
    let (d_lat, d_lon) = match track.direction {
        Direction::N => (0, speed),
        Direction::NE => (speed, speed),
        Direction::E => (speed, 0),
        Direction::SE => (speed, -speed),
        Direction::S => (0, -speed),
        Direction::SW => (-speed, -speed),
        Direction::W => (-speed, 0),
        Direction::NW => (-speed, speed),
    };

    Position {
        latitude: track.position.latitude + d_lat,
        longitude: track.position.longitude + d_lon,
        altitude: track.position.altitude,
    }
}

/// Every position `track` will occupy until it leaves the latitude/longitude
/// bounds, starting at its current position.
///
/// The first out-of-bounds position is included as the final element. At
/// least one step is always taken, so the result has two or more elements
/// even when the track starts outside the bounds.
pub fn positions(track: &Track, latitude: Bound, longitude: Bound, speed: i32) -> Vec<Position> {
    let mut out = vec![track.position];
    let mut cursor = track.clone();
    loop {
        let next = next_position(&cursor, speed);
        out.push(next);
        if !(latitude.contains(next.latitude) && longitude.contains(next.longitude)) {
            break;
        }
        cursor.position = next;
    }
    out
}
