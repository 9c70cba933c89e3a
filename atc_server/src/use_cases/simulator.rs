// Track simulator: owns the live population and advances it once per clock tick.

use super::clock::Clock;
use super::types::SnapshotConsumer;
use crate::domain::projection::next_position;
use crate::domain::{Bound, Bounds, Direction, Position, Snapshot, Track};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Largest accepted population target.
pub const MAX_TRACKS_LIMIT: usize = 1_000_000;

/// Tuning for the simulated population.
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    /// Population target. The live population is kept at `max_tracks + 1`.
    pub max_tracks: usize,
    /// Exclusive ceiling for generated track speeds; speeds fall in `[1, speed_limit)`.
    pub speed_limit: i32,
    pub bounds: Bounds,
}

/// Errors returned when simulation parameters cannot generate tracks.
#[derive(Debug, PartialEq, Eq)]
pub enum SimulationError {
    /// A bound has no room for a generated position (`lower >= upper`).
    EmptyBound { axis: &'static str, bound: Bound },
    /// Speed ceiling leaves no valid speed.
    SpeedLimitTooLow { speed_limit: i32 },
    /// Population target above `MAX_TRACKS_LIMIT`.
    TooManyTracks { max_tracks: usize },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EmptyBound { axis, bound } => write!(
                f,
                "{axis} bound [{}, {}] leaves no room for tracks",
                bound.lower, bound.upper
            ),
            SimulationError::SpeedLimitTooLow { speed_limit } => {
                write!(f, "speed limit {speed_limit} must be at least 2")
            }
            SimulationError::TooManyTracks { max_tracks } => {
                write!(f, "max tracks {max_tracks} exceeds {MAX_TRACKS_LIMIT}")
            }
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let axes = [
            ("latitude", self.bounds.latitude),
            ("longitude", self.bounds.longitude),
            ("altitude", self.bounds.altitude),
        ];
        for (axis, bound) in axes {
            if bound.lower >= bound.upper {
                return Err(SimulationError::EmptyBound { axis, bound });
            }
        }
        if self.speed_limit < 2 {
            return Err(SimulationError::SpeedLimitTooLow {
                speed_limit: self.speed_limit,
            });
        }
        if self.max_tracks > MAX_TRACKS_LIMIT {
            return Err(SimulationError::TooManyTracks {
                max_tracks: self.max_tracks,
            });
        }
        Ok(())
    }

    /// Number of live tracks after genesis and after every step.
    pub fn population(&self) -> usize {
        self.max_tracks + 1
    }
}

pub struct Simulator<R> {
    params: SimulationParams,
    rng: R,
    tracks: Arc<Snapshot>,
}

impl<R: Rng> Simulator<R> {
    /// Validates `params` and generates the initial population.
    pub fn new(params: SimulationParams, rng: R) -> Result<Self, SimulationError> {
        params.validate()?;
        let mut simulator = Self {
            params,
            rng,
            tracks: Arc::new(Snapshot::empty()),
        };
        let mut tracks = Snapshot::empty();
        simulator.replenish(&mut tracks);
        simulator.tracks = Arc::new(tracks);
        Ok(simulator)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tracks)
    }

    /// Runs one simulation step and returns the published snapshot.
    ///
    /// Every track moves at its own speed; tracks leaving the horizontal
    /// bounds are dropped and replaced with fresh ones.
    pub fn advance(&mut self) -> Arc<Snapshot> {
        let bounds = self.params.bounds;
        let mut next: Snapshot = self
            .tracks
            .tracks()
            .map(|t| t.at(next_position(t, t.speed)))
            .filter(|t| bounds.contains_horizontal(&t.position))
            .collect();
        let exited = self.tracks.len() - next.len();

        let spawned = self.replenish(&mut next);
        debug!(exited, spawned, tracks = next.len(), "simulation step");

        self.tracks = Arc::new(next);
        self.snapshot()
    }

    // `<=` keeps one track above the target, matching genesis.
    fn replenish(&mut self, tracks: &mut Snapshot) -> usize {
        let mut spawned = 0;
        while tracks.len() <= self.params.max_tracks {
            let track = self.new_track();
            if tracks.insert(track).is_none() {
                spawned += 1;
            }
        }
        spawned
    }

    fn new_track(&mut self) -> Track {
        let bounds = self.params.bounds;
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        let speed = self.rng.gen_range(1..self.params.speed_limit);
        let position = Position {
            latitude: self.rng.gen_range(bounds.latitude.lower..bounds.latitude.upper),
            longitude: self.rng.gen_range(bounds.longitude.lower..bounds.longitude.upper),
            altitude: self.rng.gen_range(bounds.altitude.lower..bounds.altitude.upper),
        };
        Track {
            id: uuid::Builder::from_random_bytes(self.rng.r#gen()).into_uuid(),
            direction,
            speed,
            position,
        }
    }
}

/// Drives `simulator` from `clock`, passing each new snapshot to `consumer`.
///
/// Ticks queue on an unbounded channel owned by the simulator task; a slow
/// consumer delays later steps but never the clock.
pub fn spawn_simulator<R, C>(
    clock: &Clock,
    mut simulator: Simulator<R>,
    consumer: C,
) -> JoinHandle<()>
where
    R: Rng + Send + 'static,
    C: SnapshotConsumer,
{
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<i64>();
    clock.tick(move |tick| {
        let _ = tick_tx.send(tick);
    });

    info!(
        tracks = simulator.tracks.len(),
        max_tracks = simulator.params.max_tracks,
        "simulator started"
    );

    tokio::spawn(async move {
        while let Some(tick) = tick_rx.recv().await {
            let snapshot = simulator.advance();
            debug!(tick, tracks = snapshot.len(), "publishing snapshot");
            consumer.consume(snapshot);
        }
        debug!("simulator stopped");
    })
}
