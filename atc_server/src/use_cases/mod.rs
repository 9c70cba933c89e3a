// Use cases layer: the clock, simulator and state engine actors.

pub mod clock;
pub mod engines;
pub mod simulator;
pub mod state;
pub mod types;

pub use clock::Clock;
pub use engines::{EngineSettings, Engines, spawn_engines};
pub use simulator::{MAX_TRACKS_LIMIT, SimulationError, SimulationParams, Simulator};
pub use state::{StateEngine, StateHandle};
pub use types::{InstructionSink, SnapshotConsumer, SubscriberId};
