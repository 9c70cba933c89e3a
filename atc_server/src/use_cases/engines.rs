// Wiring for the simulation engines: clock -> simulator -> state engine.

use super::clock::Clock;
use super::simulator::{SimulationError, SimulationParams, Simulator, spawn_simulator};
use super::state::{StateEngine, StateHandle};
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Settings for spawning the engine pipeline.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Real-time period between clock ticks.
    pub tick_interval: Duration,
    /// Population, speed and bounds for the simulator.
    pub simulation: SimulationParams,
}

/// Running engines and the handles the transport needs.
pub struct Engines {
    pub clock: Clock,
    pub state: StateHandle,
    pub simulator_task: JoinHandle<()>,
    pub state_task: JoinHandle<()>,
}

/// Spawns the state engine, then the simulator feeding it, then hooks the
/// simulator onto a fresh clock.
pub fn spawn_engines<R>(settings: EngineSettings, rng: R) -> Result<Engines, SimulationError>
where
    R: Rng + Send + 'static,
{
    let simulator = Simulator::new(settings.simulation, rng)?;
    let (state, state_task) = StateHandle::spawn(StateEngine::new(settings.simulation.bounds));
    let clock = Clock::spawn(settings.tick_interval);
    let simulator_task = spawn_simulator(&clock, simulator, state.clone());

    Ok(Engines {
        clock,
        state,
        simulator_task,
        state_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bound, Bounds, Instruction};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn settings(max_tracks: usize) -> EngineSettings {
        EngineSettings {
            tick_interval: Duration::from_secs(10),
            simulation: SimulationParams {
                max_tracks,
                speed_limit: 2,
                bounds: Bounds {
                    latitude: Bound::new(0, 50),
                    longitude: Bound::new(0, 50),
                    altitude: Bound::new(3, 20),
                },
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn when_subscriber_registers_then_it_sees_full_population_then_balanced_changes() {
        let engines = spawn_engines(settings(25), StdRng::seed_from_u64(7)).expect("engines");
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Instruction>>();
        engines.state.register(Uuid::from_u128(1), move |batch| {
            let _ = tx.send(batch);
        });

        let mut visible = HashSet::new();
        for _ in 0..20 {
            let batch = rx.recv().await.expect("batch delivered");
            for instruction in batch {
                match instruction {
                    Instruction::Create { id, .. } => assert!(visible.insert(id)),
                    Instruction::Delete { id } => assert!(visible.remove(&id)),
                    Instruction::Update { .. } => panic!("update is never produced"),
                }
            }
            assert_eq!(visible.len(), 26);
        }
    }

    #[test]
    fn when_simulation_params_are_invalid_then_spawn_fails_before_starting_tasks() {
        let mut bad = settings(5);
        bad.simulation.speed_limit = 0;

        let result = spawn_engines(bad, StdRng::seed_from_u64(1));

        assert!(matches!(
            result,
            Err(SimulationError::SpeedLimitTooLow { speed_limit: 0 })
        ));
    }
}
