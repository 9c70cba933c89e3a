use crate::domain::{Bound, Bounds};
use crate::use_cases::{EngineSettings, SimulationError, SimulationParams};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

// Startup arguments (transport surface).

#[derive(Debug, Clone, Parser)]
#[command(name = "atc_server", about = "Streams simulated air traffic to WebSocket viewers")]
pub struct Args {
    /// Port for the HTTP/WebSocket listener.
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Directory holding the viewer's static assets (served with `index.html` as default page).
    #[arg(long, env = "PUBLIC_DIR", default_value = ".")]
    pub public_dir: PathBuf,
}

pub const DEFAULT_HTTP_PORT: u16 = 8989;

/// Keepalive ping cadence for idle viewer sockets.
pub const PING_PERIOD: Duration = Duration::from_secs(60);

// Simulation tuning (overridable through the environment).

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_TRACKS: usize = 2000;
pub const DEFAULT_SPEED_LIMIT: i32 = 2;

pub const LATITUDE_BOUND: Bound = Bound::new(0, 50);
pub const LONGITUDE_BOUND: Bound = Bound::new(0, 50);
pub const ALTITUDE_BOUND: Bound = Bound::new(3, 20);

/// Errors returned when the engine settings cannot be used.
#[derive(Debug)]
pub enum ConfigError {
    ZeroTickInterval,
    Simulation(SimulationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickInterval => write!(f, "TICK_PERIOD_MS must be greater than zero"),
            ConfigError::Simulation(err) => write!(f, "invalid simulation settings: {err}"),
        }
    }
}

impl From<SimulationError> for ConfigError {
    fn from(e: SimulationError) -> Self {
        ConfigError::Simulation(e)
    }
}

/// Engine settings from `TICK_PERIOD_MS`, `MAX_TRACKS` and `SPEED_LIMIT`,
/// falling back to defaults for unset or unparsable values.
pub fn engine_settings() -> Result<EngineSettings, ConfigError> {
    engine_settings_from(|key| env::var(key).ok())
}

pub fn engine_settings_from<F>(lookup: F) -> Result<EngineSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let tick_interval = parsed(&lookup, "TICK_PERIOD_MS")
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK_INTERVAL);
    if tick_interval.is_zero() {
        return Err(ConfigError::ZeroTickInterval);
    }

    let simulation = SimulationParams {
        max_tracks: parsed(&lookup, "MAX_TRACKS").unwrap_or(DEFAULT_MAX_TRACKS),
        speed_limit: parsed(&lookup, "SPEED_LIMIT").unwrap_or(DEFAULT_SPEED_LIMIT),
        bounds: Bounds {
            latitude: LATITUDE_BOUND,
            longitude: LONGITUDE_BOUND,
            altitude: ALTITUDE_BOUND,
        },
    };
    simulation.validate()?;

    Ok(EngineSettings {
        tick_interval,
        simulation,
    })
}

fn parsed<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key).and_then(|value| value.trim().parse().ok())
}
