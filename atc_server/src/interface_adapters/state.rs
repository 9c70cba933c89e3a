use crate::use_cases::StateHandle;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    // Subscriptions and snapshots flow through the state engine task.
    pub engine: StateHandle,
    // Server-initiated keepalive cadence for each viewer socket.
    pub ping_period: Duration,
}
