// Virtual clock actor: fixed-cadence ticks fanned out to registered callbacks.

use super::types::{ClockCommand, Ticker};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Handle to the clock task. Cheap to clone.
#[derive(Clone)]
pub struct Clock {
    command_tx: mpsc::UnboundedSender<ClockCommand>,
    current_rx: watch::Receiver<i64>,
}

impl Clock {
    /// Starts the clock. The first tick (counter 0) fires immediately.
    pub fn spawn(period: Duration) -> Self {
        Self::spawn_at(period, 0)
    }

    fn spawn_at(period: Duration, start: i64) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (current_tx, current_rx) = watch::channel(start);
        tokio::spawn(clock_task(command_rx, current_tx, period, start));
        Self {
            command_tx,
            current_rx,
        }
    }

    /// Registers `ticker` to run on every subsequent tick.
    ///
    /// Registration goes through the clock's own queue, so it is applied
    /// between ticks and never during one.
    pub fn tick<F>(&self, ticker: F)
    where
        F: FnMut(i64) + Send + 'static,
    {
        if self
            .command_tx
            .send(ClockCommand::Register(Box::new(ticker)))
            .is_err()
        {
            warn!("clock task stopped; ticker dropped");
        }
    }

    /// Latest counter value delivered to tickers.
    pub fn current(&self) -> i64 {
        *self.current_rx.borrow()
    }
}

async fn clock_task(
    mut command_rx: mpsc::UnboundedReceiver<ClockCommand>,
    current_tx: watch::Sender<i64>,
    period: Duration,
    start: i64,
) {
    let mut tickers: Vec<Ticker> = Vec::new();
    let mut counter = start;
    let mut commands_open = true;
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            // Drain registrations before the next tick so callers that register
            // right after spawning see the very first tick.
            biased;

            cmd = command_rx.recv(), if commands_open => match cmd {
                Some(ClockCommand::Register(ticker)) => {
                    tickers.push(ticker);
                    debug!(tickers = tickers.len(), "ticker registered");
                }
                None => {
                    commands_open = false;
                    if tickers.is_empty() {
                        break;
                    }
                }
            },

            _ = interval.tick() => {
                let now = counter;
                counter = counter.wrapping_add(1);
                current_tx.send_replace(now);
                for ticker in tickers.iter_mut() {
                    ticker(now);
                }
            }
        }
    }

    debug!("clock stopped");
}
