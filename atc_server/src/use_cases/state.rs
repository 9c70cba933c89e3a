// Per-subscriber state engine: diffs each new snapshot against what every
// subscriber has already been shown.

use super::types::{InstructionSink, SnapshotConsumer, StateCommand, SubscriberId};
use crate::domain::{Bound, Bounds, Instruction, Snapshot, diff};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct SubscriberRecord {
    last: Arc<Snapshot>,
    sink: InstructionSink,
}

pub struct StateEngine {
    latitude: Bound,
    longitude: Bound,
    subscribers: HashMap<SubscriberId, SubscriberRecord>,
}

impl StateEngine {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            latitude: bounds.latitude,
            longitude: bounds.longitude,
            subscribers: HashMap::new(),
        }
    }

    /// Adds a subscriber with an empty view, replacing any record for `id`.
    pub fn register(&mut self, id: SubscriberId, sink: InstructionSink) {
        let record = SubscriberRecord {
            last: Arc::new(Snapshot::empty()),
            sink,
        };
        if self.subscribers.insert(id, record).is_some() {
            debug!(subscriber_id = %id, "subscriber re-registered; view reset");
        }
    }

    /// Removes the subscriber. Returns false when it was not registered.
    pub fn deregister(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Diffs `snapshot` against every subscriber's last view and delivers
    /// non-empty batches. Each view becomes `snapshot` afterwards.
    pub fn update(&mut self, snapshot: Arc<Snapshot>) {
        for (id, record) in self.subscribers.iter_mut() {
            let instructions = diff(&record.last, &snapshot, self.latitude, self.longitude);
            record.last = Arc::clone(&snapshot);
            if instructions.is_empty() {
                continue;
            }

            let (created, deleted) = count_actions(&instructions);
            debug!(
                subscriber_id = %id,
                created,
                deleted,
                first_track = %instructions[0].id(),
                "delivering instructions"
            );
            (record.sink)(instructions);
        }
    }
}

fn count_actions(instructions: &[Instruction]) -> (usize, usize) {
    instructions
        .iter()
        .fold((0, 0), |(created, deleted), i| match i {
            Instruction::Create { .. } => (created + 1, deleted),
            Instruction::Delete { .. } => (created, deleted + 1),
            Instruction::Update { .. } => (created, deleted),
        })
}

/// Handle to the state engine task. Cheap to clone.
///
/// All operations are queued and applied one at a time, so a deregister
/// either fully precedes or fully follows any in-flight diff.
#[derive(Clone)]
pub struct StateHandle {
    command_tx: mpsc::UnboundedSender<StateCommand>,
}

impl StateHandle {
    pub fn spawn(engine: StateEngine) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(state_task(engine, command_rx));
        (Self { command_tx }, task)
    }

    pub fn register<F>(&self, id: SubscriberId, sink: F)
    where
        F: FnMut(Vec<Instruction>) + Send + 'static,
    {
        self.send(StateCommand::Register {
            id,
            sink: Box::new(sink),
        });
    }

    pub fn deregister(&self, id: SubscriberId) {
        self.send(StateCommand::Deregister { id });
    }

    pub fn update(&self, snapshot: Arc<Snapshot>) {
        self.send(StateCommand::Update(snapshot));
    }

    /// Number of registered subscribers, or `None` once the task has stopped.
    pub async fn subscriber_count(&self) -> Option<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StateCommand::SubscriberCount(reply_tx));
        reply_rx.await.ok()
    }

    #[cfg(test)]
    pub(crate) fn from_sender(command_tx: mpsc::UnboundedSender<StateCommand>) -> Self {
        Self { command_tx }
    }

    fn send(&self, command: StateCommand) {
        if self.command_tx.send(command).is_err() {
            warn!("state task stopped; command dropped");
        }
    }
}

impl SnapshotConsumer for StateHandle {
    fn consume(&self, snapshot: Arc<Snapshot>) {
        self.update(snapshot);
    }
}

async fn state_task(
    mut engine: StateEngine,
    mut command_rx: mpsc::UnboundedReceiver<StateCommand>,
) {
    while let Some(command) = command_rx.recv().await {
        match command {
            StateCommand::Register { id, sink } => {
                engine.register(id, sink);
                info!(
                    subscriber_id = %id,
                    subscribers = engine.subscriber_count(),
                    "subscriber registered"
                );
            }
            StateCommand::Deregister { id } => {
                if engine.deregister(&id) {
                    info!(
                        subscriber_id = %id,
                        subscribers = engine.subscriber_count(),
                        "subscriber deregistered"
                    );
                }
            }
            StateCommand::Update(snapshot) => engine.update(snapshot),
            StateCommand::SubscriberCount(reply) => {
                let _ = reply.send(engine.subscriber_count());
            }
        }
    }
    debug!("state engine stopped");
}
