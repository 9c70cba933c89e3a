// Use-case level messages exchanged between the clock, simulator and state actors.

use crate::domain::{Instruction, Snapshot};
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Callback run by the clock task on every tick.
pub type Ticker = Box<dyn FnMut(i64) + Send + 'static>;

/// Callback the state task uses to hand a subscriber its instruction batch.
pub type InstructionSink = Box<dyn FnMut(Vec<Instruction>) + Send + 'static>;

pub enum ClockCommand {
    Register(Ticker),
}

pub enum StateCommand {
    Register {
        id: SubscriberId,
        sink: InstructionSink,
    },
    Deregister {
        id: SubscriberId,
    },
    Update(Arc<Snapshot>),
    SubscriberCount(oneshot::Sender<usize>),
}

/// Downstream port for freshly simulated snapshots.
///
/// Called from inside the simulator task; implementations must hand the
/// snapshot off and return without blocking.
pub trait SnapshotConsumer: Send + 'static {
    fn consume(&self, snapshot: Arc<Snapshot>);
}

#[cfg(test)]
impl SnapshotConsumer for tokio::sync::mpsc::UnboundedSender<Arc<Snapshot>> {
    fn consume(&self, snapshot: Arc<Snapshot>) {
        if self.send(snapshot).is_err() {
            tracing::warn!("snapshot receiver dropped");
        }
    }
}
