//! Three bounded priority queues plus the non-blocking-preferring dequeue
//! primitive (§4.6, §9 Design Note: "do not collapse to one queue with a
//! priority field").

use tokio::sync::mpsc;

use crate::tasks::Task;
use crate::types::Priority;

const TOP_CAPACITY: usize = 50;
const HIGH_CAPACITY: usize = 100;
const NORMAL_CAPACITY: usize = 100;

/// Sending half of the three priority queues. Cloned into every producer
/// (the tick loop, admin handlers).
#[derive(Clone)]
pub struct QueueHandles {
    top: mpsc::Sender<Task>,
    high: mpsc::Sender<Task>,
    normal: mpsc::Sender<Task>,
}

impl QueueHandles {
    /// Attempts to enqueue `task` onto the queue matching its kind's
    /// priority. Per spec.md §4.6 step 5, a full queue is not an error: the
    /// caller logs a warning and the next tick retries.
    pub fn try_enqueue(&self, task: Task) -> Result<(), Task> {
        let sender = match task.kind().priority() {
            Priority::Top => &self.top,
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
        };
        sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(t) => t,
            mpsc::error::TrySendError::Closed(t) => t,
        })
    }
}

/// Receiving half: implements the priority-preferring dequeue.
pub struct QueueReceivers {
    top: mpsc::Receiver<Task>,
    high: mpsc::Receiver<Task>,
    normal: mpsc::Receiver<Task>,
}

impl QueueReceivers {
    /// Dequeues the next task: Top is tried first, then High, then Normal,
    /// each via a non-blocking attempt. If all three are empty, blocks on
    /// whichever produces a task first. Returns `None` once every sender has
    /// been dropped (scheduler shutdown).
    pub async fn recv(&mut self) -> Option<Task> {
        if let Ok(task) = self.top.try_recv() {
            return Some(task);
        }
        if let Ok(task) = self.high.try_recv() {
            return Some(task);
        }
        if let Ok(task) = self.normal.try_recv() {
            return Some(task);
        }

        tokio::select! {
            biased;
            t = self.top.recv() => t,
            t = self.high.recv() => t,
            t = self.normal.recv() => t,
        }
    }
}

/// Builds a fresh set of queues at their fixed capacities.
pub fn build() -> (QueueHandles, QueueReceivers) {
    let (top_tx, top_rx) = mpsc::channel(TOP_CAPACITY);
    let (high_tx, high_rx) = mpsc::channel(HIGH_CAPACITY);
    let (normal_tx, normal_rx) = mpsc::channel(NORMAL_CAPACITY);

    (
        QueueHandles {
            top: top_tx,
            high: high_tx,
            normal: normal_tx,
        },
        QueueReceivers {
            top: top_rx,
            high: high_rx,
            normal: normal_rx,
        },
    )
}
