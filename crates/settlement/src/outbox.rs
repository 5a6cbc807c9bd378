//! Post-settlement task outbox.
//!
//! The orchestrator never awaits best-effort side effects inline:
//! it enqueues them here as idempotent, independently retryable tasks
//! and drains the queue after the payment transition is durable. A task
//! failure never fails the checkout response.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use common::{OrderNumber, VendorId};

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Fire-and-forget reward points for a paid order.
    AwardPoints { order: OrderNumber },

    /// Book one vendor's parcel with the carrier.
    BookShipment {
        order: OrderNumber,
        vendor: VendorId,
    },
}

impl Task {
    /// Identity of the task; a key is processed at most once.
    pub fn key(&self) -> String {
        match self {
            Task::AwardPoints { order } => format!("award-points/{order}"),
            Task::BookShipment { order, vendor } => format!("book-shipment/{order}/{vendor}"),
        }
    }
}

#[derive(Debug, Default)]
struct OutboxState {
    queued: VecDeque<Task>,
    queued_keys: HashSet<String>,
    done_keys: HashSet<String>,
}

/// In-process task queue with per-key idempotency.
#[derive(Debug, Default)]
pub struct Outbox {
    state: Mutex<OutboxState>,
}

impl Outbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a task unless its key is already queued or done.
    pub fn enqueue(&self, task: Task) {
        let mut state = self.state.lock().unwrap();
        let key = task.key();

        if state.queued_keys.contains(&key) || state.done_keys.contains(&key) {
            return;
        }

        state.queued_keys.insert(key);
        state.queued.push_back(task);
    }

    /// Takes every queued task. The caller reports each one back with
    /// [`mark_done`](Self::mark_done) or [`requeue`](Self::requeue).
    pub fn drain(&self) -> Vec<Task> {
        let mut state = self.state.lock().unwrap();
        state.queued_keys.clear();
        state.queued.drain(..).collect()
    }

    /// Marks a task's key as processed; future enqueues of it are ignored.
    pub fn mark_done(&self, task: &Task) {
        self.state.lock().unwrap().done_keys.insert(task.key());
    }

    /// Puts a failed task back for a later retry.
    pub fn requeue(&self, task: Task) {
        let mut state = self.state.lock().unwrap();
        let key = task.key();
        if state.done_keys.contains(&key) || state.queued_keys.contains(&key) {
            return;
        }
        state.queued_keys.insert(key);
        state.queued.push_back(task);
    }

    /// Returns the number of queued tasks.
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().queued.len()
    }
}
