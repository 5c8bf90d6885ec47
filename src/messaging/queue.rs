//! # Work Queue
//!
//! Durable FIFO channel of document-processing tasks with competing-consumer,
//! at-least-once delivery. The trait is the seam a networked queue implements
//! in production; [`InMemoryWorkQueue`] provides the same contract in-process,
//! including visibility-timeout redelivery and delayed (backoff) enqueue.

use super::message::DocumentMessage;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// One claimed message. The receipt must be acked (or requeued) by the
/// claiming worker; otherwise the message becomes visible again after the
/// visibility timeout.
#[derive(Debug, Clone)]
pub struct DocumentDelivery {
    pub receipt: u64,
    pub message: DocumentMessage,
}

/// Contract for the task channel between enqueue and the worker pool.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append a message; fails only when the backing store is unavailable.
    async fn enqueue(&self, message: DocumentMessage) -> Result<()>;

    /// Append a message that stays invisible until `delay` elapses.
    async fn enqueue_delayed(&self, message: DocumentMessage, delay: Duration) -> Result<()>;

    /// Block up to `wait` for a message. Each message is delivered to exactly
    /// one caller. `None` means the wait elapsed with nothing available.
    async fn dequeue(&self, wait: Duration) -> Result<Option<DocumentDelivery>>;

    /// Complete a delivery so it is never redelivered.
    async fn ack(&self, receipt: u64) -> Result<()>;

    /// Atomically complete a delivery and re-enqueue a (possibly updated)
    /// message after `delay`. This is the retry path.
    async fn requeue(&self, receipt: u64, message: DocumentMessage, delay: Duration)
        -> Result<()>;

    /// Number of messages waiting (visible or delayed), excluding in-flight.
    async fn depth(&self) -> Result<usize>;
}

struct QueueState {
    ready: VecDeque<DocumentMessage>,
    delayed: Vec<(Instant, DocumentMessage)>,
    in_flight: HashMap<u64, (Instant, DocumentMessage)>,
    next_receipt: u64,
}

/// In-process work queue with SQS-style read/ack/visibility semantics.
///
/// Redelivery is a lazy sweep: expired in-flight entries move back to the
/// ready list whenever a consumer polls, so no background reaper task is
/// needed.
pub struct InMemoryWorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    visibility_timeout: Duration,
}

impl InMemoryWorkQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                delayed: Vec::new(),
                in_flight: HashMap::new(),
                next_receipt: 0,
            }),
            notify: Notify::new(),
            visibility_timeout,
        }
    }

    /// Move due delayed messages and expired in-flight deliveries back to the
    /// ready list.
    fn sweep(state: &mut QueueState, now: Instant) {
        let mut i = 0;
        while i < state.delayed.len() {
            if state.delayed[i].0 <= now {
                let (_, message) = state.delayed.remove(i);
                state.ready.push_back(message);
            } else {
                i += 1;
            }
        }

        let expired: Vec<u64> = state
            .in_flight
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(receipt, _)| *receipt)
            .collect();
        for receipt in expired {
            if let Some((_, message)) = state.in_flight.remove(&receipt) {
                warn!(
                    document_id = %message.document_id(),
                    receipt,
                    "Visibility timeout expired, redelivering message"
                );
                state.ready.push_back(message);
            }
        }
    }

    fn try_claim(&self, now: Instant) -> Option<DocumentDelivery> {
        let mut state = self.state.lock();
        Self::sweep(&mut state, now);

        let message = state.ready.pop_front()?;
        let receipt = state.next_receipt;
        state.next_receipt += 1;
        state
            .in_flight
            .insert(receipt, (now + self.visibility_timeout, message.clone()));
        Some(DocumentDelivery { receipt, message })
    }

    /// Earliest instant at which a currently-invisible message may surface.
    fn next_wake(&self) -> Option<Instant> {
        let state = self.state.lock();
        state
            .delayed
            .iter()
            .map(|(at, _)| *at)
            .chain(state.in_flight.values().map(|(deadline, _)| *deadline))
            .min()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, message: DocumentMessage) -> Result<()> {
        debug!(document_id = %message.document_id(), "Enqueueing message");
        self.state.lock().ready.push_back(message);
        self.notify.notify_one();
        Ok(())
    }

    async fn enqueue_delayed(&self, message: DocumentMessage, delay: Duration) -> Result<()> {
        debug!(
            document_id = %message.document_id(),
            delay_ms = delay.as_millis() as u64,
            "Enqueueing delayed message"
        );
        self.state
            .lock()
            .delayed
            .push((Instant::now() + delay, message));
        // Wake a sleeping consumer so it recomputes its wake-up instant.
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<DocumentDelivery>> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking, so an enqueue between the
            // check and the await is not lost.
            let notified = self.notify.notified();

            if let Some(delivery) = self.try_claim(Instant::now()) {
                return Ok(Some(delivery));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let sleep_until = self.next_wake().map_or(deadline, |w| w.min(deadline));

            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(sleep_until)) => {}
            }
        }
    }

    async fn ack(&self, receipt: u64) -> Result<()> {
        let removed = self.state.lock().in_flight.remove(&receipt);
        if removed.is_none() {
            // The visibility timeout already reclaimed this delivery.
            warn!(receipt, "Ack for unknown receipt, delivery was already reclaimed");
        }
        Ok(())
    }

    async fn requeue(
        &self,
        receipt: u64,
        message: DocumentMessage,
        delay: Duration,
    ) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.in_flight.remove(&receipt);
            if delay.is_zero() {
                state.ready.push_back(message);
            } else {
                state.delayed.push((Instant::now() + delay, message));
            }
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn depth(&self) -> Result<usize> {
        let state = self.state.lock();
        Ok(state.ready.len() + state.delayed.len())
    }
}
