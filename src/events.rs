//! In-process progress event bus
//!
//! One [`EventBus`] is shared by every task and every progress stream.
//! Publishing is fire-and-forget: with no subscribers the event is dropped.
//! Each subscriber sees events in publish order; a subscriber that falls more
//! than `capacity` events behind skips ahead and gets a [`Received::Lagged`]
//! notice instead of blocking publishers.

use futures::Stream;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::types::{ProgressEvent, TaskId};

/// Fan-out channel for [`ProgressEvent`]s
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ProgressEvent>,
    next_id: AtomicU64,
}

/// What a subscriber gets from [`Subscription::recv`]
#[derive(Clone, Debug, PartialEq)]
pub enum Received {
    /// The next event in publish order
    Event(ProgressEvent),
    /// This many events were overwritten before they could be read
    Lagged(u64),
}

/// A live registration on the bus
///
/// Dropping the subscription unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: Option<broadcast::Receiver<ProgressEvent>>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    ///
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver `event` to every current subscriber
    ///
    /// Returns how many subscribers it was queued for. Never fails and never
    /// waits on a slow subscriber.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            // No subscribers
            Err(_) => 0,
        }
    }

    /// Register a new subscriber
    ///
    /// It sees every event published after this call.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(subscription_id = id, "progress subscriber registered");
        Subscription {
            id,
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Subscription {
    /// Bus-unique identifier of this subscription
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not been called yet
    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next event
    ///
    /// Returns `None` once unsubscribed or once the bus itself is gone.
    pub async fn recv(&mut self) -> Option<Received> {
        let rx = self.rx.as_mut()?;
        match rx.recv().await {
            Ok(event) => Some(Received::Event(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(subscription_id = self.id, skipped, "progress subscriber lagged");
                Some(Received::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Stop receiving events
    ///
    /// Returns `true` the first time; later calls are no-ops returning `false`.
    pub fn unsubscribe(&mut self) -> bool {
        if self.rx.take().is_some() {
            tracing::debug!(subscription_id = self.id, "progress subscriber removed");
            true
        } else {
            false
        }
    }

    /// Turn the subscription into a stream of one task's events
    ///
    /// Events for other tasks are skipped. Lag notices are passed through
    /// since the skipped events may have belonged to `task_id`. Dropping the
    /// stream unsubscribes.
    pub fn for_task(self, task_id: TaskId) -> impl Stream<Item = Received> + Send + 'static {
        futures::stream::unfold((self, task_id), |(mut sub, task_id)| async move {
            loop {
                match sub.recv().await? {
                    Received::Event(event) if event.task_id != task_id => continue,
                    received => return Some((received, (sub, task_id))),
                }
            }
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
