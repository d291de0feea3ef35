//! Change broadcast hub.
//!
//! # Responsibilities
//! - Register one bounded queue per open live-reload stream
//! - Fan a message out to every registered queue without blocking
//! - Release registrations when streams go away
//!
//! # Design Decisions
//! - `Subscriber` deregisters itself on drop, so abnormal disconnects cannot leak
//! - Broadcast snapshots the senders and releases the lock before sending
//! - A full queue loses that message; the broadcaster never waits

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::observability::metrics;

/// Default per-subscriber queue depth.
pub const DEFAULT_CAPACITY: usize = 10;

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Subscribers the message was enqueued for.
    pub delivered: usize,
    /// Subscribers skipped because their queue was full or already closed.
    pub skipped: usize,
}

#[derive(Debug)]
struct HubInner {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
    capacity: usize,
    closed: AtomicBool,
}

impl HubInner {
    fn remove(&self, id: u64) -> usize {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.remove(&id);
        let count = subscribers.len();
        metrics::record_subscribers(count);
        count
    }
}

/// Registry of live-reload subscribers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

impl ChangeHub {
    /// Create a hub whose subscribers each buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a new subscriber.
    ///
    /// After `close()` the returned subscriber is already ended.
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let count = {
            let mut subscribers = self
                .inner
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.closed.load(Ordering::Acquire) {
                drop(subscribers);
                drop(tx);
                tracing::debug!(subscriber_id = id, "Hub closed, subscription ended immediately");
                return Subscriber {
                    id,
                    rx,
                    hub: self.inner.clone(),
                };
            }
            subscribers.insert(id, tx);
            subscribers.len()
        };
        metrics::record_subscribers(count);
        tracing::debug!(subscriber_id = id, subscribers = count, "Subscriber registered");

        Subscriber {
            id,
            rx,
            hub: self.inner.clone(),
        }
    }

    /// Deregister a subscriber. Dropping it has the same effect.
    pub fn unsubscribe(&self, subscriber: Subscriber) {
        drop(subscriber);
    }

    /// Enqueue `message` for every subscriber that has room.
    pub fn broadcast(&self, message: &str) -> BroadcastReport {
        let targets: Vec<(u64, mpsc::Sender<String>)> = {
            let subscribers = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut report = BroadcastReport::default();
        for (id, tx) in targets {
            match tx.try_send(message.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber_id = id, "Subscriber queue full, message skipped");
                    report.skipped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => report.skipped += 1,
            }
        }

        tracing::info!(
            message = %message,
            delivered = report.delivered,
            skipped = report.skipped,
            "Broadcasting change"
        );
        metrics::record_broadcast(report.delivered, report.skipped);
        report
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every registration; open streams observe end-of-stream.
    ///
    /// Later subscriptions end immediately.
    pub fn close(&self) {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.closed.store(true, Ordering::Release);
        let closed = subscribers.len();
        subscribers.clear();
        metrics::record_subscribers(0);
        tracing::info!(closed, "Change hub closed");
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One registered recipient of broadcast messages.
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    rx: mpsc::Receiver<String>,
    hub: Arc<HubInner>,
}

impl Subscriber {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next message, or `None` once the hub has closed this subscription.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for tests and draining.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let remaining = self.hub.remove(self.id);
        tracing::debug!(subscriber_id = self.id, subscribers = remaining, "Subscriber released");
    }
}
