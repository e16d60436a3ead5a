//! Broadcast hub.
//!
//! Fans the fused message stream out to subscribers without ever blocking
//! the producer. Each subscriber owns a bounded lock-free queue for IMU
//! messages (drop-oldest: recency beats completeness for a live feed) and
//! a single-slot latch for the latest GNSS snapshot, which can therefore
//! never be displaced by IMU flood. A subscriber whose queue stays wedged
//! past the overflow cap is closed and removed; other subscribers and the
//! producer are unaffected.
//!
//! The subscriber set is the one piece of shared mutable state in the
//! pipeline and is mutated only under a single mutex. Fan-out into each
//! subscriber's queue is lock-free and independent.

use crate::streaming::messages::OutboundMessage;
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque subscriber identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberHandle(u64);

/// Subscriber lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// The delivery side of one subscription, owned by its writer thread.
pub struct SubscriberFeed {
    pub handle: SubscriberHandle,
    /// Bounded IMU/general message queue (drop-oldest on overflow)
    pub queue: Arc<ArrayQueue<OutboundMessage>>,
    /// Latest GNSS snapshot latch; overwritten, never queued
    pub latest_fix: Arc<Mutex<Option<OutboundMessage>>>,
    /// Cleared by either side to tear the subscription down
    pub alive: Arc<AtomicBool>,
}

struct Subscriber {
    handle: SubscriberHandle,
    queue: Arc<ArrayQueue<OutboundMessage>>,
    latest_fix: Arc<Mutex<Option<OutboundMessage>>>,
    alive: Arc<AtomicBool>,
    state: Liveness,
    /// Displaced messages since the queue last had room
    consecutive_drops: u64,
    dropped_total: u64,
}

/// Multi-subscriber broadcast hub.
pub struct BroadcastHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    overflow_cap: u64,
}

impl BroadcastHub {
    pub fn new(queue_capacity: usize, overflow_cap: u64) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            queue_capacity,
            overflow_cap,
        }
    }

    /// Register a subscriber and hand back its delivery feed.
    pub fn subscribe(&self) -> SubscriberFeed {
        let handle = SubscriberHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(ArrayQueue::new(self.queue_capacity));
        let latest_fix = Arc::new(Mutex::new(None));
        let alive = Arc::new(AtomicBool::new(true));

        self.subscribers.lock().push(Subscriber {
            handle,
            queue: Arc::clone(&queue),
            latest_fix: Arc::clone(&latest_fix),
            alive: Arc::clone(&alive),
            state: Liveness::Connecting,
            consecutive_drops: 0,
            dropped_total: 0,
        });
        log::info!("Subscriber {:?} registered", handle);

        SubscriberFeed {
            handle,
            queue,
            latest_fix,
            alive,
        }
    }

    /// Mark a subscriber's session as fully open.
    pub fn mark_open(&self, handle: SubscriberHandle) {
        if let Some(sub) = self
            .subscribers
            .lock()
            .iter_mut()
            .find(|s| s.handle == handle)
        {
            sub.state = Liveness::Open;
        }
    }

    /// Current liveness of a subscriber, `None` once it has been removed.
    pub fn liveness(&self, handle: SubscriberHandle) -> Option<Liveness> {
        self.subscribers
            .lock()
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.state)
    }

    /// Remove a subscriber and stop its delivery.
    pub fn unsubscribe(&self, handle: SubscriberHandle) {
        let mut subs = self.subscribers.lock();
        if let Some(pos) = subs.iter().position(|s| s.handle == handle) {
            let sub = subs.remove(pos);
            sub.alive.store(false, Ordering::Relaxed);
            log::info!(
                "Subscriber {:?} removed ({} messages dropped under pressure)",
                handle,
                sub.dropped_total
            );
        }
    }

    /// Deliver one message to every live subscriber.
    ///
    /// Never blocks: queue pressure on one subscriber costs it its own
    /// oldest messages, and a wedged subscriber is closed, not waited on.
    pub fn publish(&self, msg: &OutboundMessage) {
        let mut subs = self.subscribers.lock();
        subs.retain_mut(|sub| {
            if !sub.alive.load(Ordering::Relaxed) {
                sub.state = Liveness::Closed;
                log::info!("Subscriber {:?} disconnected, reaping", sub.handle);
                return false;
            }

            match msg {
                OutboundMessage::Gnss(_) => {
                    // Latch semantics: a subscriber always sees the most
                    // recent fix even if it missed several
                    *sub.latest_fix.lock() = Some(msg.clone());
                }
                OutboundMessage::Imu(_) => {
                    if sub.queue.force_push(msg.clone()).is_some() {
                        sub.consecutive_drops += 1;
                        sub.dropped_total += 1;
                        if sub.consecutive_drops > self.overflow_cap {
                            sub.state = Liveness::Closing;
                            sub.alive.store(false, Ordering::Relaxed);
                            log::warn!(
                                "Subscriber {:?} overflowed ({} consecutive drops), closing",
                                sub.handle,
                                sub.consecutive_drops
                            );
                            return false;
                        }
                    } else {
                        sub.consecutive_drops = 0;
                    }
                }
            }
            true
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
