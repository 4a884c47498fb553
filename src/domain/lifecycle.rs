//! Foreground/background tracking for the host application.
//!
//! The host reports raw visibility changes through [`LifecycleWatcher::transition`].
//! The watcher keeps the previous/current pair itself and raises a single
//! [`ForegroundReturned`] edge per background dwell to every live
//! [`Subscription`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Active,
    Inactive,
    Background,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        self == LifecycleState::Active
    }
}

/// Identifies one subscription for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The host application regained visibility after a background dwell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundReturned {
    /// Sequence number of the dwell this edge closes, starting at 1.
    pub dwell: u64,
}

/// An edge addressed to a particular subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub subscription: SubscriptionId,
    pub edge: ForegroundReturned,
}

struct Subscriber {
    id: SubscriptionId,
    live: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<Delivery>,
}

pub struct LifecycleWatcher {
    current: LifecycleState,
    open_dwell: Option<u64>,
    dwells: u64,
    next_subscription: u64,
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for LifecycleWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleWatcher")
            .field("current", &self.current)
            .field("open_dwell", &self.open_dwell)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for LifecycleWatcher {
    fn default() -> Self {
        Self::new(LifecycleState::Active)
    }
}

impl LifecycleWatcher {
    /// Starts from the state the host reports at screen entry. A non-active
    /// start counts as an open dwell.
    pub fn new(initial: LifecycleState) -> Self {
        let mut watcher = Self {
            current: initial,
            open_dwell: None,
            dwells: 0,
            next_subscription: 0,
            subscribers: Vec::new(),
        };
        if !initial.is_active() {
            watcher.open_dwell();
        }
        watcher
    }

    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// Number of subscriptions that have not been cancelled.
    pub fn live_subscriptions(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.live.load(Ordering::Acquire))
            .count()
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let live = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.push(Subscriber {
            id,
            live: Arc::clone(&live),
            sender,
        });
        tracing::debug!(subscription = id.0, "lifecycle subscription attached");
        Subscription { id, live, receiver }
    }

    /// Feeds one raw host callback. Returns the edge when this transition
    /// closed a dwell.
    pub fn transition(&mut self, next: LifecycleState) -> Option<ForegroundReturned> {
        let previous = std::mem::replace(&mut self.current, next);
        tracing::trace!(?previous, ?next, "lifecycle transition");

        let edge = match (previous.is_active(), next.is_active()) {
            (true, false) => {
                self.open_dwell();
                None
            }
            (false, true) => self
                .open_dwell
                .take()
                .map(|dwell| ForegroundReturned { dwell }),
            _ => None,
        };

        self.subscribers.retain(|s| s.live.load(Ordering::Acquire));
        if let Some(edge) = edge {
            tracing::debug!(dwell = edge.dwell, "foreground returned");
            self.subscribers.retain(|s| {
                s.sender
                    .send(Delivery {
                        subscription: s.id,
                        edge,
                    })
                    .is_ok()
            });
        }
        edge
    }

    fn open_dwell(&mut self) {
        if self.open_dwell.is_none() {
            self.dwells += 1;
            self.open_dwell = Some(self.dwells);
        }
    }
}

/// A handle on the edges raised by a [`LifecycleWatcher`].
///
/// Cancelling (or dropping) the handle flips its liveness token, and every
/// receive checks that token, so an edge already queued before cancellation
/// is never observed.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    live: Arc<AtomicBool>,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn cancel(&mut self) {
        if self.live.swap(false, Ordering::AcqRel) {
            tracing::debug!(subscription = self.id.0, "lifecycle subscription released");
        }
        self.receiver.close();
    }

    /// Returns the next already-queued delivery without waiting.
    pub fn try_next(&mut self) -> Option<Delivery> {
        let delivery = self.receiver.try_recv().ok()?;
        self.is_live().then_some(delivery)
    }

    /// Waits for the next delivery; `None` once cancelled.
    pub async fn next(&mut self) -> Option<Delivery> {
        let delivery = self.receiver.recv().await?;
        self.is_live().then_some(delivery)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
