//! Push subscriptions over an owner's interviews.
//!
//! A [`SubscriptionHub`] keeps one unbounded channel per live listener.
//! Dropping the [`Subscription`] handle removes its listener from the hub
//! and aborts any watcher task attached to it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::interview::InterviewSpec;
use crate::storage::fetch::ScopedFetch;

/// Full list of an owner's interviews at one point in time.
pub type Snapshot = Vec<InterviewSpec>;

struct Listener {
    owner_id: String,
    sender: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

/// Registry of live listeners, shared by a store and its subscriptions.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    state: Arc<Mutex<HubState>>,
}

impl std::fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for `owner_id` and queues `initial` on it.
    pub fn register(&self, owner_id: &str, initial: Snapshot) -> Subscription {
        let subscription = self.listen(owner_id);
        self.send_to(subscription.id, initial);
        subscription
    }

    /// Adds a listener for `owner_id` with nothing queued yet.
    ///
    /// Writes published from here on reach it, so a snapshot read after
    /// this call cannot miss one.
    pub fn listen(&self, owner_id: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut state = self.state.lock().expect("lock not poisoned");
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(
            id,
            Listener {
                owner_id: owner_id.to_string(),
                sender,
            },
        );
        tracing::debug!(listener = id, owner = %owner_id, "Subscription registered");

        Subscription {
            id,
            owner_id: owner_id.to_string(),
            receiver,
            hub: Arc::downgrade(&self.state),
            watcher: None,
        }
    }

    /// Sends `snapshot` to one listener. `false` once that listener is gone.
    pub fn send_to(&self, listener: u64, snapshot: Snapshot) -> bool {
        let mut state = self.state.lock().expect("lock not poisoned");
        let delivered = state
            .listeners
            .get(&listener)
            .is_some_and(|l| l.sender.send(snapshot).is_ok());
        if !delivered {
            state.listeners.remove(&listener);
        }
        delivered
    }

    /// Whether anyone is listening to `owner_id`.
    pub fn has_listeners(&self, owner_id: &str) -> bool {
        self.state
            .lock()
            .expect("lock not poisoned")
            .listeners
            .values()
            .any(|l| l.owner_id == owner_id)
    }

    /// Sends `snapshot` to every listener of `owner_id`.
    pub fn publish(&self, owner_id: &str, snapshot: Snapshot) {
        let mut state = self.state.lock().expect("lock not poisoned");
        let mut closed = Vec::new();
        for (id, listener) in state.listeners.iter() {
            if listener.owner_id == owner_id && listener.sender.send(snapshot.clone()).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            state.listeners.remove(&id);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .expect("lock not poisoned")
            .listeners
            .len()
    }
}

/// Handle to a live interview subscription.
///
/// Yields a [`Snapshot`] immediately and then after every change. Dropping
/// the handle unregisters it.
pub struct Subscription {
    id: u64,
    owner_id: String,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    hub: Weak<Mutex<HubState>>,
    watcher: Option<ScopedFetch<()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("watched", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Waits for the next snapshot. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Returns a queued snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Listener id within its hub.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ties a background task to this handle; it is aborted on drop.
    pub fn with_watcher(mut self, watcher: ScopedFetch<()>) -> Self {
        self.watcher = Some(watcher);
        self
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Snapshot>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        if let Ok(mut state) = hub.lock() {
            state.listeners.remove(&self.id);
            tracing::debug!(listener = self.id, owner = %self.owner_id, "Subscription released");
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_initial_snapshot_is_immediate() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.register("u1", Vec::new());
        assert_eq!(sub.try_next(), Some(Vec::new()));
        assert_eq!(sub.try_next(), None);
    }

    #[tokio::test]
    async fn test_publish_reaches_only_matching_owner() {
        let hub = SubscriptionHub::new();
        let mut mine = hub.register("u1", Vec::new());
        let mut theirs = hub.register("u2", Vec::new());
        mine.try_next();
        theirs.try_next();

        hub.publish("u1", Vec::new());
        assert!(mine.next().await.is_some());
        assert_eq!(theirs.try_next(), None);
    }

    #[tokio::test]
    async fn test_drop_releases_listener() {
        let hub = SubscriptionHub::new();
        let sub = hub.register("u1", Vec::new());
        let other = hub.register("u1", Vec::new());
        assert_eq!(hub.listener_count(), 2);

        drop(sub);
        assert_eq!(hub.listener_count(), 1);
        assert!(hub.has_listeners("u1"));

        drop(other);
        assert_eq!(hub.listener_count(), 0);
        assert!(!hub.has_listeners("u1"));
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_is_gone() {
        let hub = SubscriptionHub::new();
        let mut sub = hub.register("u1", Vec::new());
        drop(hub);

        assert_eq!(sub.next().await, Some(Vec::new()));
        assert_eq!(StreamExt::next(&mut sub).await, None);
    }

    #[tokio::test]
    async fn test_send_to_targets_one_listener() {
        let hub = SubscriptionHub::new();
        let mut first = hub.listen("u1");
        let mut second = hub.listen("u1");
        assert_eq!(first.try_next(), None);

        assert!(hub.send_to(first.id(), Vec::new()));
        assert_eq!(first.try_next(), Some(Vec::new()));
        assert_eq!(second.try_next(), None);

        let gone = second.id();
        drop(second);
        assert!(!hub.send_to(gone, Vec::new()));
    }

    #[tokio::test]
    async fn test_drop_aborts_watcher() {
        let hub = SubscriptionHub::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let watcher = ScopedFetch::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        let sub = hub.register("u1", Vec::new()).with_watcher(watcher);

        drop(sub);
        // The sender is dropped with the aborted task.
        assert!(rx.await.is_err());
        assert_eq!(hub.listener_count(), 0);
    }
}
