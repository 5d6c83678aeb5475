use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::watch;

use crate::document::{CollectionPath, Query, Record, StorageError};

type SnapshotSender = Arc<watch::Sender<Vec<Record>>>;

struct Subscriber {
    query: Query,
    sender: SnapshotSender,
}

/// Live subscriptions of a store, keyed by subscription id.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn register(self: &Arc<Self>, query: Query, snapshot: Vec<Record>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = watch::channel(snapshot);
        receiver.mark_changed();

        log::debug!("[SUBSCRIBE] #{id} on {}", query.collection);
        self.lock().insert(
            id,
            Subscriber {
                query,
                sender: Arc::new(sender),
            },
        );

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    /// Subscribers whose query reads from `collection`, or from a collection
    /// nested below it when `nested` is set.
    pub fn subscribers_of(
        &self,
        collection: &CollectionPath,
        nested: bool,
    ) -> Vec<(Query, SnapshotSender)> {
        self.lock()
            .values()
            .filter(|subscriber| {
                let subscribed = &subscriber.query.collection;
                subscribed == collection || (nested && collection.contains(subscribed))
            })
            .map(|subscriber| (subscriber.query.clone(), Arc::clone(&subscriber.sender)))
            .collect()
    }

    fn remove(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            log::debug!("[UNSUBSCRIBE] #{id}");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Snapshots of a query. Dropping it is the same as calling
/// [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    receiver: watch::Receiver<Vec<Record>>,
    registry: Weak<SubscriptionRegistry>,
}

impl Subscription {
    /// Waits for the next snapshot. The first call returns the snapshot taken
    /// when subscribing. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<Record>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Latest snapshot without waiting.
    pub fn current(&self) -> Vec<Record> {
        self.receiver.borrow().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// [`Subscription`] whose snapshots are parsed into domain values.
pub struct TypedSubscription<T> {
    inner: Subscription,
    parse: fn(&Record) -> Result<T, StorageError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSubscription<T> {
    pub(crate) fn new(inner: Subscription, parse: fn(&Record) -> Result<T, StorageError>) -> Self {
        Self {
            inner,
            parse,
            _marker: PhantomData,
        }
    }

    pub async fn next(&mut self) -> Option<Result<Vec<T>, StorageError>> {
        let records = self.inner.next().await?;
        Some(records.iter().map(self.parse).collect())
    }

    pub fn unsubscribe(self) {
        self.inner.unsubscribe();
    }
}
