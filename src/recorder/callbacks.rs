/// Indexed slot table for lifecycle callbacks: O(1) deregistration, and
/// dispatch always iterates a snapshot so a callback registering or
/// deregistering another callback mid-dispatch never affects that dispatch.
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Opaque deregistration token returned by every `on_*` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackHandle(u64);

/// An arena of callbacks of one event's shape, keyed by [`CallbackHandle`].
///
/// `T` is the callback's argument type; callbacks are `Fn(T) -> BoxFuture<()>`
/// so both async closures and plain functions can register.
pub struct CallbackRegistry<T> {
    next_handle: AtomicU64,
    callbacks: Mutex<BTreeMap<CallbackHandle, Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>>>,
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self {
            next_handle: AtomicU64::new(0),
            callbacks: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<T: Clone + Send + 'static> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, returning a handle that can later be passed to
    /// [`Self::deregister`]. Idempotent: each call allocates a fresh handle,
    /// so registering the same closure twice yields two independent entries.
    pub async fn register(
        &self,
        callback: Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>,
    ) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().await.insert(handle, callback);
        handle
    }

    /// Removes a previously registered callback. No-op if already removed.
    pub async fn deregister(&self, handle: CallbackHandle) {
        self.callbacks.lock().await.remove(&handle);
    }

    /// Invokes every currently registered callback, in registration order,
    /// sequentially awaiting each before starting the next. Callbacks
    /// registered by a callback running during this dispatch are not
    /// included, since the snapshot is taken up front.
    pub async fn dispatch(&self, arg: T) {
        let snapshot: Vec<_> = self.callbacks.lock().await.values().cloned().collect();
        for callback in snapshot {
            callback(arg.clone()).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.callbacks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
