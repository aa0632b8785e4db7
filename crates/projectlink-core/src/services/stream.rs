// ── Service snapshot subscriptions ──

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::Service;

pub type ServiceSnapshot = Arc<Vec<Arc<Service>>>;

/// A subscription to the in-memory services cache.
///
/// Offers point-in-time access plus change notification, either through
/// [`ServiceStream::changed`] or as a `Stream`.
pub struct ServiceStream {
    current: ServiceSnapshot,
    receiver: watch::Receiver<ServiceSnapshot>,
}

impl ServiceStream {
    pub(crate) fn new(receiver: watch::Receiver<ServiceSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &ServiceSnapshot {
        &self.current
    }

    pub fn latest(&self) -> ServiceSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<ServiceSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Snapshots after the current one, one per cache mutation.
    pub fn into_stream(self) -> ServiceWatchStream {
        ServiceWatchStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// `Stream` of snapshots, one per cache mutation.
pub struct ServiceWatchStream {
    inner: WatchStream<ServiceSnapshot>,
}

impl Stream for ServiceWatchStream {
    type Item = ServiceSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
