// ── Reactive health stream ──
//
// A `watch`-backed sink for consumers that prefer pulling the latest
// snapshot over implementing `HealthSink`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::CoreError;
use crate::model::HealthSnapshot;
use crate::sink::HealthSink;

type Slot = Option<Arc<HealthSnapshot>>;

/// [`HealthSink`] that stores the latest snapshot in a `watch` channel.
///
/// A successful publish clears any recorded reconcile error.
pub struct WatchSink {
    snapshot: watch::Sender<Slot>,
    last_error: watch::Sender<Option<CoreError>>,
}

impl WatchSink {
    /// Create a sink and the first subscriber to it.
    pub fn new() -> (Self, HealthStream) {
        let (snapshot, snapshot_rx) = watch::channel(None);
        let (last_error, error_rx) = watch::channel(None);
        let stream = HealthStream::new(snapshot_rx, error_rx);
        (
            Self {
                snapshot,
                last_error,
            },
            stream,
        )
    }

    /// Another subscriber, starting from the current value.
    pub fn subscribe(&self) -> HealthStream {
        HealthStream::new(self.snapshot.subscribe(), self.last_error.subscribe())
    }
}

impl HealthSink for WatchSink {
    fn publish(&self, snapshot: Arc<HealthSnapshot>) {
        self.last_error.send_replace(None);
        self.snapshot.send_replace(Some(snapshot));
    }

    fn reconcile_failed(&self, error: &CoreError) {
        self.last_error.send_replace(Some(error.clone()));
    }
}

/// A subscription to published health snapshots.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct HealthStream {
    current: Slot,
    receiver: watch::Receiver<Slot>,
    errors: watch::Receiver<Option<CoreError>>,
}

impl HealthStream {
    fn new(receiver: watch::Receiver<Slot>, errors: watch::Receiver<Option<CoreError>>) -> Self {
        let current = receiver.borrow().clone();
        Self {
            current,
            receiver,
            errors,
        }
    }

    /// Snapshot captured at creation time or by the last `changed()`.
    pub fn current(&self) -> Option<&Arc<HealthSnapshot>> {
        self.current.as_ref()
    }

    /// Latest published snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Option<Arc<HealthSnapshot>> {
        self.receiver.borrow().clone()
    }

    /// Error from the most recent failed reconciliation, if no snapshot
    /// has been published since.
    pub fn last_error(&self) -> Option<CoreError> {
        self.errors.borrow().clone()
    }

    /// Wait for the next published snapshot.
    /// Returns `None` once the sink has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<HealthSnapshot>> {
        loop {
            self.receiver.changed().await.ok()?;
            let snap = self.receiver.borrow_and_update().clone();
            if let Some(snap) = snap {
                self.current = Some(Arc::clone(&snap));
                return Some(snap);
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, if there is one.
    pub fn into_stream(self) -> HealthWatchStream {
        HealthWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a [`HealthStream`].
pub struct HealthWatchStream {
    inner: WatchStream<Slot>,
}

impl Stream for HealthWatchStream {
    type Item = Arc<HealthSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(None)) => {}
                Poll::Ready(Some(Some(snap))) => return Poll::Ready(Some(snap)),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
