// ── Status engine ──
//
// Lifecycle owner for one manager subscription. All notifications are
// funnelled through an unbounded queue into a single worker task, so
// reconciliations never overlap and run in arrival order.

use std::sync::Arc;

use sdwatch_bus::{
    ListenerToken, ManagerBus, ManagerCall, ManagerConnector, PropertiesChanged, SignalEvent,
};
use strum::Display;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::HealthSnapshot;
use crate::reconcile::Reconciler;
use crate::sink::HealthSink;
use crate::stream::{HealthStream, WatchSink};

// ── EngineState ──────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum EngineState {
    Inactive,
    Subscribing,
    Active,
    Unsubscribing,
}

/// A queued bus notification, owned so it can cross into the worker.
#[derive(Debug)]
enum Notification {
    Properties(PropertiesChanged),
    Signal(SignalEvent),
}

/// Everything that lives exactly as long as one `start()`/`stop()` pair.
struct Subscription<B: ManagerBus> {
    bus: Arc<B>,
    properties_token: ListenerToken,
    signal_token: ListenerToken,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

// ── StatusEngine ─────────────────────────────────────────────────

/// Keeps a [`HealthSink`] in sync with the systemd manager.
///
/// Cheaply cloneable via `Arc`. The engine acquires a fresh bus handle from
/// its connector on every [`start()`](Self::start) and releases it on
/// [`stop()`](Self::stop); it can be started again afterwards.
pub struct StatusEngine<C: ManagerConnector> {
    inner: Arc<EngineInner<C>>,
}

impl<C: ManagerConnector> Clone for StatusEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<C: ManagerConnector> {
    connector: C,
    sink: Arc<dyn HealthSink>,
    state: watch::Sender<EngineState>,
    /// `Some` while subscribed. Held across the whole of `start()` and
    /// `stop()` so the two never interleave.
    subscription: Mutex<Option<Subscription<C::Bus>>>,
}

impl<C: ManagerConnector> StatusEngine<C> {
    /// Create an inactive engine that will publish to `sink`.
    pub fn new(connector: C, sink: impl HealthSink) -> Self {
        let (state, _) = watch::channel(EngineState::Inactive);
        Self {
            inner: Arc::new(EngineInner {
                connector,
                sink: Arc::new(sink),
                state,
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Create an engine publishing into a fresh [`WatchSink`].
    pub fn watched(connector: C) -> (Self, HealthStream) {
        let (sink, stream) = WatchSink::new();
        (Self::new(connector, sink), stream)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Subscribe to the manager and publish the first snapshot.
    ///
    /// A failure to acquire the handle or to `Subscribe` leaves the engine
    /// `Inactive`. A failure of the initial reconciliation is returned, but
    /// the engine stays `Active` and retries on the next notification.
    ///
    /// Dropping the future before `Subscribe` has completed rolls the engine
    /// back to `Inactive`. After that the subscription is already owned by
    /// the engine and [`stop()`](Self::stop) releases it as usual.
    pub async fn start(&self) -> Result<Arc<HealthSnapshot>, CoreError> {
        let mut slot = self.inner.subscription.lock().await;
        if slot.is_some() {
            return Err(CoreError::AlreadyActive);
        }

        self.set_state(EngineState::Subscribing);
        let mut rollback = StartRollback::new(&self.inner.state);

        let bus = match self.inner.connector.connect().await {
            Ok(bus) => Arc::new(bus),
            Err(e) => return Err(CoreError::startup("connect", &e)),
        };

        rollback.revoke_on_drop(Arc::clone(&bus));
        if let Err(e) = bus.call_method(ManagerCall::Subscribe).await {
            rollback.nothing_to_revoke();
            return Err(CoreError::startup("subscribe", &e));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let properties_token = {
            let tx = tx.clone();
            bus.on_properties_changed(Box::new(move |change: &PropertiesChanged| {
                let _ = tx.send(Notification::Properties(change.clone()));
            }))
        };
        let signal_token = bus.on_signal(Box::new(move |signal: &SignalEvent| {
            let _ = tx.send(Notification::Signal(signal.clone()));
        }));

        self.set_state(EngineState::Active);
        info!("status engine active");

        let (initial_tx, initial_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let reconciler = Reconciler::new(Arc::clone(&bus), Arc::clone(&self.inner.sink));
        let worker = tokio::spawn(event_worker(reconciler, initial_tx, rx, cancel.clone()));

        *slot = Some(Subscription {
            bus,
            properties_token,
            signal_token,
            cancel,
            worker,
        });
        rollback.complete();

        initial_rx.await.unwrap_or_else(|_| {
            Err(CoreError::Internal(
                "event worker exited before the first snapshot".into(),
            ))
        })
    }

    /// Tear the subscription down. No snapshot is published once this
    /// returns. A no-op when the engine is not running.
    pub async fn stop(&self) {
        let mut slot = self.inner.subscription.lock().await;
        let Some(subscription) = slot.take() else {
            debug!("stop requested while inactive");
            return;
        };

        self.set_state(EngineState::Unsubscribing);

        let Subscription {
            bus,
            properties_token,
            signal_token,
            cancel,
            worker,
        } = subscription;

        bus.remove_listener(properties_token);
        bus.remove_listener(signal_token);

        cancel.cancel();
        if let Err(e) = worker.await {
            warn!(error = %e, "event worker did not shut down cleanly");
        }

        if let Err(e) = bus.call_method(ManagerCall::Unsubscribe).await {
            warn!(error = %e, "Unsubscribe failed (non-fatal)");
        }

        drop(bus);
        self.set_state(EngineState::Inactive);
        info!("status engine stopped");
    }

    /// One-shot: start, take the first snapshot, stop.
    pub async fn oneshot(connector: C) -> Result<Arc<HealthSnapshot>, CoreError> {
        let engine = Self::new(connector, |_: Arc<HealthSnapshot>| {});
        let result = engine.start().await;
        engine.stop().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        *self.inner.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state_changes(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.state() == EngineState::Active
    }

    fn set_state(&self, state: EngineState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "engine state");
        }
    }
}

// ── Start rollback ───────────────────────────────────────────

/// Undoes a half-finished `start()` if it is dropped before
/// [`complete()`](Self::complete).
struct StartRollback<'a, B: ManagerBus> {
    state: &'a watch::Sender<EngineState>,
    /// Set while a `Subscribe` may have reached the manager.
    subscribed: Option<Arc<B>>,
    completed: bool,
}

impl<'a, B: ManagerBus> StartRollback<'a, B> {
    fn new(state: &'a watch::Sender<EngineState>) -> Self {
        Self {
            state,
            subscribed: None,
            completed: false,
        }
    }

    fn revoke_on_drop(&mut self, bus: Arc<B>) {
        self.subscribed = Some(bus);
    }

    fn nothing_to_revoke(&mut self) {
        self.subscribed = None;
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl<B: ManagerBus> Drop for StartRollback<'_, B> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let previous = self.state.send_replace(EngineState::Inactive);
        debug!(from = %previous, "start abandoned, back to inactive");

        let Some(bus) = self.subscribed.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = bus.call_method(ManagerCall::Unsubscribe).await {
                        warn!(error = %e, "Unsubscribe after abandoned start failed (non-fatal)");
                    }
                });
            }
            Err(_) => warn!("start abandoned outside a runtime, Unsubscribe skipped"),
        }
    }
}

// ── Event worker ─────────────────────────────────────────────────

/// Run the initial reconciliation, report it through `initial`, then drain
/// the notification queue one entry at a time until cancelled.
///
/// An in-flight reconciliation is dropped on cancellation, so nothing is
/// published after `stop()` has joined this task.
async fn event_worker<B: ManagerBus>(
    reconciler: Reconciler<B>,
    initial: oneshot::Sender<Result<Arc<HealthSnapshot>, CoreError>>,
    mut rx: mpsc::UnboundedReceiver<Notification>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        outcome = reconciler.initial() => Some(outcome),
    };

    if let Some(outcome) = outcome {
        if let Err(ref e) = outcome {
            warn!(error = %e, "initial reconciliation failed");
            reconciler.sink().reconcile_failed(e);
        }
        // `start()` may have been abandoned by now.
        let _ = initial.send(outcome);
        drain_notifications(&reconciler, &mut rx, &cancel).await;
    }

    debug!("event worker finished");
}

async fn drain_notifications<B: ManagerBus>(
    reconciler: &Reconciler<B>,
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    cancel: &CancellationToken,
) {
    let bus = Arc::clone(reconciler.bus());
    let mut connected = true;

    loop {
        let notification = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = bus.disconnected(), if connected => {
                connected = false;
                let error = CoreError::Transport {
                    reason: "manager connection lost, no further updates will arrive".into(),
                    timeout_secs: None,
                };
                warn!(error = %error, "manager stopped delivering notifications");
                reconciler.sink().reconcile_failed(&error);
                continue;
            }
            notification = rx.recv() => {
                let Some(notification) = notification else { break };
                notification
            }
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = handle_notification(reconciler, &notification) => outcome,
        };

        if let Err(e) = outcome {
            warn!(error = %e, "reconciliation failed");
            reconciler.sink().reconcile_failed(&e);
        }
    }
}

async fn handle_notification<B: ManagerBus>(
    reconciler: &Reconciler<B>,
    notification: &Notification,
) -> Result<(), CoreError> {
    match notification {
        Notification::Properties(change) => {
            reconciler.on_properties_changed(change).await?;
        }
        Notification::Signal(signal) => {
            reconciler.on_signal(signal).await?;
        }
    }
    Ok(())
}
