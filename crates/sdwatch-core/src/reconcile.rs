// ── Reconciliation policy ──
//
// Turns bus notifications into health snapshots. Owned by the engine's
// worker task; every method runs to completion before the next
// notification is looked at.

use std::sync::Arc;

use sdwatch_bus::names::{JOB_REMOVED, N_FAILED_UNITS, STARTUP_FINISHED, SYSTEM_STATE};
use sdwatch_bus::{ManagerBus, ManagerCall, PropertiesChanged, PropertyValue, SignalEvent};
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::{FailedUnitSet, HealthSnapshot, ManagerState};
use crate::sink::HealthSink;

/// How a property change affects the cached `SystemState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StateUpdate {
    /// The notification carried the new value.
    FromPayload(PropertyValue),
    /// The cached value may be stale; fetch it from the manager.
    Refetch,
    /// Nothing state-related changed.
    KeepCached,
}

/// Stale-state compensation.
///
/// The manager can move `SystemState` between `running` and `degraded` as
/// units fail or recover without announcing it, while still announcing the
/// accompanying `NFailedUnits` change. Whenever the failed-unit count moves
/// and the state did not travel with it, the cached state must be re-read.
/// An invalidated or non-string `SystemState` is re-read as well.
pub(crate) fn needs_state_refetch(change: &PropertiesChanged) -> StateUpdate {
    if let Some(value) = change.value(SYSTEM_STATE) {
        return if value.as_str().is_some() {
            StateUpdate::FromPayload(value.clone())
        } else {
            StateUpdate::Refetch
        };
    }

    if change.is_invalidated(SYSTEM_STATE)
        || change.has_changed(N_FAILED_UNITS)
        || change.is_invalidated(N_FAILED_UNITS)
    {
        StateUpdate::Refetch
    } else {
        StateUpdate::KeepCached
    }
}

/// Whether a manager signal marks the end of a state-changing operation.
pub(crate) fn triggers_reconcile(signal: &SignalEvent) -> bool {
    signal.name == JOB_REMOVED || signal.name == STARTUP_FINISHED
}

/// Derives snapshots from one manager handle and hands them to the sink.
pub(crate) struct Reconciler<B: ManagerBus> {
    bus: Arc<B>,
    sink: Arc<dyn HealthSink>,
}

impl<B: ManagerBus> Clone for Reconciler<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<B: ManagerBus> Reconciler<B> {
    pub(crate) fn new(bus: Arc<B>, sink: Arc<dyn HealthSink>) -> Self {
        Self { bus, sink }
    }

    pub(crate) fn sink(&self) -> &Arc<dyn HealthSink> {
        &self.sink
    }

    pub(crate) fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// First reconciliation after subscribing: the cache is not trusted.
    pub(crate) async fn initial(&self) -> Result<Arc<HealthSnapshot>, CoreError> {
        self.refetch_state().await?;
        self.full().await
    }

    pub(crate) async fn on_properties_changed(
        &self,
        change: &PropertiesChanged,
    ) -> Result<Arc<HealthSnapshot>, CoreError> {
        match needs_state_refetch(change) {
            StateUpdate::FromPayload(value) => {
                debug!(state = %value, "state taken from notification");
                self.bus.set_cached_property(SYSTEM_STATE, value);
            }
            StateUpdate::Refetch => {
                debug!(properties = ?change.names(), "state not announced, re-reading");
                self.refetch_state().await?;
            }
            StateUpdate::KeepCached => {
                trace!(properties = ?change.names(), "state unchanged");
            }
        }

        self.full().await
    }

    /// Returns `Ok(None)` for signals that do not affect health.
    pub(crate) async fn on_signal(
        &self,
        signal: &SignalEvent,
    ) -> Result<Option<Arc<HealthSnapshot>>, CoreError> {
        if !triggers_reconcile(signal) {
            trace!(signal = %signal.name, "ignoring signal");
            return Ok(None);
        }

        debug!(signal = %signal.name, "reconciling after signal");
        self.full().await.map(Some)
    }

    /// Read the cached state, list failed units, classify, publish.
    pub(crate) async fn full(&self) -> Result<Arc<HealthSnapshot>, CoreError> {
        let state = match self.bus.cached_property(SYSTEM_STATE) {
            Some(value) => value,
            None => self.refetch_state().await?,
        };
        let state = match state.as_str() {
            Some(raw) => ManagerState::parse(raw),
            None => ManagerState::Unknown(state.to_string()),
        };

        let units = self
            .bus
            .call_method(ManagerCall::list_failed_units())
            .await?
            .into_units()?;
        let failed_units: FailedUnitSet = units.into_iter().map(|unit| unit.name).collect();

        let snapshot = Arc::new(HealthSnapshot::new(state, failed_units));
        debug!(
            severity = %snapshot.severity,
            state = %snapshot.state,
            failed = snapshot.failed_units.len(),
            "publishing health snapshot"
        );
        self.sink.publish(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn refetch_state(&self) -> Result<PropertyValue, CoreError> {
        let value = self.bus.remote_property(SYSTEM_STATE).await?;
        self.bus.set_cached_property(SYSTEM_STATE, value.clone());
        Ok(value)
    }
}
