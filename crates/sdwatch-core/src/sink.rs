// ── Health sink ──
//
// Where the engine delivers snapshots. Presentation layers implement
// this, or take a `HealthStream` from `WatchSink`.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::HealthSnapshot;

/// Receiver of health snapshots.
///
/// Calls arrive one at a time from the engine's worker task, in the order
/// the snapshots were built. Implementations must not block.
pub trait HealthSink: Send + Sync + 'static {
    /// Called after every successful reconciliation.
    fn publish(&self, snapshot: Arc<HealthSnapshot>);

    /// Called when a reconciliation fails. The previous snapshot stays
    /// current; nothing is published for the failed round.
    fn reconcile_failed(&self, error: &CoreError) {
        let _ = error;
    }
}

impl<F> HealthSink for F
where
    F: Fn(Arc<HealthSnapshot>) + Send + Sync + 'static,
{
    fn publish(&self, snapshot: Arc<HealthSnapshot>) {
        self(snapshot);
    }
}
