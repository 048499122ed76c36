// ── Domain model ──
//
// Value types produced by the engine. Bus payload types stay in
// `sdwatch-bus`; nothing here knows about D-Bus.

mod snapshot;
mod state;

pub use snapshot::{FailedUnitName, FailedUnitSet, HealthSnapshot};
pub use state::{ManagerState, Severity};
