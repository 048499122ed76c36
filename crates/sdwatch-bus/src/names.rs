//! Well-known names on the systemd manager object.

pub const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
pub const SYSTEMD_OBJECT_PATH: &str = "/org/freedesktop/systemd1";
pub const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

// ── Properties ──────────────────────────────────────────────────────

/// Overall manager state (`running`, `degraded`, ...).
pub const SYSTEM_STATE: &str = "SystemState";
/// Number of units currently in the failed state.
pub const N_FAILED_UNITS: &str = "NFailedUnits";

// ── Signals ─────────────────────────────────────────────────────────

pub const JOB_REMOVED: &str = "JobRemoved";
pub const STARTUP_FINISHED: &str = "StartupFinished";

// ── Unit filters ────────────────────────────────────────────────────

pub const FAILED_UNIT_STATE: &str = "failed";
