//! Status synchronization between the systemd manager and UI consumers.
//!
//! This crate owns the reconciliation policy that keeps a health indicator
//! honest about the manager's state:
//!
//! - **[`StatusEngine`]**: lifecycle owner.
//!   [`start()`](StatusEngine::start) subscribes to the manager, registers
//!   notification listeners, and publishes an initial snapshot;
//!   [`stop()`](StatusEngine::stop) tears it all down with no emissions
//!   afterwards. [`StatusEngine::oneshot()`](StatusEngine::oneshot) is the
//!   single-shot mode used by CLI status queries.
//!
//! - **Reconciliation**: Every property change and every `JobRemoved` /
//!   `StartupFinished` signal re-lists failed units and re-derives the
//!   snapshot. When `NFailedUnits` moves without `SystemState`, the state is
//!   re-read from the manager before classification.
//!
//! - **[`HealthSink`]**: Where snapshots go. [`WatchSink`] and
//!   [`HealthStream`] offer a `watch`-backed pull interface on top.
//!
//! - **Domain model** ([`model`]): [`HealthSnapshot`], [`ManagerState`],
//!   [`Severity`] and the failed-unit list.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
mod reconcile;
pub mod sink;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_CALL_TIMEOUT, EngineConfig};
pub use engine::{EngineState, StatusEngine};
pub use error::CoreError;
pub use model::{FailedUnitName, FailedUnitSet, HealthSnapshot, ManagerState, Severity};
pub use sink::HealthSink;
pub use stream::{HealthStream, HealthWatchStream, WatchSink};

// Bus types consumers need to build an engine.
pub use sdwatch_bus::{BusKind, BusTarget, ManagerConnector, SystemdConnector};
