//! Async bridge to the systemd manager object on D-Bus.
//!
//! This crate owns everything that touches the bus:
//!
//! - **[`ManagerBus`]**: the handle contract: cached and remote property
//!   reads, typed method calls, and token-based listener registration for
//!   property-change and signal notifications.
//!
//! - **[`SystemdManager`]**: the `zbus` implementation. A single dispatch
//!   task pumps `PropertiesChanged` and manager signals into the registered
//!   listeners, one notification at a time.
//!
//! - **[`ManagerConnector`]**: acquires a fresh handle on demand. Consumers
//!   receive a connector instead of reaching for a process-wide bus.
//!
//! `sdwatch-core` maps [`Error`] into its own user-facing error type.

pub mod error;
pub mod handle;
pub mod listeners;
pub mod names;
pub mod systemd;
pub mod target;
pub mod types;

pub use error::Error;
pub use handle::{ManagerBus, ManagerConnector, PropertiesHandler, SignalHandler};
pub use listeners::{ListenerKind, ListenerSet, ListenerToken};
pub use systemd::{SystemdConnector, SystemdManager, open_connection};
pub use target::{BusKind, BusTarget};
pub use types::{
    ManagerCall, MethodReply, PropertiesChanged, PropertyValue, SignalEvent, UnitRecord,
};
