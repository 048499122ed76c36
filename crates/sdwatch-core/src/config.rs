// ── Engine configuration ──
//
// Everything the engine needs to reach the manager. Built by the CLI
// from the layered profile, or constructed directly by library users.

use std::time::Duration;

use sdwatch_bus::{BusKind, BusTarget, SystemdConnector, open_connection};

use crate::error::CoreError;

/// Default deadline for a single bus round trip.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(25);

/// Connection parameters for a [`StatusEngine`](crate::StatusEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Well-known bus to dial when no explicit address is set.
    pub bus: BusKind,
    /// Explicit bus address (e.g. `unix:path=/run/dbus/system_bus_socket`).
    pub address: Option<String>,
    /// Manager object to watch.
    pub target: BusTarget,
    /// Per-call deadline.
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            address: None,
            target: BusTarget::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Open the configured bus and wrap it in a connector.
    pub async fn connector(&self) -> Result<SystemdConnector, CoreError> {
        if self.call_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "call timeout must be greater than zero".into(),
            });
        }

        let connection = open_connection(self.bus, self.address.as_deref())
            .await
            .map_err(|e| CoreError::startup("connect", &e))?;

        Ok(SystemdConnector::new(
            connection,
            self.target.clone(),
            self.call_timeout,
        ))
    }
}
