// ── Manager state and derived severity ──

use std::fmt;

use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

/// Operational mode reported by the manager's `SystemState` property.
///
/// Unrecognized values land in [`Unknown`](Self::Unknown), which keeps the
/// raw string for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ManagerState {
    Initializing,
    Starting,
    Running,
    Stopping,
    Maintenance,
    Degraded,
    #[strum(default)]
    Unknown(String),
}

impl ManagerState {
    /// Parse a raw `SystemState` value. Never fails.
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .unwrap_or_else(|_| Self::Unknown(raw.to_owned()))
    }

    /// The wire string for this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initializing => "initializing",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Maintenance => "maintenance",
            Self::Degraded => "degraded",
            Self::Unknown(raw) => raw,
        }
    }

    /// Severity implied by this state.
    ///
    /// Transitional states are Yellow, `running` is Green, and everything
    /// else (including states this build does not know) is Red.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Initializing | Self::Starting | Self::Maintenance | Self::Stopping => {
                Severity::Yellow
            }
            Self::Running => Severity::Green,
            Self::Degraded | Self::Unknown(_) => Severity::Red,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ManagerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Three-level health classification consumed by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transitional_states_are_yellow() {
        for raw in ["initializing", "starting", "maintenance", "stopping"] {
            assert_eq!(ManagerState::parse(raw).severity(), Severity::Yellow, "{raw}");
        }
    }

    #[test]
    fn running_is_green() {
        assert_eq!(ManagerState::parse("running"), ManagerState::Running);
        assert_eq!(ManagerState::Running.severity(), Severity::Green);
    }

    #[test]
    fn degraded_and_unrecognized_are_red() {
        assert_eq!(ManagerState::Degraded.severity(), Severity::Red);
        for raw in ["offline", "", "Running", "degraded "] {
            let state = ManagerState::parse(raw);
            assert!(!state.is_known(), "{raw:?} should be unknown");
            assert_eq!(state.severity(), Severity::Red, "{raw:?}");
        }
    }

    #[test]
    fn unknown_state_keeps_raw_label() {
        let state = ManagerState::parse("hibernating");
        assert_eq!(state, ManagerState::Unknown("hibernating".into()));
        assert_eq!(state.to_string(), "hibernating");
    }

    #[test]
    fn serializes_as_wire_string() {
        let json = serde_json::to_string(&ManagerState::Maintenance).unwrap();
        assert_eq!(json, "\"maintenance\"");
        assert_eq!(serde_json::to_string(&Severity::Red).unwrap(), "\"red\"");
    }

    #[test]
    fn severity_orders_by_badness() {
        assert!(Severity::Green < Severity::Yellow);
        assert!(Severity::Yellow < Severity::Red);
    }
}
