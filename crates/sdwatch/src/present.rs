//! Indicator presentation rules.
//!
//! How a `HealthSnapshot` looks to a person: icon, state label, and the
//! failed-unit summary. Serialized output carries the same strings so
//! status bars can consume them directly.

use serde::Serialize;

use sdwatch_core::{FailedUnitSet, HealthSnapshot, ManagerState, Severity};

/// Icon name for a severity, as shipped by the indicator icon theme.
pub fn icon_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Green => "systemd-green",
        Severity::Yellow => "systemd-yellow",
        Severity::Red => "systemd-red",
    }
}

pub fn state_label(state: &ManagerState) -> String {
    format!("Systemd state: {state}")
}

/// `All units are running`, or a bulleted list of failed units.
pub fn failed_units_text(units: &FailedUnitSet) -> String {
    if units.is_empty() {
        return "All units are running".into();
    }

    let mut text = String::from("Failed units:");
    for unit in units {
        text.push_str("\n • ");
        text.push_str(unit.as_str());
    }
    text
}

/// Serializable view of one snapshot with its presentation strings.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    pub icon: &'static str,
    pub label: String,
    pub summary: String,
    #[serde(flatten)]
    pub snapshot: &'a HealthSnapshot,
}

impl<'a> StatusView<'a> {
    pub fn new(snapshot: &'a HealthSnapshot) -> Self {
        Self {
            icon: icon_name(snapshot.severity),
            label: state_label(&snapshot.state),
            summary: failed_units_text(&snapshot.failed_units),
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn icons_follow_severity() {
        assert_eq!(icon_name(Severity::Green), "systemd-green");
        assert_eq!(icon_name(Severity::Yellow), "systemd-yellow");
        assert_eq!(icon_name(Severity::Red), "systemd-red");
    }

    #[test]
    fn label_uses_raw_state() {
        assert_eq!(
            state_label(&ManagerState::Running),
            "Systemd state: running"
        );
        assert_eq!(
            state_label(&ManagerState::parse("offline")),
            "Systemd state: offline"
        );
    }

    #[test]
    fn empty_unit_list_reads_all_running() {
        assert_eq!(
            failed_units_text(&FailedUnitSet::default()),
            "All units are running"
        );
    }

    #[test]
    fn failed_units_are_bulleted_in_order() {
        let units: FailedUnitSet = ["nginx.service", "foo.mount"].into_iter().collect();
        assert_eq!(
            failed_units_text(&units),
            "Failed units:\n • nginx.service\n • foo.mount"
        );
    }
}
