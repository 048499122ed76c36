// ── Health snapshot ──

use std::fmt;

use serde::Serialize;

use super::state::{ManagerState, Severity};

/// Identifier of a failed unit, e.g. `nginx.service`. Opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FailedUnitName(String);

impl FailedUnitName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailedUnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FailedUnitName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for FailedUnitName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// Failed units in the order the manager listed them. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailedUnitSet(Vec<FailedUnitName>);

impl FailedUnitSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FailedUnitName> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[FailedUnitName] {
        &self.0
    }
}

impl<N: Into<FailedUnitName>> FromIterator<N> for FailedUnitSet {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a FailedUnitSet {
    type Item = &'a FailedUnitName;
    type IntoIter = std::slice::Iter<'a, FailedUnitName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Presentation-ready health summary.
///
/// Built fresh on every reconciliation and handed out behind an `Arc`;
/// never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub severity: Severity,
    pub state: ManagerState,
    pub failed_units: FailedUnitSet,
}

impl HealthSnapshot {
    /// Classify `state` and pair it with the failed units.
    pub fn new(state: ManagerState, failed_units: FailedUnitSet) -> Self {
        Self {
            severity: state.severity(),
            state,
            failed_units,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn running_with_a_failed_unit_is_still_green() {
        let snap = HealthSnapshot::new(
            ManagerState::Running,
            ["nginx.service"].into_iter().collect(),
        );
        assert_eq!(snap.severity, Severity::Green);
        assert_eq!(snap.failed_units.len(), 1);
    }

    #[test]
    fn degraded_without_failed_units_is_red() {
        let snap = HealthSnapshot::new(ManagerState::Degraded, FailedUnitSet::default());
        assert_eq!(snap.severity, Severity::Red);
        assert!(snap.failed_units.is_empty());
    }

    #[test]
    fn duplicates_and_order_are_preserved() {
        let set: FailedUnitSet = ["b.service", "a.service", "b.service"].into_iter().collect();
        let names: Vec<&str> = set.iter().map(FailedUnitName::as_str).collect();
        assert_eq!(names, vec!["b.service", "a.service", "b.service"]);
    }

    #[test]
    fn serializes_flat() {
        let snap = HealthSnapshot::new(
            ManagerState::Starting,
            ["foo.mount"].into_iter().collect(),
        );
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "severity": "yellow",
                "state": "starting",
                "failed_units": ["foo.mount"],
            })
        );
    }
}
