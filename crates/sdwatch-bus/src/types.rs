// ── Bus payload types ──
//
// Owned, transport-independent views of what the manager sends and
// accepts. Consumers never handle `zvariant` values directly.

use std::collections::HashMap;
use std::fmt;

use zbus::zvariant::{OwnedObjectPath, Value};

use crate::error::Error;
use crate::names::FAILED_UNIT_STATE;

// ── PropertyValue ────────────────────────────────────────────────────

/// A decoded property value.
///
/// Only the scalar shapes the manager actually uses for the properties we
/// watch get their own variant. Anything else keeps its D-Bus signature so
/// it can still be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(String),
    U32(u32),
    U64(u64),
    Bool(bool),
    /// Unsupported shape, carrying its signature (e.g. `"a(ss)"`).
    Other(String),
}

impl PropertyValue {
    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::U32(n) => write!(f, "{n}"),
            Self::U64(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Other(sig) => write!(f, "<{sig}>"),
        }
    }
}

impl From<&Value<'_>> for PropertyValue {
    fn from(value: &Value<'_>) -> Self {
        match value {
            Value::Str(s) => Self::Str(s.as_str().to_owned()),
            Value::U32(n) => Self::U32(*n),
            Value::U64(n) => Self::U64(*n),
            Value::Bool(b) => Self::Bool(*b),
            // Properties.Get wraps the payload in a variant
            Value::Value(inner) => Self::from(&**inner),
            other => Self::Other(other.value_signature().to_string()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

// ── Notifications ────────────────────────────────────────────────────

/// A `PropertiesChanged` notification for the manager interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesChanged {
    /// Properties whose new value travelled with the notification.
    pub changed: HashMap<String, PropertyValue>,
    /// Properties that changed without their value being sent.
    pub invalidated: Vec<String>,
}

impl PropertiesChanged {
    /// Whether `name` appears in the changed map.
    pub fn has_changed(&self, name: &str) -> bool {
        self.changed.contains_key(name)
    }

    /// The new value of `name`, if it was sent.
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.changed.get(name)
    }

    /// Whether `name` was announced as invalidated.
    pub fn is_invalidated(&self, name: &str) -> bool {
        self.invalidated.iter().any(|p| p == name)
    }

    /// Changed and invalidated property names, for logging.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .changed
            .keys()
            .map(String::as_str)
            .chain(self.invalidated.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }
}

/// A signal emitted by the manager object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalEvent {
    /// Signal member name, e.g. `"JobRemoved"`.
    pub name: String,
    /// Decoded arguments. Best effort: arguments of unsupported shape are
    /// kept as [`PropertyValue::Other`].
    pub args: Vec<PropertyValue>,
}

impl SignalEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

// ── Method calls ─────────────────────────────────────────────────────

/// Typed manager method invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    /// Ask the manager to start emitting change signals to this client.
    Subscribe,
    /// Revert a previous [`Subscribe`](Self::Subscribe).
    Unsubscribe,
    /// List units whose active/sub/load state matches any of `states`.
    ListUnitsFiltered { states: Vec<String> },
}

impl ManagerCall {
    /// `ListUnitsFiltered(["failed"])`.
    pub fn list_failed_units() -> Self {
        Self::ListUnitsFiltered {
            states: vec![FAILED_UNIT_STATE.to_owned()],
        }
    }

    /// D-Bus member name of this call.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Subscribe => "Subscribe",
            Self::Unsubscribe => "Unsubscribe",
            Self::ListUnitsFiltered { .. } => "ListUnitsFiltered",
        }
    }
}

/// Decoded reply to a [`ManagerCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodReply {
    /// The call returns nothing.
    Empty,
    /// Unit records, in the order the manager listed them.
    Units(Vec<UnitRecord>),
}

impl MethodReply {
    /// Unwrap a unit listing.
    pub fn into_units(self) -> Result<Vec<UnitRecord>, Error> {
        match self {
            Self::Units(units) => Ok(units),
            Self::Empty => Err(Error::UnexpectedReply {
                method: "ListUnitsFiltered",
                expected: "a(ssssssouso)",
            }),
        }
    }
}

/// One `(ssssssouso)` record from `ListUnits*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitRecord {
    pub name: String,
    pub description: String,
    pub load_state: String,
    pub active_state: String,
    pub sub_state: String,
    pub following: String,
    pub object_path: String,
    pub job_id: u32,
    pub job_type: String,
    pub job_path: String,
}

impl UnitRecord {
    /// A record with only the name set; the manager fills the rest.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Wire shape of a `ListUnits*` entry.
pub(crate) type RawUnit = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

impl From<RawUnit> for UnitRecord {
    fn from(raw: RawUnit) -> Self {
        let (
            name,
            description,
            load_state,
            active_state,
            sub_state,
            following,
            object_path,
            job_id,
            job_type,
            job_path,
        ) = raw;
        Self {
            name,
            description,
            load_state,
            active_state,
            sub_state,
            following,
            object_path: object_path.to_string(),
            job_id,
            job_type,
            job_path: job_path.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn nested_variant_is_unwrapped() {
        let inner = Value::from("degraded");
        let wrapped = Value::Value(Box::new(inner));
        assert_eq!(
            PropertyValue::from(&wrapped),
            PropertyValue::Str("degraded".into())
        );
    }

    #[test]
    fn unsupported_shape_keeps_signature() {
        let value = Value::from(vec!["a", "b"]);
        assert_eq!(PropertyValue::from(&value), PropertyValue::Other("as".into()));
    }

    #[test]
    fn properties_changed_lookup() {
        let mut change = PropertiesChanged::default();
        change.changed.insert("NFailedUnits".into(), PropertyValue::U32(2));
        change.invalidated.push("SystemState".into());

        assert!(change.has_changed("NFailedUnits"));
        assert!(!change.has_changed("SystemState"));
        assert!(change.is_invalidated("SystemState"));
        assert_eq!(change.value("NFailedUnits"), Some(&PropertyValue::U32(2)));
        assert_eq!(change.names(), vec!["NFailedUnits", "SystemState"]);
    }

    #[test]
    fn list_failed_units_call() {
        let call = ManagerCall::list_failed_units();
        assert_eq!(call.method_name(), "ListUnitsFiltered");
        assert_eq!(
            call,
            ManagerCall::ListUnitsFiltered {
                states: vec!["failed".into()]
            }
        );
    }

    #[test]
    fn empty_reply_is_not_a_unit_list() {
        let err = MethodReply::Empty.into_units().unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply { .. }));
    }

    #[test]
    fn raw_unit_conversion_keeps_order_of_fields() {
        let raw: RawUnit = (
            "nginx.service".into(),
            "A high performance web server".into(),
            "loaded".into(),
            "failed".into(),
            "failed".into(),
            String::new(),
            OwnedObjectPath::try_from("/org/freedesktop/systemd1/unit/nginx_2eservice").unwrap(),
            0,
            String::new(),
            OwnedObjectPath::try_from("/").unwrap(),
        );
        let unit = UnitRecord::from(raw);
        assert_eq!(unit.name, "nginx.service");
        assert_eq!(unit.active_state, "failed");
        assert_eq!(
            unit.object_path,
            "/org/freedesktop/systemd1/unit/nginx_2eservice"
        );
        assert_eq!(unit.job_path, "/");
    }
}
