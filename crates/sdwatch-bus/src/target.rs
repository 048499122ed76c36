// Shared bus addressing for building manager handles.
//
// Describes which bus to dial and which object on it to watch. The
// connector and the core engine config both carry these values.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::names::{SYSTEMD_DESTINATION, SYSTEMD_OBJECT_PATH};

/// Which message bus to connect to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BusKind {
    /// The system bus, where PID 1 lives.
    #[default]
    System,
    /// The per-user session bus (a `systemd --user` instance).
    Session,
}

/// The remote manager object a handle is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTarget {
    /// Well-known bus name of the manager.
    pub destination: String,
    /// Object path of the manager object.
    pub path: String,
}

impl Default for BusTarget {
    fn default() -> Self {
        Self {
            destination: SYSTEMD_DESTINATION.into(),
            path: SYSTEMD_OBJECT_PATH.into(),
        }
    }
}
