use thiserror::Error;
use zbus::DBusError;

/// Top-level error type for the `sdwatch-bus` crate.
///
/// Separates failures of the bus itself ([`Transport`](Self::Transport),
/// [`Timeout`](Self::Timeout)) from explicit error replies sent by the
/// manager ([`RemoteFault`](Self::RemoteFault)). `sdwatch-core` maps these
/// into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Could not open a connection to the requested bus.
    #[error("Cannot connect to {bus} bus: {reason}")]
    Connect { bus: String, reason: String },

    /// The bus round trip failed (peer unreachable, connection dropped,
    /// malformed message, etc.)
    #[error("D-Bus transport error: {0}")]
    Transport(#[source] zbus::Error),

    /// The call did not complete within the configured deadline.
    #[error("D-Bus call {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    // ── Remote ──────────────────────────────────────────────────────
    /// The manager answered with an error reply.
    #[error("Manager returned {name}: {message}")]
    RemoteFault { name: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// A reply decoded fine but did not have the expected shape.
    #[error("Unexpected reply to {method}: expected {expected}")]
    UnexpectedReply {
        method: &'static str,
        expected: &'static str,
    },
}

impl Error {
    /// Returns `true` if the failure came from the bus rather than from the
    /// manager, so the same call could plausibly succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Transport(_) | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the manager itself rejected the request.
    pub fn is_remote_fault(&self) -> bool {
        matches!(self, Self::RemoteFault { .. })
    }
}

// ── Conversion from zbus errors ──────────────────────────────────────

impl From<zbus::Error> for Error {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => Self::RemoteFault {
                name: name.to_string(),
                message: message.unwrap_or_default(),
            },
            zbus::Error::FDO(fdo) => Self::from(*fdo),
            other => Self::Transport(other),
        }
    }
}

impl From<zbus::fdo::Error> for Error {
    fn from(err: zbus::fdo::Error) -> Self {
        match err {
            // fdo proxies wrap plain transport failures too
            zbus::fdo::Error::ZBus(inner) => Self::from(inner),
            other => Self::RemoteFault {
                name: other.name().to_string(),
                message: other.description().unwrap_or_default().to_owned(),
            },
        }
    }
}
