// ── Core error types ──
//
// User-facing errors from sdwatch-core. Consumers never see zbus
// errors directly; the `From<sdwatch_bus::Error>` impl translates
// bus-level failures into the categories the engine reasons about.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Status engine failed to start ({stage}): {reason}")]
    Startup { stage: &'static str, reason: String },

    #[error("Status engine is already running")]
    AlreadyActive,

    // ── Bus errors ───────────────────────────────────────────────────
    #[error("Bus round trip failed: {reason}")]
    Transport {
        reason: String,
        /// Set when the failure was the call deadline expiring.
        timeout_secs: Option<u64>,
    },

    #[error("Manager rejected the request ({name}): {message}")]
    RemoteFault { name: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap a bus failure that happened while bringing the engine up.
    pub(crate) fn startup(stage: &'static str, err: &sdwatch_bus::Error) -> Self {
        Self::Startup {
            stage,
            reason: err.to_string(),
        }
    }

    /// Returns `true` for failures the next notification may clear.
    pub fn is_reconcile_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RemoteFault { .. })
    }
}

// ── Conversion from bus errors ───────────────────────────────────────

impl From<sdwatch_bus::Error> for CoreError {
    fn from(err: sdwatch_bus::Error) -> Self {
        match err {
            sdwatch_bus::Error::RemoteFault { name, message } => {
                CoreError::RemoteFault { name, message }
            }
            sdwatch_bus::Error::Timeout { timeout_secs, .. } => CoreError::Transport {
                reason: err.to_string(),
                timeout_secs: Some(timeout_secs),
            },
            sdwatch_bus::Error::Connect { .. } | sdwatch_bus::Error::Transport(_) => {
                CoreError::Transport {
                    reason: err.to_string(),
                    timeout_secs: None,
                }
            }
            sdwatch_bus::Error::UnexpectedReply { .. } => CoreError::Internal(err.to_string()),
        }
    }
}
