//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sdwatch_config::ConfigError;
use sdwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// `status --exit-code` with a Yellow snapshot.
    pub const SEVERITY_YELLOW: i32 = 10;
    /// `status --exit-code` with a Red snapshot.
    pub const SEVERITY_RED: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the systemd manager")]
    #[diagnostic(
        code(sdwatch::connection_failed),
        help(
            "Check that D-Bus is running and reachable.\n\
             Reason: {reason}\n\
             Try: sdwatch status --bus session, or pass --address"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Could not subscribe to the systemd manager ({stage})")]
    #[diagnostic(
        code(sdwatch::startup_failed),
        help(
            "Is systemd the service manager on this bus?\n\
             Reason: {reason}"
        )
    )]
    StartupFailed { stage: String, reason: String },

    #[error("Bus round trip failed: {reason}")]
    #[diagnostic(code(sdwatch::transport))]
    Transport { reason: String },

    // ── Manager ──────────────────────────────────────────────────────
    #[error("Access denied by the manager: {message}")]
    #[diagnostic(
        code(sdwatch::access_denied),
        help("The bus policy rejected the call. Try the user manager with --profile user.")
    )]
    AccessDenied { message: String },

    #[error("Manager error ({name}): {message}")]
    #[diagnostic(code(sdwatch::remote_fault))]
    RemoteFault { name: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sdwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sdwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             List them with: sdwatch config profiles"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(sdwatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(sdwatch::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("D-Bus call timed out after {seconds}s")]
    #[diagnostic(
        code(sdwatch::timeout),
        help("Increase the timeout with --timeout or check whether the manager is hung.")
    )]
    Timeout { seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(sdwatch::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render {format} output: {reason}")]
    #[diagnostic(code(sdwatch::render))]
    Render { format: &'static str, reason: String },
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::StartupFailed { .. } | Self::Transport { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AccessDenied { .. } => exit_code::PERMISSION,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Startup {
                stage: "connect",
                reason,
            } => CliError::ConnectionFailed { reason },

            CoreError::Startup { stage, reason } => CliError::StartupFailed {
                stage: stage.into(),
                reason,
            },

            CoreError::Transport {
                timeout_secs: Some(seconds),
                ..
            } => CliError::Timeout { seconds },

            CoreError::Transport { reason, .. } => CliError::Transport { reason },

            CoreError::RemoteFault { name, message } if name.ends_with(".AccessDenied") => {
                CliError::AccessDenied { message }
            }

            CoreError::RemoteFault { name, message } => CliError::RemoteFault { name, message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::AlreadyActive => {
                CliError::Internal("status engine is already running".into())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Serialization(e) => CliError::Render {
                format: "toml",
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
