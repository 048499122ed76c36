//! Shared configuration for sdwatch.
//!
//! TOML profiles naming which manager to watch, layered loading
//! (defaults → file → `SDWATCH_` environment), and translation to
//! `sdwatch_core::EngineConfig`. The CLI adds flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sdwatch_core::{BusKind, BusTarget, EngineConfig};

/// Built-in profile watching PID 1 on the system bus.
pub const SYSTEM_PROFILE: &str = "system";
/// Built-in profile watching the `systemd --user` instance on the session bus.
pub const USER_PROFILE: &str = "user";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named manager profiles. `system` and `user` exist implicitly.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(SYSTEM_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-call deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "text".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    sdwatch_core::DEFAULT_CALL_TIMEOUT.as_secs()
}

/// A named manager profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Well-known bus to dial.
    #[serde(default)]
    pub bus: BusKind,

    /// Explicit bus address; wins over `bus`.
    pub address: Option<String>,

    /// Manager bus name (defaults to `org.freedesktop.systemd1`).
    pub destination: Option<String>,

    /// Manager object path (defaults to `/org/freedesktop/systemd1`).
    pub path: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Profile {
    fn builtin(name: &str) -> Option<Self> {
        let bus = match name {
            SYSTEM_PROFILE => BusKind::System,
            USER_PROFILE => BusKind::Session,
            _ => return None,
        };
        Some(Self {
            bus,
            ..Self::default()
        })
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or(SYSTEM_PROFILE)
    }

    /// Look up `name`, falling back to the built-in `system`/`user`
    /// profiles. `None` selects the default profile.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name.unwrap_or_else(|| self.default_profile_name());
        self.profiles
            .get(name)
            .cloned()
            .or_else(|| Profile::builtin(name))
            .map(|profile| (name.to_owned(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "sdwatch", "sdwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sdwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment.
///
/// A missing file is not an error. Environment variables use a double
/// underscore between sections, e.g. `SDWATCH_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SDWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `EngineConfig` from a profile and the global defaults.
pub fn profile_to_engine_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut target = BusTarget::default();
    if let Some(ref destination) = profile.destination {
        if destination.is_empty() {
            return Err(ConfigError::Validation {
                field: "destination".into(),
                reason: "must not be empty".into(),
            });
        }
        target.destination.clone_from(destination);
    }
    if let Some(ref path) = profile.path {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation {
                field: "path".into(),
                reason: format!("object path must start with '/', got '{path}'"),
            });
        }
        target.path.clone_from(path);
    }

    Ok(EngineConfig {
        bus: profile.bus,
        address: profile.address.clone(),
        target,
        call_timeout: Duration::from_secs(timeout),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), SYSTEM_PROFILE);
        assert_eq!(config.defaults.output, "text");
        assert_eq!(config.defaults.timeout, 25);
    }

    #[test]
    fn file_profiles_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "box"

[defaults]
output = "json"
timeout = 10

[profiles.box]
bus = "session"
address = "unix:path=/run/user/1000/bus"
timeout = 3
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.defaults.output, "json");

        let (name, profile) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "box");
        assert_eq!(profile.bus, BusKind::Session);

        let engine = profile_to_engine_config(&profile, &config.defaults).unwrap();
        assert_eq!(engine.call_timeout, Duration::from_secs(3));
        assert_eq!(
            engine.address.as_deref(),
            Some("unix:path=/run/user/1000/bus")
        );
        assert_eq!(engine.target, BusTarget::default());
    }

    #[test]
    fn builtin_profiles_resolve() {
        let config = Config::default();
        let (_, system) = config.resolve_profile(Some("system")).unwrap();
        assert_eq!(system.bus, BusKind::System);
        let (_, user) = config.resolve_profile(Some("user")).unwrap();
        assert_eq!(user.bus, BusKind::Session);
        assert!(matches!(
            config.resolve_profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_timeout_falls_back_to_defaults() {
        let defaults = Defaults {
            timeout: 7,
            ..Defaults::default()
        };
        let engine = profile_to_engine_config(&Profile::default(), &defaults).unwrap();
        assert_eq!(engine.call_timeout, Duration::from_secs(7));
        assert_eq!(engine.bus, BusKind::System);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let defaults = Defaults::default();
        let zero = Profile {
            timeout: Some(0),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_engine_config(&zero, &defaults),
            Err(ConfigError::Validation { ref field, .. }) if field == "timeout"
        ));

        let relative = Profile {
            path: Some("org/freedesktop/systemd1".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_engine_config(&relative, &defaults),
            Err(ConfigError::Validation { ref field, .. }) if field == "path"
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "container".into(),
            Profile {
                address: Some("tcp:host=127.0.0.1,port=4000".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, config.profiles);
    }
}
