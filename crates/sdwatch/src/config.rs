//! CLI configuration -- thin wrapper around `sdwatch_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--profile, --bus, --address, --timeout, --output, --color).

use std::path::PathBuf;

use clap::ValueEnum;

use sdwatch_core::EngineConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sdwatch_config::{Config, Profile, SYSTEM_PROFILE, USER_PROFILE};

// ── Loading ─────────────────────────────────────────────────────────

/// The config file in effect: `--config` if given, else the platform path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(sdwatch_config::config_path)
}

/// Load the config file in effect.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(sdwatch_config::load_config_from(&active_config_path(
        global,
    ))?)
}

// ── Profile resolution ──────────────────────────────────────────────

/// Sorted names of every profile the config makes available.
pub fn profile_names(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = config.profiles.keys().cloned().collect();
    for builtin in [SYSTEM_PROFILE, USER_PROFILE] {
        if !config.profiles.contains_key(builtin) {
            names.push(builtin.into());
        }
    }
    names.sort();
    names
}

/// Translate the active profile + global flags into an `EngineConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn engine_config(global: &GlobalOpts, config: &Config) -> Result<EngineConfig, CliError> {
    let (_, mut profile) = config
        .resolve_profile(global.profile.as_deref())
        .map_err(|e| match e {
            sdwatch_config::ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: profile_names(config).join(", "),
            },
            other => other.into(),
        })?;

    if let Some(bus) = global.bus {
        profile.bus = bus.into();
        // A named bus means "dial it"; drop any address the profile pinned.
        profile.address = None;
    }
    if let Some(ref address) = global.address {
        profile.address = Some(address.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(sdwatch_config::profile_to_engine_config(
        &profile,
        &config.defaults,
    )?)
}

// ── Presentation settings ───────────────────────────────────────────

/// Output format: flag > config default.
pub fn output_format(global: &GlobalOpts, config: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&config.defaults.output, true).map_err(|_| CliError::Validation {
        field: "defaults.output".into(),
        reason: format!(
            "expected text, json, json-compact, yaml or plain, got '{}'",
            config.defaults.output
        ),
    })
}

/// Color mode: flag > config default.
pub fn color_mode(global: &GlobalOpts, config: &Config) -> Result<ColorMode, CliError> {
    if let Some(mode) = global.color {
        return Ok(mode);
    }
    ColorMode::from_str(&config.defaults.color, true).map_err(|_| CliError::Validation {
        field: "defaults.color".into(),
        reason: format!(
            "expected auto, always or never, got '{}'",
            config.defaults.color
        ),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use sdwatch_core::BusKind;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["sdwatch"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let config = Config::default();
        let engine = engine_config(
            &global(&["--profile", "user", "--timeout", "3"]),
            &config,
        )
        .unwrap();
        assert_eq!(engine.bus, BusKind::Session);
        assert_eq!(engine.call_timeout, Duration::from_secs(3));

        let engine = engine_config(&global(&["--bus", "system"]), &config).unwrap();
        assert_eq!(engine.bus, BusKind::System);
        assert_eq!(engine.address, None);
    }

    #[test]
    fn unknown_profile_lists_alternatives() {
        let err = engine_config(&global(&["--profile", "nas"]), &Config::default()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "nas");
                assert_eq!(available, "system, user");
            }
            other => panic!("expected ProfileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn output_falls_back_to_config_default() {
        let mut config = Config::default();
        config.defaults.output = "yaml".into();
        assert_eq!(
            output_format(&global(&[]), &config).unwrap(),
            OutputFormat::Yaml
        );
        assert_eq!(
            output_format(&global(&["-o", "plain"]), &config).unwrap(),
            OutputFormat::Plain
        );

        config.defaults.output = "table".into();
        assert!(matches!(
            output_format(&global(&[]), &config),
            Err(CliError::Validation { .. })
        ));
    }
}
