//! Config subcommand handlers.

use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile, SYSTEM_PROFILE, USER_PROFILE};
use crate::error::{CliError, exit_code};
use crate::output;

#[derive(Debug, Serialize)]
struct ProfileRow {
    name: String,
    bus: String,
    address: Option<String>,
    default: bool,
}

/// Starter config: the built-in profiles spelled out so they can be edited.
fn starter_config() -> Config {
    let mut cfg = Config::default();
    cfg.profiles.insert(SYSTEM_PROFILE.into(), Profile::default());
    cfg.profiles.insert(
        USER_PROFILE.into(),
        Profile {
            bus: sdwatch_core::BusKind::Session,
            ..Profile::default()
        },
    );
    cfg
}

fn render_config(format: OutputFormat, cfg: &Config) -> Result<String, CliError> {
    match format {
        OutputFormat::Text | OutputFormat::Plain => {
            toml::to_string_pretty(cfg).map_err(|e| CliError::Render {
                format: "toml",
                reason: e.to_string(),
            })
        }
        OutputFormat::Json => output::render_json_pretty(cfg),
        OutputFormat::JsonCompact => output::render_json_compact(cfg),
        OutputFormat::Yaml => output::render_yaml(cfg),
    }
}

fn profile_rows(cfg: &Config) -> Vec<ProfileRow> {
    config::profile_names(cfg)
        .into_iter()
        .filter_map(|name| {
            let (name, profile) = cfg.resolve_profile(Some(&name)).ok()?;
            Some(ProfileRow {
                default: name == cfg.default_profile_name(),
                bus: profile.bus.to_string(),
                address: profile.address,
                name,
            })
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<i32, CliError> {
    let path = config::active_config_path(global);

    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            sdwatch_config::save_config_to(&starter_config(), &path)?;
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let format = global.output.unwrap_or(OutputFormat::Text);
            output::print_output(&render_config(format, &cfg)?, global.quiet);
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let rows = profile_rows(&cfg);
            let rendered = match global.output.unwrap_or(OutputFormat::Text) {
                OutputFormat::Json => output::render_json_pretty(&rows)?,
                OutputFormat::JsonCompact => output::render_json_compact(&rows)?,
                OutputFormat::Yaml => output::render_yaml(&rows)?,
                OutputFormat::Plain => rows
                    .iter()
                    .map(|row| row.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                OutputFormat::Text => rows
                    .iter()
                    .map(|row| {
                        let marker = if row.default { "*" } else { " " };
                        let target = row.address.as_deref().unwrap_or(&row.bus);
                        format!("{marker} {:<12} {target}", row.name)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            output::print_output(&rendered, global.quiet);
        }
    }

    Ok(exit_code::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_round_trips_through_toml() {
        let cfg = starter_config();
        let text = render_config(OutputFormat::Text, &cfg).unwrap();
        assert!(text.contains("[profiles.user]"));
        assert!(text.contains("bus = \"session\""));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn builtin_profiles_are_listed() {
        let rows = profile_rows(&Config::default());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["system", "user"]);
        assert!(rows[0].default);
        assert_eq!(rows[1].bus, "session");
    }
}
