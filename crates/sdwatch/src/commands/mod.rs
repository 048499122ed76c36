//! Command handlers: bridge CLI args -> engine -> output formatting.

pub mod config_cmd;
pub mod status;
pub mod watch;

use sdwatch_core::{HealthSnapshot, SystemdConnector};
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Open the configured bus and wrap it in a connector.
pub async fn connect(global: &GlobalOpts, cfg: &Config) -> Result<SystemdConnector, CliError> {
    let engine_config = config::engine_config(global, cfg)?;
    debug!(
        bus = %engine_config.bus,
        address = ?engine_config.address,
        destination = %engine_config.target.destination,
        timeout_secs = engine_config.call_timeout.as_secs(),
        "connecting"
    );
    Ok(engine_config.connector().await?)
}

/// Resolved output settings shared by `status` and `watch`.
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Presenter {
    pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        Ok(Self {
            format: config::output_format(global, cfg)?,
            color: output::should_color(config::color_mode(global, cfg)?),
            quiet: global.quiet,
        })
    }

    pub fn show(&self, snapshot: &HealthSnapshot) -> Result<(), CliError> {
        let rendered = output::render_snapshot(self.format, snapshot, self.color)?;
        output::print_output(&rendered, self.quiet);
        Ok(())
    }
}
