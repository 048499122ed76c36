//! `sdwatch watch`: print every snapshot until interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use tracing::{debug, info};

use sdwatch_core::{CoreError, HealthSink, HealthSnapshot, ManagerConnector, StatusEngine};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::Config;
use crate::error::{CliError, exit_code};

use super::Presenter;

/// Prints snapshots as the engine publishes them.
struct TerminalSink {
    presenter: Presenter,
    printed: AtomicBool,
}

impl HealthSink for TerminalSink {
    fn publish(&self, snapshot: Arc<HealthSnapshot>) {
        // Blank line between consecutive text blocks.
        if self.presenter.format == OutputFormat::Text
            && !self.presenter.quiet
            && self.printed.swap(true, Ordering::Relaxed)
        {
            println!();
        }
        if let Err(e) = self.presenter.show(&snapshot) {
            eprintln!("{e}");
        }
    }

    fn reconcile_failed(&self, error: &CoreError) {
        if self.presenter.quiet {
            return;
        }
        if self.presenter.color {
            eprintln!("{} {error}", "warning:".yellow().bold());
        } else {
            eprintln!("warning: {error}");
        }
    }
}

pub async fn handle(global: &GlobalOpts, cfg: &Config) -> Result<i32, CliError> {
    let presenter = Presenter::resolve(global, cfg)?;
    let connector = super::connect(global, cfg).await?;

    let engine = StatusEngine::new(
        connector,
        TerminalSink {
            presenter,
            printed: AtomicBool::new(false),
        },
    );

    begin(&engine).await?;
    info!("watching; press Ctrl-C to stop");

    let interrupted = tokio::signal::ctrl_c().await;
    debug!("interrupted, stopping engine");
    engine.stop().await;
    interrupted?;

    Ok(exit_code::SUCCESS)
}

/// Start `engine` for a long-running watch.
///
/// A failed first reconciliation has already been reported by the sink and
/// the engine keeps listening, retrying on the next change. Any other
/// failure stops the engine before it is returned.
async fn begin<C: ManagerConnector>(engine: &StatusEngine<C>) -> Result<(), CliError> {
    match engine.start().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_reconcile_failure() => Ok(()),
        Err(e) => {
            engine.stop().await;
            Err(e.into())
        }
    }
}
