//! `sdwatch status`: one snapshot, then exit.

use sdwatch_core::{Severity, StatusEngine};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config::Config;
use crate::error::{CliError, exit_code};

use super::Presenter;

pub async fn handle(args: &StatusArgs, global: &GlobalOpts, cfg: &Config) -> Result<i32, CliError> {
    let presenter = Presenter::resolve(global, cfg)?;
    let connector = super::connect(global, cfg).await?;

    let snapshot = StatusEngine::oneshot(connector).await?;
    presenter.show(&snapshot)?;

    Ok(if args.exit_code {
        severity_exit_code(snapshot.severity)
    } else {
        exit_code::SUCCESS
    })
}

fn severity_exit_code(severity: Severity) -> i32 {
    match severity {
        Severity::Green => exit_code::SUCCESS,
        Severity::Yellow => exit_code::SEVERITY_YELLOW,
        Severity::Red => exit_code::SEVERITY_RED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_grow_with_severity() {
        assert_eq!(severity_exit_code(Severity::Green), 0);
        assert_eq!(severity_exit_code(Severity::Yellow), 10);
        assert_eq!(severity_exit_code(Severity::Red), 11);
    }
}
