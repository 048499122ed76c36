mod cli;
mod commands;
mod config;
mod error;
mod output;
mod present;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::{CliError, exit_code};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose, cli.global.log_json);

    // Dispatch and handle errors with proper exit codes
    match run(cli).await {
        Ok(exit_code::SUCCESS) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    tracing::debug!(command = ?cli.command, "dispatching command");

    match &cli.command {
        // Config commands don't need a bus connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "sdwatch", &mut std::io::stdout());
            Ok(exit_code::SUCCESS)
        }

        Command::Status(args) => {
            let cfg = config::load(&cli.global)?;
            commands::status::handle(args, &cli.global, &cfg).await
        }

        Command::Watch => {
            let cfg = config::load(&cli.global)?;
            commands::watch::handle(&cli.global, &cfg).await
        }
    }
}
