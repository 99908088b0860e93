mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use garage_core::Controller;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Printer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let printer = Printer {
        color: output::should_color(cli.global.color),
        quiet: cli.global.quiet,
    };

    match cli.command {
        // Config commands don't need a database connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, printer),

        cmd => {
            let cfg = garage_config::load_config_or_default();
            let controller_config = config::build_controller_config(&cli.global, &cfg)?;
            let sync_timeout = controller_config.timeout;
            let controller = Controller::from_config(controller_config)?;

            tracing::debug!(command = ?cmd, garage = %controller.paths(), "dispatching command");
            let result =
                commands::dispatch(cmd, &controller, sync_timeout, printer).await;
            controller.shutdown().await;
            result
        }
    }
}
