//! Pipewave CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use pipewave::cli::{Cli, CommandContext, CommandDispatcher, EXIT_CONFIG_ERROR};
use pipewave::ui::{OutputMode, TerminalUI, UserInterface};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("pipewave=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipewave=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Pipewave starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);

    let project_root = match &cli.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().unwrap_or_default(),
    };

    let mut ui = TerminalUI::new(output_mode, cli.no_color);

    let context = CommandContext::new(project_root)
        .with_config_path(cli.config.clone())
        .with_no_color(cli.no_color);
    let dispatcher = CommandDispatcher::new(context);

    match dispatcher.dispatch(&cli, &mut ui) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            if e.is_configuration_error() {
                ExitCode::from(EXIT_CONFIG_ERROR as u8)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
