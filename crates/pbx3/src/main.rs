mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pbx3_core::Console;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
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
    let cfg = config::load_config_or_default();

    match cli.command {
        // Local commands don't need a connection
        Command::Config(args) => {
            commands::config_cmd::handle(&args, &cli.global, &cfg);
            Ok(())
        }
        Command::Logout => commands::session::logout(&cli.global, &cfg),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "pbx3", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the API
        cmd => {
            let ctx = config::resolve(&cli.global, &cfg)?;
            let console = Console::from_config(&ctx.connection)?;
            let format = config::output_format(&cli.global, &cfg);

            debug!(command = ?cmd, profile = %ctx.profile_name, "dispatching command");
            let result = commands::dispatch(cmd, &console, &ctx, &cli.global, format).await;

            result.map_err(|err| {
                if matches!(err, CliError::SessionExpired { .. }) && !ctx.token_from_flag {
                    // The stored token is dead; don't offer it again next run.
                    if let Err(e) = config::clear_token(&ctx.profile_name) {
                        warn!(profile = %ctx.profile_name, error = %e, "could not clear stored token");
                    }
                }
                err.for_profile(&ctx.profile_name)
            })
        }
    }
}
