//! updprobe CLI entry point
//!
//! Parses the flags, prepares the process environment, then runs the update
//! workflow on a Tokio runtime. Ctrl+C at any point aborts the run with exit
//! code 130.

use clap::Parser;
use updprobe_cli::cli::Cli;
use updprobe_cli::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use updprobe_cli::core::{ErrorContext, ProbeError, user_friendly_error};

fn main() {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // The environment must be written before the runtime spawns its workers.
    cli.build_config().apply_to_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let code = runtime.block_on(run(cli));

    // A pending stdin read would keep the runtime from shutting down.
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    tokio::select! {
        result = cli.execute() => match result {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                let error_ctx = user_friendly_error(e);
                error_ctx.display();
                error_ctx.exit_code()
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            println!();
            let error_ctx = ErrorContext::new(ProbeError::Cancelled);
            error_ctx.display();
            error_ctx.exit_code()
        }
    }
}
