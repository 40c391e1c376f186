//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use camino::Utf8Path;
use catfix_cli::{CliError, LOG_FILE, init_logging, run};
use log::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(err) = init_logging(Utf8Path::new(LOG_FILE)) {
        warn!("logging to stderr only, cannot open {LOG_FILE}: {err}");
    }
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
