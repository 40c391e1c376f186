//! Command-line interface for fixing missing building parts left by the
//! Spanish Cadastre buildings import.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod download;
mod error;
mod list;
mod logging;
mod process;
mod settings;
mod upload;

pub use error::CliError;
pub use logging::{LOG_FILE, init_logging};

use download::DownloadArgs;
use list::ListArgs;
use process::ProcessArgs;
use upload::UploadArgs;

pub(crate) const ARG_HISTORY: &str = "history-file";
pub(crate) const ARG_CHANGESET: &str = "changeset-id";
pub(crate) const ARG_OSM_FILE: &str = "osm-file";
pub(crate) const ARG_OSC_FILE: &str = "osc-file";
pub(crate) const ARG_WORK_DIR: &str = "work-dir";
pub(crate) const ARG_API_URL: &str = "api-url";
pub(crate) const ARG_OVERPASS_URL: &str = "overpass-url";
pub(crate) const ARG_API_DELAY: &str = "api-delay";
pub(crate) const ARG_PASSWORD_FILE: &str = "password-file";
pub(crate) const ARG_ANGLE_THRESHOLD: &str = "angle-threshold";
pub(crate) const ENV_CHANGESET: &str = "CATFIX_CMDS_DOWNLOAD_CHANGESET";
pub(crate) const ENV_OSM_FILE: &str = "CATFIX_CMDS_PROCESS_INPUT";
pub(crate) const ENV_OSC_FILE: &str = "CATFIX_CMDS_UPLOAD_INPUT";

/// Run the catfix CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when the arguments are invalid or the command fails.
pub async fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::List(args) => {
            let mut stdout = std::io::stdout().lock();
            list::run_list(&args, &mut stdout)?;
        }
        Command::Download(args) => {
            download::run_download(args).await?;
        }
        Command::Process(args) => {
            process::run_process(args)?;
        }
        Command::Upload(args) => {
            upload::run_upload(args).await?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "catfix",
    about = "Fix missing building parts in the Spanish Cadastre buildings import",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the import changesets found in a changeset history dump.
    List(ListArgs),
    /// Download a changeset and the building parts around it.
    Download(DownloadArgs),
    /// Compute the missing building parts of a downloaded changeset.
    Process(ProcessArgs),
    /// Upload a change file produced by `process`.
    Upload(UploadArgs),
}

#[cfg(test)]
mod tests;
