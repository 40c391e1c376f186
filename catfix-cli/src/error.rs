//! Error types emitted by the catfix CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use catfix_data::api::{ApiBuildError, CredentialsError, DownloadError, UploadError};
use catfix_data::{HistoryError, OscError, OsmReadError};
use thiserror::Error;

/// Errors emitted by the catfix CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass it on the command line or set {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A path could not be inspected due to an IO error.
    #[error("failed to inspect {path:?}: {source}")]
    InspectPath {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An input file name does not start with a changeset id.
    #[error("cannot derive a changeset id from {path:?}")]
    UnlabelledInput { path: Utf8PathBuf },
    /// Scanning the changeset history failed.
    #[error(transparent)]
    History(#[from] HistoryError),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Constructing the API client failed.
    #[error("failed to build the API client: {0}")]
    BuildApi(#[from] ApiBuildError),
    /// Reading the password file failed.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    /// Downloading a changeset failed.
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Reading an extract failed.
    #[error(transparent)]
    ReadExtract(#[from] OsmReadError),
    /// Writing the change file failed.
    #[error("failed to write change file {path:?}: {source}")]
    WriteChanges {
        path: Utf8PathBuf,
        #[source]
        source: OscError,
    },
    /// Creating the change file failed.
    #[error("failed to create change file {path:?}: {source}")]
    CreateChanges {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Removing a processed input failed.
    #[error("failed to remove {path:?}: {source}")]
    RemoveInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Uploading a change file failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}
