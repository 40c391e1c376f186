//! Defaults and helpers shared by the subcommands.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::CliError;

/// Password file enabling uploads when present.
pub(crate) const DEFAULT_PASSWORD_FILE: &str = ".password";
/// Pause after every remote call, in seconds.
pub(crate) const DEFAULT_API_DELAY_SECS: u64 = 10;

/// Resolve the password file, falling back to [`DEFAULT_PASSWORD_FILE`].
pub(crate) fn password_file(configured: Option<Utf8PathBuf>) -> Utf8PathBuf {
    configured.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_PASSWORD_FILE))
}

/// Resolve the pause after remote calls.
pub(crate) fn api_delay(configured: Option<u64>) -> Duration {
    Duration::from_secs(configured.unwrap_or(DEFAULT_API_DELAY_SECS))
}

/// Without a password file the tool runs in dry-run mode: uploads are
/// disabled and change files include the reused existing elements.
pub(crate) fn is_dry_run(password_file: &Utf8Path) -> Result<bool, CliError> {
    catfix_fs::file_exists(password_file)
        .map(|exists| !exists)
        .map_err(|source| CliError::InspectPath {
            path: password_file.to_path_buf(),
            source,
        })
}

/// Whether any file named `<prefix>*` exists.
pub(crate) fn any_with_prefix(prefix: &Utf8Path) -> Result<bool, CliError> {
    catfix_fs::files_with_prefix(prefix)
        .map(|found| !found.is_empty())
        .map_err(|source| CliError::InspectPath {
            path: prefix.to_path_buf(),
            source,
        })
}

/// Require `path` to be an existing regular file.
pub(crate) fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match catfix_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectPath {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Sleep between remote calls.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
