//! `upload` command: push a change file in a bot changeset.

use std::time::Duration;

use camino::Utf8PathBuf;
use catfix_data::api::{
    Credentials, HttpMapApi, HttpMapApiConfig, MapApi, UploadReceipt, upload_change_file,
    upload_tags,
};
use catfix_data::changeset_label;
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::settings::{any_with_prefix, api_delay, is_dry_run, password_file, pause, require_file};
use crate::{
    ARG_API_DELAY, ARG_API_URL, ARG_OSC_FILE, ARG_PASSWORD_FILE, CliError, ENV_OSC_FILE,
};

/// CLI arguments for the `upload` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "upload",
    long_about = "Upload a change file written by `process` in a new \
                 changeset tagged type=bot, then archive it as <file>.bz2. \
                 Uploads are disabled when the password file is missing.",
    about = "Upload a change file produced by `process`"
)]
#[ortho_config(prefix = "CATFIX")]
pub(crate) struct UploadArgs {
    /// Path to the change file.
    #[arg(value_name = ARG_OSC_FILE)]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Base URL of the OpenStreetMap API.
    #[arg(long = ARG_API_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) api_url: Option<String>,
    /// File holding the `user:password` line used to authenticate.
    #[arg(long = ARG_PASSWORD_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) password_file: Option<Utf8PathBuf>,
    /// Seconds to wait after the upload.
    #[arg(long = ARG_API_DELAY, value_name = "seconds")]
    #[serde(default)]
    pub(crate) api_delay: Option<u64>,
}

impl UploadArgs {
    pub(crate) fn into_config(self) -> Result<UploadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        UploadConfig::try_from(merged)
    }
}

/// Resolved `upload` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) api: HttpMapApiConfig,
    pub(crate) password_file: Utf8PathBuf,
    pub(crate) delay: Duration,
}

impl TryFrom<UploadArgs> for UploadConfig {
    type Error = CliError;

    fn try_from(args: UploadArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_OSC_FILE,
            env: ENV_OSC_FILE,
        })?;
        let mut api = HttpMapApiConfig::new();
        if let Some(url) = args.api_url {
            api = api.with_api_url(url);
        }
        Ok(Self {
            input,
            api,
            password_file: password_file(args.password_file),
            delay: api_delay(args.api_delay),
        })
    }
}

/// What `upload` did with a change file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UploadStatus {
    /// Dry-run mode: nothing was sent.
    Disabled,
    /// The file was already uploaded and archived.
    Skipped,
    /// The file was uploaded and archived.
    Uploaded(UploadReceipt),
}

pub(crate) async fn run_upload(args: UploadArgs) -> Result<UploadStatus, CliError> {
    let config = args.into_config()?;
    if is_dry_run(&config.password_file)? {
        warn!(
            "uploads are disabled without the password file {}",
            config.password_file
        );
        return Ok(UploadStatus::Disabled);
    }
    let credentials = Credentials::from_file(&config.password_file)?;
    let api = HttpMapApi::new(config.api.clone())?.with_credentials(credentials);
    run_upload_with(&config, &api).await
}

pub(crate) async fn run_upload_with(
    config: &UploadConfig,
    api: &dyn MapApi,
) -> Result<UploadStatus, CliError> {
    let input = config.input.as_path();
    if any_with_prefix(&Utf8PathBuf::from(format!("{input}.bz2")))? {
        info!("{input} already uploaded");
        return Ok(UploadStatus::Skipped);
    }
    require_file(input, ARG_OSC_FILE)?;
    let label = changeset_label(input).ok_or_else(|| CliError::UnlabelledInput {
        path: input.to_path_buf(),
    })?;

    let receipt = upload_change_file(api, input, &upload_tags(label)).await?;
    info!("{label} fixed in changeset {}", receipt.changeset);
    pause(config.delay).await;
    Ok(UploadStatus::Uploaded(receipt))
}
