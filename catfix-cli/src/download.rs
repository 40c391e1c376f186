//! `download` command: fetch a changeset and the building parts around it.

use std::time::Duration;

use camino::Utf8PathBuf;
use catfix_core::ElementId;
use catfix_data::api::{
    DownloadOutcome, HttpMapApi, HttpMapApiConfig, MapApi, download_changeset_extract,
};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::settings::{any_with_prefix, api_delay, pause};
use crate::{
    ARG_API_DELAY, ARG_API_URL, ARG_CHANGESET, ARG_OVERPASS_URL, ARG_WORK_DIR, CliError,
    ENV_CHANGESET,
};

/// CLI arguments for the `download` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "download",
    long_about = "Download an import changeset, then query Overpass for the \
                 buildings it created and every building part within its \
                 bounds. Writes <id>.osm and, when the changeset created \
                 buildings, the <id>.txt building filter. Changesets that \
                 already have <id>.os* files are skipped.",
    about = "Download a changeset and the building parts around it"
)]
#[ortho_config(prefix = "CATFIX")]
pub(crate) struct DownloadArgs {
    /// Import changeset id.
    #[arg(value_name = ARG_CHANGESET)]
    #[serde(default)]
    pub(crate) changeset: Option<ElementId>,
    /// Directory receiving the downloaded files.
    #[arg(long = ARG_WORK_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) work_dir: Option<Utf8PathBuf>,
    /// Base URL of the OpenStreetMap API.
    #[arg(long = ARG_API_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) api_url: Option<String>,
    /// Overpass interpreter URL.
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// Seconds to wait after the remote calls.
    #[arg(long = ARG_API_DELAY, value_name = "seconds")]
    #[serde(default)]
    pub(crate) api_delay: Option<u64>,
}

impl DownloadArgs {
    pub(crate) fn into_config(self) -> Result<DownloadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DownloadConfig::try_from(merged)
    }
}

/// Resolved `download` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DownloadConfig {
    pub(crate) changeset: ElementId,
    pub(crate) work_dir: Utf8PathBuf,
    pub(crate) api: HttpMapApiConfig,
    pub(crate) delay: Duration,
}

impl TryFrom<DownloadArgs> for DownloadConfig {
    type Error = CliError;

    fn try_from(args: DownloadArgs) -> Result<Self, Self::Error> {
        let changeset = args.changeset.ok_or(CliError::MissingArgument {
            field: ARG_CHANGESET,
            env: ENV_CHANGESET,
        })?;
        let mut api = HttpMapApiConfig::new();
        if let Some(url) = args.api_url {
            api = api.with_api_url(url);
        }
        if let Some(url) = args.overpass_url {
            api = api.with_overpass_url(url);
        }
        Ok(Self {
            changeset,
            work_dir: args.work_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
            api,
            delay: api_delay(args.api_delay),
        })
    }
}

/// What `download` did for a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DownloadStatus {
    /// Files for the changeset already exist.
    Skipped,
    /// The changeset created no visible nodes.
    Void,
    /// The extract was written.
    Downloaded(Utf8PathBuf),
}

pub(crate) async fn run_download(args: DownloadArgs) -> Result<DownloadStatus, CliError> {
    let config = args.into_config()?;
    let api = HttpMapApi::new(config.api.clone())?;
    run_download_with(&config, &api).await
}

pub(crate) async fn run_download_with(
    config: &DownloadConfig,
    api: &dyn MapApi,
) -> Result<DownloadStatus, CliError> {
    let id = config.changeset;
    if any_with_prefix(&config.work_dir.join(format!("{id}.os")))? {
        info!("{id} already downloaded");
        return Ok(DownloadStatus::Skipped);
    }
    let outcome = download_changeset_extract(api, id, &config.work_dir).await;
    pause(config.delay).await;
    match outcome? {
        DownloadOutcome::Void => Ok(DownloadStatus::Void),
        DownloadOutcome::Written { extract, .. } => {
            info!("{id} downloaded");
            Ok(DownloadStatus::Downloaded(extract))
        }
    }
}
