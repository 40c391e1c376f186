//! `process` command: compute the missing building parts of an extract.

use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use catfix_core::{ReconcileOptions, reconcile};
use catfix_data::{OscOptions, changeset_label, read_changeset, write_osc};
use clap::Parser;
use log::{error, info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::settings::{any_with_prefix, is_dry_run, password_file, require_file};
use crate::{ARG_ANGLE_THRESHOLD, ARG_OSM_FILE, ARG_PASSWORD_FILE, CliError, ENV_OSM_FILE};

/// CLI arguments for the `process` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "process",
    long_about = "Reconcile every building of a downloaded extract with its \
                 parts and write the missing parts to <id>.osc. Nothing is \
                 written when any building fails or nothing is missing. The \
                 extract is removed afterwards. Without a password file the \
                 change file also lists the reused existing elements.",
    about = "Compute the missing building parts of a downloaded changeset"
)]
#[ortho_config(prefix = "CATFIX")]
pub(crate) struct ProcessArgs {
    /// Path to the extract written by `download`.
    #[arg(value_name = ARG_OSM_FILE)]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Smallest vertex angle, in degrees, accepted without a warning.
    #[arg(long = ARG_ANGLE_THRESHOLD, value_name = "degrees")]
    #[serde(default)]
    pub(crate) angle_threshold: Option<f64>,
    /// Password file whose absence selects dry-run mode.
    #[arg(long = ARG_PASSWORD_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) password_file: Option<Utf8PathBuf>,
}

impl ProcessArgs {
    pub(crate) fn into_config(self) -> Result<ProcessConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ProcessConfig::try_from(merged)
    }
}

/// Resolved `process` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProcessConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) options: ReconcileOptions,
    pub(crate) include_existing: bool,
}

impl TryFrom<ProcessArgs> for ProcessConfig {
    type Error = CliError;

    fn try_from(args: ProcessArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_OSM_FILE,
            env: ENV_OSM_FILE,
        })?;
        let mut options = ReconcileOptions::default();
        if let Some(threshold) = args.angle_threshold {
            options.angle_threshold = threshold;
        }
        Ok(Self {
            input,
            options,
            include_existing: is_dry_run(&password_file(args.password_file))?,
        })
    }
}

/// What `process` did with an extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProcessStatus {
    /// A change file for the changeset already exists.
    Skipped,
    /// The missing parts were written.
    Written(Utf8PathBuf),
    /// At least one building failed, so nothing was written.
    HasErrors,
    /// Every building is already covered by its parts.
    NothingMissing,
}

pub(crate) fn run_process(args: ProcessArgs) -> Result<ProcessStatus, CliError> {
    let config = args.into_config()?;
    require_file(&config.input, ARG_OSM_FILE)?;
    run_process_with(&config)
}

/// Process `config.input`, then remove it whatever the outcome.
pub(crate) fn run_process_with(config: &ProcessConfig) -> Result<ProcessStatus, CliError> {
    let input = config.input.as_path();
    let label = changeset_label(input).ok_or_else(|| CliError::UnlabelledInput {
        path: input.to_path_buf(),
    })?;
    let output = input.with_file_name(format!("{label}.osc"));

    let outcome = if any_with_prefix(&output)? {
        info!("{label} already processed");
        Ok(ProcessStatus::Skipped)
    } else {
        let fixed = fix(config, label, &output);
        if fixed.is_err() {
            error!("{label} could not be processed");
            discard(&output);
        }
        fixed
    };
    remove_input(input)?;
    outcome
}

fn fix(config: &ProcessConfig, label: &str, output: &Utf8Path) -> Result<ProcessStatus, CliError> {
    let snapshot = read_changeset(&config.input)?;
    info!(
        "{label} has {} buildings and {} parts",
        snapshot.buildings.len(),
        snapshot.parts.len()
    );
    let report = reconcile(&snapshot, config.options);
    if report.errors > 0 {
        error!("{label} has errors");
        return Ok(ProcessStatus::HasErrors);
    }
    if !report.is_exportable() {
        warn!("{label} has no missing building parts");
        return Ok(ProcessStatus::NothingMissing);
    }

    let create_error = |source| CliError::CreateChanges {
        path: output.to_path_buf(),
        source,
    };
    let mut file = catfix_fs::create_utf8_file(output)
        .map(BufWriter::new)
        .map_err(create_error)?;
    let changes = report.edits.exported(config.include_existing);
    let count = changes.len();
    write_osc(&mut file, changes, OscOptions::default()).map_err(|source| {
        CliError::WriteChanges {
            path: output.to_path_buf(),
            source,
        }
    })?;
    file.flush().map_err(create_error)?;
    info!(
        "{label} fixed with {} ways and {} relations, {count} changes written to {output}",
        report.edits.ways().len(),
        report.edits.relations().len()
    );
    Ok(ProcessStatus::Written(output.to_path_buf()))
}

fn discard(output: &Utf8Path) {
    if catfix_fs::file_exists(output).unwrap_or(false)
        && let Err(err) = catfix_fs::remove_utf8_file(output)
    {
        warn!("failed to remove partial change file {output}: {err}");
    }
}

fn remove_input(input: &Utf8Path) -> Result<(), CliError> {
    let exists = catfix_fs::file_exists(input).map_err(|source| CliError::InspectPath {
        path: input.to_path_buf(),
        source,
    })?;
    if exists {
        catfix_fs::remove_utf8_file(input).map_err(|source| CliError::RemoveInput {
            path: input.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
