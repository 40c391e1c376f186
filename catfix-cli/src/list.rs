//! `list` command: print the import changesets of a history dump.

use std::io::Write;

use camino::Utf8PathBuf;
use catfix_data::list_import_changesets;
use clap::Parser;
use log::info;

use crate::settings::require_file;
use crate::{ARG_HISTORY, CliError};

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "list",
    long_about = "Scan a changeset history dump (XML, optionally bzip2 \
                 compressed) and print the id of every changeset tagged \
                 type=import by the Spanish Cadastre import, one per line.",
    about = "List the import changesets of a history dump"
)]
pub(crate) struct ListArgs {
    /// Path to the changeset history dump.
    #[arg(value_name = ARG_HISTORY)]
    pub(crate) history: Utf8PathBuf,
}

pub(crate) fn run_list(args: &ListArgs, writer: &mut dyn Write) -> Result<usize, CliError> {
    require_file(&args.history, ARG_HISTORY)?;
    let found = list_import_changesets(&args.history)?;
    for id in &found {
        writeln!(writer, "{id}").map_err(CliError::WriteOutput)?;
    }
    info!("{} import changesets in {}", found.len(), args.history);
    Ok(found.len())
}
