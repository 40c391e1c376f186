//! Unit tests for argument resolution and the offline commands.

use std::time::Duration;

use super::helpers::{CHANGESET, COMPLETE_EXTRACT, PARTIAL_EXTRACT, Workspace, block_on};
use super::*;
use camino::Utf8PathBuf;
use crate::download::{DownloadConfig, DownloadStatus, run_download_with};
use crate::list::{ListArgs, run_list};
use crate::process::{ProcessConfig, ProcessStatus, run_process_with};
use crate::settings::DEFAULT_API_DELAY_SECS;
use crate::upload::{UploadArgs, UploadConfig, UploadStatus, run_upload_with};
use catfix_data::api::{DEFAULT_API_URL, DEFAULT_OVERPASS_URL, StubCall, StubMapApi};
use rstest::rstest;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("catfix").chain(args.iter().copied()))
}

fn download_config(args: &[&str]) -> Result<DownloadConfig, CliError> {
    match parse(args).map_err(CliError::ArgumentParsing)?.command {
        Command::Download(download) => DownloadConfig::try_from(download),
        other => panic!("expected the download command, got {other:?}"),
    }
}

fn process_config(args: &[&str]) -> Result<ProcessConfig, CliError> {
    match parse(args).map_err(CliError::ArgumentParsing)?.command {
        Command::Process(process) => ProcessConfig::try_from(process),
        other => panic!("expected the process command, got {other:?}"),
    }
}

#[rstest]
fn download_uses_default_endpoints() {
    let config = download_config(&["download", "42"]).expect("config should resolve");
    assert_eq!(config.changeset, 42);
    assert_eq!(config.work_dir, Utf8PathBuf::from("."));
    assert_eq!(config.api.api_url, DEFAULT_API_URL);
    assert_eq!(config.api.overpass_url, DEFAULT_OVERPASS_URL);
    assert_eq!(config.delay, Duration::from_secs(DEFAULT_API_DELAY_SECS));
}

#[rstest]
fn download_accepts_endpoint_overrides() {
    let config = download_config(&[
        "download",
        "42",
        "--api-url",
        "http://localhost:3000/",
        "--overpass-url",
        "http://localhost:3001/interpreter",
        "--api-delay",
        "0",
        "--work-dir",
        "changesets",
    ])
    .expect("config should resolve");
    assert_eq!(config.api.api_url, "http://localhost:3000/");
    assert_eq!(config.api.overpass_url, "http://localhost:3001/interpreter");
    assert_eq!(config.delay, Duration::ZERO);
    assert_eq!(config.work_dir, Utf8PathBuf::from("changesets"));
}

#[rstest]
fn download_requires_a_changeset() {
    let err = download_config(&["download"]).expect_err("changeset is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_CHANGESET);
            assert_eq!(env, ENV_CHANGESET);
        }
        other => panic!("expected MissingArgument, got {other:?}"),
    }
}

#[rstest]
#[case::unknown_command(&["fix", "42"])]
#[case::unknown_flag(&["download", "42", "--bogus"])]
#[case::non_numeric_id(&["download", "forty-two"])]
#[case::extra_positional(&["list", "a.osm", "b.osm"])]
fn rejects_malformed_arguments(#[case] args: &[&str]) {
    assert!(parse(args).is_err(), "{args:?} should not parse");
}

#[rstest]
fn process_without_password_file_includes_existing_elements() {
    let workspace = Workspace::new();
    let missing = workspace.root().join("missing.password");
    let config = process_config(&["process", "1.osm", "--password-file", missing.as_str()])
        .expect("config should resolve");
    assert!(config.include_existing);
}

#[rstest]
fn process_with_password_file_exports_new_elements_only() {
    let workspace = Workspace::new();
    let password = workspace.root().join(".password");
    std::fs::write(&password, "bot:secret\n").expect("write password");
    let config = process_config(&[
        "process",
        "1.osm",
        "--password-file",
        password.as_str(),
        "--angle-threshold",
        "10",
    ])
    .expect("config should resolve");
    assert!(!config.include_existing);
    assert!((config.options.angle_threshold - 10.0).abs() < f64::EPSILON);
}

#[rstest]
fn process_requires_an_input() {
    let err = process_config(&["process"]).expect_err("input is required");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_OSM_FILE,
            ..
        }
    ));
}

#[rstest]
fn upload_requires_an_input() {
    let err = UploadConfig::try_from(UploadArgs::default()).expect_err("input is required");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_OSC_FILE,
            ..
        }
    ));
}

#[rstest]
fn list_prints_import_changesets() {
    let workspace = Workspace::new();
    let history = workspace.root().join("changesets.osm");
    std::fs::write(
        &history,
        r#"<osm>
  <changeset id="7" min_lat="40" min_lon="-4" max_lat="41" max_lon="-3">
    <tag k="type" v="import"/>
    <tag k="source" v="Dirección General del Catastro"/>
  </changeset>
  <changeset id="8" min_lat="40" min_lon="-4" max_lat="41" max_lon="-3">
    <tag k="type" v="edit"/>
  </changeset>
  <changeset id="9" min_lat="40" min_lon="-4" max_lat="41" max_lon="-3">
    <tag k="type" v="import"/>
    <tag k="source" v="Dirección General del Catastro"/>
  </changeset>
</osm>"#,
    )
    .expect("write history");

    let mut out = Vec::new();
    let count = run_list(&ListArgs { history }, &mut out).expect("list should succeed");
    assert_eq!(count, 2);
    assert_eq!(String::from_utf8(out).expect("utf-8 output"), "7\n9\n");
}

#[rstest]
fn list_reports_a_missing_dump() {
    let workspace = Workspace::new();
    let history = workspace.root().join("absent.osm");
    let err = run_list(&ListArgs { history }, &mut Vec::new()).expect_err("dump is missing");
    assert!(matches!(err, CliError::MissingSourceFile { .. }));
}

#[rstest]
fn process_writes_only_new_elements_when_uploads_are_enabled() {
    let workspace = Workspace::new();
    let input = workspace.write("osm", PARTIAL_EXTRACT);
    let config = ProcessConfig {
        input,
        options: catfix_core::ReconcileOptions::default(),
        include_existing: false,
    };

    let status = run_process_with(&config).expect("process should succeed");
    let output = workspace.file("osc");
    assert_eq!(status, ProcessStatus::Written(output.clone()));
    let text = std::fs::read_to_string(&output).expect("read change file");
    assert!(text.contains("<create>"));
    assert!(text.contains(r#"k="building:levels" v="2""#));
    assert!(!text.contains(r#"<node id="1" "#));
}

#[rstest]
fn process_leaves_no_file_for_complete_buildings() {
    let workspace = Workspace::new();
    let input = workspace.write("osm", COMPLETE_EXTRACT);
    let config = ProcessConfig {
        input: input.clone(),
        options: catfix_core::ReconcileOptions::default(),
        include_existing: true,
    };

    let status = run_process_with(&config).expect("process should succeed");
    assert_eq!(status, ProcessStatus::NothingMissing);
    assert!(!workspace.file("osc").exists());
    assert!(!input.exists());
}

#[rstest]
fn process_removes_an_unreadable_extract() {
    let workspace = Workspace::new();
    let input = workspace.write("osm", "<osm><way id=");
    let config = ProcessConfig {
        input: input.clone(),
        options: catfix_core::ReconcileOptions::default(),
        include_existing: true,
    };

    let err = run_process_with(&config).expect_err("extract is malformed");
    assert!(matches!(err, CliError::ReadExtract(_)));
    assert!(!input.exists());
    assert!(!workspace.file("osc").exists());
}

#[rstest]
fn download_writes_the_extract_through_the_api() {
    let workspace = Workspace::new();
    let changeset = r#"<osmChange version="0.6"><create>
  <node id="1" version="1" lat="40.0" lon="-3.0"/>
  <way id="10" version="1"><nd ref="1"/><tag k="building" v="yes"/></way>
</create></osmChange>"#;
    let api = StubMapApi::new(changeset, PARTIAL_EXTRACT);
    let config = DownloadConfig {
        changeset: CHANGESET,
        work_dir: workspace.root().clone(),
        api: catfix_data::api::HttpMapApiConfig::new(),
        delay: Duration::ZERO,
    };

    let status = block_on(run_download_with(&config, &api)).expect("download should succeed");
    assert_eq!(status, DownloadStatus::Downloaded(workspace.file("osm")));
    assert_eq!(
        std::fs::read_to_string(workspace.file("txt")).expect("read filter"),
        "way(10);"
    );
    assert!(matches!(api.calls().first(), Some(StubCall::Download(CHANGESET))));
}

#[rstest]
fn upload_failure_keeps_the_change_file() {
    let workspace = Workspace::new();
    let input = workspace.write("osc", super::helpers::CHANGE_FILE);
    let api = StubMapApi::new("", "").failing("upload");
    let config = UploadConfig {
        input: input.clone(),
        api: catfix_data::api::HttpMapApiConfig::new(),
        password_file: workspace.root().join(".password"),
        delay: Duration::ZERO,
    };

    let err = block_on(run_upload_with(&config, &api)).expect_err("upload fails");
    assert!(matches!(err, CliError::Upload(_)));
    assert!(input.exists());
    assert!(matches!(api.calls().last(), Some(StubCall::Close(_))));

    let retried = block_on(run_upload_with(&config, &StubMapApi::new("", "")));
    assert!(matches!(retried, Ok(UploadStatus::Uploaded(_))));
}
