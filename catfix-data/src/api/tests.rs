use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

const CHANGESET: &str = r#"<osmChange version="0.6">
  <create>
    <node id="1" version="1" lat="40.0" lon="-4.0"/>
    <node id="2" version="1" lat="40.5" lon="-3.5"/>
    <node id="3" version="1" lat="45.0" lon="2.0" visible="false"/>
    <way id="10" version="1"><nd ref="1"/><nd ref="2"/><tag k="building" v="yes"/></way>
    <relation id="11" version="1">
      <member type="way" ref="10" role="outer"/>
      <tag k="building" v="residential"/>
      <tag k="type" v="multipolygon"/>
    </relation>
    <way id="12" version="1"><nd ref="1"/><tag k="building:part" v="yes"/></way>
  </create>
  <modify><node id="4" version="2" lat="50.0" lon="0.0"/></modify>
</osmChange>"#;

const EXTRACT: &str = r#"<osm version="0.6"><node id="1" lat="40" lon="-4"/></osm>"#;

const FIXES: &str = r#"<osmChange version="0.6">
  <create><way id="-1"><nd ref="1"/><nd ref="2"/><nd ref="5"/><nd ref="1"/><tag k="building:part" v="yes"/></way></create>
  <modify><way id="12" version="1"><nd ref="1"/><tag k="building:part" v="yes"/><tag k="building:levels" v="2"/></way></modify>
</osmChange>"#;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
        .block_on(future)
}

#[fixture]
fn workdir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    (dir, path)
}

fn expected_query() -> String {
    "[out:xml][timeout:180][bbox:40.0000000,-4.0000000,40.5000000,-3.5000000];\
     (wr[\"building:part\"];way(10);relation(11););(._;>;);out meta;"
        .to_owned()
}

#[rstest]
fn scope_covers_created_visible_nodes_and_buildings() {
    let changes = crate::read_osc(CHANGESET.as_bytes()).expect("changeset should parse");
    let scope = ChangesetScope::from_changes(&changes);
    assert_eq!(scope.buildings, "way(10);relation(11);");
    assert_eq!(scope.overpass_query(), Some(expected_query()));
}

#[rstest]
fn downloads_the_filter_and_extract(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let api = StubMapApi::new(CHANGESET, EXTRACT);
    let outcome = block_on(download_changeset_extract(&api, 42, &dir)).expect("download");

    let DownloadOutcome::Written {
        extract,
        filter,
        bytes,
    } = &outcome
    else {
        panic!("expected an extract, got {outcome:?}");
    };
    assert_eq!(extract, &dir.join("42.osm"));
    assert_eq!(*bytes, EXTRACT.len() as u64);
    assert_eq!(read(extract), EXTRACT);
    let filter = filter.as_ref().expect("a filter should be written");
    assert_eq!(read(filter), "way(10);relation(11);");
    assert_eq!(
        api.calls(),
        vec![StubCall::Download(42), StubCall::Query(expected_query())]
    );
}

#[rstest]
fn changesets_without_created_nodes_are_void(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let document = r#"<osmChange version="0.6"><modify><node id="4" version="2" lat="50" lon="0"/></modify></osmChange>"#;
    let api = StubMapApi::new(document, EXTRACT);
    let outcome = block_on(download_changeset_extract(&api, 7, &dir)).expect("download");
    assert_eq!(outcome, DownloadOutcome::Void);
    assert!(!dir.join("7.osm").exists());
    assert_eq!(api.calls(), vec![StubCall::Download(7)]);
}

#[rstest]
fn failed_queries_leave_no_partial_extract(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let api = StubMapApi::new(CHANGESET, EXTRACT).failing("query");
    let outcome = block_on(download_changeset_extract(&api, 42, &dir));
    assert!(matches!(outcome, Err(DownloadError::Extract { id: 42, .. })));
    assert!(!dir.join("42.osm").exists());
}

#[rstest]
fn failed_downloads_report_the_changeset(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let api = StubMapApi::new(CHANGESET, EXTRACT).failing("download");
    let outcome = block_on(download_changeset_extract(&api, 42, &dir));
    assert!(matches!(
        outcome,
        Err(DownloadError::Changeset {
            id: 42,
            source: TransportError::Http { status: 500, .. }
        })
    ));
}

#[rstest]
fn uploads_archive_the_change_file(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let path = dir.join("42.osc");
    std::fs::write(&path, FIXES).expect("write change file");
    let api = StubMapApi::new("", "");

    let receipt =
        block_on(upload_change_file(&api, &path, &upload_tags("42"))).expect("upload");

    assert_eq!(receipt.changeset, 1000);
    assert_eq!(receipt.changes, 2);
    assert_eq!(receipt.archive, dir.join("42.osc.bz2"));
    assert!(receipt.archive.exists());
    assert!(!path.exists());

    let calls = api.calls();
    let [StubCall::Create(tags), StubCall::Upload(1000, document), StubCall::Close(1000)] =
        calls.as_slice()
    else {
        panic!("unexpected calls {calls:?}");
    };
    assert_eq!(tags.get("type").map(String::as_str), Some("bot"));
    assert_eq!(document.matches(r#"changeset="1000""#).count(), 2);
}

#[rstest]
fn failed_uploads_still_close_the_changeset(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let path = dir.join("42.osc");
    std::fs::write(&path, FIXES).expect("write change file");
    let api = StubMapApi::new("", "").failing("upload");

    let outcome = block_on(upload_change_file(&api, &path, &upload_tags("42")));

    assert!(matches!(
        outcome,
        Err(UploadError::Remote {
            step: "upload changes",
            ..
        })
    ));
    assert_eq!(api.calls().last(), Some(&StubCall::Close(1000)));
    assert!(path.exists(), "the change file is kept for a retry");
}

#[rstest]
fn empty_change_files_are_not_uploaded(workdir: (TempDir, Utf8PathBuf)) {
    let (_guard, dir) = workdir;
    let path = dir.join("42.osc");
    std::fs::write(&path, r#"<osmChange version="0.6"/>"#).expect("write change file");
    let api = StubMapApi::new("", "");

    let outcome = block_on(upload_change_file(&api, &path, &upload_tags("42")));

    assert!(matches!(outcome, Err(UploadError::Empty { .. })));
    assert!(api.calls().is_empty());
}

fn read(path: &Utf8Path) -> String {
    std::fs::read_to_string(path).expect("file should be readable")
}
