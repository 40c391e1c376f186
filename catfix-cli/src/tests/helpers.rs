//! Test helpers for laying out changeset working directories.

use std::future::Future;

use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Changeset id used by every fixture.
pub(super) const CHANGESET: i64 = 4242;

/// Building split by a part covering its left half.
pub(super) const PARTIAL_EXTRACT: &str = r#"<osm version="0.6">
  <node id="1" version="1" lat="40.0000" lon="-3.0000"/>
  <node id="2" version="1" lat="40.0000" lon="-2.9980"/>
  <node id="3" version="1" lat="40.0010" lon="-2.9980"/>
  <node id="4" version="1" lat="40.0010" lon="-3.0000"/>
  <node id="5" version="1" lat="40.0000" lon="-2.9990"/>
  <node id="6" version="1" lat="40.0010" lon="-2.9990"/>
  <way id="10" version="1">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="building" v="yes"/><tag k="building:levels" v="2"/>
  </way>
  <way id="11" version="1">
    <nd ref="1"/><nd ref="5"/><nd ref="6"/><nd ref="4"/><nd ref="1"/>
    <tag k="building:part" v="yes"/>
  </way>
</osm>"#;

/// Building covered by an identical part.
pub(super) const COMPLETE_EXTRACT: &str = r#"<osm version="0.6">
  <node id="1" version="1" lat="40.0000" lon="-3.0000"/>
  <node id="2" version="1" lat="40.0000" lon="-2.9980"/>
  <node id="3" version="1" lat="40.0010" lon="-2.9980"/>
  <node id="4" version="1" lat="40.0010" lon="-3.0000"/>
  <way id="10" version="1">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="building" v="yes"/><tag k="building:levels" v="2"/>
  </way>
  <way id="11" version="1">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="building:part" v="yes"/>
  </way>
</osm>"#;

/// Change file with one new way.
pub(super) const CHANGE_FILE: &str = r#"<osmChange version="0.6">
  <create>
    <way id="-1"><nd ref="5"/><nd ref="2"/><nd ref="3"/><nd ref="6"/><nd ref="5"/>
      <tag k="building:part" v="yes"/></way>
  </create>
</osmChange>"#;

/// Temporary working directory holding one changeset's files.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    pub(super) fn file(&self, suffix: &str) -> Utf8PathBuf {
        self.root.join(format!("{CHANGESET}.{suffix}"))
    }

    pub(super) fn write(&self, suffix: &str, contents: &str) -> Utf8PathBuf {
        let path = self.file(suffix);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }
}

/// Drive a command future to completion on a fresh runtime.
pub(super) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
        .block_on(future)
}
