use super::*;
use bzip2::Compression;
use bzip2::write::BzEncoder;
use rstest::{fixture, rstest};
use std::io::Write;
use tempfile::TempDir;

const EXTRACT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <node id="1" lat="0.000" lon="0.000" version="1"/>
  <node id="2" lat="0.000" lon="0.002" version="1"/>
  <node id="3" lat="0.001" lon="0.002" version="1"/>
  <node id="4" lat="0.001" lon="0.000" version="1"/>
  <node id="5" lat="0.000" lon="0.001" version="1"/>
  <node id="6" lat="0.001" lon="0.001" version="1"/>
  <node id="7" lat="0.010" lon="0.010" version="1"/>
  <node id="8" lat="0.010" lon="0.011" version="1"/>
  <node id="9" lat="0.011" lon="0.011" version="1"/>
  <way id="100" version="3">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="building" v="yes"/><tag k="building:levels" v="2"/>
  </way>
  <way id="101" version="1">
    <nd ref="1"/><nd ref="5"/><nd ref="6"/><nd ref="4"/><nd ref="1"/>
    <tag k="building:part" v="yes"/>
  </way>
  <way id="102" version="1">
    <nd ref="7"/><nd ref="8"/><nd ref="9"/><nd ref="7"/>
    <tag k="building" v="house"/>
  </way>
</osm>
"#;

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("create temporary directory")
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("UTF-8 temporary path");
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn compress(contents: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents).expect("compress fixture");
    encoder.finish().expect("finish compression")
}

#[rstest]
fn reads_plain_xml(workdir: TempDir) {
    let path = write_file(&workdir, "55.osm", EXTRACT.as_bytes());
    let snapshot = read_snapshot(&path, "55", None).expect("extract should load");
    assert_eq!(snapshot.label, "55");
    assert_eq!(snapshot.buildings.len(), 2);
    assert_eq!(snapshot.parts.len(), 1);
    assert_eq!(snapshot.catalog.node_count(), 9);
    assert_eq!(snapshot.catalog.way_count(), 3);
}

#[rstest]
fn reads_compressed_xml(workdir: TempDir) {
    let path = write_file(&workdir, "55.osm.bz2", &compress(EXTRACT.as_bytes()));
    let snapshot = read_snapshot(&path, "55", None).expect("compressed extract should load");
    assert_eq!(snapshot.buildings.len(), 2);
}

#[rstest]
fn applies_the_filter_beside_the_input(workdir: TempDir) {
    let path = write_file(&workdir, "56.osm", EXTRACT.as_bytes());
    write_file(&workdir, "56.txt", b"way(100);");
    let snapshot = read_changeset(&path).expect("changeset should load");
    assert_eq!(snapshot.label, "56");
    let ids: Vec<AreaId> = snapshot.buildings.iter().map(|building| building.id).collect();
    assert_eq!(ids, vec![AreaId::way(100)]);
}

#[rstest]
fn an_empty_filter_keeps_every_building(workdir: TempDir) {
    let path = write_file(&workdir, "57.osm", EXTRACT.as_bytes());
    write_file(&workdir, "57.txt", b"");
    let snapshot = read_changeset(&path).expect("changeset should load");
    assert_eq!(snapshot.buildings.len(), 2);
}

#[rstest]
fn rejects_unknown_extensions(workdir: TempDir) {
    let path = write_file(&workdir, "58.json", b"{}");
    let err = read_snapshot(&path, "58", None).expect_err("format should be rejected");
    assert!(matches!(err, OsmReadError::UnsupportedFormat { .. }));
}

#[rstest]
fn reports_missing_files(workdir: TempDir) {
    let path = Utf8PathBuf::from_path_buf(workdir.path().join("missing.osm"))
        .expect("UTF-8 temporary path");
    match read_snapshot(&path, "missing", None) {
        Err(OsmReadError::Open { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected open error, got {other:?}"),
    }
}

#[rstest]
fn reports_malformed_xml(workdir: TempDir) {
    let path = write_file(&workdir, "59.osm", b"<osm><way id=\"1\"></node></osm>");
    let err = read_snapshot(&path, "59", None).expect_err("document should be rejected");
    assert!(matches!(err, OsmReadError::Xml { .. }));
}

#[rstest]
fn reports_invalid_pbf(workdir: TempDir) {
    let path = write_file(&workdir, "60.osm.pbf", b"\x00\x00\x00\x0bnot a blob header");
    let err = read_snapshot(&path, "60", None).expect_err("payload should be rejected");
    assert!(matches!(err, OsmReadError::Pbf { .. }));
}

#[rstest]
#[case("1234.osm", Some("1234"))]
#[case("dir/1234.osm.pbf", Some("1234"))]
#[case(".hidden", None)]
fn derives_changeset_labels(#[case] path: &str, #[case] expected: Option<&str>) {
    assert_eq!(changeset_label(Utf8Path::new(path)), expected);
}
