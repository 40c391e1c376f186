//! Download and upload workflows built on [`MapApi`].

use std::io::{self, BufReader, Write};

use bzip2::Compression;
use bzip2::write::BzEncoder;
use camino::{Utf8Path, Utf8PathBuf};
use catfix_core::{Action, Element, ElementId, Tags};
use geo::{Coord, Rect};
use log::{debug, info, warn};

use super::{DownloadError, MapApi, UploadError};
use crate::osc::{OscChange, OscOptions, read_osc, read_osc_file, write_osc};

/// Changeset comment prefix for uploads.
pub const UPLOAD_COMMENT: &str =
    "Fixes #Spanish_Cadastre_Buildings_Import Simple 3D Buildings for cs";
/// Wiki page documenting the automated edit.
pub const UPLOAD_WIKI_URL: &str = "https://wiki.openstreetmap.org/Automated_edits/CatAtom3Dfix";

/// Area and buildings touched by an import changeset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangesetScope {
    /// Bounds of the created visible nodes, `None` when there are none.
    pub bounds: Option<Rect>,
    /// Overpass statements selecting the created buildings, `way(1);` style.
    pub buildings: String,
}

impl ChangesetScope {
    /// Collect the scope of the created elements in `changes`.
    ///
    /// # Examples
    /// ```
    /// use catfix_data::api::ChangesetScope;
    /// use catfix_data::read_osc;
    ///
    /// let document = r#"<osmChange version="0.6"><create>
    ///   <node id="1" lat="40" lon="-4"/>
    ///   <node id="2" lat="41" lon="-3"/>
    ///   <way id="3"><nd ref="1"/><tag k="building" v="yes"/></way>
    /// </create></osmChange>"#;
    /// let scope = ChangesetScope::from_changes(&read_osc(document.as_bytes())?);
    /// assert_eq!(scope.buildings, "way(3);");
    /// assert!(scope.bounds.is_some());
    /// # Ok::<(), catfix_data::OscError>(())
    /// ```
    #[must_use]
    pub fn from_changes(changes: &[OscChange]) -> Self {
        let mut bounds: Option<Rect> = None;
        let mut buildings = String::new();
        for change in changes.iter().filter(|change| change.action == Action::Create) {
            if let Element::Node(node) = &change.element
                && change.visible
            {
                bounds = Some(extend(bounds, node.location));
            }
            if change.element.tags().contains_key("building")
                && let Some(id) = change.element.id()
            {
                buildings.push_str(&format!("{}({id});", change.element.kind().as_str()));
            }
        }
        Self { bounds, buildings }
    }

    /// Overpass query fetching the buildings and every part within the
    /// bounds, or `None` when the changeset created no visible nodes.
    #[must_use]
    pub fn overpass_query(&self) -> Option<String> {
        let bounds = self.bounds?;
        Some(format!(
            "[out:xml][timeout:180][bbox:{:.7},{:.7},{:.7},{:.7}];\
             (wr[\"building:part\"];{});(._;>;);out meta;",
            bounds.min().y,
            bounds.min().x,
            bounds.max().y,
            bounds.max().x,
            self.buildings
        ))
    }
}

fn extend(bounds: Option<Rect>, location: Coord) -> Rect {
    match bounds {
        None => Rect::new(location, location),
        Some(rect) => Rect::new(
            Coord {
                x: rect.min().x.min(location.x),
                y: rect.min().y.min(location.y),
            },
            Coord {
                x: rect.max().x.max(location.x),
                y: rect.max().y.max(location.y),
            },
        ),
    }
}

/// Files produced by [`download_changeset_extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The changeset created no visible nodes, so nothing was written.
    Void,
    /// The extract was written.
    Written {
        /// Overpass extract, `<id>.osm`.
        extract: Utf8PathBuf,
        /// Building filter, `<id>.txt`, when the changeset created buildings.
        filter: Option<Utf8PathBuf>,
        /// Size of the extract in bytes.
        bytes: u64,
    },
}

/// Download changeset `id` and write the Overpass extract of its area into
/// `dir`.
///
/// The extract holds every building part within the bounds of the nodes the
/// changeset created, plus the buildings it created, with their members and
/// nodes. A partially written extract is removed when the query fails.
///
/// # Errors
/// Returns [`DownloadError`] when a remote call fails, the changeset cannot
/// be decoded, or a file cannot be written.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use catfix_data::api::{HttpMapApi, HttpMapApiConfig, download_changeset_extract};
///
/// let api = HttpMapApi::new(HttpMapApiConfig::new())?;
/// let runtime = tokio::runtime::Runtime::new()?;
/// let outcome = runtime.block_on(download_changeset_extract(&api, 38_000_000, Utf8Path::new(".")))?;
/// println!("{outcome:?}");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub async fn download_changeset_extract<A>(
    api: &A,
    id: ElementId,
    dir: &Utf8Path,
) -> Result<DownloadOutcome, DownloadError>
where
    A: MapApi + ?Sized,
{
    let document = api
        .download_changeset(id)
        .await
        .map_err(|source| DownloadError::Changeset { id, source })?;
    let changes =
        read_osc(document.as_slice()).map_err(|source| DownloadError::Decode { id, source })?;
    let scope = ChangesetScope::from_changes(&changes);
    let Some(query) = scope.overpass_query() else {
        warn!("changeset {id} is void");
        return Ok(DownloadOutcome::Void);
    };

    let filter = if scope.buildings.is_empty() {
        None
    } else {
        let path = dir.join(format!("{id}.txt"));
        write_file(&path, scope.buildings.as_bytes())?;
        Some(path)
    };

    let extract = dir.join(format!("{id}.osm"));
    debug!("querying Overpass for changeset {id}: {query}");
    let mut file = catfix_fs::create_utf8_file(&extract).map_err(|source| DownloadError::Write {
        source,
        path: extract.clone(),
    })?;
    match api.query_overpass(&query, &mut file).await {
        Ok(bytes) => {
            info!("downloaded {bytes} bytes for changeset {id} into {extract}");
            Ok(DownloadOutcome::Written {
                extract,
                filter,
                bytes,
            })
        }
        Err(source) => {
            drop(file);
            if let Err(err) = catfix_fs::remove_utf8_file(&extract) {
                warn!("failed to remove partial extract {extract}: {err}");
            }
            Err(DownloadError::Extract { id, source })
        }
    }
}

fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<(), DownloadError> {
    catfix_fs::create_utf8_file(path)
        .and_then(|mut file| file.write_all(contents))
        .map_err(|source| DownloadError::Write {
            source,
            path: path.to_path_buf(),
        })
}

/// Tags of the changeset uploading fixes for import changeset `label`.
///
/// # Examples
/// ```
/// use catfix_data::api::upload_tags;
///
/// let tags = upload_tags("38000000");
/// assert_eq!(tags.get("type").map(String::as_str), Some("bot"));
/// assert!(tags["comment"].ends_with("for cs 38000000"));
/// ```
#[must_use]
pub fn upload_tags(label: &str) -> Tags {
    [
        ("comment", format!("{UPLOAD_COMMENT} {label}")),
        ("source", crate::history::IMPORT_SOURCE.to_owned()),
        ("type", "bot".to_owned()),
        ("url", UPLOAD_WIKI_URL.to_owned()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value))
    .collect()
}

/// Result of a successful [`upload_change_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Changeset the changes were uploaded into.
    pub changeset: ElementId,
    /// Number of uploaded elements.
    pub changes: usize,
    /// Compressed copy of the uploaded file.
    pub archive: Utf8PathBuf,
}

/// Upload the osmChange file at `path` in a new changeset tagged `tags`.
///
/// The changeset is closed even when the upload fails. After a successful
/// upload the file is compressed to `<path>.bz2` and removed.
///
/// # Errors
/// Returns [`UploadError`] when the file cannot be read or is empty, a
/// remote call fails, or archiving fails.
pub async fn upload_change_file<A>(
    api: &A,
    path: &Utf8Path,
    tags: &Tags,
) -> Result<UploadReceipt, UploadError>
where
    A: MapApi + ?Sized,
{
    let changes = read_osc_file(path).map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if changes.is_empty() {
        return Err(UploadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let changeset = api
        .create_changeset(tags)
        .await
        .map_err(|source| UploadError::Remote {
            step: "create changeset",
            source,
        })?;
    info!("opened changeset {changeset} for {path}");

    let uploaded = upload_into(api, changeset, &changes).await;
    let closed = api.close_changeset(changeset).await;
    uploaded?;
    closed.map_err(|source| UploadError::Remote {
        step: "close changeset",
        source,
    })?;

    let archive = archive_file(path)?;
    info!(
        "uploaded {} changes in changeset {changeset}, archived as {archive}",
        changes.len()
    );
    Ok(UploadReceipt {
        changeset,
        changes: changes.len(),
        archive,
    })
}

async fn upload_into<A>(
    api: &A,
    changeset: ElementId,
    changes: &[OscChange],
) -> Result<(), UploadError>
where
    A: MapApi + ?Sized,
{
    let mut document = Vec::new();
    write_osc(
        &mut document,
        changes.iter().map(OscChange::as_change),
        OscOptions::default().for_changeset(changeset),
    )
    .map_err(|source| UploadError::Payload { source })?;
    api.upload_changes(changeset, document)
        .await
        .map_err(|source| UploadError::Remote {
            step: "upload changes",
            source,
        })
}

/// Compress `path` to `<path>.bz2` and remove the original.
fn archive_file(path: &Utf8Path) -> Result<Utf8PathBuf, UploadError> {
    let archive = Utf8PathBuf::from(format!("{path}.bz2"));
    let archive_error = |source| UploadError::Archive {
        path: archive.clone(),
        source,
    };
    let mut reader = catfix_fs::open_utf8_file(path)
        .map(BufReader::new)
        .map_err(archive_error)?;
    let output = catfix_fs::create_utf8_file(&archive).map_err(archive_error)?;
    let mut encoder = BzEncoder::new(output, Compression::best());
    io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .map_err(archive_error)?;
    catfix_fs::remove_utf8_file(path).map_err(|source| UploadError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(archive)
}
