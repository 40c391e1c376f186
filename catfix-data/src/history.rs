//! Scanning changeset dumps for Spanish Cadastre import changesets.

use std::io::{self, BufRead};

use camino::{Utf8Path, Utf8PathBuf};
use catfix_core::ElementId;
use thiserror::Error;

use crate::input::open_text;
use crate::xml::{Item, RawChangeset, XmlError, XmlItems};

/// `source` tag carried by the Cadastre import changesets.
pub const IMPORT_SOURCE: &str = "Dirección General del Catastro";

/// Errors raised while scanning a changeset dump.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The dump could not be opened.
    #[error("failed to open changeset dump at {path:?}")]
    Open {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Dump path.
        path: Utf8PathBuf,
    },
    /// The dump could not be decoded.
    #[error("failed to decode changeset dump at {path:?}")]
    Parse {
        /// Decoding error.
        #[source]
        source: XmlError,
        /// Dump path.
        path: Utf8PathBuf,
    },
}

/// Identities of the import changesets in a changeset dump, in dump order.
///
/// A changeset qualifies when it has valid bounds, carries tags, and is
/// tagged `type=import` with `source` set to [`IMPORT_SOURCE`].
///
/// # Errors
/// Returns [`XmlError`] when the dump cannot be decoded.
///
/// # Examples
/// ```
/// use catfix_data::import_changesets;
///
/// let dump = r#"<osm>
///   <changeset id="1" min_lat="40" min_lon="-4" max_lat="41" max_lon="-3">
///     <tag k="type" v="import"/>
///     <tag k="source" v="Dirección General del Catastro"/>
///   </changeset>
///   <changeset id="2" min_lat="40" min_lon="-4" max_lat="41" max_lon="-3">
///     <tag k="type" v="import"/>
///   </changeset>
/// </osm>"#;
/// assert_eq!(import_changesets(dump.as_bytes())?, vec![1]);
/// # Ok::<(), catfix_data::XmlError>(())
/// ```
pub fn import_changesets<R: BufRead>(source: R) -> Result<Vec<ElementId>, XmlError> {
    let mut found = Vec::new();
    for item in XmlItems::new(source) {
        if let Item::Changeset(changeset) = item?
            && is_import(&changeset)
        {
            found.push(changeset.id);
        }
    }
    Ok(found)
}

/// Scan a changeset dump file, decompressing `.bz2` archives.
///
/// # Errors
/// Returns [`HistoryError`] when the dump cannot be opened or decoded.
pub fn list_import_changesets(path: &Utf8Path) -> Result<Vec<ElementId>, HistoryError> {
    let source = open_text(path).map_err(|source| HistoryError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    import_changesets(source).map_err(|source| HistoryError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

fn is_import(changeset: &RawChangeset) -> bool {
    let Some(bounds) = changeset.bounds else {
        return false;
    };
    let valid = [bounds.min(), bounds.max()].iter().all(|corner| {
        (-180.0..=180.0).contains(&corner.x) && (-90.0..=90.0).contains(&corner.y)
    });
    valid
        && !changeset.tags.is_empty()
        && changeset.tags.get("type").is_some_and(|kind| kind == "import")
        && changeset
            .tags
            .get("source")
            .is_some_and(|source| source == IMPORT_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn changeset(bounds: &str, tags: &str) -> String {
        format!("<osm><changeset id=\"5\" {bounds}>{tags}</changeset></osm>")
    }

    const IMPORT_TAGS: &str = r#"<tag k="type" v="import"/><tag k="source" v="Dirección General del Catastro"/>"#;
    const BOUNDS: &str = r#"min_lat="40" min_lon="-4" max_lat="41" max_lon="-3""#;

    #[rstest]
    #[case(BOUNDS, IMPORT_TAGS, true)]
    #[case("", IMPORT_TAGS, false)]
    #[case(r#"min_lat="40" min_lon="-4""#, IMPORT_TAGS, false)]
    #[case(r#"min_lat="95" min_lon="-4" max_lat="96" max_lon="-3""#, IMPORT_TAGS, false)]
    #[case(BOUNDS, "", false)]
    #[case(BOUNDS, r#"<tag k="type" v="import"/><tag k="source" v="survey"/>"#, false)]
    #[case(BOUNDS, r#"<tag k="source" v="Dirección General del Catastro"/>"#, false)]
    fn selects_import_changesets(
        #[case] bounds: &str,
        #[case] tags: &str,
        #[case] selected: bool,
    ) {
        let dump = changeset(bounds, tags);
        let found = import_changesets(dump.as_bytes()).expect("dump should parse");
        assert_eq!(found == vec![5], selected);
    }

    #[rstest]
    fn reports_malformed_dumps() {
        let outcome = import_changesets(&b"<osm><changeset id=\"x\"/></osm>"[..]);
        assert!(outcome.is_err());
    }
}
