//! osmChange documents: writing edit-sets and reading them back.

use std::io;

use camino::Utf8PathBuf;
use catfix_core::ElementKind;
use thiserror::Error;

mod reader;
mod writer;

pub use reader::{OscChange, read_osc, read_osc_file};
pub use writer::{GENERATOR, OscOptions, write_changeset_document, write_osc};

use crate::xml::XmlError;

/// Errors raised while reading or writing osmChange documents.
#[derive(Debug, Error)]
pub enum OscError {
    /// The file could not be opened.
    #[error("failed to open osmChange file at {path:?}")]
    Open {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Input path.
        path: Utf8PathBuf,
    },
    /// The document could not be decoded.
    #[error("failed to decode osmChange data")]
    Parse {
        /// Decoding error.
        #[source]
        source: XmlError,
    },
    /// The document could not be written.
    #[error("failed to write osmChange data")]
    Write {
        /// Serialisation error.
        #[source]
        source: quick_xml::Error,
    },
    /// An element reached the writer without an identity.
    #[error("{kind} without an identity cannot be written")]
    MissingId {
        /// Kind of the offending element.
        kind: ElementKind,
    },
}

impl From<quick_xml::Error> for OscError {
    fn from(source: quick_xml::Error) -> Self {
        Self::Write { source }
    }
}
