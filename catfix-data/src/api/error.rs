//! Error types produced by the remote API helpers.

use std::io;

use camino::Utf8PathBuf;
use catfix_core::ElementId;
use thiserror::Error;

use crate::osc::OscError;

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The server answered with a body the client could not interpret.
    #[error("unexpected response from {url}: {message}")]
    InvalidResponse {
        /// Fully qualified request URL.
        url: String,
        /// What was wrong with the body.
        message: String,
    },
    /// The request needs credentials and none were configured.
    #[error("request to {url} requires credentials")]
    Unauthenticated {
        /// Fully qualified request URL.
        url: String,
    },
}

/// Errors raised while constructing an HTTP client.
#[derive(Debug, Error)]
pub enum ApiBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// A configured base URL does not parse.
    #[error("invalid {what} URL {url:?}: {source}")]
    InvalidUrl {
        /// Which endpoint the URL configures.
        what: &'static str,
        /// Offending URL.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised while reading a password file.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The file could not be read.
    #[error("failed to read password file at {path:?}: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Password file path.
        path: Utf8PathBuf,
    },
    /// The first line is not `user:password`.
    #[error("password file at {path:?} does not start with a user:password line")]
    Malformed {
        /// Password file path.
        path: Utf8PathBuf,
    },
}

/// Errors raised while downloading a changeset and its surroundings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DownloadError {
    /// The changeset contents could not be fetched.
    #[error("failed to download changeset {id}: {source}")]
    Changeset {
        /// Changeset identity.
        id: ElementId,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The changeset contents could not be decoded.
    #[error("failed to decode changeset {id}: {source}")]
    Decode {
        /// Changeset identity.
        id: ElementId,
        /// Decoding failure.
        #[source]
        source: OscError,
    },
    /// A local file could not be written.
    #[error("failed to write {path:?}: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Target path.
        path: Utf8PathBuf,
    },
    /// The Overpass extract could not be fetched.
    #[error("failed to download the extract of changeset {id}: {source}")]
    Extract {
        /// Changeset identity.
        id: ElementId,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
}

/// Errors raised while uploading an osmChange file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadError {
    /// The osmChange file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// Input path.
        path: Utf8PathBuf,
        /// Read failure.
        #[source]
        source: OscError,
    },
    /// The osmChange file holds no changes.
    #[error("{path:?} holds no changes")]
    Empty {
        /// Input path.
        path: Utf8PathBuf,
    },
    /// Serialising the upload payload failed.
    #[error("failed to prepare the upload payload: {source}")]
    Payload {
        /// Serialisation failure.
        #[source]
        source: OscError,
    },
    /// A remote call failed.
    #[error("failed to {step}: {source}")]
    Remote {
        /// Step that failed.
        step: &'static str,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Archiving the uploaded file failed.
    #[error("failed to archive {path:?}: {source}")]
    Archive {
        /// Path involved in the failure.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
