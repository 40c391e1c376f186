//! OpenStreetMap API and Overpass access.
//!
//! Responsibilities:
//! - Download import changesets and the Overpass extract of their area.
//! - Open changesets, upload osmChange files into them and close them.
//!
//! Boundaries:
//! - Remote calls go through the [`MapApi`] trait so the workflows can run
//!   against an in-memory stub in tests.
//! - Reconciliation itself lives in `catfix-core`.
//!
//! Invariants:
//! - A failed Overpass query leaves no partial extract behind.
//! - An opened changeset is closed whether or not the upload succeeds.

mod client;
mod credentials;
mod error;
#[cfg(any(test, feature = "test-support"))]
mod test_support;
mod workflow;

pub use client::{
    DEFAULT_API_URL, DEFAULT_OVERPASS_URL, DEFAULT_USER_AGENT, HttpMapApi, HttpMapApiConfig,
    MapApi,
};
pub use credentials::Credentials;
pub use error::{ApiBuildError, CredentialsError, DownloadError, TransportError, UploadError};
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubCall, StubMapApi};
pub use workflow::{
    ChangesetScope, DownloadOutcome, UPLOAD_COMMENT, UPLOAD_WIKI_URL, UploadReceipt,
    download_changeset_extract, upload_change_file, upload_tags,
};

#[cfg(test)]
mod tests;
