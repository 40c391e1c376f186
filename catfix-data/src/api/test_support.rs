//! In-memory [`MapApi`] for exercising the workflows without a network.

use std::cell::RefCell;
use std::io::Write;

use async_trait::async_trait;
use catfix_core::{ElementId, Tags};

use super::{MapApi, TransportError};

/// Remote call recorded by [`StubMapApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubCall {
    /// A changeset download.
    Download(ElementId),
    /// An Overpass query.
    Query(String),
    /// A changeset creation with its tags.
    Create(Tags),
    /// An upload with its document.
    Upload(ElementId, String),
    /// A changeset close.
    Close(ElementId),
}

/// Stub [`MapApi`] answering from canned documents and recording calls.
#[derive(Debug, Default)]
pub struct StubMapApi {
    changeset: Vec<u8>,
    extract: Vec<u8>,
    next_changeset: ElementId,
    failing_step: Option<&'static str>,
    calls: RefCell<Vec<StubCall>>,
}

impl StubMapApi {
    /// Stub serving `changeset` as every changeset download and `extract`
    /// as every Overpass answer.
    pub fn new(changeset: impl Into<Vec<u8>>, extract: impl Into<Vec<u8>>) -> Self {
        Self {
            changeset: changeset.into(),
            extract: extract.into(),
            next_changeset: 1000,
            ..Self::default()
        }
    }

    /// Make `step` fail with an HTTP 500. Steps are `download`, `query`,
    /// `create`, `upload` and `close`.
    #[must_use]
    pub fn failing(mut self, step: &'static str) -> Self {
        self.failing_step = Some(step);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<StubCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, step: &'static str, call: StubCall) -> Result<(), TransportError> {
        self.calls.borrow_mut().push(call);
        if self.failing_step == Some(step) {
            return Err(TransportError::Http {
                url: format!("https://stub.invalid/{step}"),
                status: 500,
                message: "stub failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl MapApi for StubMapApi {
    async fn download_changeset(&self, id: ElementId) -> Result<Vec<u8>, TransportError> {
        self.record("download", StubCall::Download(id))?;
        Ok(self.changeset.clone())
    }

    async fn query_overpass(
        &self,
        query: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        self.record("query", StubCall::Query(query.to_owned()))?;
        sink.write_all(&self.extract)
            .map_err(|source| TransportError::Network {
                url: "https://stub.invalid/query".to_owned(),
                source,
            })?;
        Ok(u64::try_from(self.extract.len()).unwrap_or(u64::MAX))
    }

    async fn create_changeset(&self, tags: &Tags) -> Result<ElementId, TransportError> {
        self.record("create", StubCall::Create(tags.clone()))?;
        Ok(self.next_changeset)
    }

    async fn upload_changes(
        &self,
        id: ElementId,
        document: Vec<u8>,
    ) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(&document).into_owned();
        self.record("upload", StubCall::Upload(id, text))
    }

    async fn close_changeset(&self, id: ElementId) -> Result<(), TransportError> {
        self.record("close", StubCall::Close(id))
    }
}
