//! Remote API seam and its HTTP implementation.

use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use catfix_core::{ElementId, Tags};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use super::{ApiBuildError, Credentials, TransportError};
use crate::osc::write_changeset_document;

/// Production OpenStreetMap API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openstreetmap.org";
/// Overpass interpreter used for extracts.
pub const DEFAULT_OVERPASS_URL: &str = "https://lz4.overpass-api.de/api/interpreter";
/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("catfix/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote operations the download and upload workflows depend on.
#[async_trait(?Send)]
pub trait MapApi {
    /// Fetch the osmChange contents of changeset `id`.
    async fn download_changeset(&self, id: ElementId) -> Result<Vec<u8>, TransportError>;
    /// Run an Overpass `query`, streaming the answer into `sink`.
    ///
    /// Returns the number of bytes written.
    async fn query_overpass(
        &self,
        query: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError>;
    /// Open a changeset carrying `tags` and return its identity.
    async fn create_changeset(&self, tags: &Tags) -> Result<ElementId, TransportError>;
    /// Upload an osmChange `document` into the open changeset `id`.
    async fn upload_changes(&self, id: ElementId, document: Vec<u8>)
    -> Result<(), TransportError>;
    /// Close changeset `id`.
    async fn close_changeset(&self, id: ElementId) -> Result<(), TransportError>;
}

/// Settings for [`HttpMapApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMapApiConfig {
    /// Base URL of the OpenStreetMap API.
    pub api_url: String,
    /// Overpass interpreter URL.
    pub overpass_url: String,
    /// Total request timeout.
    pub timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
}

impl Default for HttpMapApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            overpass_url: DEFAULT_OVERPASS_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpMapApiConfig {
    /// Create a configuration pointing at the production endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different OpenStreetMap API, such as the development server.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Use a different Overpass interpreter.
    #[must_use]
    pub fn with_overpass_url(mut self, url: impl Into<String>) -> Self {
        self.overpass_url = url.into();
        self
    }

    /// Set the total request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP implementation of [`MapApi`].
///
/// Read-only calls work anonymously. Changeset writes require
/// [`HttpMapApi::with_credentials`].
///
/// # Examples
/// ```no_run
/// use catfix_data::api::{HttpMapApi, HttpMapApiConfig, MapApi};
///
/// let api = HttpMapApi::new(HttpMapApiConfig::new())?;
/// let runtime = tokio::runtime::Runtime::new()?;
/// let document = runtime.block_on(api.download_changeset(38_000_000))?;
/// assert!(!document.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct HttpMapApi {
    client: Client,
    api_url: Url,
    overpass_url: Url,
    user_agent: String,
    credentials: Option<Credentials>,
}

impl HttpMapApi {
    /// Construct a client from `config`.
    ///
    /// # Errors
    /// Returns [`ApiBuildError`] when a URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: HttpMapApiConfig) -> Result<Self, ApiBuildError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(ApiBuildError::HttpClient)?;
        Ok(Self {
            client,
            api_url: parse_base_url("API", &config.api_url)?,
            overpass_url: Url::parse(&config.overpass_url).map_err(|source| {
                ApiBuildError::InvalidUrl {
                    what: "Overpass",
                    url: config.overpass_url.clone(),
                    source,
                }
            })?,
            user_agent: config.user_agent,
            credentials: None,
        })
    }

    /// Authenticate changeset writes with `credentials`.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.api_url
            .join(path)
            .map_err(|err| TransportError::InvalidResponse {
                url: format!("{}{path}", self.api_url),
                message: err.to_string(),
            })
    }

    fn authorised(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<RequestBuilder, TransportError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| TransportError::Unauthenticated {
                url: url.to_string(),
            })?;
        Ok(request.basic_auth(credentials.username(), Some(credentials.password())))
    }

    async fn call(&self, request: RequestBuilder, url: &Url) -> Result<Response, TransportError> {
        request
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url.as_str()))
    }

    async fn write_call(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<Response, TransportError> {
        let authorised = self.authorised(request, url)?;
        self.call(authorised.header(CONTENT_TYPE, "text/xml; charset=utf-8"), url)
            .await
    }
}

#[async_trait(?Send)]
impl MapApi for HttpMapApi {
    async fn download_changeset(&self, id: ElementId) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint(&format!("api/0.6/changeset/{id}/download"))?;
        let response = self.call(self.client.get(url.clone()), &url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?;
        Ok(body.to_vec())
    }

    async fn query_overpass(
        &self,
        query: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        let mut url = self.overpass_url.clone();
        url.query_pairs_mut().append_pair("data", query);
        let response = self.call(self.client.get(url.clone()), &url).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        while let Some(next) = stream.next().await {
            let chunk = next.map_err(|err| convert_reqwest_error(err, url.as_str()))?;
            sink.write_all(&chunk)
                .map_err(|source| TransportError::Network {
                    url: url.to_string(),
                    source,
                })?;
            written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        }
        Ok(written)
    }

    async fn create_changeset(&self, tags: &Tags) -> Result<ElementId, TransportError> {
        let url = self.endpoint("api/0.6/changeset/create")?;
        let mut document = Vec::new();
        write_changeset_document(&mut document, tags).map_err(|err| {
            TransportError::InvalidResponse {
                url: url.to_string(),
                message: format!("failed to encode changeset tags: {err}"),
            }
        })?;
        let response = self
            .write_call(self.client.put(url.clone()).body(document), &url)
            .await?;
        let body = response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?;
        body.trim()
            .parse()
            .map_err(|_| TransportError::InvalidResponse {
                url: url.to_string(),
                message: format!("expected a changeset id, got {:?}", body.trim()),
            })
    }

    async fn upload_changes(
        &self,
        id: ElementId,
        document: Vec<u8>,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(&format!("api/0.6/changeset/{id}/upload"))?;
        self.write_call(self.client.post(url.clone()).body(document), &url)
            .await?;
        Ok(())
    }

    async fn close_changeset(&self, id: ElementId) -> Result<(), TransportError> {
        let url = self.endpoint(&format!("api/0.6/changeset/{id}/close"))?;
        self.write_call(self.client.put(url.clone()), &url).await?;
        Ok(())
    }
}

/// Parse a base URL so that relative joins append to its path.
fn parse_base_url(what: &'static str, raw: &str) -> Result<Url, ApiBuildError> {
    let trimmed = raw.trim_end_matches('/');
    Url::parse(&format!("{trimmed}/")).map_err(|source| ApiBuildError::InvalidUrl {
        what,
        url: raw.to_owned(),
        source,
    })
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
