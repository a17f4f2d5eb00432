//! HTTP client wrapper for page fetches and streamed file requests.
//!
//! This module provides the `HttpClient` struct which applies timeouts,
//! validates URLs, and maps transport and status failures onto
//! [`DownloadError`].

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PAGE_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Timeout settings for the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum idle time between reads of a response.
    pub read_timeout: Duration,
    /// Total deadline for a page fetch, body included. File streams are
    /// bounded by `read_timeout` only.
    pub page_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            page_timeout: Duration::from_secs(PAGE_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for fetching pages and streaming files.
///
/// Create once and clone freely; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    page_timeout: Duration,
}

/// A successful (2xx) response whose body has not been read yet.
#[derive(Debug)]
pub struct StreamingResponse {
    url: String,
    response: reqwest::Response,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes between reads
    /// - Page fetch deadline: 60 seconds
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new HTTP client with explicit timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_config(config: ClientConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            page_timeout: config.page_timeout,
        }
    }

    /// Fetches a page and returns its full body.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails or
    /// times out, or the server answers with a non-2xx status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.send(url, Some(self.page_timeout)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(bytes = body.len(), "page fetched");
        Ok(body.to_vec())
    }

    /// Issues a GET whose body will be streamed by the caller.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_page`](Self::fetch_page), minus body read failures,
    /// which surface from [`StreamingResponse::into_body_stream`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn open_stream(&self, url: &str) -> Result<StreamingResponse, DownloadError> {
        let response = self.send(url, None).await?;
        Ok(StreamingResponse {
            url: url.to_string(),
            response,
        })
    }

    async fn send(
        &self,
        url: &str,
        total_timeout: Option<Duration>,
    ) -> Result<reqwest::Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        let mut request = self.client.get(parsed);
        if let Some(timeout) = total_timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }
}

impl StreamingResponse {
    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// The URL this response was requested from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body size from `Content-Length`, or 0 when the server did not send one.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.response.content_length().unwrap_or(0)
    }

    /// Converts the response into a stream of body chunks.
    pub fn into_body_stream(
        self,
    ) -> impl Stream<Item = Result<impl AsRef<[u8]>, DownloadError>> + Send {
        let url = self.url;
        self.response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| DownloadError::network(url.as_str(), e)))
    }
}
