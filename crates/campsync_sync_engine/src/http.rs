//! HTTP gateway implementation.
//!
//! The endpoint is a single URL: `GET` returns the dataset, `POST` with a
//! JSON body applies a batch of cell writes. The HTTP client itself is
//! abstracted via [`HttpClient`] so the gateway can be tested without a
//! network.

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteGateway;
use campsync_sync_protocol::{
    decode_fetch_response, decode_push_response, BatchUpdateRequest, Material, RowUpdate,
};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Errors are returned as text; the gateway turns them into
/// [`SyncError::Transport`].
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, String>> + Send;

    /// Sends a POST request with a `text/plain` body.
    fn post_text(
        &self,
        url: &str,
        body: String,
    ) -> impl Future<Output = Result<HttpResponse, String>> + Send;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, String> {
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(describe)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn describe(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self.client.get(url).send().await.map_err(describe)?;
        Self::read(response).await
    }

    async fn post_text(&self, url: &str, body: String) -> Result<HttpResponse, String> {
        // text/plain keeps Apps Script from requiring a CORS preflight
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(describe)?;
        Self::read(response).await
    }
}

/// [`RemoteGateway`] speaking the spreadsheet endpoint's JSON protocol.
pub struct HttpGateway<C: HttpClient> {
    url: String,
    client: C,
    timeout: Duration,
}

impl<C: HttpClient> HttpGateway<C> {
    /// Creates a gateway for `url`.
    ///
    /// Each request is bounded by `timeout` in addition to any limit the
    /// client applies itself.
    pub fn new(url: impl Into<String>, client: C, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client,
            timeout,
        }
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    async fn bounded<F>(&self, what: &str, request: F) -> SyncResult<HttpResponse>
    where
        F: Future<Output = Result<HttpResponse, String>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(SyncError::Transport(format!(
                "{what} failed: HTTP {}",
                response.status
            ))),
            Ok(Err(message)) => Err(SyncError::Transport(format!("{what} failed: {message}"))),
            Err(_) => Err(SyncError::Transport(format!(
                "{what} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

impl HttpGateway<ReqwestClient> {
    /// Creates a gateway using a `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the client cannot be built.
    pub fn reqwest(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        Ok(Self::new(url, ReqwestClient::new(timeout)?, timeout))
    }
}

impl<C: HttpClient> RemoteGateway for HttpGateway<C> {
    async fn fetch_all(&self) -> SyncResult<Vec<Material>> {
        let response = self.bounded("fetch", self.client.get(&self.url)).await?;
        let materials = decode_fetch_response(&response.body)?;
        debug!(count = materials.len(), "fetched remote dataset");
        Ok(materials)
    }

    async fn push_batch(&self, updates: &[RowUpdate]) -> SyncResult<()> {
        let body = BatchUpdateRequest::new(updates.to_vec()).to_json()?;
        let response = self
            .bounded("push", self.client.post_text(&self.url, body))
            .await?;
        decode_push_response(&response.body)?;
        debug!(count = updates.len(), "pushed batch");
        Ok(())
    }
}
