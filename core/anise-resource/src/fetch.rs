//! Remote fetch collaborator.

use crate::error::{ResourceError, ResourceResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Raw answer of the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx response, or `FetchHttpError`.
    pub fn into_bytes(self, url: &str) -> ResourceResult<Bytes> {
        if self.is_success() {
            Ok(self.bytes)
        } else {
            Err(ResourceError::FetchHttpError {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// HTTP client used for origin downloads and API probes.
///
/// Implementations report non-2xx answers as a normal [`FetchResponse`];
/// only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> ResourceResult<FetchResponse>;

    async fn post(&self, url: &str, timeout: Duration) -> ResourceResult<FetchResponse>;
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> ResourceResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("anise/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResourceError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> ResourceResult<FetchResponse> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| transport_error(url, e))?;

        debug!(url = %url, status, len = bytes.len(), "fetched");
        Ok(FetchResponse {
            status,
            bytes,
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> ResourceResult<FetchResponse> {
        self.send(self.client.get(url), url, timeout).await
    }

    async fn post(&self, url: &str, timeout: Duration) -> ResourceResult<FetchResponse> {
        self.send(self.client.post(url), url, timeout).await
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> ResourceError {
    if e.is_timeout() {
        ResourceError::FetchTimeout {
            url: url.to_string(),
        }
    } else {
        ResourceError::Network(format!("{url}: {e}"))
    }
}
