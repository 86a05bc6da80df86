//! Page render collaborator.
//!
//! Rendering is delegated to an external headless-browser service; the core
//! only describes what to capture.

use crate::error::{ResourceError, ResourceResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Page load state to wait for before capturing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    Load,
    #[default]
    NetworkIdle,
}

/// One screenshot job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub url: String,
    /// Element to capture.
    pub selector: String,
    pub viewport: Viewport,
    pub wait_until: WaitUntil,
    /// Element that must appear before capturing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,
    /// Point to click after load, for pages that need a nudge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<(i32, i32)>,
    pub omit_background: bool,
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: selector.into(),
            viewport: Viewport::default(),
            wait_until: WaitUntil::default(),
            wait_for: None,
            click: None,
            omit_background: true,
            timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    #[must_use]
    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    #[must_use]
    pub fn click_at(mut self, x: i32, y: i32) -> Self {
        self.click = Some((x, y));
        self
    }

    #[must_use]
    pub fn wait_until(mut self, state: WaitUntil) -> Self {
        self.wait_until = state;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Captures a page region as PNG bytes.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> ResourceResult<Bytes>;
}

/// [`PageRenderer`] that POSTs the request as JSON to a screenshot service
/// and expects image bytes back.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    endpoint: String,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>) -> ResourceResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ResourceError::RenderFailure(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, request: &RenderRequest) -> ResourceResult<Bytes> {
        debug!(url = %request.url, selector = %request.selector, "rendering page");
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(request.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResourceError::FetchTimeout {
                        url: request.url.clone(),
                    }
                } else {
                    ResourceError::RenderFailure(format!("render service unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResourceError::RenderFailure(format!(
                "render of {} failed ({status}): {body}",
                request.url
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResourceError::RenderFailure(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ResourceError::RenderFailure(format!(
                "render of {} returned no image",
                request.url
            )));
        }
        Ok(bytes)
    }
}

/// Renderer used when no screenshot service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRenderer;

#[async_trait]
impl PageRenderer for UnavailableRenderer {
    async fn render(&self, request: &RenderRequest) -> ResourceResult<Bytes> {
        Err(ResourceError::RenderFailure(format!(
            "no render service configured for {}",
            request.url
        )))
    }
}
