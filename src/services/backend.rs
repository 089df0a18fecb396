use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

#[cfg(target_arch = "wasm32")]
pub trait BackendBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> BackendBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait BackendBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> BackendBounds for T {}

/// Raw HTTP reply: status code plus the undecoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    pub body: String,
}

impl BackendReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Backend: BackendBounds {
    /// POSTs `body` as `application/json`. Transport failures are `Err`; any HTTP
    /// status, successful or not, comes back as a reply.
    async fn post_json(&self, url: &str, body: &Value) -> Result<BackendReply>;
}

pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Backend for HttpBackend {
    async fn post_json(&self, url: &str, body: &Value) -> Result<BackendReply> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.context("Failed to read response body")?;
        Ok(BackendReply { status, body })
    }
}
