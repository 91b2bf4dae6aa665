//! Generation API client.
//!
//! The consolidated call-site layer for every outbound request the
//! dashboard makes: post text generation, image generation and editing,
//! image upload, status patches and usage statistics. One shared
//! [`Pipeline`] instance carries them all, so a single implementation of
//! the timeout/retry/queue behavior serves both the page-render path and
//! the interactive path.
//!
//! # Example
//!
//! ```rust,no_run
//! use genpipe::client::{ClientConfig, GenerationClient};
//! use serde_json::json;
//!
//! # async fn example() -> genpipe::error::Result<()> {
//! let config = ClientConfig {
//!     base_url: "https://api.example.com".to_string(),
//!     ..Default::default()
//! };
//! let client = GenerationClient::new(config)?;
//!
//! let post = client
//!     .generate_content(json!({ "brand": "acme", "topic": "launch week" }))
//!     .await?;
//! println!("{post}");
//! # Ok(())
//! # }
//! ```

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, PipelineConfig, RequestOptions};
use crate::response::{ensure_success, parse_json};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

/// Queue priority for interactive generation requests.
const PRIORITY_GENERATE: i32 = 10;
/// Queue priority for image edits.
const PRIORITY_EDIT: i32 = 5;
/// Queue priority for background traffic (uploads, patches, stats).
const PRIORITY_BACKGROUND: i32 = 0;

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!("genpipe/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Generation client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the generation API (no trailing slash required).
    pub base_url: String,
    /// Per-attempt request timeout in milliseconds.
    pub timeout_ms: u64,
    /// TCP connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Optional proxy configuration.
    pub proxy: Option<ProxyConfig>,
    /// Pipeline policies (queue spacing, default timeout, retry).
    pub pipeline: PipelineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
            proxy: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// HTTP client for the content-generation API, with retry, timeout,
/// rate-limited queueing and cancel-all built in.
#[derive(Debug)]
pub struct GenerationClient {
    http: Client,
    pipeline: Pipeline<Value>,
    config: ClientConfig,
    upload_seq: AtomicU64,
}

impl GenerationClient {
    /// Creates a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pipeline configuration is invalid
    /// - The proxy URL is invalid
    /// - The HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.pipeline.validate()?;

        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .gzip(true)
            .user_agent(&config.user_agent);

        if let Some(proxy_config) = &config.proxy {
            let mut proxy = reqwest::Proxy::all(&proxy_config.url)
                .map_err(|e| Error::network(format!("Invalid proxy URL: {e}")))?;

            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                proxy = proxy.basic_auth(username, password);
            }
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| Error::network(format!("Failed to build HTTP client: {e}")))?;

        let pipeline = Pipeline::new(config.pipeline.clone());

        Ok(Self {
            http,
            pipeline,
            config,
            upload_seq: AtomicU64::new(0),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying pipeline, e.g. for observability.
    pub fn pipeline(&self) -> &Pipeline<Value> {
        &self.pipeline
    }

    /// Sends one request through the full pipeline composition: queue
    /// submission, per-attempt timeout, response validation, retry.
    ///
    /// The returned value is the decoded JSON payload (or the raw body as
    /// a JSON string when the backend answers with plain text).
    #[instrument(
        name = "api_request",
        skip(self, body, options),
        fields(method = %method, path = %path)
    )]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let http = self.http.clone();

        debug!(url = %url, has_body = body.is_some(), "submitting request");

        self.pipeline
            .submit(options, move || {
                let http = http.clone();
                let url = url.clone();
                let method = method.clone();
                let body = body.clone();
                async move {
                    let mut request = http.request(method, url.as_str());
                    if let Some(ref payload) = body {
                        request = request.json(payload);
                    }
                    let response = request.send().await.map_err(Error::from)?;
                    let response = ensure_success(response).await?;
                    parse_json(response).await
                }
            })
            .await
    }

    /// Requests AI-generated post text.
    ///
    /// Single-flight: a new generation supersedes a still-pending one, so
    /// rapid re-clicks never stack up.
    pub async fn generate_content(&self, payload: Value) -> Result<Value> {
        let options = RequestOptions::default()
            .with_id("content-generate")
            .with_priority(PRIORITY_GENERATE);
        self.request(Method::POST, "/api/content/generate", Some(payload), options)
            .await
    }

    /// Requests an AI-generated image for a post.
    pub async fn generate_image(&self, payload: Value) -> Result<Value> {
        let options = RequestOptions::default()
            .with_id("image-generate")
            .with_priority(PRIORITY_GENERATE);
        self.request(Method::POST, "/api/images/generate", Some(payload), options)
            .await
    }

    /// Requests an edit of a previously generated image.
    pub async fn edit_image(&self, payload: Value) -> Result<Value> {
        let options = RequestOptions::default()
            .with_id("image-edit")
            .with_priority(PRIORITY_EDIT);
        self.request(Method::POST, "/api/images/edit", Some(payload), options)
            .await
    }

    /// Uploads a finished image.
    ///
    /// Uploads are keyed uniquely so concurrent uploads queue up instead
    /// of superseding each other.
    pub async fn upload_image(&self, payload: Value) -> Result<Value> {
        let upload_id = self.upload_seq.fetch_add(1, Ordering::Relaxed);
        let options = RequestOptions::default()
            .with_id(format!("image-upload-{upload_id}"))
            .with_priority(PRIORITY_BACKGROUND);
        self.request(Method::POST, "/api/images/upload", Some(payload), options)
            .await
    }

    /// Patches a post's publication status.
    pub async fn update_post_status(&self, post_id: &str, payload: Value) -> Result<Value> {
        let options = RequestOptions::default()
            .with_id(format!("post-status-{post_id}"))
            .with_priority(PRIORITY_BACKGROUND);
        self.request(
            Method::PATCH,
            &format!("/api/posts/{post_id}/status"),
            Some(payload),
            options,
        )
        .await
    }

    /// Fetches dashboard usage statistics.
    ///
    /// Keyed single-flight: a fresh stats request replaces a stale
    /// pending one.
    pub async fn usage_stats(&self) -> Result<Value> {
        let options = RequestOptions::default()
            .with_id("usage-stats")
            .with_priority(PRIORITY_BACKGROUND);
        self.request(Method::GET, "/api/usage", None, options).await
    }

    /// Aborts every in-flight call and drops all queued work.
    ///
    /// Backs the dashboard's "cancel generation" button.
    pub async fn cancel_generation(&self) {
        self.pipeline.cancel_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert!(config.user_agent.starts_with("genpipe/"));
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_client_config_deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "base_url": "https://api.example.com",
                "pipeline": { "min_request_interval_ms": 250 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.pipeline.min_request_interval_ms, 250);
        assert_eq!(config.pipeline.retry.retries, 3);
        assert_eq!(config.timeout_ms, 60_000);
    }

    #[test]
    fn test_client_creation() {
        let config = ClientConfig {
            base_url: "https://api.example.com".to_string(),
            ..Default::default()
        };
        assert!(GenerationClient::new(config).is_ok());
    }

    #[test]
    fn test_client_creation_with_proxy() {
        let config = ClientConfig {
            base_url: "https://api.example.com".to_string(),
            proxy: Some(ProxyConfig::new("http://localhost:8080")),
            ..Default::default()
        };
        assert!(GenerationClient::new(config).is_ok());
    }

    #[test]
    fn test_client_creation_rejects_invalid_pipeline() {
        let config = ClientConfig {
            pipeline: PipelineConfig {
                retry: crate::retry_strategy::RetryConfig {
                    retries: 99,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(GenerationClient::new(config).is_err());
    }
}
