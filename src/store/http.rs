//! Object-store cold tier over plain HTTP (`PUT`/`GET {base}/{key}`).
//!
//! Works against S3-compatible gateways, R2 public write endpoints, or any
//! service that accepts raw object bodies with bearer auth.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

use super::{ColdStore, StoreError};

/// Fallback client timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpColdStore {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpColdStore {
    /// Create a store rooted at `base_url`.
    /// Returns an error if the HTTP client fails to build (e.g., TLS configuration issues).
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    fn url_for(&self, key: &str) -> String {
        let path: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url, path.join("/"))
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl ColdStore for HttpColdStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<(), StoreError> {
        let url = self.url_for(key);
        debug!(url = %url, size = blob.len(), "uploading cold blob");

        let response = self
            .with_auth(self.client.put(&url))
            .header("Content-Type", "application/octet-stream")
            .body(blob)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(failed to read body)".to_string());
            error!(
                url = %url,
                status = status.as_u16(),
                response_body = %body,
                "object store rejected upload"
            );
            return Err(StoreError::Http {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let url = self.url_for(key);
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .bytes()
                .await
                .map(Some)
                .map_err(|e| self.map_send_error(e)),
            status => Err(StoreError::Http {
                status: status.as_u16(),
                key: key.to_string(),
            }),
        }
    }
}
