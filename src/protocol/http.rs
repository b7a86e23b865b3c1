// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP implementation of the cloud API client.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::command::{ControlRequest, PayloadCommand};
use crate::device::DeviceInfo;
use crate::error::ProtocolError;
use crate::protocol::{AccessToken, ApiResponse, CloudClient, Payload};

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration for the cloud API HTTP client.
///
/// # Examples
///
/// ```
/// use coway_bridge::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new()
///     .with_base_url("http://127.0.0.1:8080/api/v1")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "http://127.0.0.1:8080/api/v1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConfig {
    /// Base URL of the production cloud API.
    pub const DEFAULT_BASE_URL: &'static str = "https://iocareapi.iot.coway.com/api/v1";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration targeting the production API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Sets a custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an HTTP(S) URL or the HTTP
    /// client cannot be created.
    pub fn into_client(self) -> Result<HttpClient, ProtocolError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProtocolError::InvalidAddress(self.base_url));
        }

        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build().map_err(ProtocolError::Http)?;

        Ok(HttpClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// HTTP client for the Coway cloud API.
///
/// State reads are `GET {base}/{path}` with the payload as query string,
/// control writes are `POST {base}/devices/{barcode}/control-param` with a
/// JSON body. Both carry the access token as a bearer token.
///
/// # Examples
///
/// ```no_run
/// use coway_bridge::protocol::{AccessToken, CloudClient, HttpClient, Payload};
///
/// # async fn example() -> Result<(), coway_bridge::error::ProtocolError> {
/// let client = HttpClient::new()?;
/// let token = AccessToken::new("token");
/// let payload = Payload::new().with("pageIndex", "0").with("pageSize", "100");
/// let response = client.get_payload("com/user-devices", &payload, &token).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Creates a client for the production API with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ProtocolError> {
        HttpConfig::new().into_client()
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the URL for a path relative to the base URL.
    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn decode(response: Response) -> Result<ApiResponse, ProtocolError> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::AuthenticationFailed);
        }

        if !response.status().is_success() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await.map_err(ProtocolError::Http)?;

        tracing::trace!(body = %body, "Received HTTP response");

        if body.trim().is_empty() {
            return Ok(ApiResponse::default());
        }
        serde_json::from_str(&body)
            .map_err(|e| ProtocolError::ConnectionFailed(format!("invalid response body: {e}")))
    }
}

impl CloudClient for HttpClient {
    async fn get_payload(
        &self,
        path: &str,
        payload: &Payload,
        token: &AccessToken,
    ) -> Result<ApiResponse, ProtocolError> {
        let url = self.build_url(path);

        tracing::debug!(url = %url, params = payload.len(), "Sending HTTP request");

        let response = self
            .client
            .get(&url)
            .query(payload)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        Self::decode(response).await
    }

    async fn send_control(
        &self,
        device: &DeviceInfo,
        commands: &[PayloadCommand],
        token: &AccessToken,
    ) -> Result<ApiResponse, ProtocolError> {
        let path = format!(
            "devices/{}/control-param",
            urlencoding::encode(&device.barcode)
        );
        let url = self.build_url(&path);
        let body = ControlRequest::new(device, commands);

        tracing::debug!(url = %url, commands = commands.len(), "Sending control request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        Self::decode(response).await
    }
}
