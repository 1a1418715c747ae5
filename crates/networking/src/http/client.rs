//! Loyalty backend HTTP client with bearer-token authentication

use super::ApiTransport;
use crate::config::ClientConfig;
use async_trait::async_trait;
use loyalty_core::{Error, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, Response, StatusCode,
};
use serde_json::Value;
use tracing::{debug, error, instrument};

const USER_AGENT_VALUE: &str = concat!("loyalty-admin/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the loyalty REST API
///
/// Joins endpoint paths onto the configured base URL and attaches the API
/// token (if any) to every request.
pub struct LoyaltyClient {
    http: Client,
    base_url: String,
}

impl LoyaltyClient {
    /// Create a client from validated configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .default_headers(Self::default_headers(config)?)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Headers sent with every request
    fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::ConfigError(format!("invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response indicates authentication failure
    fn check_auth_error(status: StatusCode) -> Option<Error> {
        match status.as_u16() {
            401 => Some(Error::TokenExpired),
            403 => Some(Error::AuthenticationError("Access forbidden".to_string())),
            _ => None,
        }
    }

    /// Map a non-success status and its body text to an error
    fn status_error(status: StatusCode, body: String) -> Error {
        Self::check_auth_error(status).unwrap_or(Error::ApiError {
            status: status.as_u16(),
            message: body,
        })
    }

    /// Turn a response into JSON, surfacing HTTP failures as errors
    async fn into_json(response: Response, path: &str) -> Result<Value> {
        let status = response.status();
        debug!("Response status for {}: {}", path, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Request to {} failed: HTTP {} {}", path, status, body);
            return Err(Self::status_error(status, body));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse response from {}: {}. Body preview: {}",
                path,
                e,
                text.chars().take(500).collect::<String>()
            );
            Error::InvalidData(e.to_string())
        })
    }
}

#[async_trait]
impl ApiTransport for LoyaltyClient {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            error!("GET {} failed: {}", url, e);
            Error::from(e)
        })?;

        Self::into_json(response, path).await
    }

    #[instrument(skip(self, body))]
    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            error!("POST {} failed: {}", url, e);
            Error::from(e)
        })?;

        Self::into_json(response, path).await
    }
}
