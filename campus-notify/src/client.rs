//! Backend REST client
//!
//! All backend traffic goes through `BackendClient`: bearer-token auth on
//! every request, a single silent refresh-and-retry on 401, and response
//! normalization (key casing + list envelope) at this boundary so the rest
//! of the service only ever sees typed, snake_cased data.

use campus_common::api::{normalize_keys, Listing};
use campus_common::config::NotifyConfig;
use campus_common::{Error, Result};
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default timeout for backend API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Token refresh endpoint
const REFRESH_PATH: &str = "/api/token/refresh/";

/// HTTP client for the school backend API
pub struct BackendClient {
    http: Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
    refresh_token: Option<String>,
}

impl BackendClient {
    /// Create a new backend client from resolved configuration
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: RwLock::new(config.access_token.clone()),
            refresh_token: config.refresh_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = self.access_token.read().await.as_deref() {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Issue a request, refreshing the access token and retrying exactly
    /// once on 401. Success bodies are returned as JSON (`Null` for 204).
    async fn request_value(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut response = self.send(method.clone(), path, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.refresh_token.is_some() {
            debug!(path = %path, "401 from backend, refreshing token and retrying once");
            self.refresh_access_token().await?;
            response = self.send(method, path, body).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::classify_response(status, &text));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// GET a list endpoint, accepting both bare-array and `{count, results}`
    /// shapes, with key normalization applied before typed deserialization.
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let value = self.request_value(Method::GET, path, None).await?;
        let normalized = normalize_keys(value);
        let listing: Listing<T> = serde_json::from_value(normalized)
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", path, e)))?;
        Ok(listing.into_vec())
    }

    /// Mark a general notice read. 204/200 on success; a missing notice is
    /// reported as `Error::NotFound` (by status or message substring).
    pub async fn mark_notice_read(&self, id: i64) -> Result<()> {
        self.request_value(Method::POST, &format!("/api/notices/{}/read/", id), None)
            .await
            .map(|_| ())
    }

    /// Mark a class-scoped notice read (distinct endpoint from general
    /// notices).
    pub async fn mark_class_notice_read(&self, id: i64) -> Result<()> {
        self.request_value(
            Method::POST,
            &format!("/api/class-notices/{}/read/", id),
            None,
        )
        .await
        .map(|_| ())
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh_access_token(&self) -> Result<()> {
        let refresh = self
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("no refresh token configured".to_string()))?;

        let body = serde_json::json!({ "refresh": refresh });
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "token refresh failed");
            return Err(Error::Unauthorized(format!(
                "token refresh returned {}",
                status
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("token refresh: {}", e)))?;

        *self.access_token.write().await = Some(refreshed.access);
        debug!("access token refreshed");
        Ok(())
    }
}

// ============================================================================
// Backend API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}
