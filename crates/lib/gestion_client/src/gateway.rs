// @zen-component: AUTH-RequestGateway
//
//! Authenticated request gateway.
//!
//! The one path every API call takes. It attaches `Authorization: Bearer`
//! from the credential store, and on a 401 waits for the refresh coordinator
//! before replaying the request exactly once.

use std::sync::Arc;

use gestion_core::models::auth::ErrorDetail;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::{ClientError, ClientResult};
use crate::refresh::RefreshCoordinator;

/// One logical API request. The gateway marks it retried before resending
/// after a 401; the flag is logged with each attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> ClientResult<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// Raw API response: status plus body bytes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Human-readable error detail: the `detail` field if present, else
    /// the raw body, else the status reason.
    pub fn detail(&self) -> String {
        if let Ok(ErrorDetail {
            detail: Some(detail),
        }) = serde_json::from_slice::<ErrorDetail>(&self.body)
        {
            return detail;
        }
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if !text.is_empty() {
            return text.chars().take(200).collect();
        }
        self.status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    }

    /// Map non-success statuses onto [`ClientError`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        let status = self.status;
        if status.is_success() {
            return Ok(self);
        }
        Err(match status {
            StatusCode::FORBIDDEN => ClientError::Forbidden(self.detail()),
            StatusCode::NOT_FOUND => ClientError::NotFound(self.detail()),
            StatusCode::UNAUTHORIZED => ClientError::AuthenticationFailed,
            _ => ClientError::Api {
                status: status.as_u16(),
                detail: self.detail(),
            },
        })
    }
}

/// Sends requests with the current bearer token and recovers from 401s.
#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
}

impl Gateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<CredentialStore>,
        coordinator: RefreshCoordinator,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            coordinator,
        }
    }

    /// Send a request. Any non-401 response is returned as-is; a 401 is
    /// recovered by one refresh-and-retry or ends the session.
    pub async fn send(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        let (response, sent_token) = self.dispatch(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        request.retried = true;

        // Another caller may already have refreshed since this request left.
        let current = self.store.access_token()?;
        if current.is_none() || current == sent_token {
            debug!(method = %request.method, path = %request.path, "401 received; refreshing token");
            self.coordinator
                .refresh()
                .await
                .map_err(ClientError::SessionExpired)?;
        } else {
            debug!(method = %request.method, path = %request.path, "401 with stale token; retrying with current token");
        }

        let (response, _) = self.dispatch(&request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.fail_authentication(&request));
        }
        Ok(response)
    }

    /// Send and decode a JSON body from a 2xx response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// Send, expecting a 2xx with no interesting body.
    pub async fn send_empty(&self, request: ApiRequest) -> ClientResult<()> {
        self.send(request).await?.error_for_status().map(|_| ())
    }

    async fn dispatch(&self, request: &ApiRequest) -> ClientResult<(ApiResponse, Option<String>)> {
        let token = self.store.access_token()?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            retried = request.retried,
            "api response"
        );
        Ok((ApiResponse::new(status, body.to_vec()), token))
    }

    fn fail_authentication(&self, request: &ApiRequest) -> ClientError {
        warn!(method = %request.method, path = %request.path, "still unauthorized after token refresh; ending session");
        self.coordinator.terminate();
        ClientError::AuthenticationFailed
    }
}
