//! Shared request function with session injection.
//!
//! Every call made by the stores goes through [`ApiClient::send`]:
//! - before the request, the current session token is attached as a raw
//!   `Authorization` header (no scheme prefix);
//! - after the response, a 401 clears the session and navigates to the
//!   login route. The response is still handed back to the caller.

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use filebox_common::{Error, Result};

use crate::config::ClientConfig;
use crate::session::SessionProvider;

/// Route the interceptor navigates to when the session expires.
pub const LOGIN_ROUTE: &str = "/login";

/// Where the application is sent when the interceptor forces a re-login.
pub trait Navigator: Send + Sync {
    /// Move the application to `route`.
    fn navigate(&self, route: &str);
}

/// Navigator that only logs the redirect.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!("Navigating to {}", route);
    }
}

/// HTTP client for the storage API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// - Invalid base URL
    /// - HTTP client construction failed
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.parsed_base_url()?,
            session,
            navigator,
        })
    }

    /// Session provider used for the `Authorization` header.
    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Absolute URL for an API path such as `/files/` or `/files/{id}`.
    ///
    /// Segments are percent-encoded; a trailing slash in `path` is kept.
    pub fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::InvalidInput(format!("Base URL cannot be a base: {}", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in path.trim_start_matches('/').split('/') {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    /// Start a request to an API path.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    /// Send a request through the interceptor.
    ///
    /// Non-success statuses are returned as responses, not errors.
    ///
    /// # Errors
    /// - Network failure
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let (request, authorized) = match self.session.token().await {
            Some(token) => (request.header(header::AUTHORIZATION, token.expose()), true),
            None => (request, false),
        };

        let request = request
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to build request: {}", e)))?;
        debug!(
            method = %request.method(),
            path = request.url().path(),
            authorized,
            "Sending request"
        );

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| Error::Network(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.on_unauthorized().await;
        }

        Ok(response)
    }

    /// Send a request and decode a JSON success body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        handle_response(response).await
    }

    /// Send a request whose success body is irrelevant.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = self.send(request).await?;
        check_status(response).await.map(|_| ())
    }

    /// `GET /healthz`.
    pub async fn health(&self) -> Result<String> {
        let response = self.send(self.request(Method::GET, "/healthz")?).await?;
        read_text(check_status(response).await?).await
    }

    async fn on_unauthorized(&self) {
        info!("Session rejected by server, signing out");
        if let Err(e) = self.session.clear().await {
            warn!("Failed to clear session after 401: {}", e);
        }
        self.navigator.navigate(LOGIN_ROUTE);
    }
}

/// Pass a success response through, turn anything else into an error.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = read_text(response).await?;
    Err(status_error(status, body))
}

/// Read the whole body as text.
pub(crate) async fn read_text(response: Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))
}

/// Handle API response with error checking.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
}

/// Error for a non-success status.
pub(crate) fn status_error(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Authentication("Invalid or expired session".to_string()),
        StatusCode::NOT_FOUND => Error::NotFound(if body.is_empty() {
            "Resource not found".to_string()
        } else {
            body
        }),
        _ => Error::Api {
            status: status.as_u16(),
            body,
        },
    }
}
