//! Authentication: login links, token exchange, registration, logout.

use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use filebox_common::{Error, Result, SessionToken};

use crate::http::{check_status, read_text, status_error, ApiClient};
use crate::models::{is_falsy, LoginPayload, Outcome, UserProfile, ValidationError};
use crate::session::{Session, SessionState};

/// Auth session store.
///
/// Only HTTP 400 on login-link and registration requests is treated as an
/// expected, user-facing failure and returned as [`Outcome::Invalid`].
/// Everything else that goes wrong is an `Err`.
pub struct AuthStore {
    api: ApiClient,
    session: Arc<SessionState>,
}

impl AuthStore {
    /// Create a store over `session`, sending requests through `api`.
    pub fn new(api: ApiClient, session: Arc<SessionState>) -> Self {
        Self { api, session }
    }

    /// Current session token, if signed in.
    pub async fn token(&self) -> Option<SessionToken> {
        let session = self.session.snapshot().await;
        (!session.token.is_empty()).then(|| session.token.clone())
    }

    /// Current user, if signed in.
    pub async fn user(&self) -> Option<UserProfile> {
        self.session.user().await
    }

    /// Check if a login has completed.
    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Ask the server to e-mail a one-time login link.
    ///
    /// # Errors
    /// - Network failure
    /// - Any non-success status other than 400
    pub async fn request_login_link(&self, email: &str) -> Result<Outcome<Value>> {
        let request = self
            .api
            .request(Method::POST, "/one-time-login")?
            .query(&[("email", email)]);
        let response = self.api.send(request).await?;
        validated_body(response).await
    }

    /// Exchange a one-time token for a session ("login").
    ///
    /// On success the token and the user are stored together.
    ///
    /// # Errors
    /// - Network failure
    /// - Non-success status (including 400)
    /// - Body is not a `{ token, user }` object
    pub async fn exchange_token(&self, token: &str) -> Result<Outcome<LoginPayload>> {
        let request = self
            .api
            .request(Method::POST, "/login")?
            .query(&[("token", token)]);
        let response = self.api.send(request).await?;

        let response = check_status(response).await?;
        let text = read_text(response).await?;
        let Some(body) = parse_body(&text) else {
            return Ok(Outcome::Empty);
        };

        let payload: LoginPayload = serde_json::from_value(body)
            .map_err(|e| Error::Serialization(format!("Unexpected login payload: {}", e)))?;
        if payload.token.is_empty() {
            return Err(Error::Authentication(
                "Server issued an empty session token".to_string(),
            ));
        }

        self.session
            .set(Session::new(payload.token.clone(), payload.user.clone()))
            .await?;
        info!("Signed in");

        Ok(Outcome::Ok(payload))
    }

    /// Create an account. Does not sign the caller in.
    ///
    /// # Errors
    /// - Network failure
    /// - Any non-success status other than 400
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        organisation: &str,
    ) -> Result<Outcome<Value>> {
        let request = self.api.request(Method::POST, "/sign-up")?.query(&[
            ("firstName", first_name),
            ("lastName", last_name),
            ("email", email),
            ("organisation", organisation),
        ]);
        let response = self.api.send(request).await?;
        validated_body(response).await
    }

    /// Tell the server to end the session, then forget it locally.
    ///
    /// The local session is cleared whatever the server answers.
    ///
    /// # Errors
    /// - Clearing the persisted session failed
    pub async fn logout(&self) -> Result<()> {
        let notified = match self.api.request(Method::POST, "/logout") {
            Ok(request) => self.api.send_empty(request).await,
            Err(e) => Err(e),
        };
        if let Err(e) = notified {
            warn!("Server logout failed, clearing local session anyway: {}", e);
        }

        self.session.reset().await?;
        info!("Signed out");
        Ok(())
    }
}

/// Decode a body where 400 is a value and an empty body means "nothing".
async fn validated_body(response: Response) -> Result<Outcome<Value>> {
    let status = response.status();

    if status == StatusCode::BAD_REQUEST {
        let text = read_text(response).await?;
        let error = serde_json::from_str(&text).unwrap_or(Value::String(text));
        return Ok(Outcome::Invalid(ValidationError { error }));
    }

    if !status.is_success() {
        let body = read_text(response).await?;
        return Err(status_error(status, body));
    }

    let text = read_text(response).await?;
    match parse_body(&text) {
        Some(body) => Ok(Outcome::Ok(body)),
        None => Ok(Outcome::Empty),
    }
}

/// JSON body, or `None` for an empty or falsy body. Non-JSON text is kept
/// as a JSON string.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    let value = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    (!is_falsy(&value)).then_some(value)
}
