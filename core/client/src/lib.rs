//! Client for the filebox storage API.
//!
//! Three pieces, leaf first:
//! - [`ApiClient`]: the shared request function. Attaches the session token
//!   to every request and signs out on HTTP 401.
//! - [`AuthStore`]: login links, token exchange, registration, logout, on
//!   top of a persisted [`SessionState`].
//! - [`FileStore`]: the file browser's listing, selection and CRUD.
//!
//! [`Filebox`] wires them together from a [`ClientConfig`].

pub mod auth;
pub mod config;
pub mod files;
pub mod http;
pub mod models;
pub mod selection;
pub mod session;

use std::sync::Arc;

pub use filebox_common::{Error, FileId, Result, SessionToken};

pub use auth::AuthStore;
pub use config::ClientConfig;
pub use files::FileStore;
pub use http::{ApiClient, LogNavigator, Navigator, LOGIN_ROUTE};
pub use models::{
    FileEntry, ListingContext, LoginPayload, Outcome, UploadFile, UserProfile, ValidationError,
};
pub use selection::Selection;
pub use session::{
    JsonFileSession, MemorySession, Session, SessionPersistence, SessionProvider, SessionState,
};

/// Both stores sharing one session and one request function.
pub struct Filebox {
    /// Authentication and session.
    pub auth: AuthStore,
    /// File browser.
    pub files: FileStore,
    /// Shared request function.
    pub api: ApiClient,
    /// Live session.
    pub session: Arc<SessionState>,
}

impl Filebox {
    /// Restore the session from the configured session file and build the
    /// stores.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Stored session cannot be read
    pub async fn open(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let persistence = Arc::new(JsonFileSession::new(config.session_file.clone()));
        Self::with_persistence(config, persistence, navigator).await
    }

    /// Build the stores over an explicit persistence backend.
    pub async fn with_persistence(
        config: &ClientConfig,
        persistence: Arc<dyn SessionPersistence>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = Arc::new(SessionState::restore(persistence).await?);
        let api = ApiClient::new(config, session.clone(), navigator)?;

        Ok(Self {
            auth: AuthStore::new(api.clone(), session.clone()),
            files: FileStore::new(api.clone()),
            api,
            session,
        })
    }
}
