//! Session state and its persistence.
//!
//! The session is the only piece of client state that survives a restart.
//! Every mutation goes through [`SessionState`], which writes the new value
//! to its [`SessionPersistence`] backend before returning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use filebox_common::{Error, Result, SessionToken};

use crate::models::UserProfile;

/// Authenticated session, or the empty session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session token; empty when signed out.
    #[serde(default)]
    pub token: SessionToken,
    /// Signed-in user; `None` when signed out.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    /// Session after a successful login.
    pub fn new(token: SessionToken, user: UserProfile) -> Self {
        Self {
            token,
            user: Some(user),
        }
    }

    /// Check if a login has completed.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Durable storage for the session.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Load the stored session; the empty session when nothing is stored.
    async fn load(&self) -> Result<Session>;

    /// Replace the stored session.
    async fn save(&self, session: &Session) -> Result<()>;
}

/// Session stored as a JSON file.
pub struct JsonFileSession {
    path: PathBuf,
}

impl JsonFileSession {
    /// Store the session at `path`. Parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionPersistence for JsonFileSession {
    async fn load(&self) -> Result<Session> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(session) => Ok(session),
                Err(e) => {
                    // Overwritten by the next save.
                    warn!(
                        "Ignoring corrupt session file {}: {}",
                        self.path.display(),
                        e
                    );
                    Ok(Session::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(session)?;

        // Write to a sibling file and rename so a crash never leaves half a session.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Persistence(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Session written to {}", self.path.display());
        Ok(())
    }
}

/// In-memory session storage for testing.
#[derive(Default)]
pub struct MemorySession {
    stored: Mutex<Session>,
}

impl MemorySession {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage that already holds `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            stored: Mutex::new(session),
        }
    }

    /// Last saved session.
    pub fn snapshot(&self) -> Session {
        self.stored
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionPersistence for MemorySession {
    async fn load(&self) -> Result<Session> {
        Ok(self.snapshot())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| Error::Persistence("Session storage poisoned".to_string()))?;
        *stored = session.clone();
        Ok(())
    }
}

/// Source of the credential attached to outgoing requests.
///
/// The request interceptor only ever reads the token and, on a 401,
/// clears the session; it never needs the rest of the auth store.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current token, `None` when signed out.
    async fn token(&self) -> Option<SessionToken>;

    /// Drop the session (token and user).
    async fn clear(&self) -> Result<()>;
}

/// Live session backed by a persistence layer.
pub struct SessionState {
    session: RwLock<Session>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionState {
    /// Restore the session from `persistence`.
    ///
    /// # Errors
    /// - Stored session cannot be read
    pub async fn restore(persistence: Arc<dyn SessionPersistence>) -> Result<Self> {
        let session = persistence.load().await?;
        if session.is_authenticated() {
            info!("Restored stored session");
        }
        Ok(Self {
            session: RwLock::new(session),
            persistence,
        })
    }

    /// Start from an empty session without reading storage.
    pub fn empty(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            persistence,
        }
    }

    /// Copy of the current session.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Check if a login has completed.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Current user, if signed in.
    pub async fn user(&self) -> Option<UserProfile> {
        self.session.read().await.user.clone()
    }

    /// Replace token and user in one write, then persist.
    pub async fn set(&self, session: Session) -> Result<()> {
        let mut current = self.session.write().await;
        self.persistence.save(&session).await?;
        *current = session;
        Ok(())
    }

    /// Reset to the empty session, then persist.
    pub async fn reset(&self) -> Result<()> {
        let mut current = self.session.write().await;
        *current = Session::default();
        self.persistence.save(&current).await
    }
}

#[async_trait]
impl SessionProvider for SessionState {
    async fn token(&self) -> Option<SessionToken> {
        let session = self.session.read().await;
        if session.token.is_empty() {
            None
        } else {
            Some(session.token.clone())
        }
    }

    async fn clear(&self) -> Result<()> {
        self.reset().await
    }
}
