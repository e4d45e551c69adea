//! Common types used throughout filebox.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Server-assigned identifier of a file or folder.
///
/// Ids are opaque to the client but end up as a URL path segment, so they
/// are validated on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId from a string.
    ///
    /// # Preconditions
    /// - `id` must be non-empty
    /// - `id` must not contain path separators
    /// - `id` must not be `.` or `..`
    ///
    /// # Errors
    /// - Returns error if the id is empty, a dot segment, or contains a separator
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "FileId cannot be empty".to_string(),
            ));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(crate::Error::InvalidInput(format!(
                "FileId cannot contain separators: {}",
                id
            )));
        }
        if id == "." || id == ".." {
            return Err(crate::Error::InvalidInput(format!(
                "FileId cannot be a dot segment: {}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session credential issued by the server at login.
///
/// The value is zeroized on drop and never printed by `Debug`. An empty
/// token means "no session".
#[derive(Clone, Default, PartialEq, Eq, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The empty token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw header value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SessionToken(<empty>)")
        } else {
            write!(f, "SessionToken([REDACTED])")
        }
    }
}
