//! Wire and state types shared by the stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use filebox_common::{Error, FileId, Result, SessionToken};

/// Name given to folders created from the browser.
pub const DEFAULT_FOLDER_NAME: &str = "Untitled Folder";

/// Profile of the signed-in user, as returned by the server.
///
/// The client stores and displays it but does not depend on its shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Value);

impl UserProfile {
    /// Raw JSON record.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// String field, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Human-readable name: "first last", else email, else id.
    pub fn display_name(&self) -> Option<String> {
        let full = [self.field("first_name"), self.field("last_name")]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
        if let Some(email) = self.field("email") {
            return Some(email.to_string());
        }
        match self.0.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    /// Session token to send on authorized requests.
    pub token: SessionToken,
    /// Signed-in user.
    #[serde(default)]
    pub user: UserProfile,
}

/// Body of a 400 answer, handed back as a value rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Server error payload, verbatim.
    pub error: Value,
}

/// Result of an auth request whose failure modes are part of the contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The server accepted the request.
    Ok(T),
    /// The server answered 2xx with an empty or falsy body.
    Empty,
    /// The server rejected the input with HTTP 400.
    Invalid(ValidationError),
}

impl<T> Outcome<T> {
    /// Check if the server accepted the request.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Accepted value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }
}

/// A file or folder as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File ID.
    pub id: FileId,
    /// Display name.
    pub name: String,
    /// Whether this entry is a folder.
    #[serde(default)]
    pub is_folder: bool,
    /// Containing folder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// MIME type (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Any other server-defined fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileEntry {
    /// Minimal entry, mostly useful for renames and tests.
    pub fn new(id: FileId, name: impl Into<String>, is_folder: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_folder,
            parent_id: None,
            mime_type: None,
            file_size: None,
            extra: Map::new(),
        }
    }

    /// Copy of this entry carrying a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Scope that decides which files are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingContext {
    /// Folder being browsed; `None` is the top level.
    pub parent_id: Option<String>,
    /// Shared drive being browsed.
    pub shared_drive: Option<String>,
    /// Trash view.
    pub show_deleted: bool,
}

impl ListingContext {
    /// Query parameters for `GET /files/`. Unset scopes are omitted.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if let Some(parent) = &self.parent_id {
            query.push(("parent_id", parent.clone()));
        }
        if let Some(drive) = &self.shared_drive {
            query.push(("shared_drive", drive.clone()));
        }
        query.push(("deleted", self.show_deleted.to_string()));
        query
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
pub(crate) struct FileListResponse {
    #[serde(default)]
    pub data: Option<Vec<FileEntry>>,
}

/// Response from the preview endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PreviewResponse {
    pub url: String,
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name the file gets on the server.
    pub name: String,
    /// Content type; `application/octet-stream` when unset.
    pub mime_type: Option<String>,
    /// File content.
    pub data: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from in-memory content.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data,
        }
    }

    /// Set the content type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk, named after its last path component.
    ///
    /// # Errors
    /// - Path has no file name
    /// - File cannot be read
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Path has no file name: {}", path.display()))
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }

    /// Content type sent with the multipart part.
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// Whether a JSON body counts as "nothing" (`null`, `false`, `""`, `0`).
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
