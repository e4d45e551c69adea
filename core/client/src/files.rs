//! File listing store.
//!
//! Mirrors the server's listing for the current [`ListingContext`] and
//! re-synchronizes after every mutation. Context setters return once the
//! fetch they triggered has settled, so callers can await a consistent
//! list instead of polling.

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use filebox_common::{Error, FileId, Result};

use crate::http::{check_status, ApiClient};
use crate::models::{
    FileEntry, FileListResponse, ListingContext, PreviewResponse, UploadFile,
    DEFAULT_FOLDER_NAME,
};
use crate::selection::Selection;

#[derive(Debug, Default)]
struct ListingState {
    context: ListingContext,
    files: Vec<FileEntry>,
    selection: Selection,
}

/// File listing store.
///
/// State locks are never held across a request; two overlapping fetches
/// both complete and the one that settles last decides the list.
pub struct FileStore {
    api: ApiClient,
    state: RwLock<ListingState>,
}

impl FileStore {
    /// Create a store with the default context and an empty list.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(ListingState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ListingState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Files from the last fetch.
    pub fn files(&self) -> Vec<FileEntry> {
        self.read().files.clone()
    }

    /// Current listing context.
    pub fn context(&self) -> ListingContext {
        self.read().context.clone()
    }

    /// Fetch the listing for the current context, replacing the local list.
    ///
    /// # Errors
    /// - Network failure or non-success status
    /// - Malformed listing
    pub async fn fetch_listing(&self) -> Result<()> {
        let context = self.context();
        let request = self
            .api
            .request(Method::GET, "/files/")?
            .query(&context.query());

        let listing: FileListResponse = self.api.send_json(request).await?;
        let files = listing.data.unwrap_or_default();
        debug!("Fetched {} entries for {:?}", files.len(), context);

        self.write().files = files;
        Ok(())
    }

    /// Apply `change` to the context and re-fetch if it changed anything.
    ///
    /// Returns whether a fetch was triggered.
    pub async fn update_context<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut ListingContext),
    {
        let changed = {
            let mut state = self.write();
            let before = state.context.clone();
            change(&mut state.context);
            state.context != before
        };

        if changed {
            self.fetch_listing().await?;
        }
        Ok(changed)
    }

    /// Browse `parent_id` (`None` for the top level).
    pub async fn set_parent(&self, parent_id: Option<String>) -> Result<bool> {
        self.update_context(|ctx| ctx.parent_id = parent_id).await
    }

    /// Browse a shared drive (`None` to leave it).
    pub async fn set_shared_drive(&self, shared_drive: Option<String>) -> Result<bool> {
        self.update_context(|ctx| ctx.shared_drive = shared_drive)
            .await
    }

    /// Switch the trash view on or off.
    pub async fn set_show_deleted(&self, show_deleted: bool) -> Result<bool> {
        self.update_context(|ctx| ctx.show_deleted = show_deleted)
            .await
    }

    /// Browse into `folder`.
    ///
    /// # Errors
    /// - `folder` is not a folder
    pub async fn enter_folder(&self, folder: &FileEntry) -> Result<bool> {
        if !folder.is_folder {
            return Err(Error::InvalidInput(format!(
                "{} is not a folder",
                folder.name
            )));
        }
        self.set_parent(Some(folder.id.to_string())).await
    }

    /// Restore the default context: top level, no shared drive, no trash.
    pub async fn reset_context(&self) -> Result<bool> {
        self.update_context(|ctx| *ctx = ListingContext::default())
            .await
    }

    /// Create an "Untitled Folder" under `parent_id`, or the current parent.
    pub async fn create_folder(&self, parent_id: Option<&str>) -> Result<()> {
        let parent = parent_id
            .map(str::to_string)
            .or_else(|| self.context().parent_id);

        let mut form = Form::new()
            .text("name", DEFAULT_FOLDER_NAME)
            .text("is_folder", "true");
        if let Some(parent) = parent {
            form = form.text("parent_id", parent);
        }

        let request = self.api.request(Method::POST, "/files/")?.multipart(form);
        self.api.send_empty(request).await?;
        info!("Created folder");

        self.fetch_listing().await
    }

    /// Delete a file.
    ///
    /// The entry disappears from the local list before the request is sent.
    /// The list is re-fetched afterwards even when the delete failed, so a
    /// rejected delete reappears; the delete's error is then returned.
    pub async fn delete_file(&self, id: &FileId) -> Result<()> {
        self.write().files.retain(|file| &file.id != id);

        let deleted = match self.api.request(Method::DELETE, &format!("/files/{}", id)) {
            Ok(request) => self.api.send_empty(request).await,
            Err(e) => Err(e),
        };
        let refreshed = self.fetch_listing().await;

        match (deleted, refreshed) {
            (Err(e), refreshed) => {
                if let Err(refresh_err) = refreshed {
                    warn!("Re-fetch after failed delete also failed: {}", refresh_err);
                }
                Err(e)
            }
            (Ok(()), refreshed) => {
                info!("Deleted {}", id);
                refreshed
            }
        }
    }

    /// Send `file`'s name to the server as its new name.
    pub async fn rename_file(&self, file: &FileEntry) -> Result<()> {
        let body = serde_json::json!({
            "id": file.id,
            "name": file.name,
        });
        let request = self
            .api
            .request(Method::PATCH, &format!("/files/{}", file.id))?
            .json(&body);
        self.api.send_empty(request).await?;

        self.fetch_listing().await
    }

    /// Upload files one at a time into the current parent.
    ///
    /// Each upload is followed by a re-fetch before the next one starts.
    /// The first failure stops the batch: earlier files stay uploaded and
    /// later files are not attempted.
    pub async fn upload_files(&self, files: &[UploadFile]) -> Result<()> {
        for (index, file) in files.iter().enumerate() {
            let part = Part::bytes(file.data.clone())
                .file_name(file.name.clone())
                .mime_str(file.content_type())
                .map_err(|e| Error::InvalidInput(format!("Invalid MIME type: {}", e)))?;

            let mut form = Form::new().part("file", part);
            if let Some(parent) = self.context().parent_id {
                form = form.text("parent_id", parent);
            }

            let request = self.api.request(Method::POST, "/files/")?.multipart(form);
            self.api.send_empty(request).await?;
            info!(
                "Uploaded {} ({}/{}, {} bytes)",
                file.name,
                index + 1,
                files.len(),
                file.data.len()
            );

            self.fetch_listing().await?;
        }
        Ok(())
    }

    /// Download `file` into `dir`, saved under the file's name.
    ///
    /// # Errors
    /// - File name is not a plain file name
    /// - Network failure or non-success status
    /// - Writing the local file failed (the partial file is removed)
    pub async fn download_file(&self, file: &FileEntry, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let name = safe_file_name(&file.name)?;
        let dest = dir.as_ref().join(name);

        let request = self
            .api
            .request(Method::GET, &format!("/files/{}/download", file.id))?;
        let response = check_status(self.api.send(request).await?).await?;

        let mut out = tokio::fs::File::create(&dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        let copied: Result<()> = async {
            while let Some(chunk) = stream.next().await {
                let chunk =
                    chunk.map_err(|e| Error::Network(format!("Stream read error: {}", e)))?;
                out.write_all(&chunk).await?;
                written += chunk.len();
            }
            out.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = copied {
            drop(out);
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e);
        }

        info!("Downloaded {} ({} bytes)", dest.display(), written);
        Ok(dest)
    }

    /// Short-lived URL to preview or render `id`.
    pub async fn preview_url(&self, id: &FileId) -> Result<String> {
        let request = self
            .api
            .request(Method::GET, &format!("/files/{}/preview", id))?;
        let preview: PreviewResponse = self.api.send_json(request).await?;
        Ok(preview.url)
    }

    /// Check if `id` is selected.
    pub fn is_selected(&self, id: &FileId) -> bool {
        self.read().selection.contains(id)
    }

    /// Select `id`, or deselect it if it is already selected.
    pub fn toggle_selection(&self, id: &FileId) {
        self.write().selection.toggle(id);
    }

    /// Deselect everything.
    pub fn clear_selection(&self) {
        self.write().selection.clear();
    }

    /// Copy of the selection.
    pub fn selection(&self) -> Selection {
        self.read().selection.clone()
    }

    /// The selected entry, if it is in the current list.
    pub fn selected_file(&self) -> Option<FileEntry> {
        let state = self.read();
        let current = state.selection.current()?;
        state.files.iter().find(|f| &f.id == current).cloned()
    }

    /// Move the selection to the next file. Returns whether it moved.
    pub fn select_next_file(&self) -> bool {
        let mut state = self.write();
        let ListingState {
            files, selection, ..
        } = &mut *state;
        selection.select_next(files)
    }

    /// Move the selection to the previous file. Returns whether it moved.
    pub fn select_previous_file(&self) -> bool {
        let mut state = self.write();
        let ListingState {
            files, selection, ..
        } = &mut *state;
        selection.select_previous(files)
    }
}

/// `name` if it is a single, ordinary path component.
fn safe_file_name(name: &str) -> Result<&str> {
    let path = Path::new(name);
    let single = path.file_name().and_then(|n| n.to_str()) == Some(name);
    if name.is_empty() || !single || name.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "Refusing to save file with unsafe name: {:?}",
            name
        )));
    }
    Ok(name)
}
