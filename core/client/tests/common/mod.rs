//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

use filebox_client::{
    ClientConfig, FileEntry, FileId, Filebox, MemorySession, Navigator, Session, SessionToken,
    UserProfile,
};

/// Navigator that remembers every route it was sent to.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

pub struct Harness {
    pub server: MockServer,
    pub app: Filebox,
    pub storage: Arc<MemorySession>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn signed_in_session() -> Session {
    Session::new(SessionToken::new("S1"), UserProfile(json!({"id": 1})))
}

pub async fn harness_with(session: Session) -> Harness {
    let server = MockServer::start().await;
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_timeout_secs(5);
    let storage = Arc::new(MemorySession::with_session(session));
    let navigator = Arc::new(RecordingNavigator::default());

    let app = Filebox::with_persistence(&config, storage.clone(), navigator.clone())
        .await
        .unwrap();

    Harness {
        server,
        app,
        storage,
        navigator,
    }
}

pub async fn signed_in() -> Harness {
    harness_with(signed_in_session()).await
}

pub async fn signed_out() -> Harness {
    harness_with(Session::default()).await
}

pub fn file_json(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "is_folder": false})
}

pub fn folder_json(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "is_folder": true})
}

pub fn listing(entries: Vec<Value>) -> Value {
    json!({"data": entries})
}

pub fn id(s: &str) -> FileId {
    FileId::new(s).unwrap()
}

pub fn ids(files: &[FileEntry]) -> Vec<String> {
    files.iter().map(|f| f.id.to_string()).collect()
}
