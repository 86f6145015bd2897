//! Session persistence
//!
//! Durable key-value storage keyed by session identifier. The engine loads
//! at turn start and saves at turn end; a failed save is a hard error since
//! losing conversational continuity is not silently degradable.

use crate::errors::{AdvisorError, Result};
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Session persistence boundary
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, `None` when the identifier is unknown
    async fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// Persist a session
    async fn save(&self, session: &Session) -> Result<()>;
}

/// File-backed session store, one JSON file per session
pub struct FileSessionStore {
    storage_dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `storage_dir`, creating it if needed
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        if !storage_dir.exists() {
            fs::create_dir_all(&storage_dir)
                .map_err(|e| AdvisorError::SessionStore(format!(
                    "Failed to create session storage directory: {}",
                    e
                )))?;
        }

        Ok(Self { storage_dir })
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.storage_dir.join(format!("session_{}.json", session_id))
    }

    /// List all stored session identifiers
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        if !self.storage_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();

        for entry in fs::read_dir(&self.storage_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                    if filename.starts_with("session_") && filename.ends_with(".json") {
                        let id = filename
                            .trim_start_matches("session_")
                            .trim_end_matches(".json");
                        sessions.push(id.to_string());
                    }
                }
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    /// Get storage directory
    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.session_path(session_id);

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| AdvisorError::SessionStore(format!(
                "Failed to read session file: {}",
                e
            )))?;

        let session: Session = serde_json::from_str(&json)
            .map_err(|e| AdvisorError::SessionStore(format!(
                "Failed to deserialize session {}: {}",
                session_id, e
            )))?;

        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.id);

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| AdvisorError::SessionStore(format!(
                "Failed to serialize session {}: {}",
                session.id, e
            )))?;

        fs::write(&path, json)
            .map_err(|e| AdvisorError::SessionStore(format!(
                "Failed to write session file: {}",
                e
            )))?;

        Ok(())
    }
}

/// In-memory session store for tests and ephemeral runs
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// True when no sessions are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| AdvisorError::SessionStore("store lock poisoned".to_string()))?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| AdvisorError::SessionStore("store lock poisoned".to_string()))?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}
