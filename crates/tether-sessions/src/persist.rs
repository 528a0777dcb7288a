//! Durable session metadata.
//!
//! One JSON record holds every session's restorable fields plus the
//! active session ID. Conversation content is never persisted; it is
//! re-fetched on restore. Read, parse, and write failures are all
//! swallowed at this boundary: persistence degrades to in-memory-only
//! state rather than surfacing an error.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tether_core::errors::StorageError;
use tether_core::ids::{ConversationId, SessionId};
use tether_core::model::{ActiveView, Session};

/// Restorable fields of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    /// Session ID.
    pub id: SessionId,
    /// Bound conversation, if one was started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Display label.
    pub label: String,
    /// Last shown pane.
    #[serde(default)]
    pub active_view: ActiveView,
    /// Model identifier.
    pub model: String,
    /// Git URL input, if entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Local path input, if entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PersistedSession {
    /// Snapshot of a live session's restorable fields.
    #[must_use]
    pub fn of(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            conversation_id: session.conversation_id.clone(),
            label: session.label.clone(),
            active_view: session.active_view,
            model: session.model.clone(),
            github_url: session.github_url.clone(),
            folder_path: session.folder_path.clone(),
            created_at: session.created_at,
        }
    }

    /// Rebuilds a live session; the conversation cache starts empty
    /// and is re-fetched separately.
    #[must_use]
    pub fn into_session(self) -> Session {
        Session {
            id: self.id,
            conversation_id: self.conversation_id,
            conversation: None,
            messages: Vec::new(),
            model: self.model,
            github_url: self.github_url,
            folder_path: self.folder_path,
            active_view: self.active_view,
            label: self.label,
            is_loading: false,
            error: None,
            created_at: self.created_at,
        }
    }
}

/// The whole durable record, last-write-wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Sessions in display order.
    pub sessions: Vec<PersistedSession>,
    /// Active session, if it survives restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<SessionId>,
}

/// Where session metadata is kept between runs.
///
/// Both operations are infallible by contract; implementations log
/// and swallow their own failures.
pub trait StateStore: Send + Sync {
    /// Reads the persisted record, `None` when absent or unreadable.
    fn load(&self) -> Option<PersistedState>;

    /// Writes the record, replacing whatever was there.
    fn save(&self, state: &PersistedState);
}

/// [`StateStore`] over one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`; parent directories are created on save.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn try_load(&self) -> Result<PersistedState, StorageError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn try_save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Option<PersistedState> {
        match self.try_load() {
            Ok(state) => Some(state),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "no usable persisted state");
                None
            }
        }
    }

    fn save(&self, state: &PersistedState) {
        if let Err(err) = self.try_save(state) {
            warn!(path = %self.path.display(), error = %err, "failed to persist session state");
        }
    }
}

/// In-memory [`StateStore`], for tests and stateless embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved record, if any.
    #[must_use]
    pub fn current(&self) -> Option<PersistedState> {
        self.state.lock().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.lock().clone()
    }

    fn save(&self, state: &PersistedState) {
        *self.state.lock() = Some(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        let session = Session::new();
        PersistedState {
            active_session_id: Some(session.id.clone()),
            sessions: vec![PersistedSession::of(&session)],
        }
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("sessions.json"));
        let state = sample_state();
        store.save(&state);
        assert_eq!(store.load(), Some(state));
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{broken").unwrap();
        let store = JsonFileStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn unwritable_path_is_swallowed() {
        let store = JsonFileStore::new(PathBuf::from("/proc/tether-denied/sessions.json"));
        store.save(&sample_state());
    }

    #[test]
    fn persisted_session_drops_conversation_cache() {
        let mut session = Session::new();
        session.conversation_id = Some("c-1".into());
        session.error = Some("stale".into());
        session.is_loading = true;
        let restored = PersistedSession::of(&session).into_session();
        assert_eq!(restored.conversation_id, Some("c-1".into()));
        assert!(restored.conversation.is_none());
        assert!(restored.messages.is_empty());
        assert!(restored.error.is_none());
        assert!(!restored.is_loading);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_state()).unwrap();
        assert!(json["activeSessionId"].is_string());
        assert!(json["sessions"][0]["createdAt"].is_string());
        assert_eq!(json["sessions"][0]["activeView"], "chat");
    }
}
