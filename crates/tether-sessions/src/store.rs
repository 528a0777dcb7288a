//! The session store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tether_core::constants::{DEFAULT_SESSION_LABEL, SESSION_LABEL_MAX};
use tether_core::errors::NO_ACTIVE_CONVERSATION;
use tether_core::ids::{ConversationId, SessionId};
use tether_core::model::{ActiveView, ProjectSource, Session};

use crate::api::{ConversationApi, CreateConversationParams};
use crate::persist::{PersistedSession, PersistedState, StateStore};

/// Owner of every session and of the request lifecycle against the
/// conversation API.
///
/// Invariants: the session list is never empty, and the active ID
/// always names a session in the list. Request failures land in the
/// affected session's `error` field; persistence failures are handled
/// inside the state store. No public operation here returns an error.
pub struct SessionStore {
    sessions: Vec<Session>,
    active_id: SessionId,
    api: Arc<dyn ConversationApi>,
    store: Arc<dyn StateStore>,
}

impl SessionStore {
    /// Builds the store from persisted state, or with one fresh
    /// session when none exists.
    ///
    /// Restored sessions start with an empty conversation cache; call
    /// [`SessionStore::restore_conversations`] to re-fetch them.
    #[must_use]
    pub fn new(api: Arc<dyn ConversationApi>, store: Arc<dyn StateStore>) -> Self {
        let persisted = store.load().unwrap_or_default();
        let mut sessions: Vec<Session> = persisted
            .sessions
            .into_iter()
            .map(PersistedSession::into_session)
            .collect();
        if sessions.is_empty() {
            debug!("no persisted sessions, starting fresh");
            sessions.push(Session::new());
        }
        let active_id = persisted
            .active_session_id
            .filter(|id| sessions.iter().any(|s| &s.id == id))
            .unwrap_or_else(|| sessions[0].id.clone());
        info!(session_count = sessions.len(), active_id = %active_id, "session store ready");
        Self {
            sessions,
            active_id,
            api,
            store,
        }
    }

    /// Re-fetches the full conversation for every restored session
    /// that has one bound.
    ///
    /// A fetch failure leaves that session's conversation cache empty
    /// instead of failing the whole restore.
    pub async fn restore_conversations(&mut self) {
        let bound: Vec<(SessionId, ConversationId)> = self
            .sessions
            .iter()
            .filter_map(|s| {
                s.conversation_id
                    .clone()
                    .map(|c| (s.id.clone(), c))
            })
            .collect();
        for (session_id, conversation_id) in bound {
            let result = self.api.fetch_conversation(&conversation_id).await;
            match result {
                Ok(conversation) => {
                    if let Some(session) = self.session_mut(&session_id) {
                        session.messages = conversation.messages.clone();
                        session.conversation = Some(conversation);
                    }
                }
                Err(err) => {
                    warn!(
                        conversation_id = %conversation_id,
                        error = %err,
                        "restore fetch failed, session left without conversation"
                    );
                }
            }
        }
    }

    // ── Session list operations ──

    /// Appends a fresh session and makes it active.
    pub fn create_session(&mut self) -> SessionId {
        let session = Session::new();
        let id = session.id.clone();
        self.sessions.push(session);
        self.active_id = id.clone();
        self.persist();
        id
    }

    /// Removes a session.
    ///
    /// When the active session is closed, the session that slides into
    /// its list index becomes active, else the new last one. Closing
    /// the only session synthesizes a fresh replacement. Unknown IDs
    /// are a no-op.
    pub fn close_session(&mut self, id: &SessionId) {
        let Some(index) = self.sessions.iter().position(|s| &s.id == id) else {
            return;
        };
        let _ = self.sessions.remove(index);
        if self.sessions.is_empty() {
            let replacement = Session::new();
            self.active_id = replacement.id.clone();
            self.sessions.push(replacement);
        } else if &self.active_id == id {
            let next = index.min(self.sessions.len() - 1);
            self.active_id = self.sessions[next].id.clone();
        }
        self.persist();
    }

    /// Changes the active session; a no-op for unknown IDs.
    pub fn switch_session(&mut self, id: &SessionId) {
        if self.sessions.iter().any(|s| &s.id == id) {
            self.active_id = id.clone();
            self.persist();
        }
    }

    /// Changes which pane the active session shows.
    pub fn set_active_view(&mut self, view: ActiveView) {
        self.active_mut().active_view = view;
        self.persist();
    }

    // ── Conversation lifecycle ──

    /// Starts a conversation for the active session.
    ///
    /// The project source resolves from the explicit argument, else
    /// the session's git URL, else its local path. The label becomes
    /// the first prompt's leading characters. Failures land in the
    /// session's `error`; loading always clears when settled.
    pub async fn start_conversation(
        &mut self,
        text: &str,
        project_source: Option<ProjectSource>,
        model: Option<String>,
    ) {
        let session_id = self.active_id.clone();
        let params = {
            let session = self.active_mut();
            session.is_loading = true;
            session.error = None;
            CreateConversationParams {
                text: text.to_owned(),
                project_source: session.resolve_project_source(project_source),
                model: model.unwrap_or_else(|| session.model.clone()),
            }
        };
        let result = self.api.create_conversation(params).await;
        if let Some(session) = self.session_mut(&session_id) {
            match result {
                Ok(conversation) => {
                    session.conversation_id = Some(conversation.id.clone());
                    session.messages = conversation.messages.clone();
                    session.conversation = Some(conversation);
                    session.label = derive_label(text);
                }
                Err(err) => {
                    warn!(session_id = %session_id, error = %err, "start conversation failed");
                    session.error = Some(err.message());
                }
            }
            session.is_loading = false;
        }
        self.persist();
    }

    /// Sends a message on the active session's conversation.
    ///
    /// Without a conversation this records [`NO_ACTIVE_CONVERSATION`]
    /// and never touches the network.
    pub async fn send_message(&mut self, text: &str) {
        let session_id = self.active_id.clone();
        let Some(conversation_id) = self.active_session().conversation_id.clone() else {
            self.active_mut().error = Some(NO_ACTIVE_CONVERSATION.to_owned());
            return;
        };
        self.active_mut().error = None;
        let result = self.api.send_message(&conversation_id, text).await;
        if let Some(session) = self.session_mut(&session_id) {
            match result {
                Ok(conversation) => {
                    session.messages = conversation.messages.clone();
                    session.conversation = Some(conversation);
                }
                Err(err) => {
                    warn!(session_id = %session_id, error = %err, "send message failed");
                    session.error = Some(err.message());
                }
            }
        }
    }

    /// Re-fetches the active session's conversation.
    ///
    /// Silently keeps the stale cache on failure.
    pub async fn refresh_conversation(&mut self) {
        let session_id = self.active_id.clone();
        let Some(conversation_id) = self.active_session().conversation_id.clone() else {
            return;
        };
        let result = self.api.fetch_conversation(&conversation_id).await;
        match result {
            Ok(conversation) => {
                if let Some(session) = self.session_mut(&session_id) {
                    session.messages = conversation.messages.clone();
                    session.conversation = Some(conversation);
                }
            }
            Err(err) => {
                debug!(conversation_id = %conversation_id, error = %err, "refresh failed, keeping cache");
            }
        }
    }

    // ── Accessors ──

    /// Sessions in display order. Never empty.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// ID of the active session.
    #[must_use]
    pub fn active_session_id(&self) -> &SessionId {
        &self.active_id
    }

    /// The active session.
    #[must_use]
    pub fn active_session(&self) -> &Session {
        self.sessions
            .iter()
            .find(|s| s.id == self.active_id)
            .expect("active id always names a present session")
    }

    /// Conversation bound to the active session, if any.
    #[must_use]
    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.active_session().conversation_id.clone()
    }

    fn active_mut(&mut self) -> &mut Session {
        let id = self.active_id.clone();
        self.session_mut(&id)
            .expect("active id always names a present session")
    }

    fn session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    fn persist(&self) {
        let state = PersistedState {
            sessions: self.sessions.iter().map(PersistedSession::of).collect(),
            active_session_id: Some(self.active_id.clone()),
        };
        self.store.save(&state);
    }
}

/// Leading characters of the first prompt, or the default label.
fn derive_label(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DEFAULT_SESSION_LABEL.to_owned();
    }
    trimmed.chars().take(SESSION_LABEL_MAX).collect()
}
