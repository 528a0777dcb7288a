//! Client-side data model.
//!
//! Two ownership regimes coexist here:
//!
//! - [`Session`] is owned exclusively by the session store. Its
//!   `conversation`/`messages` fields are cache copies of server truth and
//!   are never authoritative.
//! - [`DynamicAgent`] and [`FileActivityEvent`] live for the lifetime of one
//!   conversation's event log and are rebuilt from scratch when the live
//!   channel switches conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MODEL, DEFAULT_SESSION_LABEL};
use crate::ids::{AgentId, ConversationId, QuestionId, SessionId};

// ─────────────────────────────────────────────────────────────────────────────
// Conversation cache
// ─────────────────────────────────────────────────────────────────────────────

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human operator.
    User,
    /// The orchestrating assistant.
    Assistant,
    /// Synthetic system notices.
    System,
}

/// One message within a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned message ID.
    pub id: String,
    /// Message author role.
    pub role: MessageRole,
    /// Message body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A server-owned conversation, cached client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Ordered message history.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Execution currently attached to this conversation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_execution_id: Option<String>,
    /// Model the conversation runs against.
    pub model: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Where a session's project content comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ProjectSource {
    /// A remote git repository URL.
    GitUrl(String),
    /// A local directory path.
    LocalPath(String),
}

/// Which pane a session is showing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    /// Conversation transcript.
    #[default]
    Chat,
    /// Dynamic agent roster.
    Agents,
    /// File activity tree.
    Files,
}

/// One independent, user-switchable conversation context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Client-minted session ID.
    pub id: SessionId,
    /// Conversation bound to this session, once one has been started.
    pub conversation_id: Option<ConversationId>,
    /// Cached conversation snapshot (never authoritative).
    pub conversation: Option<Conversation>,
    /// Cached message list (mirrors `conversation.messages`).
    pub messages: Vec<Message>,
    /// Model identifier used when starting a conversation.
    pub model: String,
    /// Git URL project source input, if entered.
    pub github_url: Option<String>,
    /// Local path project source input, if entered.
    pub folder_path: Option<String>,
    /// Which pane the session is showing.
    pub active_view: ActiveView,
    /// Display label (first prompt excerpt or the default).
    pub label: String,
    /// Whether a request is currently in flight for this session.
    pub is_loading: bool,
    /// Last request error, cleared on the next attempt.
    pub error: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            conversation_id: None,
            conversation: None,
            messages: Vec::new(),
            model: DEFAULT_MODEL.to_owned(),
            github_url: None,
            folder_path: None,
            active_view: ActiveView::default(),
            label: DEFAULT_SESSION_LABEL.to_owned(),
            is_loading: false,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Resolve the project source for this session.
    ///
    /// Order: explicit argument, then the stored git URL, then the stored
    /// local path, else none.
    #[must_use]
    pub fn resolve_project_source(&self, explicit: Option<ProjectSource>) -> Option<ProjectSource> {
        explicit
            .or_else(|| self.github_url.clone().map(ProjectSource::GitUrl))
            .or_else(|| self.folder_path.clone().map(ProjectSource::LocalPath))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic agents
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a dynamically spawned agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Spawned but not yet producing output.
    Pending,
    /// Actively producing output.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// A sub-agent known only through streamed events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicAgent {
    /// Agent ID from the spawn event.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Task description from the spawn event.
    pub task: String,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// Output lines, append-only in arrival order.
    pub output: Vec<String>,
    /// Files this agent modified.
    pub files_modified: Vec<String>,
    /// Files this agent read.
    pub files_read: Vec<String>,
    /// When the spawn event arrived.
    pub spawned_at: DateTime<Utc>,
    /// When the complete event arrived, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Presentational icon, assigned from a rotation at spawn.
    pub icon: String,
    /// Presentational color, assigned from a rotation at spawn.
    pub color: String,
}

/// Icon rotation for spawned agents, keyed by spawn order.
pub const AGENT_ICONS: &[&str] = &["robot", "wrench", "magnifier", "flask", "gear", "scroll"];
/// Color rotation for spawned agents, keyed by spawn order.
pub const AGENT_COLORS: &[&str] = &[
    "#60a5fa", "#34d399", "#fbbf24", "#f472b6", "#a78bfa", "#f87171",
];

impl DynamicAgent {
    /// Create a pending agent from its spawn event.
    ///
    /// `ordinal` is the spawn order within the current roster and picks the
    /// icon/color from the rotations.
    #[must_use]
    pub fn spawned(
        id: AgentId,
        name: String,
        task: String,
        ordinal: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            task,
            status: AgentStatus::Pending,
            output: Vec::new(),
            files_modified: Vec::new(),
            files_read: Vec::new(),
            spawned_at: now,
            completed_at: None,
            icon: AGENT_ICONS[ordinal % AGENT_ICONS.len()].to_owned(),
            color: AGENT_COLORS[ordinal % AGENT_COLORS.len()].to_owned(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File activity
// ─────────────────────────────────────────────────────────────────────────────

/// What an agent did to a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Read without modification.
    Read,
    /// Overwrote contents.
    Write,
    /// Edited in place.
    Edit,
    /// Created a new file.
    Create,
    /// Deleted the file.
    Delete,
}

impl FileAction {
    /// Whether this action counts toward file activity.
    ///
    /// Reads never mark a file active.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// One file touch, immutable once appended to the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileActivityEvent {
    /// Path of the touched file.
    pub file: String,
    /// What happened to it.
    pub action: FileAction,
    /// Which agent touched it.
    pub agent_id: AgentId,
    /// Display name of that agent.
    pub agent_name: String,
    /// When the event arrived.
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Clarifications
// ─────────────────────────────────────────────────────────────────────────────

/// A question the pipeline is waiting on; at most one per subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingClarification {
    /// Question ID echoed back in the answer frame.
    pub question_id: QuestionId,
    /// Question text.
    pub question: String,
    /// Offered choices, if the question is multiple-choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Whether the pipeline blocks until answered.
    #[serde(default)]
    pub required: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
