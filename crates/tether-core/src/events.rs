//! Wire event taxonomy for the live channel.
//!
//! Two frame families:
//!
//! - **[`ChannelEvent`]**: Inbound frames, one JSON object per text frame,
//!   discriminated by `type`. Unrecognized types deserialize to
//!   [`ChannelEvent::Unknown`] and are ignored downstream, never rejected.
//! - **[`OutboundFrame`]**: Outbound frames, currently only the answer to a
//!   pending clarification.
//!
//! Events are transient: they live in the channel's in-memory log for the
//! duration of one subscription and are never persisted client-side.

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, QuestionId};
use crate::model::PendingClarification;

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Spawn payload in its nested form (`agent-spawn{agent:{id,name,task}}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnedAgent {
    /// Agent ID.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Task description.
    pub task: String,
}

/// One pipeline stage in an execution snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    /// Stage phase name.
    pub phase: String,
    /// Stage status (`pending`/`running`/`completed`/...).
    pub status: String,
}

/// Full execution state pushed for resynchronization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    /// Execution ID.
    pub id: String,
    /// Overall execution status.
    pub status: String,
    /// Pipeline stages in order.
    #[serde(default)]
    pub pipeline: Vec<PipelineStage>,
}

impl ExecutionInfo {
    /// Phase of the first pipeline stage currently running, if any.
    #[must_use]
    pub fn running_phase(&self) -> Option<&str> {
        self.pipeline
            .iter()
            .find(|stage| stage.status == "running")
            .map(|stage| stage.phase.as_str())
    }
}

/// Inbound frames delivered over one live-channel subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelEvent {
    /// A pipeline output line, with the phase that produced it.
    #[serde(rename = "output")]
    Output {
        /// Output line text.
        line: String,
        /// Pipeline phase that produced the line.
        phase: String,
    },

    /// Pipeline phase/status update.
    #[serde(rename = "phase")]
    Phase {
        /// Current pipeline phase.
        phase: String,
        /// Current execution status.
        status: String,
    },

    /// Terminal status for the execution.
    #[serde(rename = "complete")]
    Complete {
        /// Terminal status (`completed`/`failed`).
        status: String,
    },

    /// The pipeline is waiting on an answer.
    #[serde(rename = "clarification")]
    Clarification(PendingClarification),

    /// The pending question was withdrawn server-side.
    #[serde(rename = "clarification-dismissed")]
    ClarificationDismissed {
        /// ID of the withdrawn question.
        #[serde(rename = "questionId")]
        question_id: QuestionId,
    },

    /// Full execution state for resynchronization after reconnect.
    #[serde(rename = "execution-snapshot")]
    ExecutionSnapshot {
        /// Snapshot payload.
        execution: ExecutionInfo,
    },

    /// A sub-agent was spawned.
    ///
    /// Arrives either nested (`agent: {id, name, task}`) or flattened
    /// (`agentId, name, task`); both shapes deserialize. Use
    /// [`ChannelEvent::spawn_fields`] to normalize.
    #[serde(rename = "agent-spawn", rename_all = "camelCase")]
    AgentSpawn {
        /// Nested spawn payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<SpawnedAgent>,
        /// Flattened agent ID.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_id: Option<AgentId>,
        /// Flattened display name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Flattened task description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<String>,
    },

    /// A sub-agent produced an output line.
    #[serde(rename = "agent-output", rename_all = "camelCase")]
    AgentOutput {
        /// Agent ID.
        agent_id: AgentId,
        /// Output line text.
        line: String,
    },

    /// A sub-agent finished.
    #[serde(rename = "agent-complete", rename_all = "camelCase")]
    AgentComplete {
        /// Agent ID.
        agent_id: AgentId,
        /// Display name.
        name: String,
        /// Terminal status (`completed`/`failed`).
        status: String,
    },

    /// An agent touched a file.
    #[serde(rename = "file-activity", rename_all = "camelCase")]
    FileActivity {
        /// Path of the touched file.
        file: String,
        /// Action taken (`read`/`write`/`edit`/`create`/`delete`).
        action: crate::model::FileAction,
        /// Which agent touched it.
        agent_id: AgentId,
        /// Display name of that agent.
        agent_name: String,
    },

    /// Any frame type this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl ChannelEvent {
    /// Normalize an `agent-spawn` frame to `(id, name, task)`.
    ///
    /// Returns `None` for other variants or a spawn frame missing its ID.
    #[must_use]
    pub fn spawn_fields(&self) -> Option<(AgentId, String, String)> {
        let Self::AgentSpawn {
            agent,
            agent_id,
            name,
            task,
        } = self
        else {
            return None;
        };
        if let Some(a) = agent {
            return Some((a.id.clone(), a.name.clone(), a.task.clone()));
        }
        let id = agent_id.clone()?;
        Some((
            id,
            name.clone().unwrap_or_default(),
            task.clone().unwrap_or_default(),
        ))
    }

    /// Human-readable output line synthesized for agent/file events.
    ///
    /// `agent-output` contributes its raw line; spawn/complete/file-activity
    /// render a bracketed summary. Other variants contribute nothing.
    #[must_use]
    pub fn synthetic_line(&self) -> Option<String> {
        match self {
            Self::AgentSpawn { .. } => {
                let (_, name, task) = self.spawn_fields()?;
                Some(format!("[Agent: {name}] Starting: {task}"))
            }
            Self::AgentOutput { line, .. } => Some(line.clone()),
            Self::AgentComplete { name, status, .. } => {
                if status == "failed" {
                    Some(format!("[Agent: {name}] Failed"))
                } else {
                    Some(format!("[Agent: {name}] Completed"))
                }
            }
            Self::FileActivity {
                file,
                action,
                agent_name,
                ..
            } => {
                let verb = serde_json::to_value(action)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))?;
                Some(format!("[Agent: {agent_name}] {verb}: {file}"))
            }
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Frames the client sends over the live channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    /// Answer to a pending clarification.
    #[serde(rename = "clarification-response", rename_all = "camelCase")]
    ClarificationResponse {
        /// ID of the question being answered.
        question_id: QuestionId,
        /// Answer text (or the chosen option).
        answer: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileAction;
    use assert_matches::assert_matches;

    #[test]
    fn output_frame_parses() {
        let ev: ChannelEvent =
            serde_json::from_str(r#"{"type":"output","line":"Hello world","phase":"develop"}"#)
                .unwrap();
        assert_eq!(
            ev,
            ChannelEvent::Output {
                line: "Hello world".into(),
                phase: "develop".into(),
            }
        );
    }

    #[test]
    fn complete_frame_parses() {
        let ev: ChannelEvent =
            serde_json::from_str(r#"{"type":"complete","status":"completed"}"#).unwrap();
        assert_matches!(ev, ChannelEvent::Complete { status } if status == "completed");
    }

    #[test]
    fn clarification_frame_parses() {
        let ev: ChannelEvent = serde_json::from_str(
            r#"{"type":"clarification","questionId":"q-1","question":"Branch?","options":["main","dev"],"required":true}"#,
        )
        .unwrap();
        let ChannelEvent::Clarification(c) = ev else {
            panic!("wrong variant");
        };
        assert_eq!(c.question_id.as_str(), "q-1");
        assert_eq!(c.options.as_deref(), Some(&["main".to_owned(), "dev".to_owned()][..]));
        assert!(c.required);
    }

    #[test]
    fn dismissal_frame_parses() {
        let ev: ChannelEvent =
            serde_json::from_str(r#"{"type":"clarification-dismissed","questionId":"q-1"}"#)
                .unwrap();
        assert_matches!(
            ev,
            ChannelEvent::ClarificationDismissed { question_id } if question_id.as_str() == "q-1"
        );
    }

    #[test]
    fn agent_spawn_nested_shape() {
        let ev: ChannelEvent = serde_json::from_str(
            r#"{"type":"agent-spawn","agent":{"id":"a-1","name":"Builder","task":"compile"}}"#,
        )
        .unwrap();
        let (id, name, task) = ev.spawn_fields().unwrap();
        assert_eq!(id.as_str(), "a-1");
        assert_eq!(name, "Builder");
        assert_eq!(task, "compile");
    }

    #[test]
    fn agent_spawn_flattened_shape() {
        let ev: ChannelEvent = serde_json::from_str(
            r#"{"type":"agent-spawn","agentId":"a-2","name":"Tester","task":"run tests"}"#,
        )
        .unwrap();
        let (id, name, task) = ev.spawn_fields().unwrap();
        assert_eq!(id.as_str(), "a-2");
        assert_eq!(name, "Tester");
        assert_eq!(task, "run tests");
    }

    #[test]
    fn spawn_without_id_yields_none() {
        let ev: ChannelEvent =
            serde_json::from_str(r#"{"type":"agent-spawn","name":"Nameless"}"#).unwrap();
        assert!(ev.spawn_fields().is_none());
    }

    #[test]
    fn file_activity_parses() {
        let ev: ChannelEvent = serde_json::from_str(
            r#"{"type":"file-activity","file":"src/main.rs","action":"edit","agentId":"a-1","agentName":"Builder"}"#,
        )
        .unwrap();
        assert_matches!(
            ev,
            ChannelEvent::FileActivity { action: FileAction::Edit, .. }
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let ev: ChannelEvent =
            serde_json::from_str(r#"{"type":"heartbeat-extended","data":42}"#).unwrap();
        assert_eq!(ev, ChannelEvent::Unknown);
    }

    #[test]
    fn snapshot_running_phase() {
        let ev: ChannelEvent = serde_json::from_str(
            r#"{"type":"execution-snapshot","execution":{"id":"exec-1","status":"running","pipeline":[{"phase":"plan","status":"completed"},{"phase":"develop","status":"running"},{"phase":"verify","status":"pending"}]}}"#,
        )
        .unwrap();
        let ChannelEvent::ExecutionSnapshot { execution } = ev else {
            panic!("wrong variant");
        };
        assert_eq!(execution.running_phase(), Some("develop"));
    }

    #[test]
    fn snapshot_without_running_stage() {
        let info = ExecutionInfo {
            id: "exec-1".into(),
            status: "completed".into(),
            pipeline: vec![PipelineStage {
                phase: "plan".into(),
                status: "completed".into(),
            }],
        };
        assert_eq!(info.running_phase(), None);
    }

    #[test]
    fn synthetic_lines() {
        let spawn: ChannelEvent = serde_json::from_str(
            r#"{"type":"agent-spawn","agent":{"id":"a-1","name":"Builder","task":"compile"}}"#,
        )
        .unwrap();
        assert_eq!(
            spawn.synthetic_line().as_deref(),
            Some("[Agent: Builder] Starting: compile")
        );

        let done = ChannelEvent::AgentComplete {
            agent_id: "a-1".into(),
            name: "Builder".into(),
            status: "completed".into(),
        };
        assert_eq!(done.synthetic_line().as_deref(), Some("[Agent: Builder] Completed"));

        let failed = ChannelEvent::AgentComplete {
            agent_id: "a-1".into(),
            name: "Builder".into(),
            status: "failed".into(),
        };
        assert_eq!(failed.synthetic_line().as_deref(), Some("[Agent: Builder] Failed"));

        let plain = ChannelEvent::Output {
            line: "x".into(),
            phase: "p".into(),
        };
        assert_eq!(plain.synthetic_line(), None);
    }

    #[test]
    fn file_activity_synthetic_line() {
        let ev = ChannelEvent::FileActivity {
            file: "src/lib.rs".into(),
            action: FileAction::Write,
            agent_id: "a-1".into(),
            agent_name: "Builder".into(),
        };
        assert_eq!(
            ev.synthetic_line().as_deref(),
            Some("[Agent: Builder] write: src/lib.rs")
        );
    }

    #[test]
    fn outbound_answer_wire_shape() {
        let frame = OutboundFrame::ClarificationResponse {
            question_id: "q-1".into(),
            answer: "main".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "clarification-response");
        assert_eq!(json["questionId"], "q-1");
        assert_eq!(json["answer"], "main");
    }
}
