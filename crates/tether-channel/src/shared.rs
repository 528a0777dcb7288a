//! State shared between the channel handle and its transport task.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use tether_core::events::ChannelEvent;
use tether_core::ids::{ConversationId, QuestionId};
use tether_core::model::PendingClarification;

use crate::state::ChannelState;

/// The four derived read-outs of one subscription.
#[derive(Debug, Default, Clone)]
pub struct ChannelReadouts {
    /// Accumulated output lines, including synthesized agent lines.
    pub lines: Vec<String>,
    /// Most recently reported pipeline phase.
    pub phase: Option<String>,
    /// Most recently reported execution status.
    pub status: Option<String>,
    /// The one outstanding question, if any.
    pub clarification: Option<PendingClarification>,
}

/// Folds one parsed event into the read-outs.
pub(crate) fn apply_event(readouts: &mut ChannelReadouts, event: &ChannelEvent) {
    match event {
        ChannelEvent::Output { line, phase } => {
            readouts.lines.push(line.clone());
            readouts.phase = Some(phase.clone());
        }
        ChannelEvent::Phase { phase, status } => {
            readouts.phase = Some(phase.clone());
            readouts.status = Some(status.clone());
        }
        ChannelEvent::Complete { status } => {
            readouts.status = Some(status.clone());
        }
        ChannelEvent::Clarification(clarification) => {
            readouts.clarification = Some(clarification.clone());
        }
        ChannelEvent::ClarificationDismissed { question_id } => {
            let matches = readouts
                .clarification
                .as_ref()
                .is_some_and(|c| &c.question_id == question_id);
            if matches {
                readouts.clarification = None;
            }
        }
        ChannelEvent::ExecutionSnapshot { execution } => {
            readouts.status = Some(execution.status.clone());
            if let Some(phase) = execution.running_phase() {
                readouts.phase = Some(phase.to_owned());
            }
        }
        ChannelEvent::AgentSpawn { .. }
        | ChannelEvent::AgentOutput { .. }
        | ChannelEvent::AgentComplete { .. }
        | ChannelEvent::FileActivity { .. } => {
            if let Some(line) = event.synthetic_line() {
                readouts.lines.push(line);
            }
        }
        ChannelEvent::Unknown => {}
    }
}

/// State shared by the [`crate::LiveChannel`] handle and the transport
/// task it spawns. One instance per subscription; a new subscription
/// always gets a fresh, empty instance so old data cannot leak across
/// conversation IDs.
#[derive(Debug)]
pub(crate) struct ChannelShared {
    conversation_id: ConversationId,
    state: Mutex<ChannelState>,
    events: Mutex<Vec<ChannelEvent>>,
    readouts: Mutex<ChannelReadouts>,
    outbound: Mutex<Option<UnboundedSender<Message>>>,
    torn_down: AtomicBool,
    teardown: Notify,
}

impl ChannelShared {
    pub(crate) fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            state: Mutex::new(ChannelState::Disconnected),
            events: Mutex::new(Vec::new()),
            readouts: Mutex::new(ChannelReadouts::default()),
            outbound: Mutex::new(None),
            torn_down: AtomicBool::new(false),
            teardown: Notify::new(),
        }
    }

    pub(crate) fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub(crate) fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    /// Applies a state transition unless the channel is already torn
    /// down; `TornDown` is terminal.
    pub(crate) fn set_state(&self, next: ChannelState) {
        let mut state = self.state.lock();
        if *state == ChannelState::TornDown {
            return;
        }
        *state = next;
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Marks the subscription dead and wakes the transport task.
    pub(crate) fn tear_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        *self.state.lock() = ChannelState::TornDown;
        self.teardown.notify_waiters();
    }

    /// Resolves once teardown has been requested.
    pub(crate) async fn torn_down_notified(&self) {
        loop {
            let notified = self.teardown.notified();
            if self.is_torn_down() {
                return;
            }
            notified.await;
        }
    }

    /// Appends a parsed event to the log and updates the read-outs.
    ///
    /// Dropped silently after teardown.
    pub(crate) fn ingest(&self, event: ChannelEvent) {
        if self.is_torn_down() {
            debug!(conversation_id = %self.conversation_id, "event after teardown dropped");
            return;
        }
        apply_event(&mut self.readouts.lock(), &event);
        self.events.lock().push(event);
    }

    pub(crate) fn set_outbound(&self, sender: UnboundedSender<Message>) {
        *self.outbound.lock() = Some(sender);
    }

    pub(crate) fn clear_outbound(&self) {
        *self.outbound.lock() = None;
    }

    /// Queues an outbound frame if the transport is open.
    pub(crate) fn send_text(&self, text: String) -> bool {
        if self.state() != ChannelState::Open {
            return false;
        }
        let outbound = self.outbound.lock();
        match outbound.as_ref() {
            Some(sender) => sender.send(Message::text(text)).is_ok(),
            None => false,
        }
    }

    /// Clears the pending clarification if it matches `question_id`.
    pub(crate) fn clear_clarification(&self, question_id: &QuestionId) {
        let mut readouts = self.readouts.lock();
        let matches = readouts
            .clarification
            .as_ref()
            .is_some_and(|c| &c.question_id == question_id);
        if matches {
            readouts.clarification = None;
        }
    }

    pub(crate) fn readouts(&self) -> ChannelReadouts {
        self.readouts.lock().clone()
    }

    pub(crate) fn events_snapshot(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChannelEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn output_appends_line_and_phase() {
        let mut readouts = ChannelReadouts::default();
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"output","line":"Hello world","phase":"develop"}"#),
        );
        assert_eq!(readouts.lines, vec!["Hello world"]);
        assert_eq!(readouts.phase.as_deref(), Some("develop"));
        assert!(readouts.status.is_none());
    }

    #[test]
    fn phase_updates_both_fields() {
        let mut readouts = ChannelReadouts::default();
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"phase","phase":"verify","status":"running"}"#),
        );
        assert_eq!(readouts.phase.as_deref(), Some("verify"));
        assert_eq!(readouts.status.as_deref(), Some("running"));
    }

    #[test]
    fn complete_sets_terminal_status() {
        let mut readouts = ChannelReadouts::default();
        apply_event(&mut readouts, &parse(r#"{"type":"complete","status":"completed"}"#));
        assert_eq!(readouts.status.as_deref(), Some("completed"));
    }

    #[test]
    fn clarification_set_and_dismissed() {
        let mut readouts = ChannelReadouts::default();
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"clarification","questionId":"q-1","question":"Branch?"}"#),
        );
        assert!(readouts.clarification.is_some());

        // A dismissal for a different question leaves it standing.
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"clarification-dismissed","questionId":"q-9"}"#),
        );
        assert!(readouts.clarification.is_some());

        apply_event(
            &mut readouts,
            &parse(r#"{"type":"clarification-dismissed","questionId":"q-1"}"#),
        );
        assert!(readouts.clarification.is_none());
    }

    #[test]
    fn snapshot_resynchronizes_status_and_phase() {
        let mut readouts = ChannelReadouts::default();
        apply_event(
            &mut readouts,
            &parse(
                r#"{"type":"execution-snapshot","execution":{"id":"e-1","status":"running","pipeline":[{"phase":"plan","status":"completed"},{"phase":"develop","status":"running"}]}}"#,
            ),
        );
        assert_eq!(readouts.status.as_deref(), Some("running"));
        assert_eq!(readouts.phase.as_deref(), Some("develop"));
    }

    #[test]
    fn snapshot_without_running_stage_keeps_phase() {
        let mut readouts = ChannelReadouts {
            phase: Some("develop".into()),
            ..ChannelReadouts::default()
        };
        apply_event(
            &mut readouts,
            &parse(
                r#"{"type":"execution-snapshot","execution":{"id":"e-1","status":"completed","pipeline":[]}}"#,
            ),
        );
        assert_eq!(readouts.status.as_deref(), Some("completed"));
        assert_eq!(readouts.phase.as_deref(), Some("develop"));
    }

    #[test]
    fn agent_events_synthesize_lines() {
        let mut readouts = ChannelReadouts::default();
        apply_event(
            &mut readouts,
            &parse(
                r#"{"type":"agent-spawn","agent":{"id":"a-1","name":"Builder","task":"compile"}}"#,
            ),
        );
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"agent-output","agentId":"a-1","line":"building"}"#),
        );
        apply_event(
            &mut readouts,
            &parse(r#"{"type":"agent-complete","agentId":"a-1","name":"Builder","status":"completed"}"#),
        );
        assert_eq!(
            readouts.lines,
            vec![
                "[Agent: Builder] Starting: compile",
                "building",
                "[Agent: Builder] Completed",
            ]
        );
    }

    #[test]
    fn unknown_frames_change_nothing() {
        let mut readouts = ChannelReadouts::default();
        apply_event(&mut readouts, &parse(r#"{"type":"heartbeat","n":1}"#));
        assert!(readouts.lines.is_empty());
        assert!(readouts.phase.is_none());
        assert!(readouts.status.is_none());
    }

    #[test]
    fn ingest_after_teardown_is_dropped() {
        let shared = ChannelShared::new("conv-1".into());
        shared.ingest(parse(r#"{"type":"output","line":"kept","phase":"develop"}"#));
        shared.tear_down();
        shared.ingest(parse(r#"{"type":"output","line":"dropped","phase":"develop"}"#));
        assert_eq!(shared.readouts().lines, vec!["kept"]);
        assert_eq!(shared.events_snapshot().len(), 1);
        assert_eq!(shared.state(), ChannelState::TornDown);
    }

    #[test]
    fn torn_down_state_is_terminal() {
        let shared = ChannelShared::new("conv-1".into());
        shared.tear_down();
        shared.set_state(ChannelState::Open);
        assert_eq!(shared.state(), ChannelState::TornDown);
    }

    #[test]
    fn send_text_requires_open_state() {
        let shared = ChannelShared::new("conv-1".into());
        assert!(!shared.send_text("{}".into()));
    }
}
