//! The public channel handle and its transport task.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use tether_core::events::{ChannelEvent, OutboundFrame};
use tether_core::ids::{ConversationId, QuestionId};
use tether_core::model::PendingClarification;
use tether_core::settings::ChannelSettings;

use crate::shared::{ChannelReadouts, ChannelShared};
use crate::state::ChannelState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle over at most one live subscription.
///
/// Subscribing to a new conversation ID tears the previous
/// subscription down and swaps in a fresh, empty shared state, so
/// the read-outs are cleared synchronously before the new transport
/// even starts connecting.
#[derive(Debug)]
pub struct LiveChannel {
    settings: ChannelSettings,
    current: Mutex<Option<Arc<ChannelShared>>>,
}

impl LiveChannel {
    /// Channel handle with no active subscription.
    #[must_use]
    pub fn new(settings: ChannelSettings) -> Self {
        Self {
            settings,
            current: Mutex::new(None),
        }
    }

    /// Subscribes to `conversation_id`, replacing any previous
    /// subscription. Must be called within a tokio runtime.
    pub fn subscribe(&self, conversation_id: ConversationId) {
        let shared = Arc::new(ChannelShared::new(conversation_id));
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.tear_down();
        }
        let _ = tokio::spawn(run(Arc::clone(&shared), self.settings.clone()));
        *current = Some(shared);
    }

    /// Tears the current subscription down, if any.
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.current.lock().take() {
            debug!(conversation_id = %shared.conversation_id(), "unsubscribing");
            shared.tear_down();
        }
    }

    /// Answers the pending clarification.
    ///
    /// A silent no-op unless the transport is currently open; the
    /// server keeps re-broadcasting an unanswered question, so a
    /// dropped answer is recoverable. Returns whether the frame was
    /// queued. Clears the matching pending clarification on send.
    pub fn send_answer(&self, question_id: &QuestionId, answer: &str) -> bool {
        let current = self.current.lock();
        let Some(shared) = current.as_ref() else {
            return false;
        };
        let frame = OutboundFrame::ClarificationResponse {
            question_id: question_id.clone(),
            answer: answer.to_owned(),
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to encode answer frame");
                return false;
            }
        };
        let sent = shared.send_text(json);
        if sent {
            shared.clear_clarification(question_id);
        }
        sent
    }

    /// Conversation the channel is currently subscribed to.
    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.current
            .lock()
            .as_ref()
            .map(|s| s.conversation_id().clone())
    }

    /// Transport state, `Disconnected` when nothing is subscribed.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.current
            .lock()
            .as_ref()
            .map_or(ChannelState::Disconnected, |s| s.state())
    }

    /// Whether the transport is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Snapshot of all four derived read-outs.
    #[must_use]
    pub fn readouts(&self) -> ChannelReadouts {
        self.current
            .lock()
            .as_ref()
            .map(|s| s.readouts())
            .unwrap_or_default()
    }

    /// Accumulated output lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.readouts().lines
    }

    /// Most recently reported pipeline phase.
    #[must_use]
    pub fn current_phase(&self) -> Option<String> {
        self.readouts().phase
    }

    /// Most recently reported execution status.
    #[must_use]
    pub fn current_status(&self) -> Option<String> {
        self.readouts().status
    }

    /// The one outstanding question, if any.
    #[must_use]
    pub fn clarification(&self) -> Option<PendingClarification> {
        self.readouts().clarification
    }

    /// Snapshot of the full parsed event log, for the projector.
    #[must_use]
    pub fn events(&self) -> Vec<ChannelEvent> {
        self.current
            .lock()
            .as_ref()
            .map(|s| s.events_snapshot())
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport task
// ─────────────────────────────────────────────────────────────────────────────

/// Connect/stream/reconnect loop for one subscription.
///
/// Exits only through teardown; every transport loss schedules exactly
/// one reconnect after the configured fixed delay.
async fn run(shared: Arc<ChannelShared>, settings: ChannelSettings) {
    let url = format!(
        "{}/{}",
        settings.ws_url.trim_end_matches('/'),
        shared.conversation_id()
    );
    let delay = Duration::from_millis(settings.reconnect_delay_ms);
    loop {
        if shared.is_torn_down() {
            return;
        }
        shared.set_state(ChannelState::Connecting);
        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                if shared.is_torn_down() {
                    // Teardown landed mid-handshake; the close was
                    // deferred until the socket actually opened.
                    let _ = ws.close(None).await;
                    return;
                }
                shared.set_state(ChannelState::Open);
                debug!(url, "live channel open");
                drive(&shared, ws).await;
                shared.clear_outbound();
            }
            Err(err) => {
                warn!(url, error = %err, "live channel connect failed");
            }
        }
        if shared.is_torn_down() {
            return;
        }
        shared.set_state(ChannelState::ReconnectScheduled);
        debug!(url, delay_ms = settings.reconnect_delay_ms, "reconnect scheduled");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = shared.torn_down_notified() => {}
        }
    }
}

/// Streams one open socket until it closes, errors, or teardown.
async fn drive(shared: &Arc<ChannelShared>, ws: WsStream) {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    shared.set_outbound(tx);
    loop {
        tokio::select! {
            () = shared.torn_down_notified() => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            frame = rx.recv() => {
                let Some(frame) = frame else { return };
                if let Err(err) = sink.send(frame).await {
                    warn!(error = %err, "live channel write failed");
                    return;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if shared.is_torn_down() {
                            return;
                        }
                        match serde_json::from_str::<ChannelEvent>(text.as_str()) {
                            Ok(event) => shared.ingest(event),
                            Err(err) => {
                                warn!(error = %err, "unparseable frame ignored");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("live channel closed by peer");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "live channel read error");
                        return;
                    }
                }
            }
        }
    }
}
