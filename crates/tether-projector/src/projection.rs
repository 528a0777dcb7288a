//! Cursor-based fold of the event log into the roster and file tree.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tether_core::constants::ACTIVITY_SWEEP_INTERVAL_MS;
use tether_core::events::ChannelEvent;
use tether_core::model::FileActivityEvent;

use crate::roster::AgentRoster;
use crate::tree::FileTree;

/// Both derived views plus the cursor into the event log.
///
/// [`Projection::apply_log`] takes the channel's full log on every
/// tick but only folds events past the cursor, so each event lands
/// exactly once no matter how often the log is re-delivered.
#[derive(Debug, Default)]
pub struct Projection {
    cursor: usize,
    /// Dynamic agent roster.
    pub roster: AgentRoster,
    /// File tree with activity annotations.
    pub tree: FileTree,
    activity_log: Vec<FileActivityEvent>,
}

impl Projection {
    /// Empty projection with the cursor at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds every event past the cursor into the two views.
    ///
    /// `now` stamps file-activity events as they are ingested. A log
    /// shorter than the cursor means the subscription changed without
    /// a [`Projection::reset`]; the projection starts over.
    pub fn apply_log(&mut self, log: &[ChannelEvent], now: DateTime<Utc>) {
        if log.len() < self.cursor {
            warn!(
                log_len = log.len(),
                cursor = self.cursor,
                "event log shrank, resetting projection"
            );
            self.reset();
        }
        for event in &log[self.cursor..] {
            self.apply(event, now);
        }
        self.cursor = log.len();
    }

    /// Discards both views and rewinds the cursor.
    ///
    /// Called when the live channel switches conversations.
    pub fn reset(&mut self) {
        debug!(events_seen = self.cursor, "projection reset");
        *self = Self::new();
    }

    /// Recomputes file activity against `now`.
    pub fn refresh_activity(&mut self, now: DateTime<Utc>) {
        self.tree.refresh_activity(now);
    }

    /// File-activity events ingested so far, in arrival order.
    #[must_use]
    pub fn activity_log(&self) -> &[FileActivityEvent] {
        &self.activity_log
    }

    fn apply(&mut self, event: &ChannelEvent, now: DateTime<Utc>) {
        match event {
            ChannelEvent::AgentSpawn { .. } => {
                if let Some((id, name, task)) = event.spawn_fields() {
                    let _ = self.roster.spawn(id, name, task, now);
                }
            }
            ChannelEvent::AgentOutput { agent_id, line } => {
                self.roster.record_output(agent_id, line);
            }
            ChannelEvent::AgentComplete {
                agent_id, status, ..
            } => {
                self.roster.complete(agent_id, status, now);
            }
            ChannelEvent::FileActivity {
                file,
                action,
                agent_id,
                agent_name,
            } => {
                let activity = FileActivityEvent {
                    file: file.clone(),
                    action: *action,
                    agent_id: agent_id.clone(),
                    agent_name: agent_name.clone(),
                    timestamp: now,
                };
                self.tree.record(&activity, now);
                self.roster.record_file(agent_id, file, *action);
                self.activity_log.push(activity);
            }
            // Output, phase, status and clarification frames are the
            // channel's concern; anything unknown is ignored.
            _ => {}
        }
    }
}

/// Spawns the periodic sweep that decays file activity.
///
/// Runs until aborted; callers hold the handle and abort it when the
/// subscription is torn down.
pub fn spawn_activity_sweep(projection: Arc<Mutex<Projection>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(ACTIVITY_SWEEP_INTERVAL_MS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            let _ = interval.tick().await;
            projection.lock().refresh_activity(Utc::now());
        }
    })
}
