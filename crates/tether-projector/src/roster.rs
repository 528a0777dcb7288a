//! Dynamic agent roster, keyed by agent ID.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use tether_core::ids::AgentId;
use tether_core::model::{AgentStatus, DynamicAgent, FileAction};

/// Agents known through streamed events, in spawn order.
///
/// Entries are stored in an arena and looked up through an ID index.
/// Agents are never removed within a subscription's lifetime.
#[derive(Debug, Default)]
pub struct AgentRoster {
    agents: Vec<DynamicAgent>,
    index: HashMap<AgentId, usize>,
}

impl AgentRoster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new agent from a spawn event.
    ///
    /// A duplicate spawn for an existing ID is ignored. Returns whether
    /// a new entry was created.
    pub fn spawn(&mut self, id: AgentId, name: String, task: String, now: DateTime<Utc>) -> bool {
        if self.index.contains_key(&id) {
            debug!(agent_id = %id, "duplicate spawn ignored");
            return false;
        }
        let ordinal = self.agents.len();
        let agent = DynamicAgent::spawned(id.clone(), name, task, ordinal, now);
        self.agents.push(agent);
        let _ = self.index.insert(id, ordinal);
        true
    }

    /// Appends an output line and forces the agent to `running`.
    ///
    /// Output for an unknown agent is dropped.
    pub fn record_output(&mut self, id: &AgentId, line: &str) {
        let Some(agent) = self.get_mut(id) else {
            debug!(agent_id = %id, "output for unknown agent dropped");
            return;
        };
        agent.output.push(line.to_owned());
        agent.status = AgentStatus::Running;
    }

    /// Marks the agent terminal and stamps its completion time.
    ///
    /// Any status string other than `"failed"` counts as success. File
    /// lists are frozen from this point on.
    pub fn complete(&mut self, id: &AgentId, status: &str, now: DateTime<Utc>) {
        let Some(agent) = self.get_mut(id) else {
            debug!(agent_id = %id, "completion for unknown agent dropped");
            return;
        };
        agent.status = if status == "failed" {
            AgentStatus::Failed
        } else {
            AgentStatus::Completed
        };
        agent.completed_at = Some(now);
    }

    /// Records a file touch against the agent's read/modified lists.
    ///
    /// No-op once the agent is terminal, keeping its lists frozen.
    pub fn record_file(&mut self, id: &AgentId, file: &str, action: FileAction) {
        let Some(agent) = self.get_mut(id) else {
            return;
        };
        if matches!(agent.status, AgentStatus::Completed | AgentStatus::Failed) {
            return;
        }
        let list = if action.is_mutation() {
            &mut agent.files_modified
        } else {
            &mut agent.files_read
        };
        if !list.iter().any(|f| f == file) {
            list.push(file.to_owned());
        }
    }

    /// Agents in spawn order.
    #[must_use]
    pub fn agents(&self) -> &[DynamicAgent] {
        &self.agents
    }

    /// Looks up one agent by ID.
    #[must_use]
    pub fn get(&self, id: &AgentId) -> Option<&DynamicAgent> {
        self.index.get(id).map(|&i| &self.agents[i])
    }

    /// Number of agents seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agent has spawned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn get_mut(&mut self, id: &AgentId) -> Option<&mut DynamicAgent> {
        self.index.get(id).map(|&i| &mut self.agents[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with_one(now: DateTime<Utc>) -> AgentRoster {
        let mut roster = AgentRoster::new();
        assert!(roster.spawn("a-1".into(), "Builder".into(), "compile".into(), now));
        roster
    }

    #[test]
    fn duplicate_spawn_is_ignored() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        assert!(!roster.spawn("a-1".into(), "Impostor".into(), "other".into(), now));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(&"a-1".into()).unwrap().name, "Builder");
    }

    #[test]
    fn output_appends_and_marks_running() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        let id: AgentId = "a-1".into();
        roster.record_output(&id, "first");
        roster.record_output(&id, "second");
        let agent = roster.get(&id).unwrap();
        assert_eq!(agent.output, vec!["first", "second"]);
        assert_eq!(agent.status, AgentStatus::Running);
    }

    #[test]
    fn output_for_unknown_agent_is_dropped() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        roster.record_output(&"a-9".into(), "lost");
        assert_eq!(roster.len(), 1);
        assert!(roster.get(&"a-1".into()).unwrap().output.is_empty());
    }

    #[test]
    fn completion_stamps_time_and_status() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        let id: AgentId = "a-1".into();
        roster.complete(&id, "failed", now);
        let agent = roster.get(&id).unwrap();
        assert_eq!(agent.status, AgentStatus::Failed);
        assert_eq!(agent.completed_at, Some(now));
    }

    #[test]
    fn file_lists_freeze_after_completion() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        let id: AgentId = "a-1".into();
        roster.record_file(&id, "src/lib.rs", FileAction::Edit);
        roster.record_file(&id, "README.md", FileAction::Read);
        roster.complete(&id, "completed", now);
        roster.record_file(&id, "src/late.rs", FileAction::Write);
        let agent = roster.get(&id).unwrap();
        assert_eq!(agent.files_modified, vec!["src/lib.rs"]);
        assert_eq!(agent.files_read, vec!["README.md"]);
    }

    #[test]
    fn repeated_touches_deduplicate() {
        let now = Utc::now();
        let mut roster = roster_with_one(now);
        let id: AgentId = "a-1".into();
        roster.record_file(&id, "src/lib.rs", FileAction::Edit);
        roster.record_file(&id, "src/lib.rs", FileAction::Write);
        assert_eq!(roster.get(&id).unwrap().files_modified, vec!["src/lib.rs"]);
    }
}
