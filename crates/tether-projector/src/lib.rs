//! Derived projections over a live-channel event log.
//!
//! The channel delivers an append-only log of [`tether_core::events::ChannelEvent`]s.
//! This crate folds that log incrementally into two query-ready views:
//! a roster of dynamically spawned agents and a file tree annotated with
//! recent activity. Each event is consumed exactly once via a cursor, so
//! re-delivering the full log on every tick never double-applies anything.

#![deny(unsafe_code)]

mod projection;
mod roster;
mod tree;

pub use projection::{spawn_activity_sweep, Projection};
pub use roster::AgentRoster;
pub use tree::{FileTree, FileTreeNode, NodeKind};
