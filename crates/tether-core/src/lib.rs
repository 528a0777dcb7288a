//! # tether-core
//!
//! Foundation types for the Tether client engine.
//!
//! This crate provides the shared vocabulary that all other Tether crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::SessionId`], [`ids::ConversationId`],
//!   [`ids::AgentId`], [`ids::QuestionId`] as newtypes
//! - **Data model**: [`model::Session`], [`model::Conversation`],
//!   [`model::DynamicAgent`], [`model::FileActivityEvent`]
//! - **Wire events**: [`events::ChannelEvent`] (inbound) and
//!   [`events::OutboundFrame`] (outbound) for the live channel
//! - **Errors**: [`errors::ApiError`] and [`errors::StorageError`] via
//!   `thiserror`
//! - **Settings**: [`settings::TetherSettings`] with file + env loading
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other tether crates.

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod model;
pub mod settings;
