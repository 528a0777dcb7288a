//! Multi-session conversation management.
//!
//! [`SessionStore`] multiplexes independent conversation sessions,
//! owns the request lifecycle against the conversation API, and
//! serializes session metadata for restore. Every request failure is
//! converted to a per-session error string at this boundary; nothing
//! here propagates an error past a public operation.

#![deny(unsafe_code)]

mod api;
mod persist;
mod store;

pub use api::{ConversationApi, CreateConversationParams, HttpConversationApi};
pub use persist::{JsonFileStore, MemoryStore, PersistedSession, PersistedState, StateStore};
pub use store::SessionStore;
