//! One real-time subscription per conversation, with transparent reconnect.
//!
//! [`LiveChannel`] owns at most one WebSocket subscription at a time,
//! addressed by conversation ID. Inbound frames are parsed into
//! [`tether_core::events::ChannelEvent`]s, appended to an in-memory log,
//! and folded into four derived read-outs: output lines, current phase,
//! current status, and at most one pending clarification.
//!
//! Any transport close schedules exactly one reconnect attempt after a
//! fixed delay. Teardown is flag-based: every async path checks the
//! torn-down flag before mutating shared state, because a socket that
//! was abandoned mid-handshake can still produce traffic afterwards.

#![deny(unsafe_code)]

mod channel;
mod shared;
mod state;

pub use channel::LiveChannel;
pub use shared::ChannelReadouts;
pub use state::ChannelState;
