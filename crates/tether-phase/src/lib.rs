//! Animation phase scheduling for agents.
//!
//! Each agent views its coarse execution status through a small state
//! machine that walks it between a hub, a desk, and a center position.
//! Delayed transitions run as tokio timers and are cancelled by
//! generation whenever the status changes underneath them.

#![deny(unsafe_code)]

mod scheduler;

pub use scheduler::{AgentPhase, CoarseStatus, PhaseScheduler};
