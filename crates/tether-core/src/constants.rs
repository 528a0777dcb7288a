//! Timing and sizing constants shared across the client engine.

/// Delay before a dropped live-channel connection is retried.
pub const RECONNECT_DELAY_MS: u64 = 3000;

/// How long a file stays "active" after its last non-read action.
pub const FILE_ACTIVE_WINDOW_MS: i64 = 10_000;

/// Interval of the background sweep that decays file activity.
pub const ACTIVITY_SWEEP_INTERVAL_MS: u64 = 10_000;

/// Maximum length of a session label derived from the first prompt.
pub const SESSION_LABEL_MAX: usize = 40;

/// Label used when no prompt text is available.
pub const DEFAULT_SESSION_LABEL: &str = "New Session";

/// Model used for sessions created before the user picks one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

// ── Phase transition delays (ms from the status-change instant) ──

/// working: walking-to-hub → at-hub-pickup.
pub const PHASE_HUB_PICKUP_MS: u64 = 800;
/// working: at-hub-pickup → walking-to-desk.
pub const PHASE_WALK_TO_DESK_MS: u64 = 1400;
/// working: walking-to-desk → at-desk-working.
pub const PHASE_AT_DESK_MS: u64 = 2600;
/// done: celebrating → walking-to-center.
pub const PHASE_DONE_WALK_MS: u64 = 2000;
/// done: walking-to-center → at-center.
pub const PHASE_DONE_CENTER_MS: u64 = 3200;
/// stop (idle/error after working): walking-to-center → at-center.
pub const PHASE_STOP_CENTER_MS: u64 = 1200;
