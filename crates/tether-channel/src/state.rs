//! Explicit connection state machine.

/// Where one subscription's transport currently stands.
///
/// Modeled as an explicit state instead of ad hoc booleans so the
/// "nothing mutates after teardown" invariant is structural:
/// [`ChannelState::TornDown`] is terminal and absorbs every later
/// transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No transport attempt in flight.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Transport established and streaming.
    Open,
    /// Transport lost; one reconnect attempt is scheduled.
    ReconnectScheduled,
    /// Unsubscribed. Terminal.
    TornDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_compare() {
        assert_eq!(ChannelState::Open, ChannelState::Open);
        assert_ne!(ChannelState::Open, ChannelState::TornDown);
    }
}
