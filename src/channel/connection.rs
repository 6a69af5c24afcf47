// ── Connection State Machine ─────────────────────────────────────────────────
// States and transitions from SPEC_FULL.md §3/§4.6.2. Owned exclusively by the
// adapter's own event handlers and health prober (§3 lifecycle rule).

use std::time::Instant;

use crate::channel::health::{DnsDiagnostics, NetworkDiagnostics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Connected,
    Disconnected,
    DnsFailure,
    NetworkFailure,
    AuthFailure,
    RateLimited,
    GatewayError,
    UnknownError,
    Stopped,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Stopped)
    }
}

#[derive(Debug, Default)]
pub struct ErrorInfo {
    pub dns: Option<DnsDiagnostics>,
    pub network: Option<NetworkDiagnostics>,
    pub gateway_message: Option<String>,
}

/// Counters and diagnostic state accompanying the connection state machine
/// (SPEC_FULL.md §3).
pub struct ConnectionTracker {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub last_reconnect_time: Option<Instant>,
    pub last_health_check: Option<Instant>,
    pub error_info: ErrorInfo,
    pub events_registered: bool,
    pub commands_registered: bool,
    pub on_ready_fired: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_cooldown: std::time::Duration,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            reconnect_attempts: 0,
            last_reconnect_time: None,
            last_health_check: None,
            error_info: ErrorInfo::default(),
            events_registered: false,
            commands_registered: false,
            on_ready_fired: false,
            max_reconnect_attempts: 10,
            reconnect_cooldown: std::time::Duration::from_secs(60),
        }
    }

    /// Apply a transition, logging exactly once when the status actually
    /// changes (SPEC_FULL.md §4.6.2).
    pub fn transition(&mut self, to: ConnectionState) {
        self.last_reconnect_time = Some(Instant::now());
        if self.state != to {
            log::info!("[channel] connection state {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    /// `should_attempt_reconnection()` per SPEC_FULL.md §4.6.2.
    pub fn should_attempt_reconnection(&self, network_healthy: bool) -> bool {
        let attempts_ok = self.reconnect_attempts < self.max_reconnect_attempts;
        let cooldown_ok = self
            .last_reconnect_time
            .map(|t| t.elapsed() >= self.reconnect_cooldown)
            .unwrap_or(true);
        attempts_ok && cooldown_ok && network_healthy
    }

    pub fn record_reconnect_attempt(&mut self) {
        self.reconnect_attempts += 1;
        self.last_reconnect_time = Some(Instant::now());
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_logs_only_on_actual_change() {
        let mut tracker = ConnectionTracker::new();
        tracker.transition(ConnectionState::Initializing);
        assert_eq!(tracker.state, ConnectionState::Initializing);
        tracker.transition(ConnectionState::Initializing);
        assert_eq!(tracker.state, ConnectionState::Initializing);
    }

    #[test]
    fn should_not_reconnect_when_attempts_exhausted() {
        let mut tracker = ConnectionTracker::new();
        tracker.reconnect_attempts = 10;
        assert!(!tracker.should_attempt_reconnection(true));
    }

    #[test]
    fn should_not_reconnect_during_cooldown() {
        let mut tracker = ConnectionTracker::new();
        tracker.last_reconnect_time = Some(Instant::now());
        assert!(!tracker.should_attempt_reconnection(true));
    }

    #[test]
    fn should_not_reconnect_when_network_unhealthy() {
        let tracker = ConnectionTracker::new();
        assert!(!tracker.should_attempt_reconnection(false));
    }

    #[test]
    fn fresh_tracker_with_healthy_network_allows_reconnect() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.should_attempt_reconnection(true));
    }
}
