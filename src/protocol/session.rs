//! Session record for one harness invocation.
//!
//! Holds the mode, the current state, the retry counter and the last
//! transmitted command. Owned exclusively by the [`Engine`](super::Engine).

use std::time::Instant;

use bytes::Bytes;

use super::state::State;
use super::Mode;

/// Harness session
#[derive(Debug)]
pub struct Session {
    /// Session ID
    id: String,
    /// Playback or record
    mode: Mode,
    /// Current state
    state: State,
    /// Retransmissions of the current command so far
    retry_count: u64,
    /// Exact bytes last transmitted, kept for retransmission
    last_command: Option<Bytes>,
    /// Session start
    started: Instant,
    /// Counters
    stats: SessionStats,
}

impl Session {
    /// Create a new session in `WaitingForServer`
    pub fn new(mode: Mode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            state: State::WaitingForServer,
            retry_count: 0,
            last_command: None,
            started: Instant::now(),
            stats: SessionStats::default(),
        }
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get session mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Move to `state`
    pub fn set_state(&mut self, state: State) {
        if state != self.state {
            tracing::debug!("State changing from {} to {}", self.state, state);
        }
        self.state = state;
    }

    /// Retransmissions of the current command so far
    pub fn retry_count(&self) -> u64 {
        self.retry_count
    }

    /// Record a scheduled retransmission
    pub fn bump_retry(&mut self) {
        self.retry_count += 1;
        self.stats.retries += 1;
    }

    /// Clear the retry counter after a definitive verdict
    pub fn reset_retry(&mut self) {
        self.retry_count = 0;
    }

    /// Last transmitted command, if any
    pub fn last_command(&self) -> Option<&Bytes> {
        self.last_command.as_ref()
    }

    /// Remember a freshly transmitted command
    pub fn remember(&mut self, command: Bytes) {
        self.last_command = Some(command);
        self.stats.commands_sent += 1;
    }

    /// Mutable counters
    pub fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }

    /// Counters
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Seconds since the session started
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Script commands transmitted (retransmissions excluded)
    pub commands_sent: u64,
    /// Retransmissions scheduled
    pub retries: u64,
    /// Replies classified as pass
    pub passes: u64,
    /// Confirmed failures
    pub failures: u64,
    /// Confirmed failures accepted by `failure-ok`
    pub accepted_failures: u64,
    /// Lines persisted in record mode
    pub recorded_lines: u64,
}
