//! Protocol engine for the test harness.
//!
//! The harness talks to a target over a single line-oriented TCP stream.
//! After the target's welcome line the engine either plays a script back
//! (sending one command per reply and checking each reply) or asks the target
//! to record, persisting every line it emits.
//!
//! ## Message Flow
//!
//! ```text
//! Harness (Playback)                Target
//!    |                                |
//!    |<------- welcome ---------------|
//!    |-------- command ------------->|
//!    |<------- OK / ERROR: ... -------|   retried per cli-setting
//!    |-------- command ------------->|
//!    |              ...               |
//!
//! Harness (Record)                  Target
//!    |<------- welcome ---------------|
//!    |-------- record -------------->|
//!    |<------- acknowledgement -------|
//!    |<------- command line ----------|   appended to the script
//!    |<------- command line ----------|
//! ```
//!
//! ## Reply Rules
//!
//! | Reply                | retry on, budget left | otherwise, failure-ok | otherwise |
//! |----------------------|-----------------------|-----------------------|-----------|
//! | starts with `OK`     | pass                  | pass                  | pass      |
//! | anything else        | retransmit later      | accepted failure      | error     |
//!
//! The engine is sans-IO: it queues outgoing bytes and timer requests for the
//! driver in [`crate::harness`] to carry out.

mod engine;
mod reply;
mod session;
mod settings;
mod state;

pub use engine::{Engine, TimerCommand};
pub use reply::{classify, judge, Reply, Verdict, PASS_PREFIX};
pub use session::{Session, SessionStats};
pub use settings::{SettingChange, SettingKey, SettingKind, SettingValue, Settings};
pub use state::{transition, Action, Event, State, Transition};

/// Command sent to ask the target to stream a recording
pub const RECORD_COMMAND: &[u8] = b"record\r\n";

/// Harness mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drive the target from a script
    #[default]
    Playback,
    /// Persist the target's command stream as a script
    Record,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playback => f.write_str("playback"),
            Self::Record => f.write_str("record"),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Script exhausted without an unresolved failure
    Success,
    /// Confirmed failure or unexpected disconnect
    Failure,
}

impl Outcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}
