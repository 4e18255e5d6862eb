//! Protocol engine state machine.
//!
//! The machine is a pure table: [`transition`] maps `(state, event, mode)` to
//! the action the engine must run and the state it moves to. Nothing here
//! touches I/O, so the table can be checked exhaustively on its own.
//!
//! ```text
//!                        InitialMessage (Playback)
//!   [WaitingForServer] ─────────────────────────────> [WaitingForReply] ◀─┐
//!          │                                             │   │            │ CommandReply
//!          │ InitialMessage (Record)                     │   └────────────┘
//!          v                                             │
//!   [WaitingForRecordingStart]                           │ NoMoreCommands / Error / Disconnect
//!          │ CommandReply                                v
//!          v                                       [Disconnected]
//!   [WaitingForRecordedCommand] ◀─┐ RecordCommand        ▲
//!          │   └──────────────────┘                      │
//!          └──────────────── Disconnect ─────────────────┘
//! ```

use std::fmt;

use super::{Mode, Outcome};

/// Engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Waiting for the target's welcome line
    WaitingForServer,
    /// A playback command was sent, waiting for its reply
    WaitingForReply,
    /// `record` was sent, waiting for the target to acknowledge
    WaitingForRecordingStart,
    /// Recording, waiting for the next command from the target
    WaitingForRecordedCommand,
    /// Terminal state, every event is ignored
    Disconnected,
}

impl State {
    /// All states, in declaration order
    pub const ALL: [State; 5] = [
        State::WaitingForServer,
        State::WaitingForReply,
        State::WaitingForRecordingStart,
        State::WaitingForRecordedCommand,
        State::Disconnected,
    ];

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitingForServer => "Waiting for Server",
            Self::WaitingForReply => "Waiting for Reply",
            Self::WaitingForRecordingStart => "Waiting for Recording to start",
            Self::WaitingForRecordedCommand => "Waiting for a Recorded Command",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The target's welcome line arrived
    InitialMessageReceived,
    /// A reply was accepted (pass, accepted failure, or record acknowledgement)
    CommandReplyReceived,
    /// A recorded command arrived and was persisted
    RecordCommandReceived,
    /// The script stack ran dry
    NoMoreCommandsToPlay,
    /// The transport closed
    Disconnect,
    /// A reply was a confirmed failure
    Error,
}

impl Event {
    /// All events, in declaration order
    pub const ALL: [Event; 6] = [
        Event::InitialMessageReceived,
        Event::CommandReplyReceived,
        Event::RecordCommandReceived,
        Event::NoMoreCommandsToPlay,
        Event::Disconnect,
        Event::Error,
    ];

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialMessageReceived => "Received Initial Message",
            Self::CommandReplyReceived => "Received Command Reply",
            Self::RecordCommandReceived => "Received Record Command",
            Self::NoMoreCommandsToPlay => "No more commands to play",
            Self::Disconnect => "Disconnected",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Work the engine performs for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send the `record` command
    StartRecording,
    /// Retransmit or read and send the next script command
    TransmitNext,
    /// Wait for the next recorded command
    AwaitRecordedCommand,
    /// Run the shutdown path with this outcome
    Shutdown(Outcome),
    /// Log a forced termination, then shut down with failure
    TerminateAndShutdown,
    /// Terminal state, drop the event silently
    Ignore,
    /// No handler for this event in this state
    Unexpected,
}

/// Result of looking up a `(state, event)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Action to run
    pub action: Action,
    /// State after the action
    pub next: State,
}

impl Transition {
    const fn to(action: Action, next: State) -> Self {
        Self { action, next }
    }

    const fn stay(state: State, action: Action) -> Self {
        Self { action, next: state }
    }
}

/// Look up the transition for `event` in `state`.
pub fn transition(state: State, event: Event, mode: Mode) -> Transition {
    use Action::{
        AwaitRecordedCommand, Ignore, Shutdown, StartRecording, TerminateAndShutdown,
        TransmitNext, Unexpected,
    };
    use Event::{
        CommandReplyReceived, Disconnect, Error, InitialMessageReceived, NoMoreCommandsToPlay,
        RecordCommandReceived,
    };
    use State::{
        Disconnected, WaitingForRecordedCommand, WaitingForRecordingStart, WaitingForReply,
        WaitingForServer,
    };

    match (state, event) {
        (Disconnected, _) => Transition::stay(Disconnected, Ignore),

        (WaitingForServer, InitialMessageReceived) => match mode {
            Mode::Record => Transition::to(StartRecording, WaitingForRecordingStart),
            Mode::Playback => Transition::to(TransmitNext, WaitingForReply),
        },
        (WaitingForServer, Error | Disconnect) => {
            Transition::to(Shutdown(Outcome::Failure), Disconnected)
        },

        (WaitingForReply, CommandReplyReceived) => Transition::to(TransmitNext, WaitingForReply),
        (WaitingForReply, NoMoreCommandsToPlay) => {
            Transition::to(Shutdown(Outcome::Success), Disconnected)
        },
        (WaitingForReply, Error) => Transition::to(Shutdown(Outcome::Failure), Disconnected),
        (WaitingForReply, Disconnect) => Transition::to(TerminateAndShutdown, Disconnected),

        (WaitingForRecordingStart, CommandReplyReceived) => {
            Transition::to(AwaitRecordedCommand, WaitingForRecordedCommand)
        },
        (WaitingForRecordingStart, Disconnect) => {
            Transition::to(Shutdown(Outcome::Failure), Disconnected)
        },

        (WaitingForRecordedCommand, RecordCommandReceived) => {
            Transition::to(AwaitRecordedCommand, WaitingForRecordedCommand)
        },
        (WaitingForRecordedCommand, Disconnect) => {
            Transition::to(Shutdown(Outcome::Failure), Disconnected)
        },

        (state, _) => Transition::stay(state, Unexpected),
    }
}
