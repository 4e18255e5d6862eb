//! # Cascades Harness - Scriptable TCP test-harness client
//!
//! Drives a remote target over a single TCP connection by sending
//! line-oriented commands from a script and checking each reply, or records
//! the commands a target emits into a new script.
//!
//! ## Modes
//!
//! - **Playback**: read a script, send each command, judge each reply
//!   (`OK...` passes), retry on failure when enabled and write a result log.
//! - **Record**: send `record\r\n`, then append every line the target sends
//!   to the output script verbatim.
//!
//! ### State Machine
//!
//! ```text
//!                   InitialMessage (Playback)
//!  [WaitingForServer] ────────────────────────> [WaitingForReply] ◀─┐
//!         │                                           │  │  Reply  │
//!         │ InitialMessage (Record)                   │  └─────────┘
//!         v                                           │
//!  [WaitingForRecordingStart]                         │ NoMoreCommands / Error
//!         │ Reply                                     │ / Disconnect
//!         v                                           v
//!  [WaitingForRecordedCommand] ───── Disconnect ──> [Disconnected]
//! ```
//!
//! ### Script Lines
//!
//! | Line                      | Effect                                  |
//! |---------------------------|-----------------------------------------|
//! | `# ...`                   | Comment, echoed to the console          |
//! | `call <path>`             | Continue reading from `<path>`          |
//! | `cli-setting <key> [<v>]` | Set or remove a session setting         |
//! | blank                     | Ignored                                 |
//! | anything else             | Sent to the target, reply awaited       |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cascades::{Config, Harness};
//!
//! let harness = Harness::playback(Config::default(), "login.txt")
//!     .with_output("results.xml");
//! let outcome = harness.run().await?;
//! std::process::exit(outcome.exit_code().into());
//! ```
//!
//! The engine itself does no I/O and can be driven by hand:
//!
//! ```rust,ignore
//! use cascades::protocol::Engine;
//!
//! engine.on_data(b"Welcome\r\n")?;
//! while let Some(bytes) = engine.take_output() {
//!     socket.write_all(&bytes)?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod harness;
pub mod protocol;
pub mod results;
pub mod script;
pub mod transport;

// Re-exports for convenience
pub use config::Config;
pub use error::{HarnessError, Result};
pub use harness::{drive, Harness};
pub use protocol::{Engine, Mode, Outcome, Session, Settings, State};
pub use results::{Entry, ResultLog};
pub use script::{Directive, ScriptStack};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
