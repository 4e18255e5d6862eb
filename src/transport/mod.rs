//! Transport to the target.
//!
//! A single TCP client connection carrying CRLF or LF terminated lines in
//! both directions.
//!
//! ```text
//! ┌──────────────┐   commands / "record"   ┌──────────────┐
//! │   Harness    │ ──────────────────────▶ │    Target    │
//! │  (client)    │ ◀────────────────────── │  (listener)  │
//! └──────────────┘   welcome / replies     └──────────────┘
//! ```
//!
//! Reads are framed by [`LineReader`], which is cancel-safe so it can sit in
//! a `tokio::select!` next to the retry timer.

mod tcp;

pub use tcp::{connect, connect_within, LineReader};
