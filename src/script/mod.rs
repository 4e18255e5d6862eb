//! Script sources.
//!
//! A script is a line-oriented text file. Lines are either directives
//! interpreted by the engine or commands forwarded verbatim to the target;
//! see [`Directive`]. Scripts nest through `call`, managed by [`ScriptStack`].

mod directive;
mod stack;

pub use directive::{Directive, CALL_PREFIX, COMMENT_PREFIX, SETTING_PREFIX};
pub use stack::{CallOutcome, ScriptFile, ScriptStack};
