//! Settings Store driven by `cli-setting` directives.
//!
//! Values are typed at the directive boundary: every known key has an
//! expected [`SettingKind`] and a `cli-setting` whose value does not fit is
//! rejected before it reaches the store. Read sites therefore never parse.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Default for `retry`
pub const RETRY_DEFAULT: bool = false;
/// Default for `retry-interval`, in milliseconds
pub const RETRY_INTERVAL_DEFAULT_MS: u64 = 1000;
/// Default for `retry-max-intervals`
pub const RETRY_MAX_INTERVALS_DEFAULT: u64 = 30;
/// Default for `failure-ok`
pub const FAILURE_OK_DEFAULT: bool = false;

/// Kind of value a setting key expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// `1/0`, `true/false`, `yes/no`, `on/off`, or any integer
    Bool,
    /// Unsigned integer
    Integer,
    /// Free text
    Text,
}

/// Typed setting value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Boolean value
    Bool(bool),
    /// Unsigned integer value
    Integer(u64),
    /// Text value (unknown keys)
    Text(String),
}

impl SettingValue {
    /// Parse `raw` as a value of `kind`
    pub fn parse(kind: SettingKind, raw: &str) -> Option<Self> {
        match kind {
            SettingKind::Bool => parse_bool(raw).map(Self::Bool),
            SettingKind::Integer => raw.parse().ok().map(Self::Integer),
            SettingKind::Text => Some(Self::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n != 0),
    }
}

/// Setting key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `retry`: retransmit commands whose reply is not `OK`
    Retry,
    /// `retry-interval`: delay before a retransmission, in milliseconds
    RetryInterval,
    /// `retry-max-intervals`: retransmissions allowed per command
    RetryMaxIntervals,
    /// `failure-ok`: treat confirmed failures as passes
    FailureOk,
    /// Any other key; stored but never consulted
    Other(String),
}

impl SettingKey {
    /// Directive name of this key
    pub fn name(&self) -> &str {
        match self {
            Self::Retry => "retry",
            Self::RetryInterval => "retry-interval",
            Self::RetryMaxIntervals => "retry-max-intervals",
            Self::FailureOk => "failure-ok",
            Self::Other(name) => name,
        }
    }

    /// Kind of value this key accepts
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Retry | Self::FailureOk => SettingKind::Bool,
            Self::RetryInterval | Self::RetryMaxIntervals => SettingKind::Integer,
            Self::Other(_) => SettingKind::Text,
        }
    }
}

impl From<&str> for SettingKey {
    fn from(name: &str) -> Self {
        match name {
            "retry" => Self::Retry,
            "retry-interval" => Self::RetryInterval,
            "retry-max-intervals" => Self::RetryMaxIntervals,
            "failure-ok" => Self::FailureOk,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated `cli-setting` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    /// `cli-setting <key> <value>`
    Set(SettingKey, SettingValue),
    /// `cli-setting <key>`
    Remove(SettingKey),
}

impl FromStr for SettingChange {
    type Err = HarnessError;

    /// Parse the arguments that follow `cli-setting `.
    fn from_str(args: &str) -> Result<Self> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        match tokens.as_slice() {
            [key] => Ok(Self::Remove(SettingKey::from(*key))),
            [key, raw] => {
                let key = SettingKey::from(*key);
                let value = SettingValue::parse(key.kind(), raw).ok_or_else(|| {
                    HarnessError::InvalidSetting(format!(
                        "{key} expects a {:?} value, got '{raw}'",
                        key.kind()
                    ))
                })?;
                Ok(Self::Set(key, value))
            },
            _ => Err(HarnessError::InvalidSetting(format!(
                "expected 'cli-setting <key> [<value>]', got '{}'",
                args.trim()
            ))),
        }
    }
}

/// Mutable setting store, one per session
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<SettingKey, SettingValue>,
}

impl Settings {
    /// Create a store holding only defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a validated change
    pub fn apply(&mut self, change: SettingChange) {
        match change {
            SettingChange::Set(key, value) => {
                tracing::debug!("CLI setting set: {} = {}", key, value);
                self.values.insert(key, value);
            },
            SettingChange::Remove(key) => {
                tracing::debug!("CLI setting removed: {}", key);
                self.values.remove(&key);
            },
        }
    }

    /// Raw lookup, `None` when the key is unset
    pub fn get(&self, key: &SettingKey) -> Option<&SettingValue> {
        self.values.get(key)
    }

    fn bool_or(&self, key: &SettingKey, default: bool) -> bool {
        match self.values.get(key) {
            Some(SettingValue::Bool(b)) => *b,
            _ => default,
        }
    }

    fn integer_or(&self, key: &SettingKey, default: u64) -> u64 {
        match self.values.get(key) {
            Some(SettingValue::Integer(i)) => *i,
            _ => default,
        }
    }

    /// Whether non-`OK` replies are retried
    pub fn retry_enabled(&self) -> bool {
        self.bool_or(&SettingKey::Retry, RETRY_DEFAULT)
    }

    /// Delay before each retransmission
    pub fn retry_interval(&self) -> Duration {
        let millis = self.integer_or(&SettingKey::RetryInterval, RETRY_INTERVAL_DEFAULT_MS);
        Duration::from_millis(millis)
    }

    /// Retransmissions allowed per command
    pub fn retry_max_intervals(&self) -> u64 {
        self.integer_or(&SettingKey::RetryMaxIntervals, RETRY_MAX_INTERVALS_DEFAULT)
    }

    /// Whether confirmed failures are accepted
    pub fn failure_ok(&self) -> bool {
        self.bool_or(&SettingKey::FailureOk, FAILURE_OK_DEFAULT)
    }
}
