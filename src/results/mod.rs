//! Result log.
//!
//! An append-only XML document recording what a playback session sent,
//! received and retried. Lines end in CRLF and attribute values are escaped.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <results>
//!     <welcome message="Test harness ready"/>
//!     <command request sent="tap login"/>
//!     <pass recv="OK"/>
//!     <command request sent="find item"/>
//!     <retry count="1" command="find item"/>
//!     <fail recv="ERROR: not found"/>
//! </results>
//! ```

use std::io::{self, Write};

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n";
const ROOT_OPEN: &str = "<results>\r\n";
const ROOT_CLOSE: &str = "</results>\r\n";

/// One result log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Target's welcome line
    Welcome(String),
    /// Command transmitted, trimmed
    Request(String),
    /// Passing reply
    Pass(String),
    /// Confirmed failing reply
    Fail(String),
    /// Retransmission of a command
    Retry {
        /// Retry count for this command
        count: u64,
        /// Command retransmitted, trimmed
        command: String,
    },
    /// A confirmed failure accepted by `failure-ok`
    AcceptedFailure,
    /// Transport dropped while a reply was outstanding
    ForcedTermination,
    /// Session ended with unread bytes left in the root script
    Terminated {
        /// Bytes left unread
        bytes_left: u64,
    },
}

impl Entry {
    /// Render as document text
    pub fn render(&self) -> String {
        match self {
            Self::Welcome(msg) => format!("\t<welcome message=\"{}\"/>\r\n", escape(msg)),
            Self::Request(cmd) => format!("\t<command request sent=\"{}\"/>\r\n", escape(cmd)),
            Self::Pass(recv) => format!("\t<pass recv=\"{}\"/>\r\n", escape(recv)),
            Self::Fail(recv) => format!("\t<fail recv=\"{}\"/>\r\n", escape(recv)),
            Self::Retry { count, command } => format!(
                "\t<retry count=\"{}\" command=\"{}\"/>\r\n",
                count,
                escape(command)
            ),
            Self::AcceptedFailure => "\t<warning reason=\"accepted-failure\"/>\r\n".to_string(),
            Self::ForcedTermination => "\t\t<fail terminated=\"true\"/>\r\n".to_string(),
            Self::Terminated { bytes_left } => format!(
                "\t<command>\r\n\
                 \t\t<request terminated=\"true\"/>\r\n\
                 \t\t<fail terminated=\"true\" bytesLeftInFile=\"{}\"/>\r\n\
                 \t</command>\r\n",
                bytes_left
            ),
        }
    }
}

/// Escape an attribute value
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            c => out.push(c),
        }
    }
    out
}

/// Result log writer
pub struct ResultLog {
    sink: Box<dyn Write + Send>,
    enabled: bool,
    opened: bool,
    closed: bool,
}

impl ResultLog {
    /// Log writing to `sink`
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink,
            enabled: true,
            opened: false,
            closed: false,
        }
    }

    /// Log that discards everything (record mode)
    pub fn disabled() -> Self {
        Self {
            sink: Box::new(io::sink()),
            enabled: false,
            opened: false,
            closed: false,
        }
    }

    /// Whether entries are written anywhere
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write the header and open the root element
    pub fn open(&mut self) -> io::Result<()> {
        if !self.enabled || self.opened {
            return Ok(());
        }
        self.opened = true;
        self.write_raw(HEADER)?;
        self.write_raw(ROOT_OPEN)
    }

    /// Append one entry
    pub fn append(&mut self, entry: &Entry) -> io::Result<()> {
        if !self.enabled || self.closed {
            return Ok(());
        }
        self.write_raw(&entry.render())
    }

    /// Close the root element; later appends are dropped
    pub fn close(&mut self) -> io::Result<()> {
        if !self.enabled || self.closed {
            return Ok(());
        }
        self.closed = true;
        self.write_raw(ROOT_CLOSE)
    }

    /// Whether the root element was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn write_raw(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()
    }
}

impl std::fmt::Debug for ResultLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultLog")
            .field("enabled", &self.enabled)
            .field("opened", &self.opened)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Shared in-memory sink for tests
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl Capture {
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }
}
