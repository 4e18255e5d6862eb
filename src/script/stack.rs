//! Script stack: the root script plus every file entered through `call`.
//!
//! The stack is an owned `Vec` with the root at index 0. End of file pops the
//! top and reading continues from the new top, in a loop bounded by the stack
//! length. Pushing is refused once `max_depth` files are open, which makes a
//! self-referential `call` behave like a call to an empty file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_LINE_LENGTH};
use crate::error::{HarnessError, Result};

/// One open script source
pub struct ScriptFile {
    name: PathBuf,
    reader: Box<dyn BufRead + Send>,
    len: u64,
    consumed: u64,
}

impl ScriptFile {
    /// Open a script on disk
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(Self {
            name: path.to_path_buf(),
            reader: Box::new(BufReader::new(file)),
            len: metadata.len(),
            consumed: 0,
        })
    }

    /// In-memory script
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            len: bytes.len() as u64,
            reader: Box::new(Cursor::new(bytes)),
            consumed: 0,
        }
    }

    /// Path or name of this script
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.consumed)
    }

    /// Read one line of at most `max_len` bytes, terminator included.
    ///
    /// Returns `None` at end of file. A longer line is returned in pieces,
    /// split on byte boundaries.
    pub fn read_line(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let n = (&mut self.reader)
            .take(max_len.max(1) as u64)
            .read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.consumed += n as u64;
        Ok(Some(buf))
    }
}

impl std::fmt::Debug for ScriptFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptFile")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

/// Result of a `call` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// File opened and pushed; reading continues from it
    Entered(PathBuf),
    /// Depth bound reached; the call contributes no lines
    DepthExceeded,
}

/// Stack of open scripts
#[derive(Debug)]
pub struct ScriptStack {
    files: Vec<ScriptFile>,
    root_dir: Option<PathBuf>,
    max_depth: usize,
    max_line_length: usize,
}

impl ScriptStack {
    /// Create a stack whose root is `root`
    pub fn new(root: ScriptFile) -> Self {
        let root_dir = root
            .name()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        Self {
            files: vec![root],
            root_dir,
            max_depth: DEFAULT_MAX_CALL_DEPTH,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Open the root script at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ScriptFile::open(path)?))
    }

    /// Stack with no input at all (record mode)
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            root_dir: None,
            max_depth: DEFAULT_MAX_CALL_DEPTH,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set the maximum number of open files, root included
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Set the longest line returned in one piece
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Number of open files
    pub fn depth(&self) -> usize {
        self.files.len()
    }

    /// Whether every file has been exhausted
    pub fn is_exhausted(&self) -> bool {
        self.files.is_empty()
    }

    /// Unread bytes left in the root script
    pub fn root_remaining(&self) -> u64 {
        self.files.first().map_or(0, ScriptFile::remaining)
    }

    /// Next line from the top of the stack, popping exhausted files.
    ///
    /// `None` once the root itself is exhausted.
    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        while let Some(top) = self.files.last_mut() {
            if let Some(line) = top.read_line(self.max_line_length)? {
                return Ok(Some(line));
            }
            self.files.pop();
            if let Some(next) = self.files.last() {
                tracing::info!("IO Now reading from: {}", next.name().display());
            }
        }
        Ok(None)
    }

    /// Enter `target`, resolved against the working directory first and the
    /// root script's directory second.
    pub fn call(&mut self, target: &str) -> Result<CallOutcome> {
        if self.files.len() >= self.max_depth {
            tracing::warn!(
                "call {} ignored: nesting limit of {} reached",
                target,
                self.max_depth
            );
            return Ok(CallOutcome::DepthExceeded);
        }

        let file = self.resolve(target)?;
        let name = file.name().to_path_buf();
        tracing::info!("IO Now reading from: {}", name.display());
        self.files.push(file);
        Ok(CallOutcome::Entered(name))
    }

    fn resolve(&self, target: &str) -> Result<ScriptFile> {
        match ScriptFile::open(target) {
            Ok(file) => Ok(file),
            Err(first) => {
                tracing::debug!("{} not in working directory: {}", target, first);
                self.root_dir
                    .as_ref()
                    .and_then(|dir| ScriptFile::open(dir.join(target)).ok())
                    .ok_or_else(|| HarnessError::ScriptNotFound(target.to_string()))
            },
        }
    }
}
