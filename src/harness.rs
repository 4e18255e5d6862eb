//! Async driver.
//!
//! Connects the sans-IO [`Engine`] to a byte stream. One task owns the
//! engine, the socket halves and the retry timer; each loop iteration flushes
//! queued output, applies timer requests and then waits for either a line
//! from the target or the retry delay.
//!
//! ```text
//!            ┌──────────── take_output ────────────┐
//!            │                                      ▼
//! ┌────────────────┐  on_data / on_disconnect  ┌──────────┐
//! │     Engine     │ ◀──────────────────────── │  Socket  │
//! └────────────────┘                           └──────────┘
//!            ▲   │ take_timer
//!            │   ▼
//!     on_retry_elapsed ◀── Sleep
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Sleep;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{HarnessError, Result};
use crate::protocol::{Engine, Mode, Outcome, TimerCommand};
use crate::results::ResultLog;
use crate::script::ScriptStack;
use crate::transport::{connect, LineReader};

/// One harness invocation
#[derive(Debug, Clone)]
pub struct Harness {
    config: Config,
    mode: Mode,
    script: PathBuf,
    output: Option<PathBuf>,
}

impl Harness {
    /// Play back the script at `script`
    pub fn playback(config: Config, script: impl Into<PathBuf>) -> Self {
        Self {
            config,
            mode: Mode::Playback,
            script: script.into(),
            output: None,
        }
    }

    /// Record the target's command stream into `target`
    pub fn record(config: Config, target: impl Into<PathBuf>) -> Self {
        Self {
            config,
            mode: Mode::Record,
            script: target.into(),
            output: None,
        }
    }

    /// Write the result log to `path` instead of stdout
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Build the engine without connecting.
    ///
    /// In Playback this opens the root script and writes the result log
    /// header; in Record it creates or truncates the target file.
    pub fn build_engine(&self) -> Result<Engine> {
        match self.mode {
            Mode::Playback => {
                let stack = ScriptStack::open(&self.script)
                    .map_err(|e| match e {
                        HarnessError::Io(io) if io.kind() == io::ErrorKind::NotFound => {
                            HarnessError::ScriptNotFound(self.script.display().to_string())
                        },
                        other => other,
                    })?
                    .with_max_depth(self.config.script.max_call_depth)
                    .with_max_line_length(self.config.script.max_line_length);

                let sink: Box<dyn Write + Send> = match &self.output {
                    Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                    None => Box::new(io::stdout()),
                };
                Engine::playback(stack, ResultLog::new(sink))
            },
            Mode::Record => {
                let file = File::create(&self.script)?;
                Ok(Engine::record(Box::new(BufWriter::new(file))))
            },
        }
    }

    /// Build the engine, connect and drive the session to completion.
    ///
    /// Connect failures are returned as errors; everything after that is an
    /// [`Outcome`].
    pub async fn run(&self) -> Result<Outcome> {
        let mut engine = self.build_engine()?;
        let span = tracing::info_span!(
            "session",
            id = %engine.session().id(),
            mode = %self.mode
        );

        let connection = self.config.connection.clone();
        let max_line_length = self.config.script.max_line_length;
        async move {
            let stream = connect(
                &connection.host,
                connection.port,
                connection.connect_timeout(),
            )
            .await?;
            drive(&mut engine, stream, max_line_length).await
        }
        .instrument(span)
        .await
    }
}

/// Run `engine` over `stream` until it reaches an outcome.
///
/// End of stream and read or write errors are reported to the engine as a
/// disconnect. The write half is shut down once the engine finishes.
pub async fn drive<S>(engine: &mut Engine, stream: S, max_line_length: usize) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = LineReader::new(BufReader::new(read_half), max_line_length);
    let mut retry: Option<Pin<Box<Sleep>>> = None;

    loop {
        if let Err(e) = flush_output(engine, &mut write_half).await {
            tracing::warn!("Write to target failed: {}", e);
            engine.on_disconnect()?;
        }

        match engine.take_timer() {
            Some(TimerCommand::Arm(delay)) => retry = Some(Box::pin(tokio::time::sleep(delay))),
            Some(TimerCommand::Cancel) => retry = None,
            None => {},
        }

        if let Some(outcome) = engine.outcome() {
            if let Err(e) = write_half.shutdown().await {
                tracing::debug!("Socket shutdown failed: {}", e);
            }
            return Ok(outcome);
        }

        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => engine.on_data(&line)?,
                Ok(None) => {
                    tracing::info!("Target closed the connection");
                    engine.on_disconnect()?;
                },
                Err(e) => {
                    tracing::warn!("Read from target failed: {}", e);
                    engine.on_disconnect()?;
                },
            },
            () = retry_elapsed(&mut retry) => {
                retry = None;
                engine.on_retry_elapsed()?;
            },
        }
    }
}

async fn flush_output<W>(engine: &mut Engine, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut wrote = false;
    while let Some(chunk) = engine.take_output() {
        writer.write_all(&chunk).await?;
        wrote = true;
    }
    if wrote {
        writer.flush().await?;
    }
    Ok(())
}

async fn retry_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
