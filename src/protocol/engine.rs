//! Sans-IO protocol engine.
//!
//! The engine reacts to three inputs: a line from the target
//! ([`Engine::on_data`]), expiry of the retry delay
//! ([`Engine::on_retry_elapsed`]) and transport loss
//! ([`Engine::on_disconnect`]). Everything it wants done in return is queued:
//! bytes to transmit ([`Engine::take_output`]), timer requests
//! ([`Engine::take_timer`]) and, once finished, the [`Outcome`].

use std::collections::VecDeque;
use std::io::Write;
use std::time::Duration;

use bytes::Bytes;

use super::reply::{classify, judge, Verdict};
use super::session::Session;
use super::settings::{SettingChange, Settings};
use super::state::{transition, Action, Event, State};
use super::{Mode, Outcome, RECORD_COMMAND};
use crate::error::Result;
use crate::results::{Entry, ResultLog};
use crate::script::{CallOutcome, Directive, ScriptStack};

/// Request for the driver's retry timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Arm (or re-arm) a one-shot delay
    Arm(Duration),
    /// Drop any pending delay
    Cancel,
}

/// Protocol engine
pub struct Engine {
    session: Session,
    settings: Settings,
    script: ScriptStack,
    results: ResultLog,
    recording: Option<Box<dyn Write + Send>>,
    outbox: VecDeque<Bytes>,
    timer: Option<TimerCommand>,
    outcome: Option<Outcome>,
}

impl Engine {
    /// Playback engine reading `script` and writing `results`.
    ///
    /// The result document is opened immediately.
    pub fn playback(script: ScriptStack, results: ResultLog) -> Result<Self> {
        let mut engine = Self::new(Mode::Playback, script, results, None);
        engine.results.open()?;
        Ok(engine)
    }

    /// Record engine appending the target's command stream to `sink`
    pub fn record(sink: Box<dyn Write + Send>) -> Self {
        Self::new(
            Mode::Record,
            ScriptStack::empty(),
            ResultLog::disabled(),
            Some(sink),
        )
    }

    fn new(
        mode: Mode,
        script: ScriptStack,
        results: ResultLog,
        recording: Option<Box<dyn Write + Send>>,
    ) -> Self {
        let session = Session::new(mode);
        tracing::debug!("Initialising {} session {}", mode, session.id());
        Self {
            session,
            settings: Settings::new(),
            script,
            results,
            recording,
            outbox: VecDeque::new(),
            timer: None,
            outcome: None,
        }
    }

    /// Session record
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current state
    pub fn state(&self) -> State {
        self.session.state()
    }

    /// Outcome once shutdown has run
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether shutdown has run and the transport should close
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Next chunk of bytes to transmit
    pub fn take_output(&mut self) -> Option<Bytes> {
        self.outbox.pop_front()
    }

    /// Latest timer request since the last call
    pub fn take_timer(&mut self) -> Option<TimerCommand> {
        self.timer.take()
    }

    /// A line arrived from the target.
    ///
    /// Playback replies are trimmed; record lines are kept byte for byte.
    pub fn on_data(&mut self, raw: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(raw);
        let data = match self.session.mode() {
            Mode::Playback => text.trim(),
            Mode::Record => text.as_ref(),
        };
        tracing::info!(">> {}", data.trim_end_matches(['\r', '\n']));

        match self.session.state() {
            State::WaitingForServer => {
                self.results.append(&Entry::Welcome(data.to_string()))?;
                self.post(Event::InitialMessageReceived)
            },
            State::WaitingForRecordingStart => self.post(Event::CommandReplyReceived),
            State::WaitingForReply => self.handle_reply(data),
            State::WaitingForRecordedCommand => {
                self.persist(raw)?;
                self.post(Event::RecordCommandReceived)
            },
            State::Disconnected => Ok(()),
        }
    }

    /// The retry delay expired
    pub fn on_retry_elapsed(&mut self) -> Result<()> {
        if self.session.state() != State::WaitingForReply || self.session.retry_count() == 0 {
            tracing::debug!("Retry timer fired in {} with nothing to retry", self.state());
            return Ok(());
        }
        self.transmit_next()
    }

    /// The transport closed or failed
    pub fn on_disconnect(&mut self) -> Result<()> {
        self.post(Event::Disconnect)
    }

    /// Feed `event` through the transition table.
    pub fn post(&mut self, event: Event) -> Result<()> {
        let state = self.session.state();
        let t = transition(state, event, self.session.mode());
        tracing::debug!("Current State: {} event: {}", state, event);

        match t.action {
            Action::Ignore => Ok(()),
            Action::Unexpected => {
                tracing::warn!("Unexpected state transition, State: {}, event {}", state, event);
                Ok(())
            },
            Action::StartRecording => {
                self.session.set_state(t.next);
                self.outbox.push_back(Bytes::from_static(RECORD_COMMAND));
                Ok(())
            },
            Action::TransmitNext => {
                self.session.set_state(t.next);
                self.transmit_next()
            },
            Action::AwaitRecordedCommand => {
                self.session.set_state(t.next);
                Ok(())
            },
            Action::Shutdown(outcome) => self.shutdown(outcome),
            Action::TerminateAndShutdown => {
                self.results.append(&Entry::ForcedTermination)?;
                self.shutdown(Outcome::Failure)
            },
        }
    }

    /// Single terminal path. Later calls are no-ops.
    pub fn shutdown(&mut self, outcome: Outcome) -> Result<()> {
        if self.outcome.is_some() {
            return Ok(());
        }
        self.session.set_state(State::Disconnected);
        self.outcome = Some(outcome);
        self.timer = Some(TimerCommand::Cancel);

        if self.session.mode() == Mode::Playback {
            let bytes_left = self.script.root_remaining();
            if bytes_left > 0 {
                self.results.append(&Entry::Terminated { bytes_left })?;
            }
            self.results.close()?;
        }
        if let Some(sink) = self.recording.as_mut() {
            sink.flush()?;
        }

        let stats = self.session.stats();
        tracing::info!(
            session = %self.session.id(),
            outcome = ?outcome,
            commands = stats.commands_sent,
            passes = stats.passes,
            failures = stats.failures,
            accepted_failures = stats.accepted_failures,
            retries = stats.retries,
            recorded = stats.recorded_lines,
            uptime_secs = self.session.uptime_secs(),
            "Session finished"
        );
        Ok(())
    }

    fn handle_reply(&mut self, data: &str) -> Result<()> {
        let verdict = judge(classify(data), self.session.retry_count(), &self.settings);
        match verdict {
            Verdict::Retry { attempt, delay } => {
                self.session.bump_retry();
                tracing::debug!(
                    "Retry {} of {} in {:?}",
                    attempt,
                    self.settings.retry_max_intervals(),
                    delay
                );
                self.timer = Some(TimerCommand::Arm(delay));
                return Ok(());
            },
            Verdict::Pass => {
                self.results.append(&Entry::Pass(data.to_string()))?;
                self.session.stats_mut().passes += 1;
            },
            Verdict::AcceptedFailure => {
                self.results.append(&Entry::Fail(data.to_string()))?;
                self.results.append(&Entry::AcceptedFailure)?;
                self.session.stats_mut().accepted_failures += 1;
            },
            Verdict::Failure => {
                self.results.append(&Entry::Fail(data.to_string()))?;
                self.session.stats_mut().failures += 1;
            },
        }

        self.session.reset_retry();
        self.timer = Some(TimerCommand::Cancel);
        match verdict {
            Verdict::Failure => self.post(Event::Error),
            _ => self.post(Event::CommandReplyReceived),
        }
    }

    fn transmit_next(&mut self) -> Result<()> {
        let retry_count = self.session.retry_count();
        if retry_count > 0 {
            let command = match self.session.last_command() {
                Some(command) => command.clone(),
                None => {
                    return Err(crate::error::HarnessError::Protocol(
                        "retry requested before any command was sent".to_string(),
                    ))
                },
            };
            let trimmed = String::from_utf8_lossy(&command).trim().to_string();
            tracing::info!("RT {}", trimmed);
            self.results.append(&Entry::Retry {
                count: retry_count,
                command: trimmed,
            })?;
            self.outbox.push_back(command);
            return Ok(());
        }

        loop {
            let line = match self.script.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return self.post(Event::NoMoreCommandsToPlay),
                Err(e) => {
                    tracing::error!("Failed to read script: {}", e);
                    return self.shutdown(Outcome::Failure);
                },
            };

            match Directive::parse(&line) {
                Directive::Comment(text) => {
                    tracing::info!("CC {}", String::from_utf8_lossy(text));
                },
                Directive::Call(target) => {
                    let target = String::from_utf8_lossy(target);
                    match self.script.call(&target) {
                        Ok(CallOutcome::Entered(_) | CallOutcome::DepthExceeded) => {},
                        Err(e) => {
                            tracing::warn!("call {} failed: {}", target, e);
                            return self.post(Event::NoMoreCommandsToPlay);
                        },
                    }
                },
                Directive::Setting(args) => {
                    let args = String::from_utf8_lossy(args);
                    match args.parse::<SettingChange>() {
                        Ok(change) => self.settings.apply(change),
                        Err(e) => tracing::warn!("Ignoring cli-setting {}: {}", args.trim(), e),
                    }
                },
                Directive::Blank => tracing::info!(""),
                Directive::Command(command) => {
                    let bytes = Bytes::copy_from_slice(command);
                    let trimmed = String::from_utf8_lossy(command).trim().to_string();
                    tracing::info!("<< {}", trimmed);
                    self.outbox.push_back(bytes.clone());
                    self.results.append(&Entry::Request(trimmed))?;
                    self.session.remember(bytes);
                    return Ok(());
                },
            }
        }
    }

    fn persist(&mut self, raw: &[u8]) -> Result<()> {
        if let Some(sink) = self.recording.as_mut() {
            sink.write_all(raw)?;
            sink.flush()?;
            self.session.stats_mut().recorded_lines += 1;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("script", &self.script)
            .field("results", &self.results)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
