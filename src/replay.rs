//! Synchronous replay driver.
//!
//! `Replay` walks the configured phases of a [`Settings`]: pre commands run
//! once at start, every fed event is tested against each event-driven command
//! in order, and post commands run once at the end. Events are fed by the
//! caller in the order they occur in the replayed script; nothing here blocks
//! or keeps time.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandId};
use crate::error::{CueResult, ReplayError};
use crate::settings::{Phase, Settings};

/// Replay driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Validate the matcher graph before running pre commands.
    pub validate_on_start: bool,
    /// Run post commands when a replay is aborted.
    pub run_post_on_abort: bool,
    /// Keep a per-firing log in the report.
    pub record_firings: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            validate_on_start: true,
            run_post_on_abort: false,
            record_firings: true,
        }
    }
}

/// Lifecycle of a [`Replay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Idle,
    Running,
    Finished,
    Aborted,
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firing {
    /// Command whose action ran.
    pub command_id: CommandId,
    /// Phase the command belongs to.
    pub phase: Phase,
    /// Zero-based position of the triggering event; `None` for pre/post commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_index: Option<u64>,
    /// When the action was executed.
    pub at: DateTime<Utc>,
}

/// Summary of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// State when the report was taken.
    pub state: ReplayState,
    /// `None` if the report was taken before [`Replay::start`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the report was taken.
    pub ended_at: DateTime<Utc>,
    /// Number of events passed to [`Replay::feed`].
    pub events_fed: u64,
    /// Number of actions executed across all phases.
    pub fired: u64,
    /// Per-action records, empty unless `record_firings` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firings: Vec<Firing>,
}

/// Drives one replay over borrowed settings.
pub struct Replay<'s, E> {
    settings: &'s Settings<E>,
    config: ReplayConfig,
    state: ReplayState,
    started_at: Option<DateTime<Utc>>,
    events_fed: u64,
    fired: u64,
    firings: Vec<Firing>,
}

impl<E> fmt::Debug for Replay<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replay")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("events_fed", &self.events_fed)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}

impl<'s, E> Replay<'s, E> {
    #[must_use]
    pub fn new(settings: &'s Settings<E>, config: ReplayConfig) -> Self {
        Self {
            settings,
            config,
            state: ReplayState::Idle,
            started_at: None,
            events_fed: 0,
            fired: 0,
            firings: Vec::new(),
        }
    }

    /// Runs a whole replay: start, feed every event, finish.
    ///
    /// # Errors
    /// Propagates validation failures from [`Replay::start`].
    pub fn run<I>(
        settings: &'s Settings<E>,
        config: ReplayConfig,
        events: I,
    ) -> CueResult<ReplayReport>
    where
        I: IntoIterator,
        I::Item: Borrow<E>,
    {
        let mut replay = Self::new(settings, config);
        replay.start()?;
        for event in events {
            replay.feed(event.borrow())?;
        }
        replay.finish()
    }

    #[must_use]
    pub const fn state(&self) -> ReplayState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Validates (if configured) and runs every pre command once, in order.
    ///
    /// # Errors
    /// - `ReplayError::InvalidState` unless the replay is idle
    /// - `ConfigurationError` from validation; the replay stays idle
    pub fn start(&mut self) -> CueResult<()> {
        self.expect_state(ReplayState::Idle, "start")?;

        if self.config.validate_on_start {
            self.settings.validate()?;
        }

        self.state = ReplayState::Running;
        self.started_at = Some(Utc::now());
        tracing::debug!(
            pre = self.settings.pre().len(),
            event_driven = self.settings.event_driven().len(),
            post = self.settings.post().len(),
            "replay started"
        );

        let settings = self.settings;
        for command in settings.pre() {
            self.fire(command, Phase::Pre, None);
        }
        Ok(())
    }

    /// Tests `event` against every event-driven command and runs the matches.
    ///
    /// Returns the number of commands fired.
    ///
    /// # Errors
    /// `ReplayError::InvalidState` unless the replay is running.
    pub fn feed(&mut self, event: &E) -> CueResult<usize> {
        self.expect_state(ReplayState::Running, "feed")?;

        let index = self.events_fed;
        self.events_fed += 1;

        let settings = self.settings;
        let mut fired = 0;
        for command in settings.event_driven() {
            if command.matches(event) {
                self.fire(command, Phase::EventDriven, Some(index));
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Runs every post command once and ends the replay.
    ///
    /// # Errors
    /// `ReplayError::InvalidState` unless the replay is running.
    pub fn finish(&mut self) -> CueResult<ReplayReport> {
        self.expect_state(ReplayState::Running, "finish")?;
        self.run_post();
        self.state = ReplayState::Finished;
        tracing::debug!(events = self.events_fed, fired = self.fired, "replay finished");
        Ok(self.report())
    }

    /// Stops feeding events. Post commands run only if `run_post_on_abort` is set.
    ///
    /// # Errors
    /// `ReplayError::InvalidState` unless the replay is running.
    pub fn abort(&mut self) -> CueResult<ReplayReport> {
        self.expect_state(ReplayState::Running, "abort")?;
        if self.config.run_post_on_abort {
            self.run_post();
        }
        self.state = ReplayState::Aborted;
        tracing::warn!(
            events = self.events_fed,
            post_ran = self.config.run_post_on_abort,
            "replay aborted"
        );
        Ok(self.report())
    }

    /// Snapshot of progress so far.
    #[must_use]
    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            state: self.state,
            started_at: self.started_at,
            ended_at: Utc::now(),
            events_fed: self.events_fed,
            fired: self.fired,
            firings: self.firings.clone(),
        }
    }

    fn run_post(&mut self) {
        let settings = self.settings;
        for command in settings.post() {
            self.fire(command, Phase::Post, None);
        }
    }

    fn fire(&mut self, command: &Command<E>, phase: Phase, event_index: Option<u64>) {
        tracing::trace!(
            command = %command.id(),
            action = command.action().name(),
            %phase,
            ?event_index,
            "command fired"
        );
        command.action().execute();
        self.fired += 1;

        if self.config.record_firings {
            self.firings.push(Firing {
                command_id: command.id(),
                phase,
                event_index,
                at: Utc::now(),
            });
        }
    }

    fn expect_state(
        &self,
        expected: ReplayState,
        operation: &'static str,
    ) -> Result<(), ReplayError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ReplayError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
