//! Playback settings: commands ordered into run phases plus the matcher universe.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::ConfigurationError;
use crate::matcher::MatcherRef;
use crate::registry::{MatcherId, MatcherRegistry};

/// Phase of a replay a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Runs once, unconditionally, before any event is fed.
    Pre,
    /// Tested against every fed event.
    EventDriven,
    /// Runs once, unconditionally, after the run ends.
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::EventDriven => write!(f, "event_driven"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Ordered command phases and the registered matchers they rely on.
///
/// Assembled once during configuration and read-only during replay.
pub struct Settings<E> {
    pre: Vec<Command<E>>,
    event_driven: Vec<Command<E>>,
    post: Vec<Command<E>>,
    registry: MatcherRegistry<E>,
}

impl<E> Default for Settings<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Settings<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("pre", &self.pre)
            .field("event_driven", &self.event_driven)
            .field("post", &self.post)
            .field("matchers", &self.registry.len())
            .finish()
    }
}

impl<E> Settings<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pre: Vec::new(),
            event_driven: Vec::new(),
            post: Vec::new(),
            registry: MatcherRegistry::new(),
        }
    }

    /// Appends `command` to `phase` and registers its matcher tree.
    pub fn push(&mut self, phase: Phase, command: Command<E>) {
        let matcher = self.registry.register_tree(command.event_matcher().clone());
        tracing::debug!(
            command = %command.id(),
            %phase,
            %matcher,
            "command added"
        );
        self.phase_mut(phase).push(command);
    }

    pub fn push_pre(&mut self, command: Command<E>) {
        self.push(Phase::Pre, command);
    }

    pub fn push_event_driven(&mut self, command: Command<E>) {
        self.push(Phase::EventDriven, command);
    }

    pub fn push_post(&mut self, command: Command<E>) {
        self.push(Phase::Post, command);
    }

    /// Registers a matcher (and what it references) without binding it to a command.
    pub fn register(&mut self, matcher: MatcherRef<E>) -> MatcherId {
        self.registry.register_tree(matcher)
    }

    #[must_use]
    pub fn pre(&self) -> &[Command<E>] {
        &self.pre
    }

    #[must_use]
    pub fn event_driven(&self) -> &[Command<E>] {
        &self.event_driven
    }

    #[must_use]
    pub fn post(&self) -> &[Command<E>] {
        &self.post
    }

    /// Commands of `phase`, in insertion order.
    #[must_use]
    pub fn commands(&self, phase: Phase) -> &[Command<E>] {
        match phase {
            Phase::Pre => &self.pre,
            Phase::EventDriven => &self.event_driven,
            Phase::Post => &self.post,
        }
    }

    /// The deduplicated set of known matchers.
    #[must_use]
    pub fn registry(&self) -> &MatcherRegistry<E> {
        &self.registry
    }

    /// Total number of commands across all phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pre.len() + self.event_driven.len() + self.post.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates the matcher graph. See [`MatcherRegistry::validate`].
    ///
    /// # Errors
    /// Propagates the first `ConfigurationError` found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.registry.validate()
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut Vec<Command<E>> {
        match phase {
            Phase::Pre => &mut self.pre,
            Phase::EventDriven => &mut self.event_driven,
            Phase::Post => &mut self.post,
        }
    }
}
