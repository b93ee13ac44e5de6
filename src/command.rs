//! Commands bind one event matcher to one action.
//!
//! A command never runs its action itself. The replay driver asks
//! `Command::matches` and, on a match, executes the action.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::matcher::MatcherRef;

/// Executable side effect supplied by the host.
pub trait Action: fmt::Debug + Send + Sync {
    /// Performs the side effect.
    fn execute(&self);

    /// Short name used in logs.
    fn name(&self) -> &str {
        "action"
    }
}

/// Shared handle to an action.
pub type ActionRef = Arc<dyn Action>;

/// Action backed by a closure.
pub struct FnAction<F> {
    name: String,
    f: F,
}

impl<F: Fn() + Send + Sync> FnAction<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Wraps the closure straight into an [`ActionRef`].
    pub fn shared(name: impl Into<String>, f: F) -> ActionRef
    where
        F: 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() + Send + Sync> Action for FnAction<F> {
    fn execute(&self) {
        (self.f)();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Unique identifier for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Create a new random command id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An (event matcher, action) pair.
///
/// Both parts are always present; there is no partially built command.
pub struct Command<E> {
    id: CommandId,
    matcher: MatcherRef<E>,
    action: ActionRef,
    description: Option<String>,
}

impl<E> Command<E> {
    /// Creates a command that runs `action` whenever `matcher` is fired.
    #[must_use]
    pub fn new(matcher: MatcherRef<E>, action: ActionRef) -> Self {
        Self {
            id: CommandId::new(),
            matcher,
            action,
            description: None,
        }
    }

    #[must_use]
    pub fn builder() -> CommandBuilder<E> {
        CommandBuilder::new()
    }

    #[must_use]
    pub const fn id(&self) -> CommandId {
        self.id
    }

    /// The action to run when this command fires.
    #[must_use]
    pub fn action(&self) -> &ActionRef {
        &self.action
    }

    /// The matcher deciding when this command fires.
    #[must_use]
    pub fn event_matcher(&self) -> &MatcherRef<E> {
        &self.matcher
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_action(&mut self, action: ActionRef) {
        self.action = action;
    }

    pub fn set_event_matcher(&mut self, matcher: MatcherRef<E>) {
        self.matcher = matcher;
    }

    /// Whether `event` should make this command fire. Delegates to the matcher.
    #[must_use]
    pub fn matches(&self, event: &E) -> bool {
        self.matcher.matches(event)
    }
}

impl<E> Clone for Command<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            matcher: self.matcher.clone(),
            action: Arc::clone(&self.action),
            description: self.description.clone(),
        }
    }
}

impl<E> fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("matcher", &self.matcher)
            .field("action", &self.action.name())
            .field("description", &self.description)
            .finish()
    }
}

/// Builder for [`Command`].
///
/// Reports a missing matcher or action as `ValidationError::MissingField`.
pub struct CommandBuilder<E> {
    id: Option<CommandId>,
    matcher: Option<MatcherRef<E>>,
    action: Option<ActionRef>,
    description: Option<String>,
}

impl<E> Default for CommandBuilder<E> {
    fn default() -> Self {
        Self {
            id: None,
            matcher: None,
            action: None,
            description: None,
        }
    }
}

impl<E> CommandBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command ID (optional, will be generated if not set).
    #[must_use]
    pub fn id(mut self, id: CommandId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn event_matcher(mut self, matcher: MatcherRef<E>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionRef) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the command.
    ///
    /// # Errors
    /// Returns `ValidationError::MissingField` if the matcher or the action is absent.
    pub fn build(self) -> Result<Command<E>, ValidationError> {
        let matcher = self.matcher.ok_or(ValidationError::MissingField {
            field: "event_matcher".to_string(),
        })?;

        let action = self.action.ok_or(ValidationError::MissingField {
            field: "action".to_string(),
        })?;

        Ok(Command {
            id: self.id.unwrap_or_default(),
            matcher,
            action,
            description: self.description,
        })
    }
}
