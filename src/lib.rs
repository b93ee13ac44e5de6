//! # cuefire - Event subsumption and matching for cue playback
//!
//! cuefire decides which configured commands fire while a scripted run is
//! replayed. A host feeds occurring events to the engine; each event-driven
//! command asks its matcher whether the event satisfies it and, if so, the
//! bound action is executed.
//!
//! ## Core Concepts
//!
//! - **Translator**: Deterministic mapping from a domain item to a dense integer identifier
//! - **Mask**: Bitset admit-set over a translator's identifier range (O(1) membership)
//! - **EventMatcher**: "Would the occurrence of this event also satisfy me?"
//! - **AnyOf**: Union of child matchers
//! - **Command**: One matcher bound to one action
//! - **Settings**: Commands ordered into pre-run, event-driven and post-run phases
//!
//! ## Usage
//!
//! ```rust
//! use cuefire::{AnyOf, Command, EventIs, FnAction, MatcherRef, Replay, ReplayConfig, Settings};
//!
//! #[derive(Debug, PartialEq)]
//! enum Event { JobStarted(u32), JobFinished(u32) }
//!
//! let either = AnyOf::new([
//!     MatcherRef::new(EventIs::new(Event::JobStarted(1))),
//!     MatcherRef::new(EventIs::new(Event::JobFinished(1))),
//! ]);
//!
//! let mut settings = Settings::new();
//! settings.push_event_driven(Command::new(
//!     MatcherRef::new(either),
//!     FnAction::shared("blink", || println!("job 1 changed")),
//! ));
//!
//! let report = Replay::run(
//!     &settings,
//!     ReplayConfig::default(),
//!     [Event::JobStarted(1), Event::JobStarted(2), Event::JobFinished(1)],
//! )?;
//! assert_eq!(report.fired, 2);
//! # Ok::<(), cuefire::CueError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod error;
pub mod mask;
pub mod matcher;
pub mod registry;
pub mod replay;
pub mod settings;
pub mod translator;

// Re-export primary types at crate root for convenience
pub use command::{Action, ActionRef, Command, CommandBuilder, CommandId, FnAction};
pub use error::{ConfigurationError, CueError, CueResult, ReplayError, ValidationError};
pub use mask::Mask;
pub use matcher::{Always, AnyOf, Classification, EventIs, EventMatcher, MaskMatcher, MatcherRef};
pub use registry::{MatcherId, MatcherRegistry};
pub use replay::{Firing, Replay, ReplayConfig, ReplayReport, ReplayState};
pub use settings::{Phase, Settings};
pub use translator::{Identifier, IndexedTranslator, KeyTranslator, RangeTranslator, Translator};
