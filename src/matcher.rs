//! Event matchers: the subsumption capability at the heart of the engine.
//!
//! A matcher answers whether the occurrence of an event should be treated as
//! satisfying it. This is a generalize/specialize relation, not equality: a
//! matcher for "any job" is fired by an event naming job 7, but a matcher for
//! job 7 is not fired by an event about some other job.

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mask::Mask;
use crate::translator::Translator;

/// Where the events a matcher reacts to come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Driven by the state of the replayed script.
    Scripted,
    /// Driven by state outside the replay (the host engine).
    Static,
    /// Neither was declared.
    #[default]
    Unspecified,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scripted => write!(f, "scripted"),
            Self::Static => write!(f, "static"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Capability: "would the occurrence of `event` also satisfy me?"
///
/// # Contract
/// - Reflexivity: a matcher that is itself a concrete event (see
///   [`EventMatcher::as_event`]) is fired by that event.
/// - Decomposition: every matcher returned by [`EventMatcher::references`] is
///   subsumed, so anything that fires a reference also fires `self`.
///   Implementations overriding one of `references`/`is_fired_by` must
///   override the other consistently.
/// - `is_fired_by` is a total, side-effect free query.
pub trait EventMatcher<E>: fmt::Debug + Send + Sync {
    /// Whether the occurrence of `event` fires this matcher.
    fn is_fired_by(&self, event: &E) -> bool;

    /// Alias of [`EventMatcher::is_fired_by`], used from the command side.
    fn matches(&self, event: &E) -> bool {
        self.is_fired_by(event)
    }

    /// Matchers structurally subsumed by this one. Empty means atomic.
    fn references(&self) -> Vec<MatcherRef<E>> {
        Vec::new()
    }

    /// Scripted/static tag, fixed per matcher.
    fn classification(&self) -> Classification {
        Classification::Unspecified
    }

    /// True if the matcher reacts to replayed-script state.
    fn is_scripted(&self) -> bool {
        self.classification() == Classification::Scripted
    }

    /// True if the matcher reacts to engine-external state.
    fn is_static(&self) -> bool {
        self.classification() == Classification::Static
    }

    /// The concrete event this matcher stands for, if it is one.
    fn as_event(&self) -> Option<&E> {
        None
    }
}

/// Shared handle to a matcher.
///
/// Equality and hashing use reference identity: two handles are equal only if
/// they point at the same matcher instance, regardless of its contents.
pub struct MatcherRef<E>(Arc<dyn EventMatcher<E>>);

impl<E> MatcherRef<E> {
    /// Wraps `matcher` in a new shared handle.
    pub fn new<M>(matcher: M) -> Self
    where
        M: EventMatcher<E> + 'static,
    {
        Self(Arc::new(matcher))
    }

    /// Wraps an existing shared matcher without reallocating.
    #[must_use]
    pub fn from_arc(matcher: Arc<dyn EventMatcher<E>>) -> Self {
        Self(matcher)
    }

    /// Whether both handles point at the same matcher.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<E, M> From<Arc<M>> for MatcherRef<E>
where
    M: EventMatcher<E> + 'static,
{
    fn from(matcher: Arc<M>) -> Self {
        Self(matcher)
    }
}

impl<E> Clone for MatcherRef<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E> Deref for MatcherRef<E> {
    type Target = dyn EventMatcher<E>;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<E> PartialEq for MatcherRef<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<E> Eq for MatcherRef<E> {}

impl<E> std::hash::Hash for MatcherRef<E> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<E> fmt::Debug for MatcherRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Leaf matcher fired by events equal to the one it holds.
#[derive(Debug, Clone)]
pub struct EventIs<E> {
    event: E,
    classification: Classification,
}

impl<E> EventIs<E> {
    #[must_use]
    pub fn new(event: E) -> Self {
        Self {
            event,
            classification: Classification::Unspecified,
        }
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn event(&self) -> &E {
        &self.event
    }
}

impl<E> EventMatcher<E> for EventIs<E>
where
    E: PartialEq + fmt::Debug + Send + Sync,
{
    fn is_fired_by(&self, event: &E) -> bool {
        *event == self.event
    }

    fn classification(&self) -> Classification {
        self.classification
    }

    fn as_event(&self) -> Option<&E> {
        Some(&self.event)
    }
}

/// Leaf matcher fired by every event its [`Mask`] admits.
///
/// The mask is populated before the matcher is shared; afterwards it is
/// only read.
pub struct MaskMatcher<E, Tr> {
    mask: Mask<E, Tr>,
    classification: Classification,
}

impl<E, Tr: Translator<E>> MaskMatcher<E, Tr> {
    #[must_use]
    pub fn new(mask: Mask<E, Tr>) -> Self {
        Self {
            mask,
            classification: Classification::Unspecified,
        }
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn mask(&self) -> &Mask<E, Tr> {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut Mask<E, Tr> {
        &mut self.mask
    }
}

impl<E, Tr: fmt::Debug> fmt::Debug for MaskMatcher<E, Tr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskMatcher")
            .field("mask", &self.mask)
            .field("classification", &self.classification)
            .finish()
    }
}

impl<E, Tr> EventMatcher<E> for MaskMatcher<E, Tr>
where
    Tr: Translator<E> + fmt::Debug + Send + Sync,
{
    fn is_fired_by(&self, event: &E) -> bool {
        self.mask.accepts(event)
    }

    fn classification(&self) -> Classification {
        self.classification
    }
}

/// Matcher fired by every event.
///
/// Use this instead of an absent matcher when a command should fire as soon
/// as any event occurs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Always {
    classification: Classification,
}

impl Always {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            classification: Classification::Unspecified,
        }
    }

    #[must_use]
    pub const fn with_classification(classification: Classification) -> Self {
        Self { classification }
    }
}

impl<E> EventMatcher<E> for Always {
    fn is_fired_by(&self, _event: &E) -> bool {
        true
    }

    fn classification(&self) -> Classification {
        self.classification
    }
}

/// Union matcher: fired if any child is fired.
///
/// Children are captured at construction, deduplicated by identity and kept
/// in first-seen order.
pub struct AnyOf<E> {
    children: Vec<MatcherRef<E>>,
    classification: Classification,
}

impl<E> AnyOf<E> {
    /// Creates a union over `children`.
    pub fn new(children: impl IntoIterator<Item = MatcherRef<E>>) -> Self {
        Self::from_optional(children.into_iter().map(Some))
    }

    /// Creates a union over the present entries of `children`; `None` is discarded.
    pub fn from_optional(children: impl IntoIterator<Item = Option<MatcherRef<E>>>) -> Self {
        let mut seen = HashSet::new();
        let children = children
            .into_iter()
            .flatten()
            .filter(|child| seen.insert(child.addr()))
            .collect();

        Self {
            children,
            classification: Classification::Unspecified,
        }
    }

    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn children(&self) -> &[MatcherRef<E>] {
        &self.children
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<E> fmt::Debug for AnyOf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyOf")
            .field("children", &self.children)
            .field("classification", &self.classification)
            .finish()
    }
}

impl<E> EventMatcher<E> for AnyOf<E> {
    fn is_fired_by(&self, event: &E) -> bool {
        self.children.iter().any(|child| child.is_fired_by(event))
    }

    fn references(&self) -> Vec<MatcherRef<E>> {
        self.children.clone()
    }

    fn classification(&self) -> Classification {
        self.classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::{IndexedTranslator, KeyTranslator, RangeTranslator};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Letter {
        A,
        B,
        C,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum JobEvent {
        Started { job: i64 },
        Finished { job: i64 },
    }

    #[test]
    fn event_is_is_reflexive_and_exact() {
        let m = EventIs::new(Letter::A);
        assert!(m.is_fired_by(&Letter::A));
        assert!(!m.is_fired_by(&Letter::B));
        assert_eq!(m.as_event(), Some(&Letter::A));
        assert!(m.matches(&Letter::A));
    }

    #[test]
    fn mask_matcher_generalizes_over_jobs() {
        let job_of = |e: &JobEvent| match e {
            JobEvent::Started { job } => Some(*job),
            JobEvent::Finished { .. } => None,
        };
        let translator = KeyTranslator::new(RangeTranslator::with_count(16).unwrap(), job_of);
        let mut any_start: MaskMatcher<JobEvent, _> =
            MaskMatcher::new(Mask::new(translator).unwrap());
        any_start.mask_mut().accept_all();

        assert!(any_start.is_fired_by(&JobEvent::Started { job: 3 }));
        assert!(any_start.is_fired_by(&JobEvent::Started { job: 15 }));
        assert!(!any_start.is_fired_by(&JobEvent::Started { job: 16 }));
        assert!(!any_start.is_fired_by(&JobEvent::Finished { job: 3 }));
        assert!(any_start.references().is_empty());
    }

    #[test]
    fn any_of_is_union_of_children() {
        let a = MatcherRef::new(EventIs::new(Letter::A));
        let b = MatcherRef::new(EventIs::new(Letter::B));
        let or = AnyOf::new([a.clone(), b.clone()]);

        assert!(or.is_fired_by(&Letter::A));
        assert!(or.is_fired_by(&Letter::B));
        assert!(!or.is_fired_by(&Letter::C));

        let refs: HashSet<_> = or.references().into_iter().collect();
        assert_eq!(refs, HashSet::from([a, b]));
    }

    #[test]
    fn any_of_drops_none_and_identity_duplicates() {
        let a = MatcherRef::new(EventIs::new(Letter::A));
        let a_again = MatcherRef::new(EventIs::new(Letter::A));
        let or = AnyOf::from_optional([
            Some(a.clone()),
            None,
            Some(a.clone()),
            Some(a_again.clone()),
        ]);

        // Structurally equal but distinct instances are kept apart.
        assert_eq!(or.len(), 2);
        assert!(or.children()[0].ptr_eq(&a));
        assert!(or.children()[1].ptr_eq(&a_again));
    }

    #[test]
    fn empty_union_never_fires() {
        let or: AnyOf<Letter> = AnyOf::new([]);
        assert!(or.is_empty());
        assert!(!or.is_fired_by(&Letter::A));
    }

    #[test]
    fn nested_unions_fire_transitively() {
        let abc = IndexedTranslator::new([Letter::A, Letter::B, Letter::C]).unwrap();
        let mut only_c = Mask::new(abc).unwrap();
        only_c.accept(&Letter::C).unwrap();

        let inner = MatcherRef::new(AnyOf::new([MatcherRef::new(MaskMatcher::new(only_c))]));
        let outer = AnyOf::new([inner, MatcherRef::new(EventIs::new(Letter::A))]);

        assert!(outer.is_fired_by(&Letter::A));
        assert!(!outer.is_fired_by(&Letter::B));
        assert!(outer.is_fired_by(&Letter::C));
    }

    #[test]
    fn classification_is_explicit() {
        let scripted = EventIs::new(Letter::A).with_classification(Classification::Scripted);
        assert!(scripted.is_scripted());
        assert!(!scripted.is_static());

        let stat = Always::with_classification(Classification::Static);
        assert!(EventMatcher::<Letter>::is_static(&stat));
        assert!(!EventMatcher::<Letter>::is_scripted(&stat));

        let plain = AnyOf::<Letter>::new([]);
        assert_eq!(plain.classification(), Classification::Unspecified);
        assert!(!plain.is_scripted() && !plain.is_static());
    }

    #[test]
    fn always_fires_for_everything() {
        let m = MatcherRef::<Letter>::new(Always::new());
        assert!(m.is_fired_by(&Letter::A));
        assert!(m.is_fired_by(&Letter::C));
    }

    #[test]
    fn matcher_ref_equality_is_identity() {
        let shared = Arc::new(EventIs::new(Letter::B));
        let x: MatcherRef<Letter> = MatcherRef::from(Arc::clone(&shared));
        let y: MatcherRef<Letter> = MatcherRef::from(shared);
        let z = MatcherRef::new(EventIs::new(Letter::B));
        assert_eq!(x, y);
        assert_ne!(x, z);
    }
}
