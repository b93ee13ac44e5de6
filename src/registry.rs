//! Arena of registered matchers and validation of the reference graph.
//!
//! Matchers are stored once each (by identity) and addressed by a dense
//! `MatcherId`. Graph checks walk ids rather than following shared pointers
//! directly, which keeps cycle detection explicit.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::matcher::MatcherRef;

/// Index of a matcher inside a [`MatcherRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatcherId(usize);

impl MatcherId {
    /// Wraps a raw arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Identity-deduplicated set of matchers known to a configuration.
pub struct MatcherRegistry<E> {
    matchers: Vec<MatcherRef<E>>,
    index: HashMap<usize, MatcherId>,
}

impl<E> Default for MatcherRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for MatcherRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("matchers", &self.matchers)
            .finish_non_exhaustive()
    }
}

impl<E> MatcherRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers `matcher`, returning its id. Registering the same instance
    /// twice returns the original id.
    pub fn register(&mut self, matcher: MatcherRef<E>) -> MatcherId {
        let addr = matcher.addr();
        if let Some(id) = self.index.get(&addr) {
            return *id;
        }

        let id = MatcherId(self.matchers.len());
        self.matchers.push(matcher);
        self.index.insert(addr, id);
        tracing::trace!(matcher = %id, "registered matcher");
        id
    }

    /// Registers `root` and everything reachable through `references()`.
    ///
    /// Safe on cyclic graphs: each instance is visited once.
    pub fn register_tree(&mut self, root: MatcherRef<E>) -> MatcherId {
        let root_id = self.register(root.clone());

        let mut seen = HashSet::from([root.addr()]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for child in current.references() {
                if seen.insert(child.addr()) {
                    self.register(child.clone());
                    stack.push(child);
                }
            }
        }

        root_id
    }

    #[must_use]
    pub fn get(&self, id: MatcherId) -> Option<&MatcherRef<E>> {
        self.matchers.get(id.0)
    }

    /// Like [`MatcherRegistry::get`], but reports unknown ids as an error.
    pub fn try_get(&self, id: MatcherId) -> Result<&MatcherRef<E>, ConfigurationError> {
        self.get(id).ok_or(ConfigurationError::UnknownMatcher { id })
    }

    #[must_use]
    pub fn id_of(&self, matcher: &MatcherRef<E>) -> Option<MatcherId> {
        self.index.get(&matcher.addr()).copied()
    }

    #[must_use]
    pub fn contains(&self, matcher: &MatcherRef<E>) -> bool {
        self.index.contains_key(&matcher.addr())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Registered matchers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (MatcherId, &MatcherRef<E>)> {
        self.matchers
            .iter()
            .enumerate()
            .map(|(i, m)| (MatcherId(i), m))
    }

    /// Checks the reference graph.
    ///
    /// # Errors
    /// - `UnregisteredReference` if a reference is missing from the registry
    /// - `CyclicReference` if references form a cycle
    /// - `ReflexivityViolated` if a matcher is not fired by its own event
    /// - `InconsistentReference` if an event standing for a (transitive)
    ///   reference does not fire the referencing matcher
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let edges = self.edges()?;
        Self::check_acyclic(&edges)?;

        for (id, matcher) in self.iter() {
            if let Some(event) = matcher.as_event() {
                if !matcher.is_fired_by(event) {
                    return Err(ConfigurationError::ReflexivityViolated { matcher: id });
                }
            }

            for &reference in &edges[id.0] {
                for witness in self.witnesses(reference, &edges) {
                    if !matcher.is_fired_by(witness) {
                        return Err(ConfigurationError::InconsistentReference {
                            matcher: id,
                            reference,
                        });
                    }
                }
            }
        }

        tracing::debug!(matchers = self.len(), "matcher graph validated");
        Ok(())
    }

    fn edges(&self) -> Result<Vec<Vec<MatcherId>>, ConfigurationError> {
        self.iter()
            .map(|(id, matcher)| {
                matcher
                    .references()
                    .iter()
                    .map(|r| {
                        self.id_of(r)
                            .ok_or_else(|| ConfigurationError::UnregisteredReference {
                                matcher: id,
                                reference: format!("{r:?}"),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    fn check_acyclic(edges: &[Vec<MatcherId>]) -> Result<(), ConfigurationError> {
        let mut state = vec![Visit::New; edges.len()];

        for start in 0..edges.len() {
            if state[start] != Visit::New {
                continue;
            }

            // Iterative DFS; `path` holds (node, next edge index).
            let mut path: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = Visit::Active;

            while let Some(top) = path.last_mut() {
                let node = top.0;
                let Some(&child) = edges[node].get(top.1) else {
                    state[node] = Visit::Done;
                    path.pop();
                    continue;
                };
                top.1 += 1;

                match state[child.0] {
                    Visit::New => {
                        state[child.0] = Visit::Active;
                        path.push((child.0, 0));
                    }
                    Visit::Active => {
                        let from = path
                            .iter()
                            .position(|(n, _)| *n == child.0)
                            .unwrap_or(0);
                        let mut cycle: Vec<MatcherId> =
                            path[from..].iter().map(|(n, _)| MatcherId(*n)).collect();
                        cycle.push(child);
                        return Err(ConfigurationError::CyclicReference { cycle });
                    }
                    Visit::Done => {}
                }
            }
        }

        Ok(())
    }

    /// Concrete events reachable from `from` (inclusive). Requires an acyclic graph.
    fn witnesses<'a>(&'a self, from: MatcherId, edges: &[Vec<MatcherId>]) -> Vec<&'a E> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([from]);
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if let Some(event) = self.matchers[id.0].as_event() {
                out.push(event);
            }
            for &child in &edges[id.0] {
                if seen.insert(child) {
                    stack.push(child);
                }
            }
        }

        out
    }
}
