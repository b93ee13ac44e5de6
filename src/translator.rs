//! Translators map domain items onto a dense integer identifier range.
//!
//! A `Translator` is the leaf of the matching engine: masks are sized from
//! its bounds and indexed by its output. Implementations must be
//! deterministic. Two logically equal items translate to the same identifier
//! on every call, and `[min_identifier, max_identifier]` never changes after
//! a mask has been built from the translator.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ValidationError;

/// Dense integer identifier produced by a [`Translator`].
pub type Identifier = i64;

/// Deterministic mapping from an item to a dense identifier.
pub trait Translator<T: ?Sized> {
    /// Translates `item`, or returns `None` when it cannot be translated.
    ///
    /// A returned identifier should lie in `[min_identifier, max_identifier]`.
    /// Masks re-check the bounds and treat anything outside as untranslatable.
    fn try_translate(&self, item: &T) -> Option<Identifier>;

    /// Smallest identifier this translator produces (inclusive).
    fn min_identifier(&self) -> Identifier;

    /// Largest identifier this translator produces (inclusive).
    fn max_identifier(&self) -> Identifier;

    /// Whether `item` can be translated.
    fn can_translate(&self, item: &T) -> bool {
        self.try_translate(item).is_some()
    }

    /// Translates `item`.
    ///
    /// # Errors
    /// Returns `ValidationError::Untranslatable` when `can_translate(item)` is false.
    fn translate(&self, item: &T) -> Result<Identifier, ValidationError> {
        self.try_translate(item)
            .ok_or(ValidationError::Untranslatable {
                item_type: std::any::type_name::<T>(),
            })
    }

    /// Number of distinct identifiers in the range, or 0 if the bounds are inverted.
    fn distinct_translations(&self) -> u64 {
        let (min, max) = (self.min_identifier(), self.max_identifier());
        if min > max {
            return 0;
        }
        // i128 keeps the full i64 span representable.
        let span = i128::from(max) - i128::from(min) + 1;
        u64::try_from(span).unwrap_or(u64::MAX)
    }
}

impl<T: ?Sized, Tr: Translator<T> + ?Sized> Translator<T> for &Tr {
    fn try_translate(&self, item: &T) -> Option<Identifier> {
        (**self).try_translate(item)
    }

    fn min_identifier(&self) -> Identifier {
        (**self).min_identifier()
    }

    fn max_identifier(&self) -> Identifier {
        (**self).max_identifier()
    }
}

impl<T: ?Sized, Tr: Translator<T> + ?Sized> Translator<T> for Arc<Tr> {
    fn try_translate(&self, item: &T) -> Option<Identifier> {
        (**self).try_translate(item)
    }

    fn min_identifier(&self) -> Identifier {
        (**self).min_identifier()
    }

    fn max_identifier(&self) -> Identifier {
        (**self).max_identifier()
    }
}

/// Integer items in `[min, max]` translate to themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTranslator {
    min: Identifier,
    max: Identifier,
}

impl RangeTranslator {
    /// Creates a translator over the inclusive range `[min, max]`.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidIdentifierRange` if `min > max`.
    pub fn new(min: Identifier, max: Identifier) -> Result<Self, ValidationError> {
        if min > max {
            return Err(ValidationError::InvalidIdentifierRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Translator over `[0, count - 1]`.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyDomain` if `count` is zero.
    pub fn with_count(count: u32) -> Result<Self, ValidationError> {
        if count == 0 {
            return Err(ValidationError::EmptyDomain);
        }
        Self::new(0, Identifier::from(count) - 1)
    }
}

impl Translator<Identifier> for RangeTranslator {
    fn try_translate(&self, item: &Identifier) -> Option<Identifier> {
        (self.min <= *item && *item <= self.max).then_some(*item)
    }

    fn min_identifier(&self) -> Identifier {
        self.min
    }

    fn max_identifier(&self) -> Identifier {
        self.max
    }
}

/// Assigns identifiers `0..n` to an ordered list of distinct domain values.
#[derive(Debug, Clone)]
pub struct IndexedTranslator<T> {
    values: Vec<T>,
    index: HashMap<T, Identifier>,
}

impl<T: Eq + Hash + Clone> IndexedTranslator<T> {
    /// Builds a translator where the `i`-th value maps to identifier `i`.
    ///
    /// # Errors
    /// - `EmptyDomain` if no values are given
    /// - `DuplicateDomainValue` if a value appears twice
    pub fn new(values: impl IntoIterator<Item = T>) -> Result<Self, ValidationError> {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return Err(ValidationError::EmptyDomain);
        }

        let mut index = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let id = Identifier::try_from(i).map_err(|_| ValidationError::InvalidIdentifierRange {
                min: 0,
                max: Identifier::MAX,
            })?;
            if index.insert(value.clone(), id).is_some() {
                return Err(ValidationError::DuplicateDomainValue { index: i });
            }
        }

        Ok(Self { values, index })
    }

    /// The value assigned to `id`, if any.
    #[must_use]
    pub fn value_of(&self, id: Identifier) -> Option<&T> {
        usize::try_from(id).ok().and_then(|i| self.values.get(i))
    }

    /// Domain values in identifier order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Eq + Hash> Translator<T> for IndexedTranslator<T> {
    fn try_translate(&self, item: &T) -> Option<Identifier> {
        self.index.get(item).copied()
    }

    fn min_identifier(&self) -> Identifier {
        0
    }

    fn max_identifier(&self) -> Identifier {
        // Construction guarantees a non-empty list that fits in an Identifier.
        Identifier::try_from(self.values.len()).map_or(Identifier::MAX, |n| n - 1)
    }
}

/// Projects an item onto a key, then translates the key.
///
/// This is how a mask over job ids is applied to whole events: the
/// projection returns `None` for events that carry no job.
pub struct KeyTranslator<K, Tr, F> {
    inner: Tr,
    key: F,
    _key: PhantomData<fn() -> K>,
}

impl<K, Tr, F> KeyTranslator<K, Tr, F> {
    /// Wraps `inner` with the projection `key`.
    pub fn new(inner: Tr, key: F) -> Self {
        Self {
            inner,
            key,
            _key: PhantomData,
        }
    }

    /// The translator applied to projected keys.
    pub fn inner(&self) -> &Tr {
        &self.inner
    }
}

impl<K, Tr: fmt::Debug, F> fmt::Debug for KeyTranslator<K, Tr, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTranslator")
            .field("inner", &self.inner)
            .field("key", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<T, K, Tr, F> Translator<T> for KeyTranslator<K, Tr, F>
where
    T: ?Sized,
    Tr: Translator<K>,
    F: Fn(&T) -> Option<K>,
{
    fn try_translate(&self, item: &T) -> Option<Identifier> {
        (self.key)(item).and_then(|k| self.inner.try_translate(&k))
    }

    fn min_identifier(&self) -> Identifier {
        self.inner.min_identifier()
    }

    fn max_identifier(&self) -> Identifier {
        self.inner.max_identifier()
    }
}
