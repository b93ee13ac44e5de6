//! Bitset-backed admit-sets over a translator's identifier range.
//!
//! A `Mask` answers "is this item admitted?" in O(1) by translating the item
//! and testing one bit, instead of scanning a list of admitted items. Memory
//! is one bit per identifier in `[min, max]`.

use std::fmt;
use std::marker::PhantomData;

use crate::error::ValidationError;
use crate::translator::{Identifier, Translator};

const WORD_BITS: usize = u64::BITS as usize;

/// Admit-set over the identifier range of a [`Translator`].
///
/// The range is captured when the mask is built. Items the translator cannot
/// translate, or that translate outside the captured range, are never admitted.
pub struct Mask<T: ?Sized, Tr> {
    translator: Tr,
    min: Identifier,
    max: Identifier,
    len: usize,
    words: Vec<u64>,
    _item: PhantomData<fn(&T)>,
}

impl<T: ?Sized, Tr: Translator<T>> Mask<T, Tr> {
    /// Creates an empty mask covering `[translator.min_identifier(), translator.max_identifier()]`.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidIdentifierRange` if the bounds are
    /// inverted, the range is too large to address, or its bits cannot be
    /// allocated.
    pub fn new(translator: Tr) -> Result<Self, ValidationError> {
        let min = translator.min_identifier();
        let max = translator.max_identifier();
        let len = usize::try_from(translator.distinct_translations())
            .ok()
            .filter(|n| *n > 0 && *n < usize::MAX - WORD_BITS)
            .ok_or(ValidationError::InvalidIdentifierRange { min, max })?;

        let word_count = len.div_ceil(WORD_BITS);
        let mut words = Vec::<u64>::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| ValidationError::InvalidIdentifierRange { min, max })?;
        words.resize(word_count, 0);

        Ok(Self {
            translator,
            min,
            max,
            len,
            words,
            _item: PhantomData,
        })
    }

    /// Whether `item` is admitted. Never fails; untranslatable items are not admitted.
    #[must_use]
    pub fn accepts(&self, item: &T) -> bool {
        self.translator
            .try_translate(item)
            .is_some_and(|id| self.accepts_identifier(id))
    }

    /// Admits `item`.
    ///
    /// # Errors
    /// See [`Mask::set`].
    pub fn accept(&mut self, item: &T) -> Result<(), ValidationError> {
        self.set(item, true)
    }

    /// Stops admitting `item`.
    ///
    /// # Errors
    /// See [`Mask::set`].
    pub fn deny(&mut self, item: &T) -> Result<(), ValidationError> {
        self.set(item, false)
    }

    /// Admits or denies `item`.
    ///
    /// # Errors
    /// - `Untranslatable` if the translator cannot translate `item`
    /// - `IdentifierOutOfRange` if its identifier falls outside the mask
    pub fn set(&mut self, item: &T, admitted: bool) -> Result<(), ValidationError> {
        let id = self.translator.translate(item)?;
        self.set_identifier(id, admitted)
    }

    /// The translator this mask was built from.
    pub fn translator(&self) -> &Tr {
        &self.translator
    }
}

impl<T: ?Sized, Tr> Mask<T, Tr> {
    /// Whether identifier `id` is admitted. Out-of-range identifiers never are.
    #[must_use]
    pub fn accepts_identifier(&self, id: Identifier) -> bool {
        self.index_of(id)
            .is_some_and(|i| self.words[i / WORD_BITS] & bit(i) != 0)
    }

    /// Admits or denies identifier `id` directly.
    ///
    /// # Errors
    /// Returns `IdentifierOutOfRange` if `id` is outside `[min, max]`.
    pub fn set_identifier(
        &mut self,
        id: Identifier,
        admitted: bool,
    ) -> Result<(), ValidationError> {
        let i = self.index_of(id).ok_or(ValidationError::IdentifierOutOfRange {
            identifier: id,
            min: self.min,
            max: self.max,
        })?;

        let word = &mut self.words[i / WORD_BITS];
        if admitted {
            *word |= bit(i);
        } else {
            *word &= !bit(i);
        }
        Ok(())
    }

    /// Admits every identifier in the range.
    pub fn accept_all(&mut self) {
        self.words.fill(u64::MAX);
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// Denies every identifier.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of admitted identifiers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if nothing is admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Size of the identifier range (`max - min + 1`).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Smallest identifier covered (inclusive).
    #[must_use]
    pub const fn min_identifier(&self) -> Identifier {
        self.min
    }

    /// Largest identifier covered (inclusive).
    #[must_use]
    pub const fn max_identifier(&self) -> Identifier {
        self.max
    }

    /// Admitted identifiers in ascending order.
    pub fn accepted_identifiers(&self) -> impl Iterator<Item = Identifier> + '_ {
        let min = self.min;
        self.words.iter().enumerate().flat_map(move |(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let offset = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                let index = w * WORD_BITS + offset;
                // Indices are bounded by `len`, which fits the i64 span.
                Some(min + index as Identifier)
            })
        })
    }

    fn index_of(&self, id: Identifier) -> Option<usize> {
        if id >= self.min && id <= self.max {
            usize::try_from(i128::from(id) - i128::from(self.min)).ok()
        } else {
            None
        }
    }
}

const fn bit(index: usize) -> u64 {
    1u64 << (index % WORD_BITS)
}

impl<T: ?Sized, Tr: Clone> Clone for Mask<T, Tr> {
    fn clone(&self) -> Self {
        Self {
            translator: self.translator.clone(),
            min: self.min,
            max: self.max,
            len: self.len,
            words: self.words.clone(),
            _item: PhantomData,
        }
    }
}

impl<T: ?Sized, Tr: fmt::Debug> fmt::Debug for Mask<T, Tr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("translator", &self.translator)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("count", &self.count())
            .finish()
    }
}
