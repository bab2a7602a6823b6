//! Format feature flags.
//!
//! Writers record every optional format capability they use as a small
//! integer flag. Readers refuse to open data carrying a flag they do not
//! know.
//!
//! # Wire encoding
//! Flags are packed into 64-bit little-endian words. Bits 0..=62 of word `i`
//! stand for flags `63 * i` to `63 * i + 62`; bit 63 is set on every word
//! that is followed by another one. The empty set is a single zero word.

use std::collections::BTreeSet;

use crate::common::{Error, Result};

/// Flags this version of the reader understands.
pub const SUPPORTED_FEATURES: &[u32] = &[];

/// Reserved flag that no reader understands. Used to test the fail-closed
/// check.
pub const FEATURE_FLAG_TEST: u32 = 137;

const FLAGS_PER_WORD: u32 = 63;
const CONTINUATION_BIT: u64 = 1 << 63;

/// Ordered set of feature flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    flags: BTreeSet<u32>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flag. Returns `false` if it was already set.
    pub fn insert(&mut self, flag: u32) -> bool {
        self.flags.insert(flag)
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.flags.contains(&flag)
    }

    /// Flags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.flags.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags not listed in `supported`, ascending.
    pub fn unsupported(&self, supported: &[u32]) -> Vec<u32> {
        self.iter().filter(|f| !supported.contains(f)).collect()
    }

    /// Fail with [`Error::UnsupportedFeature`] if any flag is not in
    /// `supported`.
    pub fn ensure_supported(&self, supported: &[u32]) -> Result<()> {
        let unsupported = self.unsupported(supported);
        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(Error::UnsupportedFeature(unsupported))
        }
    }

    /// Pack into wire words.
    pub fn to_words(&self) -> Vec<u64> {
        let n_words = self
            .flags
            .iter()
            .next_back()
            .map_or(1, |&max| (max / FLAGS_PER_WORD) as usize + 1);
        let mut words = vec![0u64; n_words];
        for &flag in &self.flags {
            words[(flag / FLAGS_PER_WORD) as usize] |= 1 << (flag % FLAGS_PER_WORD);
        }
        for word in words.iter_mut().take(n_words - 1) {
            *word |= CONTINUATION_BIT;
        }
        words
    }

    /// Unpack wire words.
    pub fn from_words(words: &[u64]) -> Self {
        let mut flags = BTreeSet::new();
        for (i, &word) in words.iter().enumerate() {
            for bit in 0..FLAGS_PER_WORD {
                if word & (1 << bit) != 0 {
                    flags.insert(i as u32 * FLAGS_PER_WORD + bit);
                }
            }
        }
        Self { flags }
    }

    /// Whether the word is followed by another one.
    #[inline]
    pub fn has_continuation(word: u64) -> bool {
        word & CONTINUATION_BIT != 0
    }
}

impl FromIterator<u32> for FeatureFlags {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_one_word() {
        assert_eq!(FeatureFlags::new().to_words(), vec![0]);
    }

    #[test]
    fn test_word_layout() {
        let flags: FeatureFlags = [0, 62, 63, FEATURE_FLAG_TEST].into_iter().collect();
        let words = flags.to_words();

        // 137 = 2 * 63 + 11
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], CONTINUATION_BIT | 1 | (1 << 62));
        assert_eq!(words[1], CONTINUATION_BIT | 1);
        assert_eq!(words[2], 1 << 11);
        assert!(!FeatureFlags::has_continuation(words[2]));

        assert_eq!(FeatureFlags::from_words(&words), flags);
    }

    #[test]
    fn test_unsupported() {
        let flags: FeatureFlags = [3, FEATURE_FLAG_TEST].into_iter().collect();
        assert_eq!(flags.unsupported(&[3]), vec![FEATURE_FLAG_TEST]);
        assert!(flags.ensure_supported(&[3, FEATURE_FLAG_TEST]).is_ok());

        let err = flags.ensure_supported(SUPPORTED_FEATURES).unwrap_err();
        assert_eq!(err.to_string(), "unsupported format feature: 3, 137");
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut flags = FeatureFlags::new();
        assert!(flags.insert(5));
        assert!(!flags.insert(5));
        assert_eq!(flags.len(), 1);
        assert!(flags.contains(5));
    }
}
