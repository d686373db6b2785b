//! Word lists keyed by word length
//!
//! Provides the read-only word lookup the game consults when a guess is
//! committed, plus the subset of words that can be dealt as targets.

pub mod daily;
mod embedded;
pub mod loader;

pub use daily::DailyContext;
pub use embedded::EMBEDDED;

use rustc_hash::{FxHashMap, FxHashSet};

/// Error looking up a word list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordListError {
    #[error("no word list for {0}-letter words")]
    UnsupportedLength(usize),
}

/// Read-only word lookup keyed by length
pub trait WordSource: Send + Sync {
    /// Every valid guess of length `len`
    ///
    /// # Errors
    /// Returns `WordListError::UnsupportedLength` if no list exists for `len`.
    fn valid_words(&self, len: usize) -> Result<&[String], WordListError>;

    /// Words of length `len` that can be dealt as targets
    ///
    /// # Errors
    /// Returns `WordListError::UnsupportedLength` if no list exists for `len`.
    fn answers(&self, len: usize) -> Result<&[String], WordListError>;

    /// Check whether `word` is an accepted guess
    fn is_valid(&self, word: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
struct LengthEntry {
    valid: Vec<String>,
    lookup: FxHashSet<String>,
    answers: Vec<String>,
}

/// In-memory word lists for one or more lengths
#[derive(Debug, Clone, Default)]
pub struct WordLists {
    by_len: FxHashMap<usize, LengthEntry>,
}

impl WordLists {
    /// Word lists compiled into the binary
    #[must_use]
    pub fn embedded() -> Self {
        let mut lists = Self::default();
        for &(_, valid, answers) in EMBEDDED {
            lists.insert(
                valid.iter().map(ToString::to_string).collect(),
                answers.iter().map(ToString::to_string).collect(),
            );
        }
        lists
    }

    /// Build lists from owned words of any lengths
    ///
    /// Answers are also accepted as guesses.
    #[must_use]
    pub fn from_lists(valid: Vec<String>, answers: Vec<String>) -> Self {
        let mut lists = Self::default();
        lists.insert(valid, answers);
        lists
    }

    /// Add words, grouping them by length
    ///
    /// Words are lower-cased; duplicates are dropped.
    pub fn insert(&mut self, valid: Vec<String>, answers: Vec<String>) {
        for word in valid.into_iter().chain(answers.iter().cloned()) {
            let word = word.to_lowercase();
            let entry = self.by_len.entry(word.chars().count()).or_default();
            if entry.lookup.insert(word.clone()) {
                entry.valid.push(word);
            }
        }
        for word in answers {
            let word = word.to_lowercase();
            let entry = self.by_len.entry(word.chars().count()).or_default();
            if !entry.answers.contains(&word) {
                entry.answers.push(word);
            }
        }
    }

    /// Supported word lengths in ascending order
    #[must_use]
    pub fn lengths(&self) -> Vec<usize> {
        let mut lengths: Vec<usize> = self.by_len.keys().copied().collect();
        lengths.sort_unstable();
        lengths
    }

    fn entry(&self, len: usize) -> Result<&LengthEntry, WordListError> {
        self.by_len
            .get(&len)
            .ok_or(WordListError::UnsupportedLength(len))
    }
}

impl WordSource for WordLists {
    fn valid_words(&self, len: usize) -> Result<&[String], WordListError> {
        Ok(&self.entry(len)?.valid)
    }

    fn answers(&self, len: usize) -> Result<&[String], WordListError> {
        Ok(&self.entry(len)?.answers)
    }

    fn is_valid(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.by_len
            .get(&word.chars().count())
            .is_some_and(|entry| entry.lookup.contains(&word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_lengths() {
        let lists = WordLists::embedded();
        assert_eq!(lists.lengths(), vec![4, 5, 6]);
    }

    #[test]
    fn embedded_answers_are_valid_words() {
        let lists = WordLists::embedded();
        for len in lists.lengths() {
            let answers = lists.answers(len).unwrap();
            assert!(!answers.is_empty());
            for answer in answers {
                assert_eq!(answer.len(), len, "Word '{answer}' is not {len} letters");
                assert!(
                    answer.chars().all(|c| c.is_ascii_lowercase()),
                    "Word '{answer}' contains non-lowercase chars"
                );
                assert!(lists.is_valid(answer), "Answer '{answer}' not in valid list");
            }
        }
    }

    #[test]
    fn embedded_contains_common_words() {
        let lists = WordLists::embedded();
        for word in ["crane", "trace", "allow", "llama", "error", "arrow"] {
            assert!(lists.is_valid(word), "missing {word}");
        }
        assert!(lists.is_valid("CRANE"));
        assert!(!lists.is_valid("zzzzz"));
    }

    #[test]
    fn unsupported_length() {
        let lists = WordLists::embedded();
        assert_eq!(
            lists.valid_words(12).unwrap_err(),
            WordListError::UnsupportedLength(12)
        );
        assert!(lists.answers(2).is_err());
    }

    #[test]
    fn from_lists_groups_by_length() {
        let lists = WordLists::from_lists(
            vec!["cat".into(), "Dog".into(), "bird".into(), "dog".into()],
            vec!["fish".into()],
        );
        assert_eq!(lists.lengths(), vec![3, 4]);
        assert_eq!(lists.valid_words(3).unwrap(), &["cat", "dog"]);
        assert_eq!(lists.answers(4).unwrap(), &["fish"]);
        assert!(lists.is_valid("fish"));
        assert!(lists.answers(3).unwrap().is_empty());
    }
}
