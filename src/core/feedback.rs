//! Guess feedback calculation
//!
//! Feedback for one guess is a sequence of [`MatchState`], one per letter:
//! - `Invalid` = letter not creditable (gray)
//! - `Position` = letter in word, wrong position (yellow)
//! - `Match` = letter in correct position (green)

use serde::{Deserialize, Serialize};

/// Feedback for a single letter of a committed guess
///
/// Ordered from weakest to strongest so keyboard hints can keep the best
/// state seen for a letter with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Invalid,
    Position,
    Match,
}

impl MatchState {
    /// Emoji square used in share text
    #[must_use]
    pub const fn emoji(self) -> char {
        match self {
            Self::Match => '🟩',
            Self::Position => '🟨',
            Self::Invalid => '⬜',
        }
    }
}

/// Calculate the feedback when `guess` is played against `target`
///
/// Implements the exact feedback rules, including duplicate letters.
///
/// # Algorithm
/// 1. First pass: mark exact matches and mask that target letter out of a
///    scratch copy so it can not be credited again
/// 2. Second pass: for every other position, search the scratch target left
///    to right; credit `Position` and mask the occurrence, or mark `Invalid`
///
/// A repeated guess letter is therefore never credited more often than it
/// occurs, unmatched, in the target.
///
/// Positions past the shorter of the two inputs are not evaluated.
///
/// # Examples
/// ```
/// use wordle_duet::core::{MatchState, evaluate};
///
/// let guess: Vec<char> = "trace".chars().collect();
/// let target: Vec<char> = "crane".chars().collect();
///
/// assert_eq!(
///     evaluate(&guess, &target),
///     vec![
///         MatchState::Invalid,
///         MatchState::Match,
///         MatchState::Match,
///         MatchState::Position,
///         MatchState::Match,
///     ]
/// );
/// ```
#[must_use]
// Allow: index needed to compare guess[i] with target[i] and set result[i]
#[allow(clippy::needless_range_loop)]
pub fn evaluate(guess: &[char], target: &[char]) -> Vec<MatchState> {
    let width = guess.len().min(target.len());
    let mut result = vec![MatchState::Invalid; width];

    // `None` marks a target letter that has already been credited
    let mut scratch: Vec<Option<char>> = target[..width].iter().copied().map(Some).collect();

    // First pass: exact position matches
    for i in 0..width {
        if guess[i] == target[i] {
            result[i] = MatchState::Match;
            scratch[i] = None;
        }
    }

    // Second pass: present elsewhere in the remaining pool
    for i in 0..width {
        if result[i] == MatchState::Match {
            continue;
        }
        if let Some(slot) = scratch.iter_mut().find(|slot| **slot == Some(guess[i])) {
            result[i] = MatchState::Position;
            *slot = None;
        }
    }

    result
}

/// Check whether every letter of a feedback row is an exact match
#[must_use]
pub fn is_perfect(feedback: &[MatchState]) -> bool {
    !feedback.is_empty() && feedback.iter().all(|&state| state == MatchState::Match)
}

/// Convert feedback to an emoji string like "🟩🟨⬜🟩🟨"
#[must_use]
pub fn to_emoji(feedback: &[MatchState]) -> String {
    feedback.iter().map(|state| state.emoji()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use MatchState::{Invalid, Match, Position};

    fn eval(guess: &str, target: &str) -> Vec<MatchState> {
        let guess: Vec<char> = guess.chars().collect();
        let target: Vec<char> = target.chars().collect();
        evaluate(&guess, &target)
    }

    fn credits(feedback: &[MatchState], guess: &str, letter: char) -> usize {
        guess
            .chars()
            .zip(feedback)
            .filter(|(c, state)| *c == letter && **state != Invalid)
            .count()
    }

    #[test]
    fn feedback_all_invalid() {
        assert_eq!(eval("abcde", "fghij"), vec![Invalid; 5]);
    }

    #[test]
    fn feedback_all_match() {
        let feedback = eval("crane", "crane");
        assert!(is_perfect(&feedback));
    }

    #[test]
    fn feedback_trace_against_crane() {
        // R, A and E share positions with CRANE; C sits elsewhere
        assert_eq!(
            eval("trace", "crane"),
            vec![Invalid, Match, Match, Position, Match]
        );
    }

    #[test]
    fn feedback_duplicate_letters_match_takes_priority() {
        // SPEED vs ERASE: both E's credited, ERASE has two
        assert_eq!(
            eval("speed", "erase"),
            vec![Position, Invalid, Position, Position, Invalid]
        );
    }

    #[test]
    fn feedback_duplicate_letters_complex() {
        // ROBOT vs FLOOR: first O is elsewhere, second O is in place
        assert_eq!(
            eval("robot", "floor"),
            vec![Position, Position, Invalid, Match, Invalid]
        );
    }

    #[test]
    fn feedback_repeated_letters_masked() {
        // LLAMA vs ALLOW: two L's and one A available in the target
        let feedback = eval("llama", "allow");
        assert_eq!(feedback, vec![Position, Match, Position, Invalid, Invalid]);
        assert!(credits(&feedback, "llama", 'l') <= 2);
        assert!(credits(&feedback, "llama", 'a') <= 1);
    }

    #[test]
    fn feedback_repeated_letters_direct_match() {
        // ARROW vs ERROR: both R's and the O are in place
        assert_eq!(
            eval("arrow", "error"),
            vec![Invalid, Match, Match, Match, Invalid]
        );
    }

    #[test]
    fn feedback_credits_never_exceed_target_counts() {
        let pairs = [
            ("eerie", "sheep"),
            ("aaaaa", "abbey"),
            ("lolly", "hello"),
            ("speed", "erase"),
            ("geese", "these"),
        ];
        for (guess, target) in pairs {
            let feedback = eval(guess, target);
            for letter in guess.chars() {
                let available = target.chars().filter(|&c| c == letter).count();
                assert!(
                    credits(&feedback, guess, letter) <= available,
                    "{guess} vs {target}: '{letter}' over-credited"
                );
            }
            let exact = guess.chars().zip(target.chars()).filter(|(g, t)| g == t).count();
            let matches = feedback.iter().filter(|&&s| s == Match).count();
            assert_eq!(exact, matches, "{guess} vs {target}");
        }
    }

    #[test]
    fn feedback_emoji() {
        assert_eq!(to_emoji(&[Match, Position, Invalid]), "🟩🟨⬜");
    }

    #[test]
    fn perfect_requires_letters() {
        assert!(!is_perfect(&[]));
        assert!(!is_perfect(&[Match, Position]));
    }
}
