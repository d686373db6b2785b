//! Word list loading utilities
//!
//! Loads extra word lists from files, one word per line.

use std::fs;
use std::io;
use std::path::Path;

/// Load words from a file
///
/// Returns the lower-cased words, skipping blank lines and entries that are
/// not purely ASCII letters.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or opened.
///
/// # Examples
/// ```no_run
/// use wordle_duet::wordlists::loader::load_from_file;
///
/// let words = load_from_file("data/words-5.txt").unwrap();
/// println!("Loaded {} words", words.len());
/// ```
pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_words(&content))
}

/// Parse newline-separated words
#[must_use]
pub fn parse_words(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_lowercase)
        .collect()
}
