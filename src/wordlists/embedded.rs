//! Embedded word lists
//!
//! Word lists compiled into the binary at build time.

// Include generated word lists from build script
include!(concat!(env!("OUT_DIR"), "/wordlists.rs"));

/// Embedded `(length, valid words, answers)` triples
pub const EMBEDDED: &[(usize, &[&str], &[&str])] = &[
    (4, WORDS_4, ANSWERS_4),
    (5, WORDS_5, ANSWERS_5),
    (6, WORDS_6, ANSWERS_6),
];
