//! Formatting utilities for terminal output

use crate::core::BoardRecord;

/// Create a progress bar string
#[must_use]
pub fn create_progress_bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return "░".repeat(width);
    }
    // Cast is safe: values are clamped to [0, width]
    let filled = ((value / max) * width as f64) as usize;
    let filled = filled.min(width);

    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Short description of how one board ended
#[must_use]
pub fn format_record(record: BoardRecord, guesses_allowed: usize) -> String {
    match record {
        BoardRecord::Solved(1) => "solved in 1 guess".to_string(),
        BoardRecord::Solved(n) => format!("solved in {n}/{guesses_allowed} guesses"),
        BoardRecord::Lost => "not solved".to_string(),
    }
}

/// Letters spaced out for a board row, padding unfilled cells with `_`
#[must_use]
pub fn spaced_word(word: &str, width: usize) -> String {
    let mut cells: Vec<String> = word.chars().map(|c| c.to_ascii_uppercase().to_string()).collect();
    cells.resize(width.max(cells.len()), "_".to_string());
    cells.join(" ")
}
