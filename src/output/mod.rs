//! Terminal output formatting
//!
//! Plain-terminal summaries printed before and after the TUI.

pub mod display;
pub mod formatters;

pub use display::{print_channel_banner, print_game_summary, print_relay_banner, print_statistics};
