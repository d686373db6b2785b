//! Command implementations

pub mod play;
pub mod relay;

pub use play::{PlayMode, daily_game, run_play, word_lists};
pub use relay::run_relay;
