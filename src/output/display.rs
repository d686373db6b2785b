//! Display functions for command results

use super::formatters::{create_progress_bar, format_record};
use crate::core::GameState;
use crate::session::Statistics;
use crate::signaling::ChannelId;
use colored::Colorize;
use std::net::SocketAddr;

/// Print the channel a host should hand to the joining player
pub fn print_channel_banner(channel: &ChannelId, relay_url: &str) {
    println!("\n{}", "═".repeat(60).cyan());
    println!(
        " {} {} ",
        "CHANNEL:".bright_cyan().bold(),
        channel.as_str().bright_yellow().bold()
    );
    println!("{}", "═".repeat(60).cyan());
    println!("   Relay:  {relay_url}");
    println!("   Join:   wordle_duet join {channel}");
}

/// Print where a relay is listening
pub fn print_relay_banner(addr: SocketAddr) {
    println!(
        "{} listening on {}",
        "Signaling relay".bright_cyan().bold(),
        format!("ws://{addr}").bright_yellow()
    );
    println!("Press Ctrl-C to stop.");
}

/// Print the outcome of a game, the share grid and running statistics
pub fn print_game_summary(game: &GameState, stats: Option<&Statistics>) {
    println!("\n{}", "─".repeat(60).cyan());

    let Some(win) = game.win_state() else {
        println!("{}", "Game saved. Come back to finish it today.".yellow());
        return;
    };

    for (i, (record, target)) in win.records.iter().zip(game.targets()).enumerate() {
        let line = format!(
            "Board {}: {} {}",
            i + 1,
            target.to_uppercase(),
            format_record(*record, win.guesses_allowed)
        );
        if win.losses() == 0 {
            println!("{}", line.green());
        } else {
            println!("{line}");
        }
    }

    println!();
    if win.losses() == 0 {
        println!("{}", "✅ All boards solved!".green().bold());
    } else {
        println!(
            "{}",
            format!("❌ {} of {} boards solved", win.wins(), win.records.len())
                .red()
                .bold()
        );
    }

    println!("\n{}", game.share_text());

    if let Some(stats) = stats {
        print_statistics(stats);
    }
}

/// Print totals and the guess distribution
pub fn print_statistics(stats: &Statistics) {
    println!("\n📊 {}", "Statistics:".bright_cyan().bold());
    println!("   Played:         {}", stats.played);
    println!(
        "   Boards solved:  {}",
        format!("{:.0}%", stats.win_rate()).bright_yellow().bold()
    );
    println!("   Current streak: {}", stats.current_streak);
    println!("   Max streak:     {}", stats.max_streak);

    let max = stats.distribution.values().copied().max().unwrap_or(0);
    if max == 0 {
        return;
    }

    println!("\n📈 {}", "Distribution:".bright_cyan().bold());
    for (guesses, &count) in &stats.distribution {
        let bar = create_progress_bar(f64::from(count), f64::from(max), 30);
        println!("   {guesses:2}: {} {count:4}", bar.green());
    }
}
