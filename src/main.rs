//! Wordle Duet - CLI
//!
//! Daily word game in the terminal, solo or with a partner over WebRTC.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use wordle_duet::{
    commands::{PlayMode, run_play, run_relay},
    config::{self, Config},
    signaling::{ChannelId, RelayConfig},
};

#[derive(Parser)]
#[command(
    name = "wordle_duet",
    about = "Daily word-guessing game, solo or cooperative over a peer-to-peer channel",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.config/wordle_duet/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Signaling relay url, e.g. ws://127.0.0.1:9090
    #[arg(short, long, global = true)]
    relay: Option<String>,

    /// Letters per word
    #[arg(short, long, global = true)]
    letters: Option<usize>,

    /// Boards played at once
    #[arg(short, long, global = true)]
    boards: Option<usize>,

    /// Where saved games, statistics and the log live
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Extra accepted guesses, one word per line
    #[arg(short = 'w', long, global = true)]
    words: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play today's game alone (default)
    Play,

    /// Start a shared game and print the channel for your partner
    Host,

    /// Join a partner's shared game
    Join {
        /// Channel printed by the host
        channel: String,
    },

    /// Run a signaling relay
    Relay {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:9090")]
        bind: String,
    },
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(relay) = &self.relay {
            config.relay_url.clone_from(relay);
        }
        if let Some(letters) = self.letters {
            config.letter_count = letters;
        }
        if let Some(boards) = self.boards {
            config.board_count = boards;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(words) = &self.words {
            config.extra_words = Some(words.clone());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // Default to Play mode if no command given
    let command = cli.command.unwrap_or(Commands::Play);

    let mode = match command {
        Commands::Relay { bind } => {
            init_logging(None);
            return run_relay(RelayConfig {
                bind_addr: bind,
                ..RelayConfig::default()
            });
        }
        Commands::Play => PlayMode::Solo,
        Commands::Host => PlayMode::Host,
        Commands::Join { channel } => PlayMode::Join(ChannelId::from(channel.trim())),
    };

    init_logging(Some(&config.data_dir().join("wordle_duet.log")));
    run_play(&config, mode)
}

/// Install env_logger, default filter `warn`
///
/// With a file the log is appended there so it never draws over the TUI.
fn init_logging(file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    if let Some(path) = file {
        let opened = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(path));
        match opened {
            Ok(log_file) => {
                builder.target(env_logger::Target::Pipe(Box::new(log_file)));
            }
            Err(e) => {
                eprintln!("Logging disabled: cannot open {}: {e}", path.display());
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    builder.init();
}
