//! Play a daily game, alone or with a partner

use crate::config::Config;
use crate::core::GameState;
use crate::interactive::{App, run_tui};
use crate::output::{print_channel_banner, print_game_summary};
use crate::session::{
    Collaborators, FileStore, PersistenceStore, Session, SessionOptions, StoredStatistics,
};
use crate::signaling::ChannelId;
use crate::transport::{RtcLink, Role};
use crate::wordlists::{DailyContext, WordLists, WordSource, loader::load_from_file};
use anyhow::{Context, Result, bail};
use std::sync::Arc;

/// Who the local player is in the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayMode {
    Solo,
    /// Mint a channel and wait for a partner
    Host,
    /// Join the partner's channel
    Join(ChannelId),
}

impl PlayMode {
    fn title(&self) -> &'static str {
        match self {
            Self::Solo => "Solo",
            Self::Host => "Hosting",
            Self::Join(_) => "Joined",
        }
    }
}

/// Embedded lists plus any extra guesses from the config
///
/// # Errors
///
/// Returns an error if the extra word file cannot be read.
pub fn word_lists(config: &Config) -> Result<WordLists> {
    let mut lists = WordLists::embedded();
    if let Some(path) = &config.extra_words {
        let extra = load_from_file(path)
            .with_context(|| format!("cannot read word list {}", path.display()))?;
        log::info!("Loaded {} extra words from {}", extra.len(), path.display());
        lists.insert(extra, Vec::new());
    }
    Ok(lists)
}

/// Deal today's targets for the configured board shape
///
/// # Errors
///
/// Returns an error if no word list exists for the letter count or there are
/// not enough answers for the requested boards.
pub fn daily_game(config: &Config, words: &dyn WordSource) -> Result<GameState> {
    if config.board_count == 0 {
        bail!("board count must be at least 1");
    }
    let answers = words.answers(config.letter_count)?;
    if answers.len() < config.board_count {
        bail!(
            "only {} {}-letter answers available for {} boards",
            answers.len(),
            config.letter_count,
            config.board_count
        );
    }

    let context = DailyContext::today(config.letter_count, config.board_count);
    log::info!("Dealing day {} targets", context.day());
    let targets = context.pick_targets(answers, config.board_count);
    Ok(GameState::new(&targets, config.guesses(), config.columns)?)
}

/// Run the TUI for one game, then print the summary
///
/// # Errors
///
/// Returns an error if the game cannot be set up (word lists, data
/// directory, peer connection) or the terminal fails.
pub fn run_play(config: &Config, mode: PlayMode) -> Result<()> {
    let words = Arc::new(word_lists(config)?);
    let game = daily_game(config, words.as_ref())?;

    let data_dir = config.data_dir();
    let store: Arc<dyn PersistenceStore> = Arc::new(
        FileStore::open(&data_dir)
            .with_context(|| format!("cannot use data directory {}", data_dir.display()))?,
    );
    let collab = Collaborators {
        words,
        store: store.clone(),
        stats: Box::new(StoredStatistics::new(store.clone())),
        on_end: None,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let title = mode.title();
    let session = runtime.block_on(start_session(config, mode, game, collab))?;

    let app = run_tui(App::new(session, title))?;
    let game = app.game.clone();
    runtime.block_on(app.into_session().close());

    let stats = StoredStatistics::new(store).load(game.letter_count, game.boards.len());
    if let Err(e) = &stats {
        log::warn!("Statistics unavailable: {e}");
    }
    print_game_summary(&game, stats.ok().as_ref());
    Ok(())
}

async fn start_session(
    config: &Config,
    mode: PlayMode,
    game: GameState,
    collab: Collaborators,
) -> Result<Session> {
    let (channel, role) = match mode {
        PlayMode::Solo => return Ok(Session::solo(game, collab)),
        PlayMode::Host => (ChannelId::generate(), Role::Leader),
        PlayMode::Join(channel) => (channel, Role::Joiner),
    };

    if role == Role::Leader {
        print_channel_banner(&channel, &config.relay_url);
    }

    let endpoint = RtcLink::connect(&config.ice_servers)
        .await
        .context("failed to create peer connection")?;
    let options = SessionOptions {
        relay_url: config.relay_url.clone(),
        channel,
        role,
    };
    Ok(Session::open(options, game, collab, endpoint))
}
