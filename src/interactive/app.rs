//! TUI application state and logic
//!
//! The terminal loop runs on the calling thread and only talks to the
//! session through its handle: keys go in with `press`, and the latest game
//! and any notices are pulled on every tick.

use crate::core::{GameState, Key, WinState};
use crate::session::{Session, SessionNotice};
use crate::transport::NegotiationState;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);
const MAX_MESSAGES: usize = 5;

/// Application state
pub struct App {
    pub session: Session,
    pub game: GameState,
    /// Shown in the header: solo, hosting or joined
    pub title: String,
    pub messages: Vec<Message>,
    pub negotiation: Option<NegotiationState>,
    pub peer_connected: bool,
    pub ended: Option<WinState>,
    pub should_quit: bool,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub style: MessageStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Info,
    Success,
    Error,
}

impl App {
    #[must_use]
    pub fn new(session: Session, title: impl Into<String>) -> Self {
        let game = session.state();
        let mut app = Self {
            negotiation: session.negotiation(),
            session,
            game,
            title: title.into(),
            messages: Vec::new(),
            peer_connected: false,
            ended: None,
            should_quit: false,
        };

        app.ended = app.game.win_state();
        if app.ended.is_some() {
            app.add_message("Today's game is already finished.", MessageStyle::Info);
        } else if let Some(channel) = app.session.channel() {
            let text = format!("Waiting for the other player on channel {channel}");
            app.add_message(&text, MessageStyle::Info);
        } else {
            app.add_message("Type a word and press Enter.", MessageStyle::Info);
        }
        app
    }

    /// True when the session was started with a peer channel
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.session.channel().is_some()
    }

    /// Pull the latest game and notices from the session
    pub fn refresh(&mut self) {
        self.game = self.session.state();
        // A peer's snapshot can reopen a game this side had finished
        if !self.game.is_complete() {
            self.ended = None;
        }
        self.negotiation = self.session.negotiation();
        for notice in self.session.take_notices() {
            self.on_notice(notice);
        }
    }

    fn on_notice(&mut self, notice: SessionNotice) {
        match notice {
            SessionNotice::Connected => {
                self.peer_connected = true;
                self.add_message("Connected! You are now playing together.", MessageStyle::Success);
            }
            SessionNotice::NotInWordList => {
                let word = self.game.active_guess.to_uppercase();
                self.add_message(&format!("'{word}' is not in the word list"), MessageStyle::Error);
            }
            SessionNotice::Ended(win) => {
                let text = if win.losses() == 0 {
                    "🎉 All boards solved! Press Esc to leave."
                } else {
                    "Out of guesses. Press Esc to leave."
                };
                let style = if win.losses() == 0 {
                    MessageStyle::Success
                } else {
                    MessageStyle::Error
                };
                self.add_message(text, style);
                self.ended = Some(win);
            }
            SessionNotice::PeerClosed => {
                self.peer_connected = false;
                self.add_message("The other player left. Carrying on solo.", MessageStyle::Info);
            }
            SessionNotice::SignalingFailed(reason) => {
                self.add_message(&format!("Relay unavailable: {reason}"), MessageStyle::Error);
            }
        }
    }

    /// Translate one terminal key into session input
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Only process key press events (fixes Windows double-input bug)
        if key.kind != KeyEventKind::Press {
            return;
        }

        let input = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return;
            }
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char(c) if c.is_ascii_alphabetic() => Key::Letter(c.to_ascii_lowercase()),
            KeyCode::Backspace => Key::Remove,
            KeyCode::Enter => Key::Enter,
            _ => return,
        };

        if self.ended.is_some() {
            return;
        }
        if let Err(e) = self.session.press(input) {
            self.add_message(&e.to_string(), MessageStyle::Error);
        }
    }

    pub fn add_message(&mut self, text: &str, style: MessageStyle) {
        self.messages.push(Message {
            text: text.to_string(),
            style,
        });

        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    /// Give the session back for an orderly close
    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }
}

/// Run the TUI application until the player leaves
///
/// Returns the app so the caller can close its session.
///
/// # Errors
///
/// Returns an error if terminal setup/cleanup fails or if there's an I/O error
/// during rendering or event handling.
pub fn run_tui(app: App) -> Result<App> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = app;
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err}");
    }

    Ok(app)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        app.refresh();
        terminal.draw(|f| super::rendering::ui(f, app))?;

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
        {
            app.handle_key(key);
        }
    }
    Ok(())
}
