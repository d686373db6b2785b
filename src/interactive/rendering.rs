//! TUI rendering with ratatui
//!
//! Boards in a grid, the keyboard with letter hints, a message log and a
//! status bar showing the connection.

use super::app::{App, MessageStyle};
use crate::core::{BoardState, Completion, MatchState, Row};
use crate::output::formatters::spaced_word;
use crate::transport::NegotiationState;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};
use rustc_hash::FxHashMap;

const KEYBOARD: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Boards
            Constraint::Length(5), // Keyboard
            Constraint::Length(7), // Messages
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_boards(f, app, chunks[1]);
    render_keyboard(f, app, chunks[2]);
    render_messages(f, app, chunks[3]);
    render_status(f, app, chunks[4]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let channel = app
        .session
        .channel()
        .map(|channel| format!(" | channel {channel}"))
        .unwrap_or_default();
    let title = format!(
        "🎯 WORDLE DUET - {} ({} letters, {} boards){channel}",
        app.title,
        app.game.letter_count,
        app.game.boards.len()
    );

    let header = Paragraph::new(title)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(header, area);
}

fn render_boards(f: &mut Frame, app: &App, area: Rect) {
    let columns = app.game.columns.clamp(1, app.game.boards.len().max(1));
    let rows = app.game.boards.len().div_ceil(columns).max(1);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    for (i, board) in app.game.boards.iter().enumerate() {
        let col_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(row_areas[i / columns]);
        render_board(f, app, i, board, col_areas[i % columns]);
    }
}

fn render_board(f: &mut Frame, app: &App, index: usize, board: &BoardState, area: Rect) {
    let width = app.game.letter_count;
    let mut lines: Vec<Line> = board.rows.iter().map(|row| row_line(row, width)).collect();

    // The typed guess is shown under a finished board too, dimmed
    if board.is_complete() && !app.game.active_guess.is_empty() {
        lines.push(Line::styled(
            spaced_word(&app.game.active_guess, width),
            Style::default().fg(Color::DarkGray),
        ));
    }
    while lines.len() < app.game.guesses_allowed {
        lines.push(Line::styled(
            spaced_word("", width),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let (title, color) = match board.complete {
        Completion::Incomplete => (format!(" Board {} ", index + 1), Color::White),
        Completion::Success => (format!(" Board {} ✓ ", index + 1), Color::Green),
        Completion::Fail => (
            format!(" Board {} ✗ {} ", index + 1, board.target.to_uppercase()),
            Color::Red,
        ),
    };

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().fg(color)),
    );
    f.render_widget(paragraph, area);
}

fn row_line(row: &Row, width: usize) -> Line<'static> {
    if !row.committed {
        return Line::styled(
            spaced_word(&row.word(), width),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    }

    let mut spans = Vec::with_capacity(row.letters.len() * 2);
    for (i, &(letter, state)) in row.letters.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            letter.to_ascii_uppercase().to_string(),
            cell_style(Some(state)),
        ));
    }
    Line::from(spans)
}

fn cell_style(state: Option<MatchState>) -> Style {
    match state {
        Some(MatchState::Match) => Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD),
        Some(MatchState::Position) => Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        Some(MatchState::Invalid) => Style::default().fg(Color::White).bg(Color::DarkGray),
        None => Style::default().fg(Color::White),
    }
}

fn render_keyboard(f: &mut Frame, app: &App, area: Rect) {
    let hints: FxHashMap<char, MatchState> = app.game.keyboard_hints();

    let lines: Vec<Line> = KEYBOARD
        .iter()
        .map(|keys| {
            let mut spans = Vec::new();
            for (i, key) in keys.chars().enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" "));
                }
                spans.push(Span::styled(
                    key.to_ascii_uppercase().to_string(),
                    cell_style(hints.get(&key).copied()),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let keyboard = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().title(" Keyboard ").borders(Borders::ALL));
    f.render_widget(keyboard, area);
}

fn render_messages(f: &mut Frame, app: &App, area: Rect) {
    let messages: Vec<ListItem> = app
        .messages
        .iter()
        .rev()
        .map(|msg| {
            let style = match msg.style {
                MessageStyle::Info => Style::default().fg(Color::White),
                MessageStyle::Success => Style::default().fg(Color::Green),
                MessageStyle::Error => Style::default().fg(Color::Red),
            };
            ListItem::new(msg.text.clone()).style(style)
        })
        .collect();

    let messages_list =
        List::new(messages).block(Block::default().title(" Messages ").borders(Borders::ALL));

    f.render_widget(messages_list, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(40),
        ])
        .split(area);

    let solved = app
        .game
        .boards
        .iter()
        .filter(|b| b.complete == Completion::Success)
        .count();
    let progress = Paragraph::new(format!("Solved: {solved}/{}", app.game.boards.len()))
        .alignment(Alignment::Center);
    f.render_widget(progress, chunks[0]);

    let (link_text, link_color) = connection_label(app);
    let link = Paragraph::new(link_text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(link_color));
    f.render_widget(link, chunks[1]);

    let help = Paragraph::new("A-Z: Type | Backspace | Enter: Guess | Esc: Leave")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[2]);
}

fn connection_label(app: &App) -> (&'static str, Color) {
    if !app.is_shared() {
        return ("Solo", Color::White);
    }
    match app.negotiation {
        _ if app.peer_connected => ("Peer: connected", Color::Green),
        Some(NegotiationState::Idle | NegotiationState::Signaled) => {
            ("Peer: waiting", Color::Yellow)
        }
        Some(NegotiationState::Negotiating) => ("Peer: negotiating", Color::Yellow),
        Some(NegotiationState::Connected) => ("Peer: connected", Color::Green),
        Some(NegotiationState::Closed) | None => ("Peer: gone (solo)", Color::DarkGray),
    }
}
