use std::collections::VecDeque;
use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use skirmish::{ConnectionStatus, SessionClient, StoreChange};

const MAX_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn color(self) -> Color {
        match self {
            LogLevel::Info => Color::White,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

struct LogEntry {
    elapsed_secs: u64,
    level: LogLevel,
    message: String,
}

pub struct TuiState {
    started: Instant,
    log: VecDeque<LogEntry>,
    scroll_back: usize,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            log: VecDeque::new(),
            scroll_back: 0,
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn record(&mut self, change: &StoreChange) {
        let message = describe(change);
        match change {
            StoreChange::Status(ConnectionStatus::Error) => self.log_error(message),
            StoreChange::Status(ConnectionStatus::Disconnected) => self.log_warn(message),
            _ => self.log_info(message),
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_back = (self.scroll_back + 5).min(self.log.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    fn push(&mut self, level: LogLevel, message: String) {
        if self.log.len() == MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            elapsed_secs: self.started.elapsed().as_secs(),
            level,
            message,
        });
    }

    fn visible_log(&self, rows: usize) -> impl Iterator<Item = &LogEntry> {
        let end = self.log.len().saturating_sub(self.scroll_back);
        let start = end.saturating_sub(rows);
        self.log.range(start..end)
    }
}

/// One-line summary of a store change, shared by the log panel and headless
/// mode.
pub fn describe(change: &StoreChange) -> String {
    match change {
        StoreChange::Status(status) => format!("Connection {}", status),
        StoreChange::Identity(client_id) => format!("Assigned identity {}", client_id),
        StoreChange::SessionReady(ready) => format!(
            "Session {} ready, opponent {}",
            ready.session_id, ready.opponent_id
        ),
        StoreChange::GameStarted(session_id) => format!("Session {} started", session_id),
        StoreChange::GameEnded(outcome) => format!(
            "Session {} ended, winner {} ({})",
            outcome.session_id, outcome.winner_id, outcome.reason
        ),
        StoreChange::UnitMoved { unit_id, position } => format!(
            "Unit {} moved to {:.5}, {:.5}",
            unit_id, position.lat, position.lon
        ),
        StoreChange::SessionCleared => "Session state cleared".to_string(),
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, client: &SessionClient) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state, client);
    render_session(frame, chunks[1], client);
    render_overlay(frame, chunks[2], client);
    render_log(frame, chunks[3], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, state: &TuiState, client: &SessionClient) {
    let uptime = format_duration(state.started.elapsed().as_secs());
    let title = format!(" Skirmish - Uptime: {} ", uptime);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let status = client.status();
    let mut spans = vec![
        Span::styled("Server: ", Style::default().fg(Color::Gray)),
        Span::styled(
            client.config().server_url.clone(),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::styled(
            status.as_str(),
            Style::default()
                .fg(status_color(status))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if client.is_reconnect_scheduled() {
        spans.push(Span::styled(
            " (retrying)",
            Style::default().fg(Color::Yellow),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_session(frame: &mut Frame, area: Rect, client: &SessionClient) {
    let block = Block::default()
        .title(" Session ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let store = client.store();
    let stats = client.dispatch_stats();

    let ready = store
        .session_ready()
        .map(|ready| format!("{} vs {}", ready.session_id, ready.opponent_id));
    let ended = store
        .game_ended()
        .map(|outcome| format!("winner {} ({})", outcome.winner_id, outcome.reason));

    let lines = vec![
        field("Identity: ", store.client_id().map(str::to_string)),
        field("Ready: ", ready),
        field("Started: ", store.game_started().map(str::to_string)),
        field("Ended: ", ended),
        Line::from(vec![
            Span::styled("Frames: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} recv / {} applied / {} rejected",
                    stats.frames, stats.events_applied, stats.frames_rejected
                ),
                Style::default().fg(if stats.frames_rejected > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_overlay(frame: &mut Frame, area: Rect, client: &SessionClient) {
    let positions = client.store().positions();

    let block = Block::default()
        .title(format!(" Unit Positions ({}) ", positions.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let mut units: Vec<_> = positions.iter().collect();
    units.sort_by(|a, b| a.0.cmp(b.0));

    let lines: Vec<Line> = if units.is_empty() {
        vec![Line::from(Span::styled(
            "No unit movements yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        units
            .into_iter()
            .map(|(unit_id, position)| {
                Line::from(vec![
                    Span::styled(format!("{:<16}", unit_id), Style::default().fg(Color::Gray)),
                    Span::styled(
                        format!("{:>11.5} {:>11.5}", position.lat, position.lon),
                        Style::default().fg(Color::White),
                    ),
                ])
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let title = if state.scroll_back > 0 {
        format!(" Log (-{}) ", state.scroll_back)
    } else {
        " Log ".to_string()
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let rows = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .visible_log(rows)
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", format_duration(entry.elapsed_secs)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(entry.level.color())),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("'r' reconnect  'l' leave session  PgUp/PgDn scroll  'q' or ESC quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn field(label: &'static str, value: Option<String>) -> Line<'static> {
    let (text, color) = match value {
        Some(value) => (value, Color::White),
        None => ("-".to_string(), Color::DarkGray),
    };
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(text, Style::default().fg(color)),
    ])
}

fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Connecting => Color::Cyan,
        ConnectionStatus::Disconnected => Color::Yellow,
        ConnectionStatus::Error => Color::Red,
        ConnectionStatus::Idle => Color::DarkGray,
    }
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish::LatLon;

    #[test]
    fn test_describe_unit_moved() {
        let change = StoreChange::UnitMoved {
            unit_id: "u-1".to_string(),
            position: LatLon::new(50.5, 4.25),
        };

        assert_eq!(describe(&change), "Unit u-1 moved to 50.50000, 4.25000");
    }

    #[test]
    fn test_log_is_bounded() {
        let mut state = TuiState::new();
        for i in 0..MAX_LOG_ENTRIES + 10 {
            state.log_info(format!("entry {}", i));
        }

        assert_eq!(state.log.len(), MAX_LOG_ENTRIES);
        assert_eq!(state.log.front().unwrap().message, "entry 10");
    }

    #[test]
    fn test_scroll_window() {
        let mut state = TuiState::new();
        for i in 0..20 {
            state.log_info(format!("entry {}", i));
        }

        let tail: Vec<_> = state.visible_log(3).map(|e| e.message.as_str()).collect();
        assert_eq!(tail, ["entry 17", "entry 18", "entry 19"]);

        state.scroll_up();
        let earlier: Vec<_> = state.visible_log(3).map(|e| e.message.as_str()).collect();
        assert_eq!(earlier, ["entry 12", "entry 13", "entry 14"]);

        state.scroll_to_bottom();
        assert_eq!(state.visible_log(1).next().unwrap().message, "entry 19");
    }

    #[test]
    fn test_error_status_logged_as_error() {
        let mut state = TuiState::new();
        state.record(&StoreChange::Status(ConnectionStatus::Error));

        assert_eq!(state.log.back().unwrap().level, LogLevel::Error);
    }
}
