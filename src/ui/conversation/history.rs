//! Conversation history display component

use crate::events::{ConversationRole, Turn};
use crate::state::ConversationState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the transcript plus the thinking indicator and error notice
pub struct ConversationHistory<'a> {
    state: &'a ConversationState,
    notice: Option<&'a str>,
    show_timestamps: bool,
    welcome: bool,
    /// Lines scrolled up from the bottom
    scroll_back: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(state: &'a ConversationState) -> Self {
        Self {
            state,
            notice: None,
            show_timestamps: true,
            welcome: true,
            scroll_back: 0,
        }
    }

    /// Informational text shown under the transcript (help, session id)
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn welcome(mut self, welcome: bool) -> Self {
        self.welcome = welcome;
        self
    }

    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    /// How many lines the view can scroll back when drawn into `area`
    pub fn max_scroll(&self, area: Rect) -> usize {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        self.lines(inner.width).len().saturating_sub(inner.height as usize)
    }

    /// All lines of the history, top to bottom, for the given inner width
    pub fn lines(&self, width: u16) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        if self.state.is_empty() && self.welcome {
            lines.extend(welcome_lines());
        }

        for turn in self.state.turns() {
            lines.extend(self.render_turn(turn, width));
            lines.push(Line::default());
        }

        if self.state.pending() {
            lines.push(thinking_line());
        }

        if let Some(error) = self.state.last_error() {
            lines.push(Line::from(vec![
                Span::styled(format!("⚠️ {}", error), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
            ]));
        }

        if let Some(notice) = self.notice {
            for text in notice.lines() {
                lines.push(Line::from(Span::styled(text.to_string(), Style::default().fg(Color::Yellow))));
            }
        }

        lines
    }

    /// Render a single turn into lines
    fn render_turn(&self, turn: &Turn, width: u16) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        let role_icon = match turn.role() {
            ConversationRole::User => "👤",
            ConversationRole::Assistant => "🤔",
        };

        let mut header = format!("{} {}", role_icon, turn.role().display_name());
        if self.show_timestamps {
            header.push_str(&format!(" {}", turn.timestamp().format("%H:%M:%S")));
        }
        lines.push(Line::from(Span::styled(header, Style::default().fg(Color::DarkGray))));

        let style = content_style(turn.role());
        for content_line in wrap_text(turn.content(), width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![Span::raw("  "), Span::styled(content_line, style)]));
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);

        // Pin to the bottom unless the user scrolled back
        let height = inner_area.height as usize;
        let end = all_lines.len().saturating_sub(self.scroll_back.min(all_lines.len()));
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled("Welcome to SocraticChat!", Style::default().fg(Color::Green))),
        Line::default(),
        Line::from(Span::styled(
            "I'm here to help you think through your ideas by asking thoughtful questions.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "What would you like to explore today?",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ]
}

/// Animated "Thinking..." indicator
fn thinking_line() -> Line<'static> {
    let dots = match (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 4
    {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "",
    };

    Line::from(vec![
        Span::styled("🤔 Thinking", Style::default().fg(Color::Green)),
        Span::styled(dots, Style::default().fg(Color::Yellow)),
    ])
}

fn content_style(role: ConversationRole) -> Style {
    match role {
        ConversationRole::User => Style::default().fg(Color::Blue),
        ConversationRole::Assistant => Style::default().fg(Color::Green),
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace().flat_map(|word| split_long_word(word, width)) {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(&word);
            current_len += word_len;
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Break a word wider than `width` into `width`-char pieces
fn split_long_word(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= width {
        return vec![word.to_string()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}
