use crate::config::UiConfig;
use crate::controller::{ConversationController, Exchange};
use crate::error::ExchangeError;
use crate::events::ConversationEvent;
use crate::transport::ChatReply;
use crate::ui::conversation::{get_help_text, ConversationComposer, ConversationHistory, ParsedCommand, SlashCommand};
use crate::ui::conversation::composer::ConversationResult;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame,
};
use tokio::sync::{broadcast, mpsc};

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// A spawned exchange that has come back from the transport
#[derive(Debug)]
pub struct FinishedExchange {
    pub exchange: Exchange,
    pub outcome: Result<ChatReply, ExchangeError>,
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    controller: ConversationController,
    composer: ConversationComposer,
    ui: UiConfig,
    finished_tx: mpsc::UnboundedSender<FinishedExchange>,
    state_events: broadcast::Receiver<ConversationEvent>,
    notice: Option<String>,
    scroll_back: usize,
    /// Furthest `scroll_back` can go, as of the last render
    max_scroll: usize,
}

impl ConversationManager {
    pub fn new(
        controller: ConversationController,
        ui: UiConfig,
        finished_tx: mpsc::UnboundedSender<FinishedExchange>,
    ) -> Self {
        let state_events = controller.subscribe();
        Self {
            controller,
            composer: ConversationComposer::new("Type your message..."),
            ui,
            finished_tx,
            state_events,
            notice: None,
            scroll_back: 0,
            max_scroll: 0,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    #[cfg(test)]
    fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    #[cfg(test)]
    fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
                return ConversationAction::None;
            }
            KeyCode::Esc if !self.composer.is_palette_open() => {
                self.notice = None;
                self.controller.dismiss_error();
                self.sync();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5).min(self.max_scroll);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                return ConversationAction::None;
            }
            _ => {}
        }

        let action = match self.composer.handle_key(key) {
            ConversationResult::Submitted(input) => {
                self.submit(&input);
                ConversationAction::None
            }
            ConversationResult::Command(command) => self.handle_slash_command(command),
            ConversationResult::None => ConversationAction::None,
        };
        self.sync();
        action
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.handle_paste(text);
    }

    /// Begin an exchange and run the network call on its own task
    pub fn submit(&mut self, input: &str) {
        let Some(exchange) = self.controller.begin(input) else {
            return;
        };
        self.notice = None;

        let transport = self.controller.transport();
        let finished_tx = self.finished_tx.clone();
        tokio::spawn(async move {
            let outcome = exchange.send_via(transport.as_ref()).await;
            // The UI may already be gone
            let _ = finished_tx.send(FinishedExchange { exchange, outcome });
        });

        self.sync();
    }

    /// Apply a finished exchange (called from the main loop)
    pub fn finish_exchange(&mut self, finished: FinishedExchange) {
        self.controller.resolve(finished.exchange, finished.outcome);
        self.sync();
    }

    pub fn clear(&mut self) {
        self.controller.clear();
        self.composer.clear();
        self.notice = None;
        self.sync();
    }

    /// Drain state notifications and bring the view in line with the state
    fn sync(&mut self) {
        loop {
            match self.state_events.try_recv() {
                Ok(ConversationEvent::TurnAppended { .. }) | Ok(ConversationEvent::Cleared) => {
                    // New content scrolls into view
                    self.scroll_back = 0;
                }
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        self.composer.set_enabled(!self.controller.state().pending());
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Clear => {
                self.clear();
                ConversationAction::None
            }
            SlashCommand::Session => {
                self.notice = Some(match self.controller.state().session_id() {
                    Some(id) => format!("Session: {}", id),
                    None => "No session yet. One is assigned after the first reply.".to_string(),
                });
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    /// Draw the whole conversation screen
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(5),    // History
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Footer
            ])
            .split(frame.size());

        frame.render_widget(header(), chunks[0]);

        let history = ConversationHistory::new(self.controller.state())
            .notice(self.notice.as_deref())
            .show_timestamps(self.ui.show_timestamps)
            .welcome(self.ui.welcome);
        // The history may have shrunk (clear, resize) since the last scroll
        self.max_scroll = history.max_scroll(chunks[1]);
        self.scroll_back = self.scroll_back.min(self.max_scroll);
        frame.render_widget(history.scroll_back(self.scroll_back), chunks[1]);

        frame.render_widget(&self.composer, chunks[2]);

        let palette_height = self.composer.palette_height().min(chunks[1].height);
        if palette_height > 0 {
            let palette_area = Rect {
                x: chunks[2].x,
                y: chunks[2].y.saturating_sub(palette_height),
                width: chunks[2].width,
                height: palette_height,
            };
            self.composer.render_palette(palette_area, frame.buffer_mut());
        }

        frame.render_widget(footer(!self.controller.state().is_empty()), chunks[3]);
    }
}

fn header() -> ratatui::widgets::Paragraph<'static> {
    ratatui::widgets::Paragraph::new(vec![
        Line::from(Span::styled(
            "🤔 SocraticChat",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("Engage in thoughtful dialogue", Style::default().fg(Color::Gray))),
    ])
}

fn footer(can_clear: bool) -> ratatui::widgets::Paragraph<'static> {
    let mut hint = String::from("Enter send · / commands · PgUp/PgDn scroll · Ctrl+C quit");
    if can_clear {
        hint.push_str(" · Ctrl+L clear");
    }
    ratatui::widgets::Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
}
