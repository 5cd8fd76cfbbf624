//! Terminal UI event loop

use crate::config::Config;
use crate::controller::ConversationController;
use crate::transport::HttpTransport;
use crate::ui::conversation::{ConversationAction, ConversationManager, FinishedExchange};
use anyhow::{Context, Result};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the interactive terminal UI until the user quits
pub async fn run(config: Config) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    tracing::info!(api_url = %transport.base_url(), "Starting terminal UI");

    let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();
    let controller = ConversationController::new(transport);
    let mut manager = ConversationManager::new(controller, config.ui.clone(), finished_tx);

    install_panic_hook();
    let mut terminal = enter_terminal()?;
    let outcome = event_loop(&mut terminal, &mut manager, &mut finished_rx).await;
    leave_terminal(&mut terminal)?;

    outcome
}

async fn event_loop(
    terminal: &mut Tui,
    manager: &mut ConversationManager,
    finished_rx: &mut mpsc::UnboundedReceiver<FinishedExchange>,
) -> Result<()> {
    let mut events = EventStream::new();
    // Keeps the thinking indicator animated
    let mut ticker = interval(Duration::from_millis(300));

    loop {
        terminal
            .draw(|frame| manager.render(frame))
            .context("Failed to draw terminal")?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    if manager.handle_key(key) == ConversationAction::Exit {
                        break;
                    }
                }
                Some(Ok(Event::Paste(text))) => manager.handle_paste(&text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
            Some(finished) = finished_rx.recv() => manager.finish_exchange(finished),
            _ = ticker.tick() => {}
        }
    }

    tracing::info!("Terminal UI closed");
    Ok(())
}

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Restore the terminal before the default hook prints the panic
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        default_hook(info);
    }));
}
