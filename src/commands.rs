use crate::config::Config;
use crate::controller::{ConversationController, Resolution};
use crate::events::ConversationRole;
use crate::transport::HttpTransport;
use crate::ui::conversation::{get_help_text, parse_slash_command, SlashCommand};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One exchange from the command line
pub async fn send_message(config: &Config, message: &str, session_id: Option<String>) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(config)?);
    let mut controller = match session_id {
        Some(id) => ConversationController::resume(transport, id),
        None => ConversationController::new(transport),
    };

    match controller.submit(message).await {
        None => anyhow::bail!("Message cannot be empty"),
        Some(Resolution::Answered) => {
            if let Some(turn) = controller.state().turns().last() {
                println!("{}", turn.content());
            }
            if let Some(id) = controller.state().session_id() {
                eprintln!("session: {}", id);
            }
            Ok(())
        }
        Some(_) => {
            let error = controller.state().last_error().unwrap_or_default();
            anyhow::bail!("{}", error)
        }
    }
}

pub async fn check_health(config: &Config) -> Result<()> {
    let transport = HttpTransport::new(config)?;
    let health = transport.health().await?;

    println!("✅ {} is {}", transport.base_url(), health.status);
    if let Some(timestamp) = health.timestamp {
        println!("   🕒 {}", timestamp);
    }
    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;

    println!("📍 {}", config.config_path().display());
    println!("{}", "=".repeat(50));
    print!("{}", rendered);
    Ok(())
}

/// Line-mode conversation over stdin/stdout
pub async fn run_repl(config: &Config) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(config)?);
    let mut controller = ConversationController::new(transport);

    println!("🤔 SocraticChat");
    println!("Engage in thoughtful dialogue");
    println!("{}", "=".repeat(50));
    if config.ui.welcome {
        println!("I'm here to help you think through your ideas by asking thoughtful questions.");
        println!("What would you like to explore today? (/help for commands)");
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read user input")? else {
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Some(command) = parse_slash_command(&line) {
            match command.command {
                SlashCommand::Clear => {
                    controller.clear();
                    println!("🧹 Conversation cleared.");
                }
                SlashCommand::Session => match controller.state().session_id() {
                    Some(id) => println!("Session: {}", id),
                    None => println!("No session yet."),
                },
                SlashCommand::Help => println!("{}", get_help_text()),
                SlashCommand::Bye => break,
            }
            continue;
        }

        println!("Thinking...");
        match controller.submit(&line).await {
            Some(Resolution::Answered) => {
                if let Some(turn) = controller.state().turns().last() {
                    debug_assert_eq!(turn.role(), ConversationRole::Assistant);
                    println!("🤔 {}\n", turn.content());
                }
            }
            Some(Resolution::Failed) => {
                if let Some(error) = controller.state().last_error() {
                    eprintln!("⚠️ {}\n", error);
                }
            }
            Some(Resolution::Stale) | None => {}
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}
