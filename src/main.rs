use clap::{Parser, Subcommand};
use socratic::{app, commands, logging, Config};

#[derive(Parser)]
#[command(name = "socratic")]
#[command(version)]
#[command(about = "Socratic dialogue in your terminal", long_about = None)]
struct Cli {
    /// Chat service base URL (overrides SOCRATIC_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation (the default)
    Chat {
        /// Plain line-mode prompt instead of the full-screen UI
        #[arg(long)]
        plain: bool,
    },
    /// Send a single message and print the reply
    Send {
        message: String,
        /// Continue an existing server session
        #[arg(long)]
        session: Option<String>,
    },
    /// Check that the chat service is reachable
    Health,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.apply_overrides(None, cli.api_url);

    match cli.command.unwrap_or(Commands::Chat { plain: false }) {
        Commands::Chat { plain: false } => {
            logging::init_file(&config.log_path())?;
            app::run(config).await
        }
        Commands::Chat { plain: true } => {
            logging::init_stderr()?;
            commands::run_repl(&config).await
        }
        Commands::Send { message, session } => {
            logging::init_stderr()?;
            commands::send_message(&config, &message, session).await
        }
        Commands::Health => {
            logging::init_stderr()?;
            commands::check_health(&config).await
        }
        Commands::Config => commands::show_config(&config),
    }
}
