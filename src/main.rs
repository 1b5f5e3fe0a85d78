use clap::{Parser, Subcommand};
use console::Term;
use tracing::info;

use librarian_chat::api::{HttpLibrarianApi, LibrarianApi};
use librarian_chat::components::{chat, history};
use librarian_chat::config::{AppConfig, ConfigArgs};
use librarian_chat::db::local_state::LocalState;
use librarian_chat::db::state_store::{MemoryStateStore, SqliteStateStore, StateStore};
use librarian_chat::errors::AppError;
use librarian_chat::service::chat_service::ChatService;

#[derive(Debug, Parser)]
#[command(name = "librarian-chat", version, about = "Terminal chat client for the Smart Librarian")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Interactive chat (default).
    Chat,
    /// Print the saved transcript.
    History,
    /// Check that the backend is reachable.
    Health,
    /// Forget the saved transcript and conversation id.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they stay out of the chat screen.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "librarian_chat=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat);
    let config = AppConfig::try_from(cli.config)?;

    // ── Backend client ────────────────────────────────────────────────────────
    let api = HttpLibrarianApi::new(&config.api_base_url, config.request_timeout)?;
    info!("Using backend at {}", api.base_url());

    // ── Local state ───────────────────────────────────────────────────────────
    if config.ephemeral {
        run(command, &config, api, MemoryStateStore::new()).await?;
    } else {
        let store = SqliteStateStore::connect(&config.state_db).await?;
        info!("Local state in {}", config.state_db);
        run(command, &config, api, store).await?;
    }
    Ok(())
}

async fn run<S: StateStore>(
    command: Command,
    config: &AppConfig,
    api: HttpLibrarianApi,
    store: S,
) -> Result<(), AppError> {
    let term = Term::stdout();
    match command {
        Command::Chat => {
            let service = ChatService::new(api, store, config.cover_size.clone());
            chat::run(&service, &term).await
        }
        Command::History => history::show(&LocalState::new(store), &term).await,
        Command::Health => {
            let health = api.health().await?;
            term.write_line(&format!("{}: {}", api.base_url(), health.status))?;
            Ok(())
        }
        Command::Reset => {
            let state = LocalState::new(store);
            state.clear_transcript().await?;
            state.clear_conversation_id().await?;
            term.write_line("Cleared saved conversation.")?;
            Ok(())
        }
    }
}
