use std::time::Duration;

use clap::Args;

use crate::errors::AppError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STATE_DB: &str = "sqlite://librarian-state.db";
/// Matches the backend's default cover size.
pub const DEFAULT_COVER_SIZE: &str = "512x512";

/// Settings shared by every subcommand; each flag can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Base URL of the Smart Librarian backend.
    #[arg(long, env = "LIBRARIAN_API_BASE_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub api_base_url: String,

    /// SQLite database holding the transcript and conversation id.
    #[arg(long, env = "LIBRARIAN_STATE_DB", default_value = DEFAULT_STATE_DB, global = true)]
    pub state_db: String,

    /// Size requested for cover images.
    #[arg(long, env = "LIBRARIAN_COVER_SIZE", default_value = DEFAULT_COVER_SIZE, global = true)]
    pub cover_size: String,

    /// Per-request timeout; requests wait indefinitely when unset.
    #[arg(long, env = "LIBRARIAN_REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,

    /// Keep state in memory only.
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub state_db: String,
    pub cover_size: String,
    pub request_timeout: Option<Duration>,
    pub ephemeral: bool,
}

impl TryFrom<ConfigArgs> for AppConfig {
    type Error = AppError;

    fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
        let api_base_url = args.api_base_url.trim().trim_end_matches('/').to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "api base url must start with http:// or https:// (got '{}')",
                args.api_base_url
            )));
        }
        if args.cover_size.trim().is_empty() {
            return Err(AppError::Config("cover size cannot be empty".to_string()));
        }
        Ok(Self {
            api_base_url,
            state_db: args.state_db,
            cover_size: args.cover_size.trim().to_string(),
            request_timeout: args
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            ephemeral: args.ephemeral,
        })
    }
}
