use thiserror::Error;

/// Failures talking to the Smart Librarian backend.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Transport ────────────────────────────────────────────────────────────
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    // ── Server-reported ──────────────────────────────────────────────────────
    #[error("conversation '{conversation_id}' not found")]
    ConversationNotFound { conversation_id: String },

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    // ── Payload ──────────────────────────────────────────────────────────────
    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        ApiError::Transport { url: url.into(), message: source.to_string() }
    }

    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        ApiError::Decode { url: url.into(), message: source.to_string() }
    }

    /// The cached conversation id is no longer known to the server.
    pub fn is_stale_session(&self) -> bool {
        matches!(self, ApiError::ConversationNotFound { .. })
    }
}

/// Failures of the local key-value state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state database error: {message}")]
    Database {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("state migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to (de)serialize stored value for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn db(message: impl Into<String>, source: sqlx::Error) -> Self {
        StoreError::Database { message: message.into(), source }
    }

    pub fn serde(key: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Serialization { key: key.into(), source }
    }
}

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("a message is already being sent")]
    SendInProgress,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn is_busy(&self) -> bool {
        matches!(self, AppError::SendInProgress)
    }
}
