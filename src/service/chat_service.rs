use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::LibrarianApi;
use crate::db::local_state::LocalState;
use crate::db::state_store::StateStore;
use crate::errors::{ApiError, AppError};
use crate::models::{ConversationId, CoverResponse, Message, MessageReply, Transcript};
use crate::service::session_manager::SessionManager;

/// Result of one user-triggered send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    Delivered { image: bool },
    /// An error bubble carrying `reason` was appended.
    Failed { reason: String },
}

#[derive(Debug, Error)]
enum SendFailure {
    #[error("No conversation")]
    NoConversation,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Chat screen state: the transcript plus everything needed to extend it.
pub struct ChatService<A, S> {
    sessions: SessionManager<A, S>,
    cover_size: String,
    transcript: watch::Sender<Transcript>,
    // Held for the whole send; a second send is rejected rather than queued.
    send_lock: Mutex<()>,
}

impl<A: LibrarianApi, S: StateStore> ChatService<A, S> {
    pub fn new(api: A, store: S, cover_size: impl Into<String>) -> Self {
        let (transcript, _) = watch::channel(Transcript::new());
        Self {
            sessions: SessionManager::new(api, LocalState::new(store)),
            cover_size: cover_size.into(),
            transcript,
            send_lock: Mutex::new(()),
        }
    }

    pub fn sessions(&self) -> &SessionManager<A, S> {
        &self.sessions
    }

    /// Observes every transcript change, including the optimistic user bubble.
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.transcript.subscribe()
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.borrow().clone()
    }

    /// Replaces the in-memory transcript with the persisted one.
    pub async fn load(&self) -> Result<(), AppError> {
        let stored = self.sessions.state().load_transcript().await?;
        debug!("Loaded {} stored messages", stored.len());
        self.transcript.send_replace(stored);
        Ok(())
    }

    /// Forgets the transcript and the cached conversation id.
    pub async fn new_conversation(&self) -> Result<(), AppError> {
        let _guard = self.send_lock.try_lock().map_err(|_| AppError::SendInProgress)?;
        let state = self.sessions.state();
        state.clear_transcript().await?;
        state.clear_conversation_id().await?;
        self.transcript.send_modify(Transcript::clear);
        info!("Started a new chat");
        Ok(())
    }

    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, AppError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        let _guard = self.send_lock.try_lock().map_err(|_| AppError::SendInProgress)?;

        self.transcript.send_modify(|t| t.push(Message::user(text)));

        let (conversation_id, reply) = match self.exchange(text).await {
            Ok(done) => done,
            Err(failure) => {
                let reason = failure.to_string();
                warn!("Send failed: {reason}");
                self.transcript.send_modify(|t| t.push(Message::send_failure(&reason)));
                return Ok(SendOutcome::Failed { reason });
            }
        };

        let image = match reply.recommended_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => self.fetch_cover(title).await,
            _ => None,
        };
        let has_image = image.is_some();

        self.transcript.send_modify(|t| {
            if let Some(url) = image {
                t.push(Message::bot_image(url));
            }
            t.push(Message::bot_text(reply.reply.clone()));
        });

        let snapshot = self.transcript();
        if let Err(e) = self.sessions.state().save_transcript(&snapshot).await {
            error!("Failed to persist transcript: {e}");
        }

        let active = reply
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(conversation_id);
        self.sessions.remember(&active).await;

        Ok(SendOutcome::Delivered { image: has_image })
    }

    /// Sends `text`, recreating the conversation and retrying once if the server
    /// no longer knows the cached id.
    async fn exchange(&self, text: &str) -> Result<(ConversationId, MessageReply), SendFailure> {
        let conversation_id = self
            .sessions
            .ensure_conversation()
            .await
            .ok_or(SendFailure::NoConversation)?;

        match self.sessions.api().send_message(&conversation_id, text).await {
            Ok(reply) => Ok((conversation_id, reply)),
            Err(e) if e.is_stale_session() => {
                warn!("Conversation {conversation_id} expired, retrying with a new one");
                self.sessions.invalidate().await;
                let fresh = self
                    .sessions
                    .ensure_conversation()
                    .await
                    .ok_or(SendFailure::NoConversation)?;
                let reply = self.sessions.api().send_message(&fresh, text).await?;
                Ok((fresh, reply))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_cover(&self, title: &str) -> Option<String> {
        match self.sessions.api().cover(title, &self.cover_size).await {
            Ok(CoverResponse { image_data_url: Some(url) }) if !url.is_empty() => Some(url),
            Ok(_) => {
                debug!("No cover image returned for '{title}'");
                None
            }
            Err(e) => {
                warn!("Cover lookup for '{title}' failed: {e}");
                None
            }
        }
    }
}
