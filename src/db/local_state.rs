use tracing::warn;

use crate::db::state_store::StateStore;
use crate::errors::StoreError;
use crate::models::{ConversationId, Transcript};

pub const TRANSCRIPT_KEY: &str = "conversation";
pub const CONVERSATION_ID_KEY: &str = "conversationId";

/// Typed view over the two persisted app-state entries.
pub struct LocalState<S> {
    store: S,
}

impl<S: StateStore> LocalState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Missing or unreadable transcripts load as empty.
    pub async fn load_transcript(&self) -> Result<Transcript, StoreError> {
        let Some(raw) = self.store.get(TRANSCRIPT_KEY).await? else {
            return Ok(Transcript::new());
        };
        match serde_json::from_str(&raw) {
            Ok(transcript) => Ok(transcript),
            Err(e) => {
                warn!("Discarding unreadable stored transcript: {e}");
                Ok(Transcript::new())
            }
        }
    }

    pub async fn save_transcript(&self, transcript: &Transcript) -> Result<(), StoreError> {
        let raw = serde_json::to_string(transcript).map_err(|e| StoreError::serde(TRANSCRIPT_KEY, e))?;
        self.store.set(TRANSCRIPT_KEY, &raw).await
    }

    pub async fn clear_transcript(&self) -> Result<(), StoreError> {
        self.store.remove(TRANSCRIPT_KEY).await
    }

    pub async fn conversation_id(&self) -> Result<Option<ConversationId>, StoreError> {
        Ok(self
            .store
            .get(CONVERSATION_ID_KEY)
            .await?
            .filter(|id| !id.trim().is_empty()))
    }

    pub async fn save_conversation_id(&self, id: &str) -> Result<(), StoreError> {
        self.store.set(CONVERSATION_ID_KEY, id).await
    }

    pub async fn clear_conversation_id(&self) -> Result<(), StoreError> {
        self.store.remove(CONVERSATION_ID_KEY).await
    }
}
