use tracing::{error, info, warn};

use crate::api::LibrarianApi;
use crate::db::local_state::LocalState;
use crate::db::state_store::StateStore;
use crate::models::ConversationId;

/// Keeps a usable conversation id in local state, creating one on demand.
pub struct SessionManager<A, S> {
    api: A,
    state: LocalState<S>,
}

impl<A: LibrarianApi, S: StateStore> SessionManager<A, S> {
    pub fn new(api: A, state: LocalState<S>) -> Self {
        Self { api, state }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &LocalState<S> {
        &self.state
    }

    /// Returns the cached id, or asks the server for a new one.
    ///
    /// `None` means no conversation could be obtained; the failure has already
    /// been logged.
    pub async fn ensure_conversation(&self) -> Option<ConversationId> {
        match self.state.conversation_id().await {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => warn!("Cached conversation id unreadable, creating a new one: {e}"),
        }

        let created = match self.api.create_conversation().await {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to create conversation: {e}");
                return None;
            }
        };

        if let Err(e) = self.state.save_conversation_id(&created.conversation_id).await {
            error!("Failed to persist conversation id {}: {e}", created.conversation_id);
            return None;
        }
        info!("Started conversation {}", created.conversation_id);
        Some(created.conversation_id)
    }

    /// Drops the cached id so the next [`ensure_conversation`](Self::ensure_conversation) creates one.
    pub async fn invalidate(&self) {
        if let Err(e) = self.state.clear_conversation_id().await {
            error!("Failed to clear cached conversation id: {e}");
        }
    }

    /// Caches an id the server reported for the current exchange.
    pub async fn remember(&self, id: &str) {
        match self.state.conversation_id().await {
            Ok(Some(current)) if current == id => {}
            _ => {
                if let Err(e) = self.state.save_conversation_id(id).await {
                    error!("Failed to persist conversation id {id}: {e}");
                }
            }
        }
    }
}
