//! Scripted [`LibrarianApi`] and [`StateStore`] doubles used by the service unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::api::LibrarianApi;
use crate::db::state_store::{MemoryStateStore, StateStore};
use crate::errors::{ApiError, StoreError};
use crate::models::{CoverResponse, CreateConversationResponse, HealthResponse, MessageReply};

pub enum Reply {
    Ok(MessageReply),
    NotFound,
    Status(u16),
    Transport,
}

impl Reply {
    pub fn text(reply: &str) -> Self {
        Reply::Ok(MessageReply {
            reply: reply.to_string(),
            recommended_title: None,
            conversation_id: None,
        })
    }

    pub fn titled(reply: &str, title: &str) -> Self {
        Reply::Ok(MessageReply {
            reply: reply.to_string(),
            recommended_title: Some(title.to_string()),
            conversation_id: None,
        })
    }
}

pub enum Cover {
    Image(String),
    Missing,
    Fail,
}

#[derive(Default)]
struct Calls {
    create: AtomicUsize,
    send: AtomicUsize,
    cover: AtomicUsize,
}

pub struct FakeApi {
    created_ids: Mutex<VecDeque<String>>,
    create_fails: bool,
    replies: Mutex<VecDeque<Reply>>,
    cover: Cover,
    sent: Mutex<Vec<(String, String)>>,
    cover_titles: Mutex<Vec<(String, String)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    calls: Calls,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            created_ids: Mutex::new(VecDeque::new()),
            create_fails: false,
            replies: Mutex::new(VecDeque::new()),
            cover: Cover::Missing,
            sent: Mutex::new(Vec::new()),
            cover_titles: Mutex::new(Vec::new()),
            gate: None,
            calls: Calls::default(),
        }
    }

    pub fn with_created_ids<const N: usize>(self, ids: [&str; N]) -> Self {
        *self.created_ids.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.create_fails = true;
        self
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn with_cover(mut self, cover: Cover) -> Self {
        self.cover = cover;
        self
    }

    /// `send_message` signals `reached` and then waits on `release`.
    pub fn with_send_gate(mut self, reached: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((reached, release));
        self
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.calls.send.load(Ordering::SeqCst)
    }

    pub fn cover_calls(&self) -> usize {
        self.calls.cover.load(Ordering::SeqCst)
    }

    /// `(conversation_id, message)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// `(title, size)` pairs in request order.
    pub fn cover_requests(&self) -> Vec<(String, String)> {
        self.cover_titles.lock().unwrap().clone()
    }
}

impl LibrarianApi for FakeApi {
    async fn create_conversation(&self) -> Result<CreateConversationResponse, ApiError> {
        let n = self.calls.create.fetch_add(1, Ordering::SeqCst) + 1;
        if self.create_fails {
            return Err(ApiError::Transport {
                url: "/conversations".into(),
                message: "connection refused".into(),
            });
        }
        let conversation_id = self
            .created_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("conv-{n}"));
        Ok(CreateConversationResponse { conversation_id })
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<MessageReply, ApiError> {
        self.calls.send.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.to_string()));

        if let Some((reached, release)) = &self.gate {
            reached.notify_one();
            release.notified().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Ok(reply)) => Ok(reply),
            Some(Reply::NotFound) => Err(ApiError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            }),
            Some(Reply::Status(status)) => Err(ApiError::Status {
                status,
                body: "scripted failure".into(),
            }),
            Some(Reply::Transport) | None => Err(ApiError::Transport {
                url: "/conversations/message".into(),
                message: "connection reset".into(),
            }),
        }
    }

    async fn cover(&self, title: &str, size: &str) -> Result<CoverResponse, ApiError> {
        self.calls.cover.fetch_add(1, Ordering::SeqCst);
        self.cover_titles
            .lock()
            .unwrap()
            .push((title.to_string(), size.to_string()));
        match &self.cover {
            Cover::Image(url) => Ok(CoverResponse { image_data_url: Some(url.clone()) }),
            Cover::Missing => Ok(CoverResponse { image_data_url: None }),
            Cover::Fail => Err(ApiError::Status { status: 500, body: "cover failed".into() }),
        }
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse { status: "ok".into() })
    }
}

/// [`MemoryStateStore`] whose reads, or writes to one key, can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStateStore,
    fail_reads: bool,
    fail_writes_to: Option<&'static str>,
}

impl FlakyStore {
    pub fn failing_reads() -> Self {
        Self { fail_reads: true, ..Self::default() }
    }

    pub fn failing_writes_to(key: &'static str) -> Self {
        Self { fail_writes_to: Some(key), ..Self::default() }
    }

    /// Reads through to the backing map regardless of `fail_reads`.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap()
    }

    fn closed(action: &str, key: &str) -> StoreError {
        StoreError::db(format!("Failed to {action} {key}"), sqlx::Error::PoolClosed)
    }
}

impl StateStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(Self::closed("read", key));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes_to == Some(key) {
            return Err(Self::closed("write", key));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}
