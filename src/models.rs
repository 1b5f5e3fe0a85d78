use serde::{Deserialize, Serialize};

/// Opaque conversation token issued by the backend.
pub type ConversationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chat bubble. Bot messages carry either `text` or `image`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: Some(text.into()), image: None }
    }

    pub fn bot_text(text: impl Into<String>) -> Self {
        Self { sender: Sender::Bot, text: Some(text.into()), image: None }
    }

    pub fn bot_image(data_url: impl Into<String>) -> Self {
        Self { sender: Sender::Bot, text: None, image: Some(data_url.into()) }
    }

    /// Synthesized bubble shown when a send fails.
    pub fn send_failure(reason: &str) -> Self {
        Self::bot_text(format!("Network error. {reason}"))
    }
}

/// Ordered chat record; insertion order is chat order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationResponse {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessageRequest {
    pub conversation_id: ConversationId,
    pub message: String,
}

/// Reply to `POST /conversations/message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_title: Option<String>,
    /// Echoed (or replaced) id the server used for this exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverRequest {
    pub title: String,
    pub size: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverResponse {
    #[serde(default)]
    pub image_data_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
