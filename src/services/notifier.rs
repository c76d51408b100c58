//! Notifier seam: pushes to the fixed recipient and interactive requests.

use async_trait::async_trait;

use crate::error::Result;

/// What the requester asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// First contact or help: reply with the welcome text
    Welcome,
    /// Run a detection cycle now and report the result
    CheckNow,
}

/// Where a request came from, which decides how it is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A chat command
    Message { chat_id: i64, message_id: i64 },
    /// An inline button press
    Callback { query_id: String, chat_id: i64 },
}

/// An inbound interactive request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub origin: Origin,
}

impl Request {
    pub fn chat_id(&self) -> i64 {
        match self.origin {
            Origin::Message { chat_id, .. } | Origin::Callback { chat_id, .. } => chat_id,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.origin, Origin::Callback { .. })
    }
}

/// Inline button attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

/// Callback payload of the "check now" button.
pub const CHECK_CALLBACK: &str = "check_items";

/// Answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Chat message, optionally with an inline button
    Message { text: String, button: Option<Button> },
    /// Pop-up answer to a button press
    Alert(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            button: None,
        }
    }
}

/// Chat transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to the configured recipient.
    async fn push(&self, text: &str) -> Result<()>;

    /// Wait for the next batch of interactive requests.
    ///
    /// Implementations track their own position; a request is returned at
    /// most once.
    async fn poll(&self) -> Result<Vec<Request>>;

    /// Answer a request.
    async fn reply(&self, request: &Request, reply: Reply) -> Result<()>;
}
