// src/services/telegram.rs

//! Telegram Bot API notifier.
//!
//! Uses long polling (`getUpdates`) for inbound commands and button presses,
//! `sendMessage` for pushes and replies, and `answerCallbackQuery` for
//! button alerts.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::TelegramConfig;
use crate::services::notifier::{Action, Button, Notifier, Origin, Reply, Request};
use crate::utils::truncate_chars;

/// Telegram caps callback alert text at 200 characters.
const ALERT_LIMIT: usize = 200;

/// Extra time on top of the long-poll timeout before the request is abandoned.
const POLL_GRACE_SECS: u64 = 10;

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    data: Option<String>,
}

impl Update {
    /// Interpret an update as a request, if it is one we handle.
    fn into_request(self) -> Option<Request> {
        if let Some(message) = self.message {
            let action = parse_command(message.text.as_deref()?)?;
            return Some(Request {
                action,
                origin: Origin::Message {
                    chat_id: message.chat.id,
                    message_id: message.message_id,
                },
            });
        }

        let query = self.callback_query?;
        if query.data.as_deref() != Some(crate::services::notifier::CHECK_CALLBACK) {
            log::debug!("Ignoring callback with data {:?}", query.data);
            return None;
        }
        let chat_id = query.message.map_or(query.from.id, |m| m.chat.id);
        Some(Request {
            action: Action::CheckNow,
            origin: Origin::Callback {
                query_id: query.id,
                chat_id,
            },
        })
    }
}

/// Map a command like `/check` or `/start@SomeBot` to an action.
fn parse_command(text: &str) -> Option<Action> {
    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next().unwrap_or(word);
    match name.to_lowercase().as_str() {
        "start" | "help" => Some(Action::Welcome),
        "check" | "init" => Some(Action::CheckNow),
        _ => None,
    }
}

#[derive(Serialize)]
struct GetUpdatesBody<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Serialize)]
struct InlineKeyboard<'a> {
    inline_keyboard: Vec<Vec<InlineButton<'a>>>,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Serialize)]
struct AnswerCallbackBody<'a> {
    callback_query_id: &'a str,
    text: &'a str,
    show_alert: bool,
}

/// Notifier backed by the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    api: String,
    chat_id: i64,
    poll_timeout_secs: u64,
    offset: AtomicI64,
}

impl TelegramNotifier {
    /// Build a notifier from configuration. Fails if the token or chat is missing.
    pub fn new(config: &TelegramConfig, client: Client) -> Result<Self> {
        let (token, chat_id) = config.credentials()?;
        let base = config.api_base.trim_end_matches('/');
        Ok(Self {
            client,
            api: format!("{base}/bot{token}"),
            chat_id,
            poll_timeout_secs: config.poll_timeout_secs,
            offset: AtomicI64::new(0),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Option<Duration>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}/{}", self.api, method))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // The URL carries the bot token; keep it out of error messages.
        let response = request.send().await.map_err(|e| AppError::Http(e.without_url()))?;
        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        if !parsed.ok {
            return Err(AppError::notify(format!(
                "{method} failed ({status}): {}",
                parsed.description.unwrap_or_else(|| "no description".into())
            )));
        }
        parsed
            .result
            .ok_or_else(|| AppError::notify(format!("{method} returned no result")))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        button: Option<&Button>,
    ) -> Result<()> {
        let body = SendMessageBody {
            chat_id,
            text,
            reply_to_message_id: reply_to,
            reply_markup: button.map(|b| InlineKeyboard {
                inline_keyboard: vec![vec![InlineButton {
                    text: &b.label,
                    callback_data: &b.data,
                }]],
            }),
        };
        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, chat_id: i64, text: &str) -> Result<()> {
        let short = truncate_chars(text, ALERT_LIMIT);
        let body = AnswerCallbackBody {
            callback_query_id: query_id,
            text: &short,
            show_alert: true,
        };
        let _: bool = self.call("answerCallbackQuery", &body, None).await?;

        if short != text {
            self.send_message(chat_id, text, None, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn push(&self, text: &str) -> Result<()> {
        self.send_message(self.chat_id, text, None, None).await
    }

    async fn poll(&self) -> Result<Vec<Request>> {
        let body = GetUpdatesBody {
            offset: self.offset.load(Ordering::SeqCst),
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        let timeout = Duration::from_secs(self.poll_timeout_secs + POLL_GRACE_SECS);
        let updates: Vec<Update> = self.call("getUpdates", &body, Some(timeout)).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }
        if !updates.is_empty() {
            log::debug!("Received {} update(s)", updates.len());
        }

        Ok(updates.into_iter().filter_map(Update::into_request).collect())
    }

    async fn reply(&self, request: &Request, reply: Reply) -> Result<()> {
        match (&request.origin, reply) {
            (Origin::Callback { query_id, chat_id }, Reply::Alert(text)) => {
                self.answer_callback(query_id, *chat_id, &text).await
            }
            (origin, Reply::Alert(text)) => {
                let reply_to = reply_target(origin);
                self.send_message(request.chat_id(), &text, reply_to, None)
                    .await
            }
            (origin, Reply::Message { text, button }) => {
                let reply_to = reply_target(origin);
                self.send_message(request.chat_id(), &text, reply_to, button.as_ref())
                    .await
            }
        }
    }
}

fn reply_target(origin: &Origin) -> Option<i64> {
    match origin {
        Origin::Message { message_id, .. } => Some(*message_id),
        Origin::Callback { .. } => None,
    }
}
