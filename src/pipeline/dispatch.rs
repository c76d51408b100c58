// src/pipeline/dispatch.rs

//! Interactive command handling.
//!
//! Polls the notifier for requests and answers each one. A "check now"
//! request runs a detection cycle immediately, independent of the periodic
//! schedule.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::app::App;
use crate::error::{DetectError, Result};
use crate::models::Item;
use crate::services::{Action, Button, CHECK_CALLBACK, Reply, Request};

/// Polls for requests and answers them with bounded concurrency.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    retry: Duration,
}

impl Dispatcher {
    pub fn new(concurrency: usize, retry: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            retry,
        }
    }

    pub fn from_app(app: &App) -> Self {
        let telegram = &app.config.telegram;
        Self::new(
            telegram.max_concurrent_requests,
            Duration::from_secs(telegram.poll_retry_secs),
        )
    }

    /// Poll and answer requests until the task is dropped.
    pub async fn run(&self, app: Arc<App>) {
        log::info!("Listening for commands");
        loop {
            if let Err(e) = self.poll_once(&app).await {
                log::warn!("Polling for commands failed: {}", e);
                tokio::time::sleep(self.retry).await;
            }
        }
    }

    /// Fetch one batch of requests and answer all of them.
    ///
    /// Returns the number of requests in the batch.
    pub async fn poll_once(&self, app: &App) -> Result<usize> {
        let requests = app.notifier.poll().await?;
        let count = requests.len();

        stream::iter(requests)
            .for_each_concurrent(self.concurrency, |request| async move {
                if let Err(e) = handle(app, &request).await {
                    log::warn!("Could not answer {:?}: {}", request.action, e);
                }
            })
            .await;

        Ok(count)
    }
}

/// Answer a single request.
pub async fn handle(app: &App, request: &Request) -> Result<()> {
    if !app.config.telegram.is_allowed(request.chat_id()) {
        log::warn!("Ignoring request from chat {} (not allowed)", request.chat_id());
        return Ok(());
    }

    match request.action {
        Action::Welcome => {
            let messages = &app.config.messages;
            let reply = Reply::Message {
                text: messages.welcome.replace("{site}", &app.site()),
                button: Some(Button {
                    label: messages.check_button.clone(),
                    data: CHECK_CALLBACK.to_string(),
                }),
            };
            app.notifier.reply(request, reply).await
        }
        Action::CheckNow => check_now(app, request).await,
    }
}

async fn check_now(app: &App, request: &Request) -> Result<()> {
    let messages = &app.config.messages;
    log::info!("Manual check requested from chat {}", request.chat_id());

    let new_items = match app.detector.detect().await {
        Ok(detection) => detection.new_items,
        Err(DetectError::StoreWriteFailed { new_items, .. }) => new_items,
        Err(e) => {
            log::warn!("Manual check failed: {}", e);
            let text = messages
                .check_failed
                .replace("{site}", &app.site())
                .replace("{error}", &e.to_string());
            return app.notifier.reply(request, plain(request, text)).await;
        }
    };

    if new_items.is_empty() {
        let text = messages.nothing_new.replace("{site}", &app.site());
        return app.notifier.reply(request, plain(request, text)).await;
    }

    if request.is_callback() {
        let text = alert_text(app, &new_items);
        return app.notifier.reply(request, Reply::Alert(text)).await;
    }

    for item in &new_items {
        let text = item.format(&messages.reply_item);
        app.notifier.reply(request, Reply::text(text)).await?;
    }
    Ok(())
}

/// Button presses are answered with an alert, commands with a message.
fn plain(request: &Request, text: String) -> Reply {
    if request.is_callback() {
        Reply::Alert(text)
    } else {
        Reply::text(text)
    }
}

fn alert_text(app: &App, items: &[Item]) -> String {
    let messages = &app.config.messages;
    let header = messages
        .alert_header
        .replace("{count}", &items.len().to_string());
    let body: Vec<String> = items
        .iter()
        .map(|item| item.format(&messages.alert_item))
        .collect();
    format!("{}\n{}", header, body.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use crate::pipeline::ChangeDetector;
    use crate::services::Origin;
    use crate::storage::MemoryStore;
    use crate::testing::{RecordingNotifier, ScriptedSource, set, target};

    const CHAT: i64 = 42;

    fn app(source: &ScriptedSource, store: &MemoryStore, notifier: &RecordingNotifier) -> App {
        let detector = ChangeDetector::new(
            target(),
            Box::new(source.clone()),
            Box::new(store.clone()),
        );
        let mut config = Config::default();
        config.source.url = target().to_string();
        config.telegram.chat_id = Some(CHAT);
        App::new(config, detector, Box::new(notifier.clone()))
    }

    fn command(action: Action, chat_id: i64) -> Request {
        Request {
            action,
            origin: Origin::Message {
                chat_id,
                message_id: 1,
            },
        }
    }

    fn button() -> Request {
        Request {
            action: Action::CheckNow,
            origin: Origin::Callback {
                query_id: "q".into(),
                chat_id: CHAT,
            },
        }
    }

    #[tokio::test]
    async fn test_welcome_offers_check_button() {
        let notifier = RecordingNotifier::new();
        let app = app(&ScriptedSource::default(), &MemoryStore::new(), &notifier);

        handle(&app, &command(Action::Welcome, CHAT)).await.unwrap();

        let replies = notifier.replies();
        assert_eq!(replies.len(), 1);
        match &replies[0].1 {
            Reply::Message { text, button } => {
                assert!(text.contains("example.com"));
                assert_eq!(button.as_ref().unwrap().data, CHECK_CALLBACK);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_command_replies_per_item_then_nothing_new() {
        let notifier = RecordingNotifier::new();
        let store = MemoryStore::new();
        let app = app(&ScriptedSource::new(set(&["a", "b"])), &store, &notifier);

        handle(&app, &command(Action::CheckNow, CHAT)).await.unwrap();
        handle(&app, &command(Action::CheckNow, CHAT)).await.unwrap();

        let texts: Vec<Reply> = notifier.replies().into_iter().map(|(_, r)| r).collect();
        assert_eq!(
            texts,
            vec![
                Reply::text("New item found!\n\nTitle: Course a\nURL: https://example.com/a"),
                Reply::text("New item found!\n\nTitle: Course b\nURL: https://example.com/b"),
                Reply::text("No new items right now."),
            ]
        );
        assert_eq!(store.snapshot(), Some(set(&["a", "b"])));
    }

    #[tokio::test]
    async fn test_button_answers_with_batched_alert() {
        let notifier = RecordingNotifier::new();
        let app = app(
            &ScriptedSource::new(set(&["a", "b"])),
            &MemoryStore::new(),
            &notifier,
        );

        handle(&app, &button()).await.unwrap();

        assert_eq!(
            notifier.replies()[0].1,
            Reply::Alert(
                "2 new item(s) found:\n\
                 Title: Course a\nURL: https://example.com/a\n\n\
                 Title: Course b\nURL: https://example.com/b"
                    .into()
            )
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_to_requester() {
        let notifier = RecordingNotifier::new();
        let app = app(&ScriptedSource::failing(), &MemoryStore::new(), &notifier);

        handle(&app, &command(Action::CheckNow, CHAT)).await.unwrap();

        match &notifier.replies()[0].1 {
            Reply::Message { text, .. } => assert!(text.starts_with("Could not check example.com")),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_chat_is_ignored() {
        let notifier = RecordingNotifier::new();
        let source = ScriptedSource::new(set(&["a"]));
        let store = MemoryStore::new();
        let app = app(&source, &store, &notifier);

        handle(&app, &command(Action::CheckNow, 999)).await.unwrap();

        assert!(notifier.replies().is_empty());
        assert_eq!(source.calls(), 0);
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_poll_once_answers_whole_batch() {
        let notifier = RecordingNotifier::new();
        let app = app(
            &ScriptedSource::new(set(&["a"])),
            &MemoryStore::new(),
            &notifier,
        );
        notifier.queue(vec![
            command(Action::Welcome, CHAT),
            command(Action::CheckNow, CHAT),
            button(),
        ]);

        let dispatcher = Dispatcher::from_app(&app);
        assert_eq!(dispatcher.poll_once(&app).await.unwrap(), 3);
        assert_eq!(notifier.replies().len(), 3);

        // "a" is reported by exactly one of the two checks.
        let reported = notifier
            .replies()
            .iter()
            .filter(|(_, reply)| match reply {
                Reply::Message { text, .. } | Reply::Alert(text) => text.contains("Course a"),
            })
            .count();
        assert_eq!(reported, 1);

        assert_eq!(dispatcher.poll_once(&app).await.unwrap(), 0);
    }
}
