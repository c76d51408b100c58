//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::get_domain;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watched page and how to read items from it
    #[serde(default)]
    pub source: SourceConfig,

    /// Periodic check cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Snapshot persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Reply and push templates
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Recognized keys: `TELEGRAM_BOT_TOKEN`, `CHAT_ID`, `WATCH_URL`,
    /// `CHECK_INTERVAL_SECS`, `RETRY_INTERVAL_SECS`, `STORE_PATH`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Some(chat) = lookup("CHAT_ID") {
            let id = chat
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("CHAT_ID is not an integer: {chat}")))?;
            self.telegram.chat_id = Some(id);
        }
        if let Some(url) = lookup("WATCH_URL") {
            self.source.url = url;
        }
        if let Some(secs) = lookup("CHECK_INTERVAL_SECS") {
            self.schedule.interval_secs = parse_secs("CHECK_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("RETRY_INTERVAL_SECS") {
            self.schedule.retry_secs = parse_secs("RETRY_INTERVAL_SECS", &secs)?;
        }
        if let Some(path) = lookup("STORE_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        if self.schedule.retry_secs == 0 {
            return Err(AppError::validation("schedule.retry_secs must be > 0"));
        }
        if self.telegram.max_concurrent_requests == 0 {
            return Err(AppError::validation(
                "telegram.max_concurrent_requests must be > 0",
            ));
        }
        if self.source.link_attr.trim().is_empty() {
            return Err(AppError::validation("source.link_attr is empty"));
        }
        self.source.target()?;
        for selector in [
            &self.source.item_selector,
            &self.source.title_selector,
            &self.source.link_selector,
        ] {
            parse_selector(selector)?;
        }
        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::config(format!("{key} is not a number of seconds: {value}")))
}

/// Compile a CSS selector, mapping failures to `AppError::Selector`.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Watched page and item extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page listing the items
    #[serde(default = "defaults::url")]
    pub url: String,

    /// CSS selector matching one element per item
    #[serde(default = "defaults::item_selector")]
    pub item_selector: String,

    /// CSS selector for the title, relative to the item element
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// CSS selector for the link element, relative to the item element
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,

    /// HTML attribute holding the link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl SourceConfig {
    /// Parsed target URL.
    pub fn target(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }

    /// Host of the watched page, for message templates.
    pub fn site(&self) -> String {
        get_domain(&self.url).unwrap_or_else(|| self.url.clone())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            item_selector: defaults::item_selector(),
            title_selector: defaults::title_selector(),
            link_selector: defaults::link_selector(),
            link_attr: defaults::link_attr(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Periodic check cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between regular checks
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Seconds to wait after a failed check
    #[serde(default = "defaults::retry")]
    pub retry_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            retry_secs: defaults::retry(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File holding the last seen items
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; usually supplied through `TELEGRAM_BOT_TOKEN`
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Chat receiving periodic pushes
    #[serde(default)]
    pub chat_id: Option<i64>,

    /// Extra chats allowed to use interactive commands
    #[serde(default)]
    pub allowed_chats: Vec<i64>,

    /// Bot API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Long-poll timeout for `getUpdates`
    #[serde(default = "defaults::poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Delay after a failed poll
    #[serde(default = "defaults::poll_retry")]
    pub poll_retry_secs: u64,

    /// Maximum requests from one poll handled at once
    #[serde(default = "defaults::max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl TelegramConfig {
    /// Token and recipient, or a configuration error naming what is missing.
    pub fn credentials(&self) -> Result<(String, i64)> {
        let token = self
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::config("TELEGRAM_BOT_TOKEN is not set"))?;
        let chat_id = self
            .chat_id
            .ok_or_else(|| AppError::config("CHAT_ID is not set"))?;
        Ok((token, chat_id))
    }

    /// Whether a chat may issue interactive commands.
    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.chat_id == Some(chat_id) || self.allowed_chats.contains(&chat_id)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            allowed_chats: Vec::new(),
            api_base: defaults::api_base(),
            poll_timeout_secs: defaults::poll_timeout(),
            poll_retry_secs: defaults::poll_retry(),
            max_concurrent_requests: defaults::max_concurrent_requests(),
        }
    }
}

/// Message templates.
///
/// Placeholders: `{title}`, `{url}`, `{site}`, `{count}`, `{error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "defaults::welcome")]
    pub welcome: String,
    #[serde(default = "defaults::check_button")]
    pub check_button: String,
    #[serde(default = "defaults::push_item")]
    pub push_item: String,
    #[serde(default = "defaults::reply_item")]
    pub reply_item: String,
    #[serde(default = "defaults::alert_header")]
    pub alert_header: String,
    #[serde(default = "defaults::alert_item")]
    pub alert_item: String,
    #[serde(default = "defaults::nothing_new")]
    pub nothing_new: String,
    #[serde(default = "defaults::check_failed")]
    pub check_failed: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: defaults::welcome(),
            check_button: defaults::check_button(),
            push_item: defaults::push_item(),
            reply_item: defaults::reply_item(),
            alert_header: defaults::alert_header(),
            alert_item: defaults::alert_item(),
            nothing_new: defaults::nothing_new(),
            check_failed: defaults::check_failed(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn url() -> String {
        "https://academy.binance.com/es/learn-and-earn".into()
    }
    pub fn item_selector() -> String {
        ".css-yhgbpk".into()
    }
    pub fn title_selector() -> String {
        ".course-name".into()
    }
    pub fn link_selector() -> String {
        "a".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; learnwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }

    // Schedule defaults
    pub fn interval() -> u64 {
        30 * 60
    }
    pub fn retry() -> u64 {
        60
    }

    // Storage defaults
    pub fn store_path() -> PathBuf {
        PathBuf::from("data/items.txt")
    }

    // Telegram defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn poll_timeout() -> u64 {
        30
    }
    pub fn poll_retry() -> u64 {
        5
    }
    pub fn max_concurrent_requests() -> usize {
        4
    }

    // Message defaults
    pub fn welcome() -> String {
        "Welcome! I watch {site} for newly published items.\nUse /check to look for new items right now.".into()
    }
    pub fn check_button() -> String {
        "Check for new items".into()
    }
    pub fn push_item() -> String {
        "New item on {site}!\n\nTitle: {title}\nURL: {url}".into()
    }
    pub fn reply_item() -> String {
        "New item found!\n\nTitle: {title}\nURL: {url}".into()
    }
    pub fn alert_header() -> String {
        "{count} new item(s) found:".into()
    }
    pub fn alert_item() -> String {
        "Title: {title}\nURL: {url}".into()
    }
    pub fn nothing_new() -> String {
        "No new items right now.".into()
    }
    pub fn check_failed() -> String {
        "Could not check {site} right now ({error}). Please try again later.".into()
    }
}
