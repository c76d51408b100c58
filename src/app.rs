// src/app.rs

//! Application context shared by the scheduler and the command dispatcher.

use std::time::Duration;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::ChangeDetector;
use crate::services::{Notifier, PageSource, TelegramNotifier};
use crate::storage::FileStore;

/// Everything a detection cycle and its reporting need, built once at startup.
pub struct App {
    pub config: Config,
    pub detector: ChangeDetector,
    pub notifier: Box<dyn Notifier>,
}

impl App {
    pub fn new(config: Config, detector: ChangeDetector, notifier: Box<dyn Notifier>) -> Self {
        Self {
            config,
            detector,
            notifier,
        }
    }

    /// Build the production wiring: page source, file store, Telegram.
    ///
    /// Fails on invalid configuration or missing Telegram credentials.
    pub fn from_config(config: Config) -> Result<Self> {
        let detector = build_detector(&config)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.source.timeout_secs))
            .build()?;
        let notifier = TelegramNotifier::new(&config.telegram, client)?;
        Ok(Self::new(config, detector, Box::new(notifier)))
    }

    /// Host of the watched page, for message templates.
    pub fn site(&self) -> String {
        self.config.source.site()
    }
}

/// Build a detector reading the configured page and file store.
pub fn build_detector(config: &Config) -> Result<ChangeDetector> {
    config.validate()?;
    let source = PageSource::new(&config.source)?;
    let store = FileStore::new(&config.storage.path);
    Ok(ChangeDetector::new(
        config.source.target()?,
        Box::new(source),
        Box::new(store),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_missing_credentials_abort_startup() {
        let err = App::from_config(Config::default()).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_config_rejected_before_wiring() {
        let mut config = Config::default();
        config.source.link_selector = "[[".into();
        assert!(build_detector(&config).is_err());
    }

    #[test]
    fn test_build_with_credentials() {
        let mut config = Config::default();
        config.telegram.token = Some("123:abc".into());
        config.telegram.chat_id = Some(1);
        let app = App::from_config(config).unwrap();
        assert_eq!(app.site(), "academy.binance.com");
        assert_eq!(app.detector.target().as_str(), "https://academy.binance.com/es/learn-and-earn");
    }
}
