// src/models/mod.rs

//! Domain models for the watcher.

mod config;
mod item;

pub use config::{
    Config, MessagesConfig, ScheduleConfig, SourceConfig, StorageConfig, TelegramConfig,
    parse_selector,
};
pub use item::{Item, ItemSet};
