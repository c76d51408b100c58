//! Service layer: the external collaborators of the detection cycle.
//!
//! - Page fetching and item extraction (`PageSource`)
//! - Chat transport (`TelegramNotifier`)

pub mod notifier;
pub mod source;
pub mod telegram;

pub use notifier::{Action, Button, CHECK_CALLBACK, Notifier, Origin, Reply, Request};
pub use source::{ContentSource, PageSource};
pub use telegram::TelegramNotifier;
