//! Detection pipeline.
//!
//! - `ChangeDetector`: one fetch → compare → persist cycle
//! - `Scheduler`: periodic cycles with push notifications
//! - `Dispatcher`: on-demand cycles triggered by chat commands

pub mod detect;
pub mod diff;
pub mod dispatch;
pub mod schedule;

pub use detect::{ChangeDetector, Detection};
pub use diff::{DiffResult, calculate_diff};
pub use dispatch::{Dispatcher, handle};
pub use schedule::{CycleOutcome, Scheduler};
