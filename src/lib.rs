// src/lib.rs

//! learnwatch: watches a listing page and reports newly published items.

pub mod app;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
