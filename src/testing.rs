//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;
use url::Url;

use crate::error::{AppError, FetchError, Result, StoreError};
use crate::models::{Item, ItemSet};
use crate::services::{ContentSource, Notifier, Reply, Request};
use crate::storage::ItemStore;

pub fn item(id: &str) -> Item {
    Item::new(format!("Course {id}"), format!("https://example.com/{id}"))
}

pub fn set(ids: &[&str]) -> ItemSet {
    ids.iter().map(|id| item(id)).collect()
}

pub fn target() -> Url {
    Url::parse("https://example.com/learn").unwrap()
}

/// Source returning whatever the test last put in it. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    items: Arc<Mutex<Option<ItemSet>>>,
    calls: Arc<Mutex<usize>>,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedSource {
    pub fn new(items: ItemSet) -> Self {
        let source = Self::default();
        source.set(items);
        source
    }

    /// Source whose fetches fail with `MarkersAbsent`.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Make every fetch wait on `barrier` before returning.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn set(&self, items: ItemSet) {
        *self.items.lock().unwrap() = Some(items);
    }

    pub fn fail(&self) {
        *self.items.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn fetch(&self, target: &Url) -> std::result::Result<ItemSet, FetchError> {
        *self.calls.lock().unwrap() += 1;
        let result = self.items.lock().unwrap().clone();
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        result.ok_or_else(|| FetchError::MarkersAbsent {
            url: target.to_string(),
            selector: ".item".into(),
        })
    }
}

/// Store with a fixed snapshot that can be told to fail reads or writes.
#[derive(Default)]
pub struct BrokenStore {
    pub items: ItemSet,
    pub fail_load: bool,
    pub fail_save: bool,
}

#[async_trait]
impl ItemStore for BrokenStore {
    async fn load(&self) -> std::result::Result<ItemSet, StoreError> {
        if self.fail_load {
            return Err(StoreError::corrupt("broken.txt", 1, "garbage"));
        }
        Ok(self.items.clone())
    }

    async fn save(&self, _items: &ItemSet) -> std::result::Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::io(
                "broken.txt",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        Ok(())
    }

    fn location(&self) -> String {
        "broken.txt".into()
    }
}

/// Notifier that records everything it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub pushes: Arc<Mutex<Vec<String>>>,
    pub replies: Arc<Mutex<Vec<(Request, Reply)>>>,
    inbox: Arc<Mutex<VecDeque<Vec<Request>>>>,
    fail_push: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose pushes always fail.
    pub fn failing() -> Self {
        Self {
            fail_push: true,
            ..Self::default()
        }
    }

    /// Queue a batch to be returned by the next `poll`.
    pub fn queue(&self, batch: Vec<Request>) {
        self.inbox.lock().unwrap().push_back(batch);
    }

    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(Request, Reply)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn push(&self, text: &str) -> Result<()> {
        if self.fail_push {
            return Err(AppError::notify("push rejected"));
        }
        self.pushes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Request>> {
        let batch = self.inbox.lock().unwrap().pop_front();
        match batch {
            Some(batch) => Ok(batch),
            None => {
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }

    async fn reply(&self, request: &Request, reply: Reply) -> Result<()> {
        self.replies.lock().unwrap().push((request.clone(), reply));
        Ok(())
    }
}
