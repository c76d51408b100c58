//! Item and snapshot data structures.

use std::slice;

use serde::{Deserialize, Serialize};

/// A published entry on the watched page.
///
/// Identity is the exact `(title, url)` pair: two items are equal only if
/// both fields match byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Item {
    /// Display title as shown on the page
    pub title: String,

    /// Absolute link to the item
    pub url: String,
}

impl Item {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Format the item for display using a template.
    ///
    /// Supported placeholders: `{title}`, `{url}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{url}", &self.url)
    }
}

/// An ordered snapshot of items observed at one point in time.
///
/// Order is whatever the source produced and is kept on write, but it
/// carries no meaning for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSet(Vec<Item>);

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Item> {
        self.0.iter()
    }

    pub fn push(&mut self, item: Item) {
        self.0.push(item);
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Item> {
        self.0
    }
}

impl From<Vec<Item>> for ItemSet {
    fn from(items: Vec<Item>) -> Self {
        Self(items)
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ItemSet {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
