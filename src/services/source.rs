// src/services/source.rs

//! Content source service.
//!
//! Fetches the watched page and extracts items using configured CSS
//! selectors.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{FetchError, Result};
use crate::models::{Item, ItemSet, SourceConfig, parse_selector};
use crate::utils::{http, normalize_whitespace, resolve_url};

/// Anything that can report the items currently published at a URL.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the items observed right now, in page order.
    async fn fetch(&self, target: &Url) -> std::result::Result<ItemSet, FetchError>;
}

/// Compiled selectors for one page layout.
#[derive(Debug, Clone)]
struct ItemSelectors {
    item_raw: String,
    item: Selector,
    title: Selector,
    link: Selector,
    link_attr: String,
}

/// HTML page source driven by CSS selectors.
pub struct PageSource {
    client: Client,
    selectors: ItemSelectors,
}

impl PageSource {
    /// Create a page source, compiling selectors and the HTTP client up front.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Self::with_client(client, config)
    }

    /// Create a page source using an existing HTTP client.
    pub fn with_client(client: Client, config: &SourceConfig) -> Result<Self> {
        let selectors = ItemSelectors {
            item_raw: config.item_selector.clone(),
            item: parse_selector(&config.item_selector)?,
            title: parse_selector(&config.title_selector)?,
            link: parse_selector(&config.link_selector)?,
            link_attr: config.link_attr.clone(),
        };
        Ok(Self { client, selectors })
    }

    /// Extract items from a page body.
    ///
    /// Elements without a title or link are skipped. If no element matches
    /// the item selector, or none of the matches yields an item, the page is
    /// treated as missing its markers.
    pub fn parse_items(&self, html: &str, base: &Url) -> std::result::Result<ItemSet, FetchError> {
        let document = Html::parse_document(html);
        let sel = &self.selectors;

        let mut matched = 0usize;
        let mut seen = HashSet::new();
        let mut items = ItemSet::new();

        for element in document.select(&sel.item) {
            matched += 1;
            let Some(item) = self.parse_item(&element, base) else {
                log::debug!("Skipping item element #{matched}: no title or link");
                continue;
            };
            if seen.insert(item.clone()) {
                items.push(item);
            }
        }

        if items.is_empty() {
            log::warn!(
                "{} element(s) matched '{}' at {} but no items were extracted",
                matched,
                sel.item_raw,
                base
            );
            return Err(FetchError::MarkersAbsent {
                url: base.to_string(),
                selector: sel.item_raw.clone(),
            });
        }
        Ok(items)
    }

    fn parse_item(&self, element: &ElementRef, base: &Url) -> Option<Item> {
        let sel = &self.selectors;
        let title_elem = element.select(&sel.title).next()?;
        let title = normalize_whitespace(&title_elem.text().collect::<String>());
        if title.is_empty() {
            return None;
        }

        // The item element itself may be the link.
        let href = element
            .select(&sel.link)
            .next()
            .and_then(|e| e.value().attr(&sel.link_attr))
            .or_else(|| element.value().attr(&sel.link_attr))?
            .trim();
        if href.is_empty() {
            return None;
        }

        Some(Item::new(title, resolve_url(base, href)))
    }
}

#[async_trait]
impl ContentSource for PageSource {
    async fn fetch(&self, target: &Url) -> std::result::Result<ItemSet, FetchError> {
        let unreachable = |source| FetchError::Unreachable {
            url: target.to_string(),
            source,
        };

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.to_string(),
                status,
            });
        }
        let body = response.text().await.map_err(unreachable)?;

        let items = self.parse_items(&body, target)?;
        log::info!("Fetched {} items from {}", items.len(), target);
        Ok(items)
    }
}
