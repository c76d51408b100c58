//! Local filesystem snapshot store.
//!
//! ## File Format
//!
//! ```text
//! Title: <title>
//! URL: <url>
//!
//! Title: <title>
//! URL: <url>
//! ```
//!
//! One record per item, records separated by a blank line, UTF-8, trailing
//! whitespace trimmed. Writes go to a sibling `.tmp` file which is then
//! renamed over the target.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::models::{Item, ItemSet};
use crate::storage::ItemStore;

const TITLE_PREFIX: &str = "Title:";
const URL_PREFIX: &str = "URL:";

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used for atomic replacement.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("items"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let tmp = self.tmp_path();
        let io = |e| StoreError::io(&tmp, e);
        let mut file = tokio::fs::File::create(&tmp).await.map_err(io)?;
        file.write_all(bytes).await.map_err(io)?;
        file.flush().await.map_err(io)?;
        file.sync_all().await.map_err(io)?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Render items in the record format.
    pub fn encode(items: &ItemSet) -> Result<String, StoreError> {
        let mut out = String::new();
        for item in items {
            check_field(item, &item.title)?;
            check_field(item, &item.url)?;
            out.push_str(&format!("{TITLE_PREFIX} {}\n", item.title));
            out.push_str(&format!("{URL_PREFIX} {}\n\n", item.url));
        }
        Ok(out)
    }

    /// Parse the record format.
    pub fn decode(&self, text: &str) -> Result<ItemSet, StoreError> {
        let mut items = ItemSet::new();
        let mut record: Vec<&str> = Vec::with_capacity(2);
        let mut index = 0;

        let lines = text.lines().map(str::trim_end).chain(std::iter::once(""));
        for line in lines {
            if !line.is_empty() {
                record.push(line);
                continue;
            }
            if record.is_empty() {
                continue;
            }
            index += 1;
            items.push(self.decode_record(index, &record)?);
            record.clear();
        }

        Ok(items)
    }

    fn decode_record(&self, index: usize, lines: &[&str]) -> Result<Item, StoreError> {
        let [title_line, url_line] = lines else {
            return Err(StoreError::corrupt(
                &self.path,
                index,
                format!("expected 2 lines, found {}", lines.len()),
            ));
        };
        let title = field(title_line, TITLE_PREFIX)
            .ok_or_else(|| StoreError::corrupt(&self.path, index, "missing 'Title:' line"))?;
        let url = field(url_line, URL_PREFIX)
            .ok_or_else(|| StoreError::corrupt(&self.path, index, "missing 'URL:' line"))?;
        Ok(Item::new(title, url))
    }
}

fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn check_field(item: &Item, value: &str) -> Result<(), StoreError> {
    let message = if value.contains(['\n', '\r']) {
        "contains a line break"
    } else if value.len() != value.trim_end().len() {
        "has trailing whitespace"
    } else {
        return Ok(());
    };
    Err(StoreError::Unencodable {
        title: item.title.clone(),
        message: message.to_string(),
    })
}

#[async_trait]
impl ItemStore for FileStore {
    async fn load(&self) -> Result<ItemSet, StoreError> {
        let Some(bytes) = self.read_bytes().await? else {
            log::info!("No snapshot at {} yet", self.path.display());
            return Ok(ItemSet::new());
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| StoreError::corrupt(&self.path, 0, format!("not UTF-8: {e}")))?;
        let items = self.decode(&text)?;
        log::debug!("Loaded {} items from {}", items.len(), self.path.display());
        Ok(items)
    }

    async fn save(&self, items: &ItemSet) -> Result<(), StoreError> {
        let text = Self::encode(items)?;
        self.write_bytes(text.as_bytes()).await?;
        log::info!("Saved {} items to {}", items.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ItemSet {
        vec![
            Item::new("Intro to DeFi", "https://example.com/courses/defi"),
            Item::new("¿Qué es BNB?", "https://example.com/courses/bnb"),
        ]
        .into()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("items.txt"));

        let items = store.load().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested/dir/items.txt"));

        store.save(&sample()).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_file_layout() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("items.txt"));

        store.save(&sample()).await.unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "Title: Intro to DeFi\nURL: https://example.com/courses/defi\n\n\
             Title: ¿Qué es BNB?\nURL: https://example.com/courses/bnb\n\n"
        );
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("items.txt"));

        store.save(&sample()).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("items.txt")]);
    }

    #[tokio::test]
    async fn test_unencodable_item_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("items.txt"));
        store.save(&sample()).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let bad: ItemSet = vec![Item::new("two\nlines", "https://example.com/x")].into();
        let err = store.save(&bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Unencodable { .. }));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("items.txt");
        std::fs::write(&path, "Title: ok\nURL: https://example.com/1\n\nnonsense\n").unwrap();

        let err = FileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { record: 2, .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("items.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = FileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let store = FileStore::new("items.txt");
        let text = "\n\nTitle: A  \r\nURL: https://example.com/a\t\n\n\n\nTitle: B\nURL: https://example.com/b";
        let items = store.decode(text).unwrap();
        assert_eq!(
            items.into_vec(),
            vec![
                Item::new("A", "https://example.com/a"),
                Item::new("B", "https://example.com/b"),
            ]
        );
    }

    #[test]
    fn test_decode_whitespace_only_is_empty() {
        let store = FileStore::new("items.txt");
        assert!(store.decode("  \n\n \n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_swapped_lines_is_corrupt() {
        let store = FileStore::new("items.txt");
        let err = store
            .decode("URL: https://example.com/a\nTitle: A\n")
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { record: 1, .. }));
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        let store = FileStore::new("data/items.txt");
        assert_eq!(store.tmp_path(), PathBuf::from("data/items.txt.tmp"));
    }
}
