//! JSON state files kept in the data directory.
//!
//! Every store of the bot (subscriptions, warnings, dispatch records, feed state)
//! is persisted as one JSON document through a [`JsonFile`]. Writes go to a
//! temporary sibling file which is then renamed over the target, so a crash during
//! a write never leaves a truncated document behind.

mod feed_state;

use std::{marker::PhantomData, path::PathBuf};

use log::{debug, warn};
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;

use crate::errors::StoreError;

pub use crate::storage::feed_state::{FeedState, FeedStateStore};

/// A JSON document on disk holding a value of type `T`.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), StoreError> {
/// let file: JsonFile<Vec<String>> = JsonFile::new("/var/lib/nina/names.json");
/// let mut names = file.load().await?;
/// names.push("berlin".to_string());
/// file.persist(&names).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Reads the document.
    ///
    /// A missing file is not an error: it yields `T::default()` so a fresh data
    /// directory starts empty.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file exists but cannot be read
    /// - [`StoreError::Corrupted`] if its content is not a valid document
    pub async fn load(&self) -> Result<T, StoreError> {
        let serialized = match fs::read_to_string(&self.path).await {
            Ok(serialized) => serialized,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("no state found at {}, starting empty", self.display());
                return Ok(T::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.display(),
                    source,
                });
            }
        };

        let value = serde_json::from_str(&serialized).map_err(|source| StoreError::Corrupted {
            path: self.display(),
            source,
        })?;
        debug!("loaded state from {}", self.display());

        Ok(value)
    }

    /// Replaces the document with `value`.
    pub async fn persist(&self, value: &T) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(value)?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, serialized)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.display().to_string(),
                source,
            })?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.display(),
                source,
            })?;

        debug!("persisted state to {}", self.display());
        Ok(())
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let file: JsonFile<Vec<String>> = JsonFile::new(temp_dir.path().join("missing.json"));

        assert!(file.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let file: JsonFile<BTreeMap<String, u32>> =
            JsonFile::new(temp_dir.path().join("state.json"));

        let mut value = BTreeMap::new();
        value.insert("berlin".to_string(), 3);
        file.persist(&value).await.unwrap();

        assert_eq!(file.load().await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temporary_file() {
        let temp_dir = TempDir::new().unwrap();
        let file: JsonFile<Vec<u8>> = JsonFile::new(temp_dir.path().join("state.json"));

        file.persist(&vec![1, 2, 3]).await.unwrap();

        assert!(!temp_dir.path().join("state.json.tmp").exists());
        assert!(temp_dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_load_corrupted_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "{ this is not valid json ").await.unwrap();

        let file: JsonFile<Vec<String>> = JsonFile::new(&path);
        let result = file.load().await;

        assert!(matches!(result, Err(StoreError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_persist_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file: JsonFile<Vec<String>> =
            JsonFile::new(temp_dir.path().join("missing").join("state.json"));

        let result = file.persist(&vec![]).await;

        assert!(matches!(result, Err(StoreError::Io { .. })));
    }
}
