//! Bounded lists of records mirrored to a file, rewritten on every save.

use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use dock_shared_util::FileAccess;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::ConfError;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Could not access history file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed json history")]
    Json(#[from] serde_json::Error),
    #[error("Malformed key file history")]
    KeyFile(#[from] ConfError),
}

/// How many records a history keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryLimit {
    #[default]
    Unbounded,
    /// Nothing is kept.
    Disabled,
    Keep(usize),
}

impl From<i64> for HistoryLimit {
    /// -1 (or any negative count) keeps everything, 0 keeps nothing.
    fn from(count: i64) -> Self {
        match count {
            c if c < 0 => HistoryLimit::Unbounded,
            0 => HistoryLimit::Disabled,
            c => HistoryLimit::Keep(c as usize),
        }
    }
}

impl From<i32> for HistoryLimit {
    fn from(count: i32) -> Self {
        HistoryLimit::from(count as i64)
    }
}

impl HistoryLimit {
    /// Drop the oldest records until the list fits.
    pub fn trim<T>(self, items: &mut Vec<T>) {
        let keep = match self {
            HistoryLimit::Unbounded => return,
            HistoryLimit::Disabled => 0,
            HistoryLimit::Keep(n) => n,
        };
        if items.len() > keep {
            items.drain(..items.len() - keep);
        }
    }
}

/// The on-disk encoding of a history.
pub trait HistoryFormat {
    type Item;
    fn encode(items: &[Self::Item]) -> Result<String, HistoryError>;
    fn decode(content: &str) -> Result<Vec<Self::Item>, HistoryError>;
}

/// A json array of records, oldest first.
pub struct Json<T>(PhantomData<T>);

impl<T: Serialize + DeserializeOwned> HistoryFormat for Json<T> {
    type Item = T;

    fn encode(items: &[T]) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(items)?)
    }

    fn decode(content: &str) -> Result<Vec<T>, HistoryError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(content)?)
    }
}

/// Read a history file. A missing file is an empty history.
pub fn read_history<F: HistoryFormat>(path: &Path, files: &FileAccess) -> Result<Vec<F::Item>, HistoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = files.read_to_string(path).map_err(|source| HistoryError::Io { path: path.to_path_buf(), source })?;
    F::decode(&content)
}

pub fn write_history<F: HistoryFormat>(path: &Path, files: &FileAccess, items: &[F::Item]) -> Result<(), HistoryError> {
    let content = F::encode(items)?;
    files.write(path, content).map_err(|source| HistoryError::Io { path: path.to_path_buf(), source })
}

/// A bounded list of records, most recent last, optionally mirrored to a file.
pub struct History<F: HistoryFormat> {
    path: Option<PathBuf>,
    limit: HistoryLimit,
    files: FileAccess,
    items: Vec<F::Item>,
}

impl<F: HistoryFormat> std::fmt::Debug for History<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History").field("path", &self.path).field("limit", &self.limit).field("len", &self.items.len()).finish()
    }
}

impl<F: HistoryFormat> History<F> {
    pub fn new(files: FileAccess) -> Self {
        History { path: None, limit: HistoryLimit::default(), files, items: Vec::new() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Use a new file, and load its records.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> Result<(), HistoryError> {
        self.path = Some(path.into());
        self.load()
    }

    pub fn set_limit(&mut self, limit: impl Into<HistoryLimit>) {
        self.limit = limit.into();
        self.limit.trim(&mut self.items);
    }

    pub fn limit(&self) -> HistoryLimit {
        self.limit
    }

    pub fn load(&mut self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else { return Ok(()) };
        self.items = read_history::<F>(path, &self.files)?;
        self.limit.trim(&mut self.items);
        Ok(())
    }

    /// Rewrite the whole file. Without a file set, nothing is written.
    pub fn save(&self) -> Result<(), HistoryError> {
        match &self.path {
            Some(path) => write_history::<F>(path, &self.files, &self.items),
            None => Ok(()),
        }
    }

    /// Append a record, dropping the oldest ones over the limit.
    pub fn push(&mut self, item: F::Item) {
        self.items.push(item);
        self.limit.trim(&mut self.items);
    }

    pub fn items(&self) -> &[F::Item] {
        &self.items
    }

    pub fn last(&self) -> Option<&F::Item> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_limits() {
        for (limit, expected) in [(-1, vec![1, 2, 3, 4, 5]), (0, vec![]), (2, vec![4, 5]), (9, vec![1, 2, 3, 4, 5])] {
            let mut items = vec![1, 2, 3, 4, 5];
            HistoryLimit::from(limit).trim(&mut items);
            assert_eq!(items, expected);
        }
    }

    #[test]
    fn test_json_history_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("history.json");
        let files = FileAccess::new();

        let mut history = History::<Json<String>>::new(files.clone());
        history.set_path(&path).unwrap();
        assert!(history.is_empty());
        history.set_limit(2);
        for item in ["a", "b", "c"] {
            history.push(item.to_string());
        }
        history.save().unwrap();

        let mut reloaded = History::<Json<String>>::new(files);
        reloaded.set_path(&path).unwrap();
        assert_eq!(reloaded.items(), ["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_disabled_history_stays_empty() {
        let mut history = History::<Json<i32>>::new(FileAccess::new());
        history.set_limit(0);
        history.push(1);
        assert!(history.is_empty());
        assert!(history.save().is_ok());
    }
}
