//! Shared key-value store handing the selected topic from the browser to the quiz.
//!
//! String keys, string (usually JSON) values, no expiry. When backed by a file
//! the whole map is rewritten on every mutation, so values survive restarts
//! until overwritten.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Key holding the JSON array of the selected topic's questions.
pub const KEY_TOPIC_QUESTIONS: &str = "currentTopicQuestions";
/// Key holding the selected topic's display name.
pub const KEY_TOPIC_TITLE: &str = "currentTopicTitle";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to persist store to {path}: {source}")]
  Persist { path: String, source: std::io::Error },
  #[error("failed to encode store: {0}")]
  Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct KvStore {
  entries: Arc<RwLock<HashMap<String, String>>>,
  path: Option<PathBuf>,
}

impl KvStore {
  pub fn in_memory() -> Self {
    Self { entries: Arc::new(RwLock::new(HashMap::new())), path: None }
  }

  /// Open a file-backed store. A missing or unreadable file starts empty.
  #[instrument(level = "info", skip_all, fields(path = %path.display()))]
  pub async fn open(path: PathBuf) -> Self {
    let entries = match tokio::fs::read_to_string(&path).await {
      Ok(s) => match serde_json::from_str::<HashMap<String, String>>(&s) {
        Ok(map) => {
          info!(target: "store", keys = map.len(), "Loaded persisted store");
          map
        }
        Err(e) => {
          warn!(target: "store", error = %e, "Store file is corrupt; starting empty");
          HashMap::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
      Err(e) => {
        warn!(target: "store", error = %e, "Store file unreadable; starting empty");
        HashMap::new()
      }
    };
    Self { entries: Arc::new(RwLock::new(entries)), path: Some(path) }
  }

  pub async fn get(&self, key: &str) -> Option<String> {
    self.entries.read().await.get(key).cloned()
  }

  #[instrument(level = "debug", skip(self, value), fields(value_len = value.len()))]
  pub async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
    let mut entries = self.entries.write().await;
    entries.insert(key.to_string(), value);
    self.persist(&entries).await
  }

  // Called with the write guard held so concurrent writers serialize on disk too.
  async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
    let Some(path) = &self.path else { return Ok(()) };
    let body = serde_json::to_string(entries)?;
    let err = |source| StoreError::Persist { path: path.display().to_string(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await.map_err(err)?;
    }
    tokio::fs::write(path, body).await.map_err(err)?;
    debug!(target: "store", keys = entries.len(), "Store persisted");
    Ok(())
  }
}

// Nothing in the app deletes keys; tests use these to reset state.
#[cfg(test)]
impl KvStore {
  pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.write().await;
    if entries.remove(key).is_some() {
      self.persist(&entries).await?;
    }
    Ok(())
  }

  pub async fn clear(&self) -> Result<(), StoreError> {
    let mut entries = self.entries.write().await;
    entries.clear();
    self.persist(&entries).await
  }
}
