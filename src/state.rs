//! Application state: topic browser, shared key-value store, live quiz sessions.
//!
//! This module owns:
//!   - the topic browser (catalog + current selection)
//!   - the shared key-value store the browser writes and the quiz reads
//!   - the live quiz session; loading the quiz screen again replaces it
//!   - the quiz settings (from TOML or defaults)

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::browser::TopicBrowser;
use crate::catalog::load_catalog;
use crate::config::{load_quiz_config_from_env, Paths, QuizConfig};
use crate::quiz::{QuizError, QuizSession};
use crate::store::KvStore;

#[derive(Clone)]
pub struct AppState {
    pub browser: Arc<RwLock<TopicBrowser>>,
    pub store: KvStore,
    pub sessions: Arc<RwLock<HashMap<String, QuizSession>>>,
    pub config: QuizConfig,
}

impl AppState {
    /// Build state from env: load config, load the catalog, open the store.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env(paths: &Paths) -> Self {
        let config = load_quiz_config_from_env().unwrap_or_default();
        let topics = load_catalog(&paths.topics, &config.catalog.test_url).await;
        let store = match &paths.store {
            Some(p) => KvStore::open(p.clone()).await,
            None => {
                info!(target: "quiz_backend", "STORE_PATH empty; using in-memory store");
                KvStore::in_memory()
            }
        };
        Self::new(TopicBrowser::new(topics, config.catalog.test_url.clone()), store, config)
    }

    pub fn new(browser: TopicBrowser, store: KvStore, config: QuizConfig) -> Self {
        info!(target: "catalog", topics = browser.count(), "Startup topic inventory");
        Self {
            browser: Arc::new(RwLock::new(browser)),
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Initialize a quiz session from the store and register it, discarding
    /// any session left by an earlier load of the quiz screen.
    #[instrument(level = "info", skip(self))]
    pub async fn open_session(&self) -> Result<(String, QuizSession), QuizError> {
        let session = QuizSession::from_store(&self.store, &self.config.quiz).await?;
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        let discarded = sessions.len();
        sessions.clear();
        sessions.insert(id.clone(), session.clone());
        info!(target: "quiz", session = %id, discarded, "Quiz session opened");
        Ok((id, session))
    }

    /// Run `f` against a live session. `None` if the id is unknown.
    pub async fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(f)
    }
}
