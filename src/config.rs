//! Loading quiz configuration from environment variables and an optional TOML file.
//!
//! See `QuizConfig` for the expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_TOPICS_PATH: &str = "./static/js/topics-data.json";
pub const DEFAULT_STORE_PATH: &str = "./data/local_storage.json";
pub const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub quiz: QuizSettings,
  #[serde(default)]
  pub catalog: CatalogSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
  /// Minimum percentage for the pass-style verdict.
  pub pass_threshold: u32,
  /// Title used when the store holds questions but no topic title.
  pub default_title: String,
}

impl Default for QuizSettings {
  fn default() -> Self {
    Self { pass_threshold: 70, default_title: "Testing".into() }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
  /// Screen every topic links to.
  pub test_url: String,
}

impl Default for CatalogSettings {
  fn default() -> Self {
    Self { test_url: "test.html".into() }
  }
}

/// Filesystem locations, all overridable from the environment.
#[derive(Clone, Debug)]
pub struct Paths {
  pub topics: PathBuf,
  pub store: Option<PathBuf>,
  pub static_dir: PathBuf,
}

impl Paths {
  /// TOPICS_PATH, STORE_PATH (empty string = in-memory store), STATIC_DIR.
  pub fn from_env() -> Self {
    let topics = std::env::var("TOPICS_PATH").unwrap_or_else(|_| DEFAULT_TOPICS_PATH.into());
    let store = match std::env::var("STORE_PATH") {
      Ok(s) if s.is_empty() => None,
      Ok(s) => Some(PathBuf::from(s)),
      Err(_) => Some(PathBuf::from(DEFAULT_STORE_PATH)),
    };
    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.into());
    Self { topics: topics.into(), store, static_dir: static_dir.into() }
  }
}

pub fn parse_quiz_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  toml::from_str::<QuizConfig>(s)
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_quiz_config(&s) {
      Ok(cfg) => {
        info!(target: "quiz_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quiz_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
