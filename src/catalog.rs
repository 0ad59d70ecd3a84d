//! Topic catalog loading: read the static topics resource, validate it, and
//! fall back to the built-in catalog on any failure.

use std::path::Path;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::{decode_questions, derive_difficulty, RawCatalog, Topic};
use crate::seeds::fallback_topics;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("failed to read topics resource: {0}")]
  Io(#[from] std::io::Error),
  #[error("malformed topics resource: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Parse the topics document. Questions that fail to decode or validate are
/// skipped; only a document that is not a catalog at all is an error.
pub fn parse_catalog(json: &str, test_url: &str) -> Result<Vec<Topic>, CatalogError> {
  let raw: RawCatalog = serde_json::from_str(json)?;
  let topics = raw
    .topics
    .into_iter()
    .map(|rt| {
      let (questions, rejected) = decode_questions(rt.questions);
      for (pos, reason) in rejected {
        warn!(target: "catalog", topic = %rt.id, position = pos, %reason, "Skipping malformed question");
      }
      Topic {
        difficulty: derive_difficulty(&questions),
        id: rt.id,
        name: rt.title,
        description: rt.description,
        questions,
        test_url: test_url.to_string(),
      }
    })
    .collect();
  Ok(topics)
}

/// Load the catalog from disk. Never fails: errors produce the fallback catalog.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_catalog(path: &Path, test_url: &str) -> Vec<Topic> {
  let loaded = match tokio::fs::read_to_string(path).await {
    Ok(s) => parse_catalog(&s, test_url),
    Err(e) => Err(CatalogError::from(e)),
  };

  match loaded {
    Ok(topics) => {
      info!(target: "catalog", count = topics.len(), "Loaded topics catalog");
      topics
    }
    Err(e) => {
      error!(target: "catalog", error = %e, "Topic catalog unavailable; using built-in fallback");
      fallback_topics(test_url)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;

  const SAMPLE: &str = r#"{
    "topics": [
      {
        "id": "megaliths",
        "title": "Megaliths",
        "description": "Standing stones",
        "questions": [
          { "text": "Where is Stonehenge?", "options": ["England", "France"], "correctAnswer": 0,
            "explanation": "Wiltshire.", "difficulty": "basic" },
          { "text": "Broken", "options": ["x"], "correctAnswer": 3 },
          { "text": "What is a dolmen?", "options": ["A tomb", "A tower"], "correctAnswer": 0,
            "explanation": "A single-chamber tomb.", "difficulty": "advanced", "image": "img/dolmen.jpg" },
          { "text": "Menhir means?", "options": ["Long stone", "Round stone"], "correctAnswer": 0,
            "difficulty": "advanced" }
        ]
      },
      { "id": "empty", "title": "Empty", "description": "Nothing here" }
    ]
  }"#;

  #[test]
  fn parses_and_derives_difficulty() {
    let topics = parse_catalog(SAMPLE, "test.html").unwrap();
    assert_eq!(topics.len(), 2);

    let m = &topics[0];
    assert_eq!(m.name, "Megaliths");
    assert_eq!(m.question_count(), 3);
    assert_eq!(m.difficulty, Difficulty::Advanced);
    assert_eq!(m.questions[1].image.as_deref(), Some("img/dolmen.jpg"));
    assert_eq!(m.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![0, 1, 2]);

    assert_eq!(topics[1].difficulty, Difficulty::Intermediate);
    assert!(topics[1].questions.is_empty());
  }

  #[test]
  fn wrongly_shaped_question_only_drops_itself() {
    let json = r#"{
      "topics": [
        { "id": "a", "title": "A", "questions": [
          { "text": "Fine", "options": ["x", "y"], "correctAnswer": 1 } ] },
        { "id": "b", "title": "B", "questions": [
          { "text": "No answer", "options": ["x", "y"] },
          { "text": "String index", "options": ["x", "y"], "correctAnswer": "1" },
          { "text": "Also fine", "options": ["x"], "correctAnswer": 0 } ] }
      ]
    }"#;
    let topics = parse_catalog(json, "test.html").unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].question_count(), 1);
    assert_eq!(topics[1].question_count(), 1);
    assert_eq!(topics[1].questions[0].prompt, "Also fine");
    assert_eq!(topics[1].questions[0].id, 0);
  }

  #[test]
  fn malformed_document_is_an_error() {
    assert!(matches!(parse_catalog("{ not json", "test.html"), Err(CatalogError::Parse(_))));
  }

  #[tokio::test]
  async fn missing_file_uses_fallback() {
    let topics = load_catalog(Path::new("/definitely/not/here/topics.json"), "test.html").await;
    assert!(!topics.is_empty());
    assert!(topics.iter().all(|t| t.questions.is_empty()));
    assert!(topics.iter().any(|t| t.id == "megaliths"));
  }

  #[tokio::test]
  async fn reads_catalog_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topics.json");
    std::fs::write(&path, SAMPLE).unwrap();
    let topics = load_catalog(&path, "quiz.html").await;
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].test_url, "quiz.html");
  }
}
