//! Built-in fallback content.

use crate::domain::{Difficulty, Topic};

/// Minimal catalog that keeps the topic browser usable when the topics
/// resource cannot be loaded. Question sets are empty.
pub fn fallback_topics(test_url: &str) -> Vec<Topic> {
  vec![
    Topic {
      id: "prehistoric_art".into(),
      name: "Prehistoric Art".into(),
      description: "Rock carvings, cave painting and ancient artifacts.".into(),
      questions: Vec::new(),
      difficulty: Difficulty::Intermediate,
      test_url: test_url.into(),
    },
    Topic {
      id: "megaliths".into(),
      name: "Megaliths".into(),
      description: "Megaliths: their purpose, construction and historical significance.".into(),
      questions: Vec::new(),
      difficulty: Difficulty::Intermediate,
      test_url: test_url.into(),
    },
  ]
}
