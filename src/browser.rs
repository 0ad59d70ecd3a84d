//! Topic browser: the in-memory catalog, text filter, sort criteria, the
//! current selection, and the hand-off to the quiz screen.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{derive_difficulty, Question, Topic};
use crate::store::{KvStore, StoreError, KEY_TOPIC_QUESTIONS, KEY_TOPIC_TITLE};

#[derive(Debug, Error)]
pub enum BrowserError {
  #[error("Please select a topic before starting the test.")]
  NoTopicSelected,
  #[error("Unknown topic: {0}")]
  UnknownTopic(String),
  #[error("A topic with id {0} already exists")]
  DuplicateTopic(String),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("failed to encode questions: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Sort criteria offered by the browser. Anything unrecognized keeps catalog order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
  Name,
  Difficulty,
  QuestionCount,
  Unchanged,
}

impl SortBy {
  pub fn parse(s: &str) -> Self {
    match s {
      "name" => SortBy::Name,
      "difficulty" => SortBy::Difficulty,
      "questionCount" | "question_count" => SortBy::QuestionCount,
      _ => SortBy::Unchanged,
    }
  }
}

/// Details panel for the selected topic.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionInfo {
  pub id: String,
  pub name: String,
  pub question_count: usize,
  pub difficulty: &'static str,
}

/// Where the client goes after a successful start.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Navigation {
  pub redirect: String,
}

/// Fields accepted when adding a topic.
#[derive(Clone, Debug, Default)]
pub struct NewTopic {
  pub id: Option<String>,
  pub name: String,
  pub description: String,
  pub questions: Vec<Question>,
  pub test_url: Option<String>,
}

/// Fields that can be changed on an existing topic; `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct TopicPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub questions: Option<Vec<Question>>,
}

pub struct TopicBrowser {
  topics: Vec<Topic>,
  selected: Option<String>,
  default_test_url: String,
}

impl TopicBrowser {
  pub fn new(topics: Vec<Topic>, default_test_url: impl Into<String>) -> Self {
    Self { topics, selected: None, default_test_url: default_test_url.into() }
  }

  pub fn count(&self) -> usize { self.topics.len() }

  pub fn get(&self, id: &str) -> Option<&Topic> {
    self.topics.iter().find(|t| t.id == id)
  }

  pub fn topics_by<F>(&self, pred: F) -> Vec<&Topic>
  where
    F: Fn(&Topic) -> bool,
  {
    self.topics.iter().filter(|t| pred(t)).collect()
  }

  pub fn selected(&self) -> Option<&Topic> {
    self.selected.as_deref().and_then(|id| self.get(id))
  }

  pub fn is_selected(&self, id: &str) -> bool {
    self.selected.as_deref() == Some(id)
  }

  /// Case-insensitive substring match on name or description, catalog order preserved.
  pub fn filter(&self, term: &str) -> Vec<&Topic> {
    let needle = term.to_lowercase();
    self.topics_by(|t| t.name.to_lowercase().contains(&needle) || t.description.to_lowercase().contains(&needle))
  }

  /// Filter then sort, as the topic grid renders it. Sorting works on a copy,
  /// the canonical catalog order is never touched.
  pub fn view(&self, term: &str, by: SortBy) -> Vec<&Topic> {
    let mut view = self.filter(term);
    sort_view(&mut view, by);
    view
  }

  /// Select by id. An unknown id clears the selection.
  #[instrument(level = "info", skip(self))]
  pub fn select(&mut self, topic_id: &str) -> Option<SelectionInfo> {
    let info = self.get(topic_id).map(|t| SelectionInfo {
      id: t.id.clone(),
      name: t.name.clone(),
      question_count: t.question_count(),
      difficulty: t.difficulty_label(),
    });
    self.selected = info.as_ref().map(|i| i.id.clone());
    if info.is_none() {
      warn!(target: "catalog", %topic_id, "Selection cleared: unknown topic");
    }
    info
  }

  /// Copy the selected topic's questions and name into the store and return
  /// the quiz screen URL.
  #[instrument(level = "info", skip(self, store))]
  pub async fn start(&self, store: &KvStore) -> Result<Navigation, BrowserError> {
    let topic = self.selected().ok_or(BrowserError::NoTopicSelected)?;
    let raw: Vec<_> = topic.questions.iter().map(Question::to_raw).collect();
    store.set(KEY_TOPIC_QUESTIONS, serde_json::to_string(&raw)?).await?;
    store.set(KEY_TOPIC_TITLE, topic.name.clone()).await?;
    info!(target: "catalog", topic = %topic.id, questions = raw.len(), "Topic handed off to quiz");
    Ok(Navigation { redirect: format!("{}?topic={}", topic.test_url, urlencoding::encode(&topic.id)) })
  }

  pub fn add_topic(&mut self, new: NewTopic) -> Result<&Topic, BrowserError> {
    let id = new.id.unwrap_or_else(generate_id);
    if self.get(&id).is_some() {
      return Err(BrowserError::DuplicateTopic(id));
    }
    self.topics.push(Topic {
      difficulty: derive_difficulty(&new.questions),
      id,
      name: new.name,
      description: new.description,
      questions: new.questions,
      test_url: new.test_url.unwrap_or_else(|| self.default_test_url.clone()),
    });
    info!(target: "catalog", count = self.topics.len(), "Topic added");
    Ok(&self.topics[self.topics.len() - 1])
  }

  /// Remove a topic, clearing the selection if it pointed at it.
  pub fn remove_topic(&mut self, id: &str) -> Result<(), BrowserError> {
    let before = self.topics.len();
    self.topics.retain(|t| t.id != id);
    if self.topics.len() == before {
      return Err(BrowserError::UnknownTopic(id.to_string()));
    }
    if self.is_selected(id) {
      self.selected = None;
    }
    Ok(())
  }

  pub fn update_topic(&mut self, id: &str, patch: TopicPatch) -> Result<&Topic, BrowserError> {
    let topic = self
      .topics
      .iter_mut()
      .find(|t| t.id == id)
      .ok_or_else(|| BrowserError::UnknownTopic(id.to_string()))?;
    if let Some(name) = patch.name { topic.name = name; }
    if let Some(description) = patch.description { topic.description = description; }
    if let Some(questions) = patch.questions {
      topic.difficulty = derive_difficulty(&questions);
      topic.questions = questions;
    }
    Ok(&*topic)
  }
}

fn sort_view(view: &mut [&Topic], by: SortBy) {
  match by {
    SortBy::Name => view.sort_by(|a, b| locale_cmp(&a.name, &b.name)),
    SortBy::Difficulty => view.sort_by(|a, b| locale_cmp(a.difficulty_label(), b.difficulty_label())),
    SortBy::QuestionCount => view.sort_by(|a, b| b.question_count().cmp(&a.question_count())),
    SortBy::Unchanged => {}
  }
}

/// Case-insensitive first, then code point order, approximating a natural
/// locale collation.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn generate_id() -> String {
  Uuid::new_v4().simple().to_string()[..9].to_string()
}
