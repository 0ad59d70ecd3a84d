//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Listing, filtering, sorting and selecting topics
//!   - Topic maintenance (add / update / remove)
//!   - Handing the selected topic to the quiz via the shared store
//!   - Opening quiz sessions and dispatching engine commands

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::browser::{BrowserError, NewTopic, SelectionInfo, SortBy, TopicPatch};
use crate::domain::{validate_questions, Question, RawQuestion};
use crate::protocol::{
  to_card, to_topic_out, ErrorOut, NewTopicIn, QuizCommand, QuizOut, StartOut, TopicCard, TopicOut, TopicPatchIn,
};
use crate::quiz::QuizError;
use crate::state::AppState;

/// Screen the client returns to when a quiz cannot be shown.
pub const TOPIC_SELECTOR_PAGE: &str = "topic-selector.html";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Quiz(#[from] QuizError),
  #[error(transparent)]
  Browser(#[from] BrowserError),
  #[error("Unknown quiz session: {0}")]
  UnknownSession(String),
  #[error("{0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Quiz(QuizError::FatalDataMissing) => StatusCode::NOT_FOUND,
      ApiError::Quiz(QuizError::NoOptionSelected | QuizError::OptionOutOfRange { .. }) => StatusCode::BAD_REQUEST,
      ApiError::Quiz(_) => StatusCode::CONFLICT,
      ApiError::Browser(BrowserError::NoTopicSelected) => StatusCode::BAD_REQUEST,
      ApiError::Browser(BrowserError::UnknownTopic(_)) => StatusCode::NOT_FOUND,
      ApiError::Browser(BrowserError::DuplicateTopic(_)) => StatusCode::CONFLICT,
      ApiError::Browser(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Quiz(QuizError::FatalDataMissing) => "fatal_data_missing",
      ApiError::Quiz(QuizError::NoOptionSelected) => "no_option_selected",
      ApiError::Quiz(QuizError::SlotLocked) => "slot_locked",
      ApiError::Quiz(QuizError::OptionOutOfRange { .. }) => "option_out_of_range",
      ApiError::Quiz(QuizError::Completed) => "completed",
      ApiError::Quiz(QuizError::NotReadyToSubmit) => "not_ready_to_submit",
      ApiError::Quiz(QuizError::NoCorrectionPending) => "no_correction_pending",
      ApiError::Browser(BrowserError::NoTopicSelected) => "no_topic_selected",
      ApiError::Browser(BrowserError::UnknownTopic(_)) => "unknown_topic",
      ApiError::Browser(BrowserError::DuplicateTopic(_)) => "duplicate_topic",
      ApiError::Browser(_) => "internal",
      ApiError::UnknownSession(_) => "unknown_session",
      ApiError::BadRequest(_) => "bad_request",
    }
  }

  pub fn to_out(&self) -> ErrorOut {
    let redirect = matches!(self, ApiError::Quiz(QuizError::FatalDataMissing) | ApiError::UnknownSession(_))
      .then_some(TOPIC_SELECTOR_PAGE);
    ErrorOut { error: self.code(), message: self.to_string(), redirect }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn list_topics(state: &AppState, search: &str, sort: &str) -> Vec<TopicCard> {
  let browser = state.browser.read().await;
  let cards: Vec<TopicCard> = browser
    .view(search, SortBy::parse(sort))
    .into_iter()
    .map(|t| to_card(t, browser.is_selected(&t.id)))
    .collect();
  debug!(target: "catalog", shown = cards.len(), total = browser.count(), "Topic grid rendered");
  cards
}

pub async fn get_topic(state: &AppState, id: &str) -> Result<TopicOut, ApiError> {
  let browser = state.browser.read().await;
  browser
    .get(id)
    .map(to_topic_out)
    .ok_or_else(|| BrowserError::UnknownTopic(id.to_string()).into())
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title))]
pub async fn add_topic(state: &AppState, body: NewTopicIn) -> Result<TopicOut, ApiError> {
  let questions = validate_incoming(&body.questions)?;
  let mut browser = state.browser.write().await;
  let topic = browser.add_topic(NewTopic {
    id: body.id,
    name: body.title,
    description: body.description,
    questions,
    test_url: body.test_url,
  })?;
  info!(target: "catalog", id = %topic.id, "Topic added via API");
  Ok(to_topic_out(topic))
}

#[instrument(level = "info", skip(state, body))]
pub async fn update_topic(state: &AppState, id: &str, body: TopicPatchIn) -> Result<TopicOut, ApiError> {
  let questions = body.questions.as_deref().map(validate_incoming).transpose()?;
  let mut browser = state.browser.write().await;
  let topic = browser.update_topic(id, TopicPatch { name: body.title, description: body.description, questions })?;
  Ok(to_topic_out(topic))
}

#[instrument(level = "info", skip(state))]
pub async fn remove_topic(state: &AppState, id: &str) -> Result<(), ApiError> {
  state.browser.write().await.remove_topic(id)?;
  info!(target: "catalog", %id, "Topic removed");
  Ok(())
}

#[instrument(level = "info", skip(state))]
pub async fn select_topic(state: &AppState, topic_id: &str) -> Option<SelectionInfo> {
  state.browser.write().await.select(topic_id)
}

#[instrument(level = "info", skip(state))]
pub async fn start_test(state: &AppState) -> Result<StartOut, ApiError> {
  let browser = state.browser.read().await;
  Ok(browser.start(&state.store).await?)
}

#[instrument(level = "info", skip(state))]
pub async fn start_quiz(state: &AppState) -> Result<QuizOut, ApiError> {
  match state.open_session().await {
    Ok((session_id, session)) => Ok(QuizOut { session_id, view: session.view() }),
    Err(e) => {
      warn!(target: "quiz", error = %e, "Quiz screen loaded without a selected topic");
      Err(e.into())
    }
  }
}

pub async fn quiz_view(state: &AppState, session_id: &str) -> Result<QuizOut, ApiError> {
  state
    .with_session(session_id, |s| QuizOut { session_id: session_id.to_string(), view: s.view() })
    .await
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))
}

/// Apply one engine command and return the re-rendered view.
#[instrument(level = "info", skip(state))]
pub async fn quiz_command(state: &AppState, session_id: &str, command: QuizCommand) -> Result<QuizOut, ApiError> {
  let result = state
    .with_session(session_id, |s| {
      let outcome = match command {
        QuizCommand::Select { index } => s.select_option(index),
        QuizCommand::Check => s.check(),
        QuizCommand::Next => {
          s.next();
          Ok(())
        }
        QuizCommand::Prev => {
          s.prev();
          Ok(())
        }
        QuizCommand::Submit => s.submit().map(|_| ()),
        QuizCommand::FixMistakes => s.fix_mistakes(),
      };
      outcome.map(|()| s.view())
    })
    .await
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;

  let view = result.map_err(|e| {
    debug!(target: "quiz", session = %session_id, ?command, error = %e, "Invalid quiz action");
    ApiError::from(e)
  })?;
  Ok(QuizOut { session_id: session_id.to_string(), view })
}

fn validate_incoming(raw: &[RawQuestion]) -> Result<Vec<Question>, ApiError> {
  let (questions, rejected) = validate_questions(raw);
  match rejected.first() {
    Some((pos, reason)) => Err(ApiError::BadRequest(format!("question {pos}: {reason}"))),
    None => Ok(questions),
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::browser::TopicBrowser;
  use crate::config::QuizConfig;
  use crate::domain::{derive_difficulty, Topic};
  use crate::quiz::Report;
  use crate::store::{KvStore, KEY_TOPIC_QUESTIONS, KEY_TOPIC_TITLE};

  fn raw(text: &str, correct: usize) -> RawQuestion {
    RawQuestion {
      text: text.into(),
      options: vec!["A".into(), "B".into(), "C".into()],
      correct_answer: correct,
      explanation: "See the lecture.".into(),
      difficulty: Some("intermediate".into()),
      image: None,
    }
  }

  pub(crate) fn test_state() -> AppState {
    let (questions, _) = validate_questions(&[raw("Where is Stonehenge?", 0), raw("What is a dolmen?", 2)]);
    let topic = Topic {
      id: "megaliths".into(),
      name: "Megaliths".into(),
      description: "Standing stones".into(),
      difficulty: derive_difficulty(&questions),
      questions,
      test_url: "test.html".into(),
    };
    AppState::new(TopicBrowser::new(vec![topic], "test.html"), KvStore::in_memory(), QuizConfig::default())
  }

  async fn run(state: &AppState, id: &str, cmds: &[QuizCommand]) -> QuizOut {
    let mut last = None;
    for c in cmds {
      last = Some(quiz_command(state, id, *c).await.unwrap());
    }
    last.unwrap()
  }

  #[tokio::test]
  async fn start_then_initialize_round_trips_questions() {
    let state = test_state();
    select_topic(&state, "megaliths").await.unwrap();
    let nav = start_test(&state).await.unwrap();
    assert_eq!(nav.redirect, "test.html?topic=megaliths");

    let (_, session) = state.open_session().await.unwrap();
    let browser = state.browser.read().await;
    let original = &browser.get("megaliths").unwrap().questions;
    assert_eq!(session.original_questions(), original.as_slice());
    assert_eq!(session.title(), "Megaliths");
  }

  #[tokio::test]
  async fn quiz_without_selection_is_fatal() {
    let state = test_state();
    let err = start_quiz(&state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_out().redirect, Some(TOPIC_SELECTOR_PAGE));
  }

  #[tokio::test]
  async fn start_test_without_selection_is_rejected() {
    let state = test_state();
    let err = start_test(&state).await.unwrap_err();
    assert_eq!(err.code(), "no_topic_selected");
    assert_eq!(state.store.get(KEY_TOPIC_QUESTIONS).await, None);
  }

  #[tokio::test]
  async fn scenario_all_correct() {
    let state = test_state();
    select_topic(&state, "megaliths").await;
    start_test(&state).await.unwrap();
    let id = start_quiz(&state).await.unwrap().session_id;

    use QuizCommand::*;
    let out = run(&state, &id, &[Select { index: 0 }, Check, Next, Select { index: 2 }, Check, Submit]).await;
    assert!(out.view.completed);
    assert!(!out.view.controls.fix_mistakes);
    assert!(matches!(out.view.report, Some(Report::Final { percentage: 100, .. })));
  }

  #[tokio::test]
  async fn scenario_fix_mistakes() {
    let state = test_state();
    select_topic(&state, "megaliths").await;
    start_test(&state).await.unwrap();
    let id = start_quiz(&state).await.unwrap().session_id;

    use QuizCommand::*;
    let out = run(&state, &id, &[Select { index: 1 }, Check, Next, Select { index: 2 }, Check, Submit]).await;
    assert_eq!(
      out.view.report,
      Some(Report::Interim { iteration: 1, correct: 1, attempted: 2, remaining_incorrect: 1 })
    );
    assert!(out.view.controls.fix_mistakes);

    let out = run(&state, &id, &[FixMistakes]).await;
    assert_eq!(out.view.total, 1);
    assert_eq!(out.view.position, 1);
    assert_eq!(out.view.iteration, 2);
    assert_eq!(out.view.prompt, "Where is Stonehenge?");

    let out = run(&state, &id, &[Select { index: 0 }, Check, Submit]).await;
    assert!(out.view.completed);
    assert!(matches!(out.view.report, Some(Report::Final { .. })));
  }

  #[tokio::test]
  async fn reloading_quiz_screen_replaces_session() {
    let state = test_state();
    select_topic(&state, "megaliths").await;
    start_test(&state).await.unwrap();

    let first = start_quiz(&state).await.unwrap().session_id;
    let mut last = first.clone();
    for _ in 0..50 {
      last = start_quiz(&state).await.unwrap().session_id;
    }
    assert_eq!(state.sessions.read().await.len(), 1);
    assert!(quiz_view(&state, &last).await.is_ok());

    let err = quiz_view(&state, &first).await.unwrap_err();
    assert_eq!(err.code(), "unknown_session");
    assert_eq!(err.to_out().redirect, Some(TOPIC_SELECTOR_PAGE));
  }

  #[tokio::test]
  async fn invalid_actions_report_notices() {
    let state = test_state();
    state.store.set(KEY_TOPIC_QUESTIONS, serde_json::to_string(&vec![raw("Q", 0)]).unwrap()).await.unwrap();
    state.store.set(KEY_TOPIC_TITLE, "Solo".into()).await.unwrap();
    let id = start_quiz(&state).await.unwrap().session_id;

    let err = quiz_command(&state, &id, QuizCommand::Check).await.unwrap_err();
    assert_eq!(err.code(), "no_option_selected");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = quiz_command(&state, "nope", QuizCommand::Next).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    // Boundary navigation is a quiet no-op.
    let out = quiz_command(&state, &id, QuizCommand::Prev).await.unwrap();
    assert_eq!(out.view.position, 1);
  }

  #[tokio::test]
  async fn added_topic_rejects_malformed_questions() {
    let state = test_state();
    let body = NewTopicIn {
      id: Some("bad".into()),
      title: "Bad".into(),
      description: String::new(),
      questions: vec![raw("ok", 0), raw("broken", 5)],
      test_url: None,
    };
    let err = add_topic(&state, body).await.unwrap_err();
    assert_eq!(err.code(), "bad_request");
    assert!(get_topic(&state, "bad").await.is_err());
  }

  #[tokio::test]
  async fn list_marks_selected_card() {
    let state = test_state();
    select_topic(&state, "megaliths").await;
    let cards = list_topics(&state, "", "name").await;
    assert_eq!(cards.len(), 1);
    assert!(cards[0].selected);
    assert_eq!(cards[0].question_count, 2);
    assert!(list_topics(&state, "pyramids", "").await.is_empty());
  }
}
