//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::logic::{self, ApiError};
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status(), Json(self.to_out())).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(search = %q.search, sort = %q.sort))]
pub async fn http_list_topics(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TopicsQuery>,
) -> impl IntoResponse {
  let cards = logic::list_topics(&state, &q.search, &q.sort).await;
  info!(target: "catalog", shown = cards.len(), "HTTP topics served");
  Json(cards)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_topic(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<TopicOut> {
  logic::get_topic(&state, &id).await.map(Json)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_topic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NewTopicIn>,
) -> Result<(StatusCode, Json<TopicOut>), ApiError> {
  let topic = logic::add_topic(&state, body).await?;
  Ok((StatusCode::CREATED, Json(topic)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_patch_topic(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<TopicPatchIn>,
) -> ApiResult<TopicOut> {
  logic::update_topic(&state, &id, body).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_topic(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  logic::remove_topic(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(topic_id = %body.topic_id))]
pub async fn http_select_topic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SelectTopicIn>,
) -> impl IntoResponse {
  let selection = logic::select_topic(&state, &body.topic_id).await;
  Json(SelectTopicOut { selection })
}

#[instrument(level = "info", skip(state))]
pub async fn http_start_test(State(state): State<Arc<AppState>>) -> ApiResult<StartOut> {
  let nav = logic::start_test(&state).await?;
  info!(target: "catalog", redirect = %nav.redirect, "HTTP start served");
  Ok(Json(nav))
}

#[instrument(level = "info", skip(state))]
pub async fn http_start_quiz(State(state): State<Arc<AppState>>) -> ApiResult<QuizOut> {
  logic::start_quiz(&state).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  logic::quiz_view(&state, &id).await.map(Json)
}

#[instrument(level = "info", skip(state), fields(index = body.index))]
pub async fn http_quiz_select(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SelectOptionIn>,
) -> ApiResult<QuizOut> {
  logic::quiz_command(&state, &id, QuizCommand::Select { index: body.index }).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_check(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  logic::quiz_command(&state, &id, QuizCommand::Check).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_next(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  logic::quiz_command(&state, &id, QuizCommand::Next).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_prev(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  logic::quiz_command(&state, &id, QuizCommand::Prev).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_submit(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  let out = logic::quiz_command(&state, &id, QuizCommand::Submit).await?;
  info!(target: "quiz", session = %id, completed = out.view.completed, "HTTP submit evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_fix_mistakes(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<QuizOut> {
  logic::quiz_command(&state, &id, QuizCommand::FixMistakes).await.map(Json)
}
