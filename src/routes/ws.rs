//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic::{self, ApiError};
use crate::protocol::{ClientWsMessage, ErrorOut, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quiz_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quiz_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error {
            error: ErrorOut { error: "bad_request", message: format!("Invalid JSON: {}", e), redirect: None },
          },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "error": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quiz_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quiz_backend", "WebSocket disconnected");
}

fn error_msg(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { error: e.to_out() }
}

#[instrument(level = "info", skip(state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListTopics { search, sort } => {
      let topics = logic::list_topics(state, &search, &sort).await;
      ServerWsMessage::Topics { topics }
    }

    ClientWsMessage::SelectTopic { topic_id } => {
      let selection = logic::select_topic(state, &topic_id).await;
      ServerWsMessage::Selection { selection }
    }

    ClientWsMessage::StartTest => match logic::start_test(state).await {
      Ok(nav) => ServerWsMessage::Navigate { redirect: nav.redirect },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::StartQuiz => match logic::start_quiz(state).await {
      Ok(quiz) => ServerWsMessage::Quiz { quiz },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::GetQuiz { session_id } => match logic::quiz_view(state, &session_id).await {
      Ok(quiz) => ServerWsMessage::Quiz { quiz },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Quiz { session_id, command } => {
      match logic::quiz_command(state, &session_id, command).await {
        Ok(quiz) => {
          tracing::info!(target: "quiz", session = %session_id, ?command, "WS quiz command applied");
          ServerWsMessage::Quiz { quiz }
        }
        Err(e) => error_msg(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::logic::tests::test_state;
  use crate::protocol::QuizCommand;

  #[tokio::test]
  async fn ws_flow_reaches_final_report() {
    let state = test_state();
    let sel = handle_client_ws(ClientWsMessage::SelectTopic { topic_id: "megaliths".into() }, &state).await;
    assert!(matches!(sel, ServerWsMessage::Selection { selection: Some(_) }));

    let nav = handle_client_ws(ClientWsMessage::StartTest, &state).await;
    assert!(matches!(nav, ServerWsMessage::Navigate { ref redirect } if redirect == "test.html?topic=megaliths"));

    let session_id = match handle_client_ws(ClientWsMessage::StartQuiz, &state).await {
      ServerWsMessage::Quiz { quiz } => quiz.session_id,
      other => panic!("unexpected {other:?}"),
    };

    let mut last = ServerWsMessage::Pong;
    for command in [
      QuizCommand::Select { index: 0 },
      QuizCommand::Check,
      QuizCommand::Next,
      QuizCommand::Select { index: 2 },
      QuizCommand::Check,
      QuizCommand::Submit,
    ] {
      last = handle_client_ws(ClientWsMessage::Quiz { session_id: session_id.clone(), command }, &state).await;
    }
    match last {
      ServerWsMessage::Quiz { quiz } => assert!(quiz.view.completed),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn ws_start_quiz_without_data_redirects() {
    let state = test_state();
    match handle_client_ws(ClientWsMessage::StartQuiz, &state).await {
      ServerWsMessage::Error { error } => {
        assert_eq!(error.error, "fatal_data_missing");
        assert_eq!(error.redirect, Some("topic-selector.html"));
      }
      other => panic!("unexpected {other:?}"),
    }
  }
}
