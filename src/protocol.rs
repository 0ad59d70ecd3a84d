//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::browser::{Navigation, SelectionInfo};
use crate::domain::{Question, RawQuestion, Topic};
use crate::quiz::QuizView;

/// Engine commands accepted for a live quiz session.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum QuizCommand {
    Select { index: usize },
    Check,
    Next,
    Prev,
    Submit,
    FixMistakes,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListTopics {
        #[serde(default)]
        search: String,
        #[serde(default)]
        sort: String,
    },
    SelectTopic {
        #[serde(rename = "topicId")]
        topic_id: String,
    },
    StartTest,
    StartQuiz,
    GetQuiz {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Quiz {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(flatten)]
        command: QuizCommand,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Topics {
        topics: Vec<TopicCard>,
    },
    Selection {
        selection: Option<SelectionInfo>,
    },
    Navigate {
        redirect: String,
    },
    Quiz {
        #[serde(flatten)]
        quiz: QuizOut,
    },
    Error {
        #[serde(flatten)]
        error: ErrorOut,
    },
}

/// One card in the topic grid.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub question_count: usize,
    pub difficulty: &'static str,
    pub selected: bool,
}

pub fn to_card(t: &Topic, selected: bool) -> TopicCard {
    TopicCard {
        id: t.id.clone(),
        name: t.name.clone(),
        description: t.description.clone(),
        question_count: t.question_count(),
        difficulty: t.difficulty_label(),
        selected,
    }
}

/// Full topic, questions in their resource format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicOut {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: &'static str,
    pub question_count: usize,
    pub test_url: String,
    pub questions: Vec<RawQuestion>,
}

pub fn to_topic_out(t: &Topic) -> TopicOut {
    TopicOut {
        id: t.id.clone(),
        title: t.name.clone(),
        description: t.description.clone(),
        difficulty: t.difficulty_label(),
        question_count: t.question_count(),
        test_url: t.test_url.clone(),
        questions: t.questions.iter().map(Question::to_raw).collect(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct TopicsQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopicIn {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
    #[serde(default)]
    pub test_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicPatchIn {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Deserialize)]
pub struct SelectTopicIn {
    #[serde(rename = "topicId")]
    pub topic_id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectTopicOut {
    pub selection: Option<SelectionInfo>,
}

pub type StartOut = Navigation;

#[derive(Debug, Deserialize)]
pub struct SelectOptionIn {
    pub index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
    pub session_id: String,
    pub view: QuizView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
