//! Domain models used by the backend: difficulty tags, questions, topics, and
//! the raw records they are decoded from.

use serde::{Deserialize, Serialize};

/// Difficulty tag carried by a question. Declaration order is the
/// enumeration order used to break ties in the majority vote.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Basic,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Basic, Difficulty::Intermediate, Difficulty::Advanced];

  /// Parse a raw tag. Unknown tags yield `None` and are ignored by the vote.
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag {
      "basic" => Some(Difficulty::Basic),
      "intermediate" => Some(Difficulty::Intermediate),
      "advanced" => Some(Difficulty::Advanced),
      _ => None,
    }
  }

  pub fn tag(self) -> &'static str {
    match self {
      Difficulty::Basic => "basic",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }

  /// Human label shown on cards and in the details panel.
  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Basic => "Basic",
      Difficulty::Intermediate => "Intermediate",
      Difficulty::Advanced => "Advanced",
    }
  }
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::Intermediate }
}

/// Question record as it appears in the topics resource and in the shared store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
  pub text: String,
  #[serde(default)] pub options: Vec<String>,
  pub correct_answer: usize,
  #[serde(default)] pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub difficulty: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub image: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawTopic {
  pub id: String,
  pub title: String,
  #[serde(default)] pub description: String,
  /// Kept undecoded so one malformed record only costs that question.
  #[serde(default)] pub questions: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawCatalog {
  #[serde(default)] pub topics: Vec<RawTopic>,
}

/// Stable identity of a question inside its topic (position in the original list).
pub type QuestionId = usize;

/// Validated multiple-choice question.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Question {
  pub id: QuestionId,
  pub prompt: String,
  pub options: Vec<String>,
  pub correct: usize,
  pub explanation: String,
  pub difficulty: Option<Difficulty>,
  pub image: Option<String>,
}

impl Question {
  /// Validate a raw record. `correct_answer` must index into a non-empty option list.
  pub fn from_raw(id: QuestionId, raw: &RawQuestion) -> Result<Self, String> {
    if raw.options.is_empty() {
      return Err("question has no options".into());
    }
    if raw.correct_answer >= raw.options.len() {
      return Err(format!(
        "correctAnswer {} out of range for {} options",
        raw.correct_answer,
        raw.options.len()
      ));
    }
    Ok(Self {
      id,
      prompt: raw.text.clone(),
      options: raw.options.clone(),
      correct: raw.correct_answer,
      explanation: raw.explanation.clone(),
      difficulty: raw.difficulty.as_deref().and_then(Difficulty::from_tag),
      image: raw.image.clone().filter(|s| !s.is_empty()),
    })
  }

  pub fn to_raw(&self) -> RawQuestion {
    RawQuestion {
      text: self.prompt.clone(),
      options: self.options.clone(),
      correct_answer: self.correct,
      explanation: self.explanation.clone(),
      difficulty: self.difficulty.map(|d| d.tag().to_string()),
      image: self.image.clone(),
    }
  }
}

/// A named collection of questions with a derived difficulty label.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Topic {
  pub id: String,
  pub name: String,
  pub description: String,
  pub questions: Vec<Question>,
  pub difficulty: Difficulty,
  pub test_url: String,
}

impl Topic {
  pub fn question_count(&self) -> usize { self.questions.len() }

  pub fn difficulty_label(&self) -> &'static str { self.difficulty.label() }
}

/// Majority vote over recognized tags. Ties go to the first tied difficulty in
/// enumeration order; no votes at all yields the mid-level default.
pub fn derive_difficulty(questions: &[Question]) -> Difficulty {
  let mut counts = [0usize; 3];
  for q in questions {
    if let Some(d) = q.difficulty {
      counts[d as usize] += 1;
    }
  }

  let mut best = Difficulty::default();
  let mut max_count = 0;
  for d in Difficulty::ALL {
    if counts[d as usize] > max_count {
      max_count = counts[d as usize];
      best = d;
    }
  }
  best
}

/// Turn raw question records into validated questions, assigning stable ids.
/// Malformed records are returned separately so the caller can log them.
pub fn validate_questions(raw: &[RawQuestion]) -> (Vec<Question>, Vec<(usize, String)>) {
  let mut ok = Vec::with_capacity(raw.len());
  let mut rejected = Vec::new();
  for (pos, rq) in raw.iter().enumerate() {
    match Question::from_raw(ok.len(), rq) {
      Ok(q) => ok.push(q),
      Err(reason) => rejected.push((pos, reason)),
    }
  }
  (ok, rejected)
}

/// Like [`validate_questions`], but for records not yet decoded. A record of
/// the wrong shape (missing `correctAnswer`, negative index, ...) is rejected
/// at its position instead of failing the whole list.
pub fn decode_questions(values: Vec<serde_json::Value>) -> (Vec<Question>, Vec<(usize, String)>) {
  let mut ok = Vec::with_capacity(values.len());
  let mut rejected = Vec::new();
  for (pos, value) in values.into_iter().enumerate() {
    let decoded = serde_json::from_value::<RawQuestion>(value)
      .map_err(|e| e.to_string())
      .and_then(|rq| Question::from_raw(ok.len(), &rq));
    match decoded {
      Ok(q) => ok.push(q),
      Err(reason) => rejected.push((pos, reason)),
    }
  }
  (ok, rejected)
}
