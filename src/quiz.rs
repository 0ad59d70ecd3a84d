//! Quiz engine: one session per quiz screen load.
//!
//! Each slot goes Unanswered -> Checked and never back within an iteration.
//! The session goes InProgress -> NeedsCorrection -> InProgress (reduced set,
//! next iteration) -> ... -> Complete. Questions answered correctly in any
//! iteration drop out for good; the loop has no iteration cap, so a question
//! that is always answered wrong keeps coming back.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::QuizSettings;
use crate::domain::{decode_questions, Question, QuestionId};
use crate::store::{KvStore, KEY_TOPIC_QUESTIONS, KEY_TOPIC_TITLE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
  #[error("Questions for this test were not found. Please return to the topic selection page.")]
  FatalDataMissing,
  #[error("Please choose an answer before checking.")]
  NoOptionSelected,
  #[error("This question has already been checked.")]
  SlotLocked,
  #[error("Option {index} does not exist for this question.")]
  OptionOutOfRange { index: usize },
  #[error("The test is no longer accepting answers.")]
  Completed,
  #[error("Answer and check the last question before submitting.")]
  NotReadyToSubmit,
  #[error("There are no mistakes to fix.")]
  NoCorrectionPending,
}

/// One question's position in the active set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
  pub answer: Option<usize>,
  pub checked: bool,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Pass,
  Review,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
  Interim {
    iteration: u32,
    correct: usize,
    attempted: usize,
    remaining_incorrect: usize,
  },
  Final {
    title: String,
    correct: usize,
    total: usize,
    percentage: u32,
    verdict: Verdict,
  },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  InProgress,
  NeedsCorrection(Report),
  Complete(Report),
}

/// Per-option coloring once a slot is checked.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
  SelectedCorrect,
  SelectedWrong,
  CorrectUnselected,
  Neutral,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OptionView {
  pub index: usize,
  pub text: String,
  pub selected: bool,
  pub mark: OptionMark,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Feedback {
  pub correct: bool,
  pub explanation: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Controls {
  pub prev: bool,
  pub check: bool,
  pub next: bool,
  pub submit: bool,
  pub fix_mistakes: bool,
}

/// Everything the quiz screen needs to draw itself.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
  pub title: String,
  pub iteration: u32,
  pub position: usize,
  pub total: usize,
  pub prompt: String,
  pub image: Option<String>,
  pub options: Vec<OptionView>,
  pub locked: bool,
  pub feedback: Option<Feedback>,
  pub controls: Controls,
  pub report: Option<Report>,
  pub completed: bool,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  title: String,
  pass_threshold: u32,
  original: Vec<Question>,
  active: Vec<QuestionId>,
  slots: Vec<Slot>,
  pointer: usize,
  phase: Phase,
  answered_correctly: BTreeSet<QuestionId>,
  answered_incorrectly: BTreeSet<QuestionId>,
  iteration: u32,
}

impl QuizSession {
  /// Start a session over `questions`. An empty set is treated as missing data.
  pub fn new(questions: Vec<Question>, title: String, pass_threshold: u32) -> Result<Self, QuizError> {
    if questions.is_empty() {
      return Err(QuizError::FatalDataMissing);
    }
    let active: Vec<QuestionId> = questions.iter().map(|q| q.id).collect();
    Ok(Self {
      title,
      pass_threshold,
      slots: vec![Slot::default(); active.len()],
      active,
      original: questions,
      pointer: 0,
      phase: Phase::InProgress,
      answered_correctly: BTreeSet::new(),
      answered_incorrectly: BTreeSet::new(),
      iteration: 1,
    })
  }

  /// Build a session from the raw values found in the shared store.
  pub fn initialize(
    questions_json: Option<&str>,
    title: Option<String>,
    settings: &QuizSettings,
  ) -> Result<Self, QuizError> {
    let json = questions_json.ok_or(QuizError::FatalDataMissing)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
      warn!(target: "quiz", error = %e, "Stored question set is malformed");
      QuizError::FatalDataMissing
    })?;
    let (questions, rejected) = decode_questions(values);
    for (pos, reason) in rejected {
      warn!(target: "quiz", position = pos, %reason, "Skipping malformed stored question");
    }
    let title = title.unwrap_or_else(|| settings.default_title.clone());
    Self::new(questions, title, settings.pass_threshold)
  }

  #[instrument(level = "info", skip_all)]
  pub async fn from_store(store: &KvStore, settings: &QuizSettings) -> Result<Self, QuizError> {
    let questions = store.get(KEY_TOPIC_QUESTIONS).await;
    let title = store.get(KEY_TOPIC_TITLE).await;
    let session = Self::initialize(questions.as_deref(), title, settings)?;
    info!(target: "quiz", title = %session.title, questions = session.original.len(), "Quiz session initialized");
    Ok(session)
  }

  pub fn is_completed(&self) -> bool { self.phase != Phase::InProgress }

  pub fn current_question(&self) -> &Question {
    &self.original[self.active[self.pointer]]
  }

  fn last_index(&self) -> usize { self.active.len() - 1 }

  /// Record a choice for the current slot. The slot stays unanswered until checked.
  pub fn select_option(&mut self, index: usize) -> Result<(), QuizError> {
    if self.is_completed() {
      return Err(QuizError::Completed);
    }
    if self.slots[self.pointer].checked {
      return Err(QuizError::SlotLocked);
    }
    if index >= self.current_question().options.len() {
      return Err(QuizError::OptionOutOfRange { index });
    }
    self.slots[self.pointer].answer = Some(index);
    Ok(())
  }

  /// Lock the current slot. Checking an already checked slot changes nothing.
  pub fn check(&mut self) -> Result<(), QuizError> {
    if self.is_completed() {
      return Err(QuizError::Completed);
    }
    let slot = &mut self.slots[self.pointer];
    if slot.answer.is_none() {
      return Err(QuizError::NoOptionSelected);
    }
    slot.checked = true;
    Ok(())
  }

  /// Move forward; returns false at the last question. Also works after
  /// completion so answers can be reviewed.
  pub fn next(&mut self) -> bool {
    if self.pointer < self.last_index() {
      self.pointer += 1;
      true
    } else {
      false
    }
  }

  pub fn prev(&mut self) -> bool {
    if self.pointer > 0 {
      self.pointer -= 1;
      true
    } else {
      false
    }
  }

  /// Score the current iteration and either ask for corrections or finish.
  #[instrument(level = "info", skip(self), fields(iteration = self.iteration))]
  pub fn submit(&mut self) -> Result<Report, QuizError> {
    if self.is_completed() {
      return Err(QuizError::Completed);
    }
    if self.pointer != self.last_index() || !self.slots[self.pointer].checked {
      return Err(QuizError::NotReadyToSubmit);
    }

    let mut correct_count = 0;
    for (id, slot) in self.active.iter().zip(&self.slots) {
      if slot.answer == Some(self.original[*id].correct) {
        correct_count += 1;
        self.answered_correctly.insert(*id);
      } else {
        // Never pruned when the question is later answered correctly.
        self.answered_incorrectly.insert(*id);
      }
    }

    let attempted = self.active.len();
    if correct_count < attempted {
      let report = Report::Interim {
        iteration: self.iteration,
        correct: correct_count,
        attempted,
        remaining_incorrect: self.original.len() - self.answered_correctly.len(),
      };
      info!(target: "quiz", correct = correct_count, attempted, "Iteration has mistakes");
      self.phase = Phase::NeedsCorrection(report.clone());
      Ok(report)
    } else {
      let percentage = (100.0 * correct_count as f64 / attempted as f64).round() as u32;
      let verdict = if percentage >= self.pass_threshold { Verdict::Pass } else { Verdict::Review };
      let report = Report::Final {
        title: self.title.clone(),
        correct: correct_count,
        total: attempted,
        percentage,
        verdict,
      };
      info!(target: "quiz", percentage, iterations = self.iteration, "Quiz complete");
      self.phase = Phase::Complete(report.clone());
      Ok(report)
    }
  }

  /// Re-ask every question not yet credited as correct.
  #[instrument(level = "info", skip(self), fields(iteration = self.iteration))]
  pub fn fix_mistakes(&mut self) -> Result<(), QuizError> {
    if !matches!(self.phase, Phase::NeedsCorrection(_)) {
      return Err(QuizError::NoCorrectionPending);
    }
    self.active = self
      .original
      .iter()
      .map(|q| q.id)
      .filter(|id| !self.answered_correctly.contains(id))
      .collect();
    self.slots = vec![Slot::default(); self.active.len()];
    self.pointer = 0;
    self.iteration += 1;
    self.phase = Phase::InProgress;
    info!(target: "quiz", remaining = self.active.len(), iteration = self.iteration, "Correction iteration started");
    Ok(())
  }

  pub fn view(&self) -> QuizView {
    let q = self.current_question();
    let slot = self.slots[self.pointer];
    let options = q
      .options
      .iter()
      .enumerate()
      .map(|(i, text)| {
        let selected = slot.answer == Some(i);
        let mark = match (slot.checked, selected, i == q.correct) {
          (false, _, _) => OptionMark::Neutral,
          (true, true, true) => OptionMark::SelectedCorrect,
          (true, true, false) => OptionMark::SelectedWrong,
          (true, false, true) => OptionMark::CorrectUnselected,
          (true, false, false) => OptionMark::Neutral,
        };
        OptionView { index: i, text: text.clone(), selected, mark }
      })
      .collect();

    let feedback = slot.checked.then(|| Feedback {
      correct: slot.answer == Some(q.correct),
      explanation: q.explanation.clone(),
    });

    let at_last = self.pointer == self.last_index();
    let controls = match &self.phase {
      Phase::InProgress => Controls {
        prev: self.pointer > 0,
        check: !slot.checked,
        next: slot.checked && !at_last,
        submit: slot.checked && at_last,
        fix_mistakes: false,
      },
      Phase::NeedsCorrection(_) => Controls {
        prev: self.pointer > 0,
        next: !at_last,
        fix_mistakes: true,
        ..Controls::default()
      },
      Phase::Complete(_) => Controls {
        prev: self.pointer > 0,
        next: !at_last,
        ..Controls::default()
      },
    };

    let report = match &self.phase {
      Phase::InProgress => None,
      Phase::NeedsCorrection(r) | Phase::Complete(r) => Some(r.clone()),
    };

    QuizView {
      title: self.title.clone(),
      iteration: self.iteration,
      position: self.pointer + 1,
      total: self.active.len(),
      prompt: q.prompt.clone(),
      image: q.image.clone(),
      options,
      locked: slot.checked,
      feedback,
      controls,
      report,
      completed: self.is_completed(),
    }
  }
}

// Read-only accessors.
#[allow(dead_code)]
impl QuizSession {
  pub fn title(&self) -> &str { &self.title }
  pub fn iteration(&self) -> u32 { self.iteration }
  pub fn pointer(&self) -> usize { self.pointer }
  pub fn phase(&self) -> &Phase { &self.phase }
  pub fn slots(&self) -> &[Slot] { &self.slots }
  pub fn original_questions(&self) -> &[Question] { &self.original }
  pub fn answered_correctly(&self) -> &BTreeSet<QuestionId> { &self.answered_correctly }
  pub fn answered_incorrectly(&self) -> &BTreeSet<QuestionId> { &self.answered_incorrectly }

  pub fn active_questions(&self) -> impl Iterator<Item = &Question> + '_ {
    self.active.iter().map(move |id| &self.original[*id])
  }
}
