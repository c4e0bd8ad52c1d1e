//! Multiple-choice quiz widgets
//!
//! A widget shows a question and one button per choice in shuffled order.
//! The first activated button decides the outcome; the widget then removes
//! its buttons and cannot be answered again.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::surface::{Surface, SurfaceEvent};

pub const CORRECT_FEEDBACK: &str = "Hourray, you found the right answer!";
pub const INCORRECT_FEEDBACK: &str = "Well, that actually wasn't the right answer";

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("Question '{0}' has no choices")]
    NoChoices(String),

    #[error("Question '{id}' lists choice '{choice}' more than once")]
    DuplicateChoice { id: String, choice: String },

    #[error("Question '{id}': correct answer '{correct}' is not one of the choices")]
    CorrectNotAChoice { id: String, correct: String },
}

/// One question with its answer key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub question: String,
    pub choices: Vec<String>,
    pub correct: String,

    /// Worked explanation; kept with the record, never part of the feedback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionRecord {
    pub fn new(id: &str, question: &str, choices: &[&str], correct: &str) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            correct: correct.to_string(),
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// The correct answer must be one of a non-empty set of distinct choices
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.choices.is_empty() {
            return Err(QuestionError::NoChoices(self.id.clone()));
        }
        for (i, choice) in self.choices.iter().enumerate() {
            if self.choices[..i].contains(choice) {
                return Err(QuestionError::DuplicateChoice {
                    id: self.id.clone(),
                    choice: choice.clone(),
                });
            }
        }
        if !self.choices.contains(&self.correct) {
            return Err(QuestionError::CorrectNotAChoice {
                id: self.id.clone(),
                correct: self.correct.clone(),
            });
        }
        Ok(())
    }
}

/// Orders the choices before display
pub trait Shuffler {
    fn shuffle(&mut self, choices: &mut [String]);
}

/// Uniformly random permutation
pub struct RandomShuffle<R: Rng> {
    rng: R,
}

impl RandomShuffle<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        Self { rng: rand::rng() }
    }
}

impl RandomShuffle<StdRng> {
    /// Reproducible permutations
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> Shuffler for RandomShuffle<R> {
    fn shuffle(&mut self, choices: &mut [String]) {
        choices.shuffle(&mut self.rng);
    }
}

/// Leaves the choices in the order they were declared
pub struct KeepOrder;

impl Shuffler for KeepOrder {
    fn shuffle(&mut self, _choices: &mut [String]) {}
}

/// Result of answering a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn feedback(self) -> &'static str {
        match self {
            Outcome::Correct => CORRECT_FEEDBACK,
            Outcome::Incorrect => INCORRECT_FEEDBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Unanswered,
    Answered(Outcome),
}

/// A displayed question waiting for its single answer
#[derive(Debug)]
pub struct QuizWidget {
    question: String,
    correct: String,
    buttons: Vec<String>,
    state: QuizState,
}

impl QuizWidget {
    /// Shuffle the choices, then display the question and one button per choice
    pub fn ask(
        record: &QuestionRecord,
        shuffler: &mut impl Shuffler,
        surface: &mut impl Surface,
    ) -> Self {
        let mut buttons = record.choices.clone();
        shuffler.shuffle(&mut buttons);
        debug!(question = %record.id, order = ?buttons, "Asking");

        surface.emit(SurfaceEvent::Heading(record.question.clone()));
        surface.emit(SurfaceEvent::Buttons(buttons.clone()));

        Self {
            question: record.question.clone(),
            correct: record.correct.clone(),
            buttons,
            state: QuizState::Unanswered,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Button labels in display order
    pub fn buttons(&self) -> &[String] {
        &self.buttons
    }

    pub fn correct(&self) -> &str {
        &self.correct
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    /// Activate the button at `index`.
    ///
    /// Only the first activation has an effect: it removes the buttons,
    /// clears prior output and prints the feedback. Later calls, and indexes
    /// with no button, return `None`.
    pub fn activate(&mut self, index: usize, surface: &mut impl Surface) -> Option<Outcome> {
        if self.state != QuizState::Unanswered {
            return None;
        }
        let label = self.buttons.get(index)?;
        let outcome = if *label == self.correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };

        surface.emit(SurfaceEvent::ButtonsRemoved);
        surface.emit(SurfaceEvent::Cleared);
        surface.print(outcome.feedback());

        self.state = QuizState::Answered(outcome);
        Some(outcome)
    }

    /// Activate the button carrying `label`
    pub fn activate_label(&mut self, label: &str, surface: &mut impl Surface) -> Option<Outcome> {
        let index = self.buttons.iter().position(|b| b == label)?;
        self.activate(index, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::RecordingSurface;
    use std::collections::HashMap;

    fn color_question() -> QuestionRecord {
        QuestionRecord::new(
            "favorite-color",
            "What is your favorite color?",
            &["Grey", "White", "Black", "Red"],
            "Red",
        )
    }

    #[test]
    fn test_ask_displays_heading_and_buttons() {
        let mut surface = RecordingSurface::new();
        let widget = QuizWidget::ask(&color_question(), &mut KeepOrder, &mut surface);

        assert_eq!(widget.state(), QuizState::Unanswered);
        assert_eq!(
            surface.events,
            vec![
                SurfaceEvent::Heading("What is your favorite color?".to_string()),
                SurfaceEvent::Buttons(
                    ["Grey", "White", "Black", "Red"].iter().map(|s| s.to_string()).collect()
                ),
            ]
        );
    }

    #[test]
    fn test_correct_answer_feedback_once() {
        let mut surface = RecordingSurface::new();
        let mut widget = QuizWidget::ask(&color_question(), &mut KeepOrder, &mut surface);

        assert_eq!(widget.activate_label("Red", &mut surface), Some(Outcome::Correct));
        assert_eq!(widget.activate_label("Red", &mut surface), None);
        assert_eq!(widget.activate(0, &mut surface), None);

        assert_eq!(surface.texts(), vec![CORRECT_FEEDBACK]);
        assert_eq!(widget.state(), QuizState::Answered(Outcome::Correct));
    }

    #[test]
    fn test_incorrect_answer_feedback_once() {
        let mut surface = RecordingSurface::new();
        let mut widget = QuizWidget::ask(&color_question(), &mut KeepOrder, &mut surface);

        assert_eq!(widget.activate(0, &mut surface), Some(Outcome::Incorrect));
        assert_eq!(widget.activate_label("Red", &mut surface), None);
        assert_eq!(surface.texts(), vec![INCORRECT_FEEDBACK]);
    }

    #[test]
    fn test_activation_removes_buttons_and_clears() {
        let mut surface = RecordingSurface::new();
        let mut widget = QuizWidget::ask(&color_question(), &mut KeepOrder, &mut surface);
        widget.activate(3, &mut surface);

        assert_eq!(
            &surface.events[2..],
            &[
                SurfaceEvent::ButtonsRemoved,
                SurfaceEvent::Cleared,
                SurfaceEvent::Text(CORRECT_FEEDBACK.to_string()),
            ]
        );
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let mut surface = RecordingSurface::new();
        let mut widget = QuizWidget::ask(&color_question(), &mut KeepOrder, &mut surface);
        assert_eq!(widget.activate(17, &mut surface), None);
        assert_eq!(widget.state(), QuizState::Unanswered);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut surface = RecordingSurface::new();
        let record = color_question();
        let widget = QuizWidget::ask(&record, &mut RandomShuffle::seeded(7), &mut surface);

        let mut shown = widget.buttons().to_vec();
        shown.sort();
        let mut expected = record.choices.clone();
        expected.sort();
        assert_eq!(shown, expected);
    }

    #[test]
    fn test_shuffle_distribution_is_uniform() {
        let record = QuestionRecord::new("abc", "?", &["a", "b", "c"], "a");
        let mut shuffler = RandomShuffle::seeded(42);
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
        let trials = 6000;

        for _ in 0..trials {
            let mut surface = RecordingSurface::new();
            let widget = QuizWidget::ask(&record, &mut shuffler, &mut surface);
            *counts.entry(widget.buttons().to_vec()).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        for count in counts.values() {
            // expected 1000 each, sigma ~29
            assert!((800..=1200).contains(count), "skewed permutation count {}", count);
        }
    }

    #[test]
    fn test_validate_record() {
        assert!(color_question().validate().is_ok());

        let bad = QuestionRecord::new("q", "?", &["a", "b"], "c");
        assert!(matches!(bad.validate(), Err(QuestionError::CorrectNotAChoice { .. })));

        let dup = QuestionRecord::new("q", "?", &["a", "a"], "a");
        assert!(matches!(dup.validate(), Err(QuestionError::DuplicateChoice { .. })));

        let empty = QuestionRecord::new("q", "?", &[], "a");
        assert!(matches!(empty.validate(), Err(QuestionError::NoChoices(_))));
    }
}
