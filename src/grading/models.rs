use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::grading::types::{
    Confidence, Correctness, QuestionKind, SessionStatus, StepStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Rectangle in percentages of the page image, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub const FALLBACK_BAND_HEIGHT: f64 = 25.0;

impl Region {
    /// Forces the rectangle inside the page: every value into [0, 100] and
    /// the far edges no further than 100.
    pub fn clamped(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x = finite_or_zero(x).clamp(0.0, 100.0);
        let y = finite_or_zero(y).clamp(0.0, 100.0);
        let width = finite_or_zero(width).clamp(0.0, 100.0 - x);
        let height = finite_or_zero(height).clamp(0.0, 100.0 - y);
        Self { x, y, width, height }
    }

    /// Full-width band used when the grading pipeline did not locate the answer.
    pub fn fallback_band(ordinal: usize) -> Self {
        let y = (ordinal as f64 * FALLBACK_BAND_HEIGHT).min(100.0 - FALLBACK_BAND_HEIGHT);
        Self::clamped(0.0, y, 100.0, FALLBACK_BAND_HEIGHT)
    }

    pub fn is_within_image(&self) -> bool {
        let in_range = |value: f64| (0.0..=100.0).contains(&value);
        in_range(self.x)
            && in_range(self.y)
            && in_range(self.width)
            && in_range(self.height)
            && self.x + self.width <= 100.0
            && self.y + self.height <= 100.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: StepId,
    pub label: String,
    pub max_marks: f64,
    pub(crate) obtained_marks: Option<f64>,
    pub(crate) status: StepStatus,
    pub note: Option<String>,
}

impl Step {
    pub fn obtained_marks(&self) -> Option<f64> {
        self.obtained_marks
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn needs_manual_entry(&self) -> bool {
        self.obtained_marks.is_none()
    }
}

/// How a question is marked. Stepped variants own their rubric steps and
/// derive the question total from them.
#[derive(Debug, Clone, PartialEq)]
pub enum Marking {
    Atomic,
    SteppedNarrative(Vec<Step>),
    SteppedNumeric(Vec<Step>),
}

impl Marking {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Self::Atomic => QuestionKind::Atomic,
            Self::SteppedNarrative(_) => QuestionKind::SteppedNarrative,
            Self::SteppedNumeric(_) => QuestionKind::SteppedNumeric,
        }
    }

    pub fn steps(&self) -> Option<&[Step]> {
        match self {
            Self::Atomic => None,
            Self::SteppedNarrative(steps) | Self::SteppedNumeric(steps) => Some(steps),
        }
    }

    pub(crate) fn steps_mut(&mut self) -> Option<&mut Vec<Step>> {
        match self {
            Self::Atomic => None,
            Self::SteppedNarrative(steps) | Self::SteppedNumeric(steps) => Some(steps),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub max_marks: f64,
    pub(crate) obtained_marks: Option<f64>,
    pub ai_remark: String,
    pub(crate) status: Correctness,
    pub confidence: Confidence,
    pub region: Region,
    pub transcript: String,
    pub(crate) marking: Marking,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.marking.kind()
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    pub fn steps(&self) -> Option<&[Step]> {
        self.marking.steps()
    }

    pub fn step(&self, step_id: &StepId) -> Option<&Step> {
        self.steps()?.iter().find(|step| &step.id == step_id)
    }

    pub fn obtained_marks(&self) -> Option<f64> {
        self.obtained_marks
    }

    pub fn status(&self) -> Correctness {
        self.status
    }

    /// Atomic low-confidence answers are shown empty and must be typed in.
    pub fn needs_manual_entry(&self) -> bool {
        match self.steps() {
            None => self.confidence == Confidence::Low && self.obtained_marks.is_none(),
            Some(steps) => steps.iter().any(Step::needs_manual_entry),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub student_name: String,
    pub roll_no: Option<String>,
    pub subject: String,
    pub exam_title: Option<String>,
    pub total_marks: f64,
    pub(crate) obtained_marks: f64,
    pub(crate) status: SessionStatus,
    pub(crate) questions: Vec<Question>,
    pub answer_sheet: Option<String>,
    pub(crate) finalized_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub awaiting_entry: usize,
}

impl Session {
    pub fn obtained_marks(&self) -> f64 {
        self.obtained_marks
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, question_id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == question_id)
    }

    pub(crate) fn question_mut(&mut self, question_id: &QuestionId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|question| &question.id == question_id)
    }

    /// 1-based position used for region labels.
    pub fn ordinal_of(&self, question_id: &QuestionId) -> Option<usize> {
        self.questions.iter().position(|question| &question.id == question_id).map(|idx| idx + 1)
    }

    pub fn finalized_at(&self) -> Option<OffsetDateTime> {
        self.finalized_at
    }

    pub fn summary(&self) -> SessionSummary {
        let percentage = if self.total_marks > 0.0 {
            (self.obtained_marks / self.total_marks * 1000.0).round() / 10.0
        } else {
            0.0
        };
        SessionSummary {
            obtained_marks: self.obtained_marks,
            total_marks: self.total_marks,
            percentage,
            awaiting_entry: self.questions.iter().filter(|q| q.needs_manual_entry()).count(),
        }
    }
}
