use thiserror::Error;

use crate::grading::models::{Marking, Question, QuestionId, Session, StepId};
use crate::grading::types::{Correctness, StepStatus};

/// Amount the +/- controls move a mark by.
pub const MARK_INCREMENT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkTarget {
    pub question_id: QuestionId,
    pub step_id: Option<StepId>,
}

/// A stored mark change, reported upward for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEvent {
    pub question_id: QuestionId,
    pub step_id: Option<StepId>,
    pub value: f64,
}

impl MarkEvent {
    pub fn target(&self) -> MarkTarget {
        MarkTarget { question_id: self.question_id.clone(), step_id: self.step_id.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("question {question_id} has no step {step_id}")]
    UnknownStep { question_id: QuestionId, step_id: StepId },
    #[error("question {0} is marked as a whole and has no steps")]
    NotStepped(QuestionId),
    #[error("question {0} total is derived from its steps")]
    DerivedTotal(QuestionId),
    #[error("mark for question {question_id} must be a finite number, got {value}")]
    NonFinite { question_id: QuestionId, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Up,
    Down,
}

/// Out-of-range entries are pulled to the nearest bound, never rejected.
pub fn clamp_mark(value: f64, max: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else if value > max {
        max
    } else {
        value
    }
}

/// An ungraded mark nudges from zero.
pub fn nudged(current: Option<f64>, max: f64, nudge: Nudge) -> f64 {
    let base = current.unwrap_or(0.0);
    let next = match nudge {
        Nudge::Up => base + MARK_INCREMENT,
        Nudge::Down => base - MARK_INCREMENT,
    };
    clamp_mark(next, max)
}

/// Ungraded entries count as zero.
pub fn sum_marks<I>(marks: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    marks.into_iter().map(|mark| mark.unwrap_or(0.0)).sum()
}

impl Question {
    pub fn mark_for(&self, step_id: Option<&StepId>) -> Result<Option<f64>, MarkError> {
        match (step_id, self.steps()) {
            (None, None) => Ok(self.obtained_marks),
            (None, Some(_)) => Ok(self.obtained_marks),
            (Some(_), None) => Err(MarkError::NotStepped(self.id.clone())),
            (Some(step_id), Some(_)) => self
                .step(step_id)
                .map(|step| step.obtained_marks)
                .ok_or_else(|| self.unknown_step(step_id)),
        }
    }

    pub fn max_for(&self, step_id: Option<&StepId>) -> Result<f64, MarkError> {
        match step_id {
            None => Ok(self.max_marks),
            Some(step_id) => match self.steps() {
                None => Err(MarkError::NotStepped(self.id.clone())),
                Some(_) => self
                    .step(step_id)
                    .map(|step| step.max_marks)
                    .ok_or_else(|| self.unknown_step(step_id)),
            },
        }
    }

    /// Stores a reviewer mark and returns the value actually kept.
    pub(crate) fn set_mark(
        &mut self,
        step_id: Option<&StepId>,
        value: f64,
    ) -> Result<f64, MarkError> {
        if !value.is_finite() {
            return Err(MarkError::NonFinite { question_id: self.id.clone(), value });
        }

        let question_id = self.id.clone();
        match (&mut self.marking, step_id) {
            (Marking::Atomic, None) => {
                let stored = clamp_mark(value, self.max_marks);
                self.obtained_marks = Some(stored);
                self.status = Correctness::from_marks(self.obtained_marks, self.max_marks);
                Ok(stored)
            }
            (Marking::Atomic, Some(_)) => Err(MarkError::NotStepped(question_id)),
            (_, None) => Err(MarkError::DerivedTotal(question_id)),
            (marking, Some(step_id)) => {
                let steps = marking.steps_mut().ok_or(MarkError::NotStepped(question_id.clone()))?;
                let step = steps.iter_mut().find(|step| &step.id == step_id).ok_or_else(|| {
                    MarkError::UnknownStep { question_id: question_id.clone(), step_id: step_id.clone() }
                })?;
                let stored = clamp_mark(value, step.max_marks);
                step.obtained_marks = Some(stored);
                step.status = StepStatus::from_marks(step.obtained_marks, step.max_marks);
                self.recompute_from_steps();
                Ok(stored)
            }
        }
    }

    fn recompute_from_steps(&mut self) {
        if let Some(steps) = self.marking.steps() {
            let total = sum_marks(steps.iter().map(|step| step.obtained_marks));
            self.obtained_marks = Some(total);
            self.status = Correctness::from_marks(self.obtained_marks, self.max_marks);
        }
    }

    fn unknown_step(&self, step_id: &StepId) -> MarkError {
        MarkError::UnknownStep { question_id: self.id.clone(), step_id: step_id.clone() }
    }
}

impl Session {
    pub(crate) fn recompute_total(&mut self) {
        self.obtained_marks = sum_marks(self.questions.iter().map(|q| q.obtained_marks));
    }

    /// Applies one edit and re-derives the session total.
    pub(crate) fn apply_mark(
        &mut self,
        question_id: &QuestionId,
        step_id: Option<&StepId>,
        value: f64,
    ) -> Result<MarkEvent, MarkError> {
        let question = self
            .question_mut(question_id)
            .ok_or_else(|| MarkError::UnknownQuestion(question_id.clone()))?;
        let stored = question.set_mark(step_id, value)?;
        self.recompute_total();

        Ok(MarkEvent { question_id: question_id.clone(), step_id: step_id.cloned(), value: stored })
    }
}
