use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[serde(alias = "pending")]
    Processing,
    Ready,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move session from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Lifecycle only moves forward: processing -> ready -> completed, or into error
    /// from any non-terminal state. Staying put is always allowed.
    pub fn can_become(self, next: SessionStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (Self::Processing, Self::Ready | Self::Error) => true,
            (Self::Ready, Self::Completed | Self::Error) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: SessionStatus) -> Result<SessionStatus, TransitionError> {
        if self.can_become(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    #[serde(alias = "SHORT_ANSWER")]
    Atomic,
    #[serde(alias = "LONG_ANSWER")]
    SteppedNarrative,
    #[serde(alias = "NUMERICAL")]
    SteppedNumeric,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "ATOMIC",
            Self::SteppedNarrative => "STEPPED_NARRATIVE",
            Self::SteppedNumeric => "STEPPED_NUMERIC",
        }
    }

    pub fn is_stepped(self) -> bool {
        !matches!(self, Self::Atomic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correctness {
    Correct,
    Partial,
    Incorrect,
}

impl Correctness {
    /// Status shown once a reviewer has touched the mark.
    pub fn from_marks(obtained: Option<f64>, max: f64) -> Self {
        match obtained {
            None => Self::Partial,
            Some(value) if value <= 0.0 => Self::Incorrect,
            Some(value) if value >= max => Self::Correct,
            Some(_) => Self::Partial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[serde(alias = "medium")]
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Correct,
    Incorrect,
    LowConfidence,
}

impl StepStatus {
    pub fn from_marks(obtained: Option<f64>, max: f64) -> Self {
        match obtained {
            None => Self::LowConfidence,
            Some(value) if value >= max => Self::Correct,
            Some(_) => Self::Incorrect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_only() {
        assert!(SessionStatus::Processing.can_become(SessionStatus::Ready));
        assert!(SessionStatus::Ready.can_become(SessionStatus::Completed));
        assert!(SessionStatus::Ready.can_become(SessionStatus::Error));
        assert!(!SessionStatus::Completed.can_become(SessionStatus::Ready));
        assert!(!SessionStatus::Error.can_become(SessionStatus::Completed));
        assert!(!SessionStatus::Ready.can_become(SessionStatus::Processing));
    }

    #[test]
    fn completion_requires_a_ready_session() {
        assert!(!SessionStatus::Processing.can_become(SessionStatus::Completed));
        assert!(SessionStatus::Completed.can_become(SessionStatus::Completed));
        assert_eq!(
            SessionStatus::Processing.transition(SessionStatus::Completed),
            Err(TransitionError { from: SessionStatus::Processing, to: SessionStatus::Completed })
        );
    }

    #[test]
    fn transition_reports_both_ends() {
        let err = SessionStatus::Error.transition(SessionStatus::Completed).unwrap_err();
        assert_eq!(err.from, SessionStatus::Error);
        assert_eq!(err.to, SessionStatus::Completed);
    }

    #[test]
    fn legacy_type_tags_are_accepted() {
        let kind: QuestionKind = serde_json::from_str("\"SHORT_ANSWER\"").unwrap();
        assert_eq!(kind, QuestionKind::Atomic);
        let kind: QuestionKind = serde_json::from_str("\"LONG_ANSWER\"").unwrap();
        assert_eq!(kind, QuestionKind::SteppedNarrative);
        let kind: QuestionKind = serde_json::from_str("\"NUMERICAL\"").unwrap();
        assert_eq!(kind, QuestionKind::SteppedNumeric);
        assert_eq!(serde_json::to_string(&QuestionKind::SteppedNumeric).unwrap(), "\"STEPPED_NUMERIC\"");
    }

    #[test]
    fn medium_confidence_counts_as_high() {
        let confidence: Confidence = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn correctness_follows_marks() {
        assert_eq!(Correctness::from_marks(None, 2.0), Correctness::Partial);
        assert_eq!(Correctness::from_marks(Some(0.0), 2.0), Correctness::Incorrect);
        assert_eq!(Correctness::from_marks(Some(1.0), 2.0), Correctness::Partial);
        assert_eq!(Correctness::from_marks(Some(2.0), 2.0), Correctness::Correct);
    }

    #[test]
    fn step_status_follows_marks() {
        assert_eq!(StepStatus::from_marks(Some(1.0), 1.0), StepStatus::Correct);
        assert_eq!(StepStatus::from_marks(Some(0.5), 1.0), StepStatus::Incorrect);
        assert_eq!(StepStatus::from_marks(None, 1.0), StepStatus::LowConfidence);
    }
}
