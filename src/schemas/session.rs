use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::grading::marks::{clamp_mark, sum_marks, MarkEvent};
use crate::grading::models::{Marking, Question, QuestionId, Region, Session, Step, StepId};
use crate::grading::types::{
    Confidence, Correctness, QuestionKind, SessionStatus, StepStatus,
};

/// Identifiers arrive as question numbers or as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    #[serde(default)]
    pub id: Option<WireId>,
    pub student_name: String,
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub exam_title: Option<String>,
    #[serde(default)]
    pub total_marks: f64,
    #[serde(default)]
    pub obtained_marks: Option<f64>,
    #[serde(default = "default_session_status")]
    pub status: SessionStatus,
    #[serde(default)]
    pub questions: Vec<QuestionDocument>,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub answer_sheet_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDocument {
    pub id: WireId,
    #[serde(alias = "text")]
    pub question: String,
    #[serde(default = "default_question_kind")]
    #[serde(alias = "type")]
    pub question_type: QuestionKind,
    pub max_marks: f64,
    #[serde(default)]
    pub obtained_marks: Option<f64>,
    #[serde(default)]
    pub ai_remark: Option<String>,
    #[serde(default)]
    pub status: Option<Correctness>,
    #[serde(default = "default_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    #[serde(alias = "region")]
    pub bbox: Option<RegionDocument>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<StepDocument>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDocument {
    pub id: WireId,
    #[serde(default)]
    pub label: String,
    pub max_marks: f64,
    #[serde(default)]
    pub obtained_marks: Option<f64>,
    #[serde(default = "default_step_status")]
    pub ai_status: StepStatus,
    #[serde(default)]
    pub ai_note: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate)]
pub struct RegionDocument {
    #[validate(range(min = 0.0, max = 100.0))]
    pub x: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub y: f64,
    #[serde(alias = "w")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub width: f64,
    #[serde(alias = "h")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub height: f64,
}

/// Body of `PATCH /sessions/{id}/marks`.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct MarkUpdateRequest {
    pub question_id: String,
    pub step_id: Option<String>,
    #[validate(range(min = 0.0))]
    pub obtained_marks: Option<f64>,
}

impl From<&MarkEvent> for MarkUpdateRequest {
    fn from(event: &MarkEvent) -> Self {
        Self {
            question_id: event.question_id.0.clone(),
            step_id: event.step_id.as_ref().map(|step_id| step_id.0.clone()),
            obtained_marks: Some(event.value),
        }
    }
}

fn default_session_status() -> SessionStatus {
    SessionStatus::Ready
}

fn default_question_kind() -> QuestionKind {
    QuestionKind::Atomic
}

fn default_confidence() -> Confidence {
    Confidence::Low
}

fn default_step_status() -> StepStatus {
    StepStatus::LowConfidence
}

impl RegionDocument {
    fn into_region(self, question_id: &str) -> Region {
        let fits = self.x + self.width <= 100.0 && self.y + self.height <= 100.0;
        if let Err(errors) = self.validate() {
            tracing::warn!(question_id, error = %errors, "Region out of range; clamping into image");
        } else if !fits {
            tracing::warn!(question_id, "Region extends past the image; clamping into image");
        }
        Region::clamped(self.x, self.y, self.width, self.height)
    }
}

impl StepDocument {
    fn into_step(self) -> Step {
        let max_marks = self.max_marks.max(0.0);
        // steps the grader was unsure about wait for the reviewer
        let obtained_marks = match self.ai_status {
            StepStatus::LowConfidence => None,
            _ => self.obtained_marks.map(|value| clamp_mark(value, max_marks)),
        };
        Step {
            id: StepId(self.id.into_string()),
            label: self.label,
            max_marks,
            obtained_marks,
            status: self.ai_status,
            note: self.ai_note.filter(|note| !note.trim().is_empty()),
        }
    }
}

impl QuestionDocument {
    fn into_question(self, ordinal: usize) -> Question {
        let id = self.id.into_string();
        let max_marks = self.max_marks.max(0.0);

        let steps: Vec<Step> =
            self.steps.unwrap_or_default().into_iter().map(StepDocument::into_step).collect();
        let marking = match self.question_type {
            QuestionKind::Atomic => Marking::Atomic,
            _ if steps.is_empty() => {
                tracing::debug!(question_id = %id, "Stepped question without steps; marking atomically");
                Marking::Atomic
            }
            QuestionKind::SteppedNarrative => Marking::SteppedNarrative(steps),
            QuestionKind::SteppedNumeric => Marking::SteppedNumeric(steps),
        };

        let obtained_marks = match (marking.steps(), self.confidence) {
            (Some(steps), _) => Some(sum_marks(steps.iter().map(Step::obtained_marks))),
            (None, Confidence::Low) => None,
            (None, Confidence::High) => self.obtained_marks.map(|value| clamp_mark(value, max_marks)),
        };
        let region = match self.bbox {
            Some(region) => region.into_region(&id),
            None => Region::fallback_band(ordinal),
        };

        Question {
            status: self.status.unwrap_or_else(|| Correctness::from_marks(obtained_marks, max_marks)),
            id: QuestionId(id),
            text: self.question,
            max_marks,
            obtained_marks,
            ai_remark: self.ai_remark.unwrap_or_default(),
            confidence: self.confidence,
            region,
            transcript: self.transcript.unwrap_or_default(),
            marking,
        }
    }
}

impl SessionDocument {
    /// Normalises a fetched document into a session whose totals hold.
    pub fn into_session(self, requested_id: &str) -> Session {
        let questions: Vec<Question> = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, question)| question.into_question(idx + 1))
            .collect();

        let total_marks = if self.total_marks > 0.0 {
            self.total_marks
        } else {
            questions.iter().map(|question| question.max_marks).sum()
        };
        let obtained_marks = sum_marks(questions.iter().map(|question| question.obtained_marks));

        Session {
            id: self.id.map(WireId::into_string).unwrap_or_else(|| requested_id.to_string()),
            student_name: self.student_name,
            roll_no: self.roll_no,
            subject: self.subject,
            exam_title: self.exam_title,
            total_marks,
            obtained_marks,
            status: self.status,
            questions,
            answer_sheet: self.answer_sheet_url,
            finalized_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> SessionDocument {
        serde_json::from_value(json!({
            "studentName": "Asha Verma",
            "rollNo": "10B-07",
            "subject": "Physics",
            "totalMarks": 0,
            "obtainedMarks": 99,
            "status": "ready",
            "answerSheetUrl": "/uploads/s-1/page_1.png",
            "questions": [
                {
                    "id": 1,
                    "question": "Define Ohm's Law.",
                    "questionType": "SHORT_ANSWER",
                    "maxMarks": 2,
                    "obtainedMarks": 5,
                    "aiRemark": "Correct definition provided.",
                    "status": "correct",
                    "confidence": "high",
                    "bbox": {"x": 5, "y": 10, "w": 90, "h": 20},
                    "transcript": "V = IR",
                    "steps": null
                },
                {
                    "id": "2",
                    "question": "Explain the transformer.",
                    "questionType": "LONG_ANSWER",
                    "maxMarks": 5,
                    "obtainedMarks": 2,
                    "confidence": "medium",
                    "bbox": {"x": 90, "y": 40, "w": 30, "h": 20},
                    "steps": [
                        {"id": "a", "label": "Principle", "maxMarks": 1, "obtainedMarks": 1, "aiStatus": "correct"},
                        {"id": "b", "label": "Diagram", "maxMarks": 2, "obtainedMarks": 1, "aiStatus": "low_confidence"}
                    ]
                },
                {
                    "id": 3,
                    "question": "Calculate the resistance.",
                    "questionType": "NUMERICAL",
                    "maxMarks": 3,
                    "obtainedMarks": 2,
                    "confidence": "low",
                    "steps": []
                }
            ]
        }))
        .expect("session document")
    }

    #[test]
    fn numeric_ids_become_strings_and_totals_are_recomputed() {
        let session = document().into_session("s-1");

        assert_eq!(session.id, "s-1");
        assert_eq!(session.questions()[0].id, QuestionId("1".into()));
        assert_eq!(session.total_marks, 10.0);
        // q1 clamped to 2, q2 summed from its graded step, q3 low confidence starts empty
        assert_eq!(session.obtained_marks(), 3.0);
        assert_eq!(session.questions()[1].obtained_marks(), Some(1.0));
        assert_eq!(session.answer_sheet.as_deref(), Some("/uploads/s-1/page_1.png"));
    }

    #[test]
    fn low_confidence_values_start_empty() {
        let session = document().into_session("s-1");

        let transformer = &session.questions()[1];
        assert_eq!(transformer.kind(), QuestionKind::SteppedNarrative);
        let diagram = transformer.step(&StepId("b".into())).unwrap();
        assert_eq!(diagram.obtained_marks(), None);
        assert!(transformer.needs_manual_entry());

        let resistance = &session.questions()[2];
        assert_eq!(resistance.obtained_marks(), None);
        assert!(resistance.needs_manual_entry());
    }

    #[test]
    fn stepped_type_without_steps_degrades_to_atomic() {
        let session = document().into_session("s-1");
        assert_eq!(session.questions()[2].kind(), QuestionKind::Atomic);
    }

    #[test]
    fn regions_are_clamped_or_defaulted() {
        let session = document().into_session("s-1");

        assert_eq!(session.questions()[0].region, Region { x: 5.0, y: 10.0, width: 90.0, height: 20.0 });
        assert_eq!(session.questions()[1].region, Region { x: 90.0, y: 40.0, width: 10.0, height: 20.0 });
        assert_eq!(session.questions()[2].region, Region::fallback_band(3));
        assert!(session.questions().iter().all(|q| q.region.is_within_image()));
    }

    #[test]
    fn mark_update_request_uses_snake_case_keys() {
        let event = MarkEvent {
            question_id: QuestionId("2".into()),
            step_id: Some(StepId("b".into())),
            value: 1.5,
        };
        let body = serde_json::to_value(MarkUpdateRequest::from(&event)).unwrap();
        assert_eq!(body, json!({"question_id": "2", "step_id": "b", "obtained_marks": 1.5}));
    }
}
