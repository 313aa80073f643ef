use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::grading::marks::sum_marks;
use crate::grading::models::{Marking, Question, QuestionId, Region, Session, Step, StepId};
use crate::grading::types::{Confidence, Correctness, SessionStatus, StepStatus};
use crate::schemas::session::{MarkUpdateRequest, SessionDocument};
use crate::services::review_api::ReviewBackend;

pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Recorded {
    calls: Vec<String>,
    mark_writes: Vec<MarkUpdateRequest>,
    mark_attempts: usize,
    finalize_calls: Vec<String>,
}

/// In-memory review service that records every call.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    document: Option<SessionDocument>,
    image: Option<Vec<u8>>,
    write_delay: Option<Duration>,
    failing: bool,
    recorded: Mutex<Recorded>,
}

impl RecordingBackend {
    pub(crate) fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub(crate) fn with_document(document: SessionDocument) -> Self {
        Self { document: Some(document), ..Self::default() }
    }

    pub(crate) fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }

    /// Mark writes take `delay` before they complete.
    pub(crate) fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn mark_writes(&self) -> Vec<MarkUpdateRequest> {
        self.recorded().mark_writes.clone()
    }

    pub(crate) fn mark_attempts(&self) -> usize {
        self.recorded().mark_attempts
    }

    pub(crate) fn finalize_calls(&self) -> Vec<String> {
        self.recorded().finalize_calls.clone()
    }

    pub(crate) fn call_log(&self) -> Vec<String> {
        self.recorded().calls.clone()
    }
}

#[async_trait]
impl ReviewBackend for RecordingBackend {
    async fn fetch_session(&self, session_id: &str) -> Result<SessionDocument> {
        self.recorded().calls.push(format!("fetch:{session_id}"));
        match (&self.document, self.failing) {
            (Some(document), false) => Ok(document.clone()),
            _ => Err(anyhow!("review service offline")),
        }
    }

    async fn update_mark(&self, _session_id: &str, update: &MarkUpdateRequest) -> Result<()> {
        self.recorded().mark_attempts += 1;
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut recorded = self.recorded();
        recorded.calls.push(format!("mark:{}", update.question_id));
        if self.failing {
            return Err(anyhow!("review service offline"));
        }
        recorded.mark_writes.push(update.clone());
        Ok(())
    }

    async fn finalize(&self, session_id: &str) -> Result<()> {
        let mut recorded = self.recorded();
        recorded.calls.push(format!("finalize:{session_id}"));
        if self.failing {
            return Err(anyhow!("review service offline"));
        }
        recorded.finalize_calls.push(session_id.to_string());
        Ok(())
    }

    async fn fetch_image(&self, reference: &str) -> Result<Vec<u8>> {
        self.recorded().calls.push(format!("image:{reference}"));
        match (&self.image, self.failing) {
            (Some(bytes), false) => Ok(bytes.clone()),
            _ => Err(anyhow!("image unavailable")),
        }
    }
}

pub(crate) fn atomic_question(id: &str, max: f64, obtained: Option<f64>) -> Question {
    Question {
        id: QuestionId(id.to_string()),
        text: format!("Question {id}"),
        max_marks: max,
        obtained_marks: obtained,
        ai_remark: String::new(),
        status: Correctness::from_marks(obtained, max),
        confidence: Confidence::High,
        region: Region { x: 0.0, y: 0.0, width: 100.0, height: 20.0 },
        transcript: String::new(),
        marking: Marking::Atomic,
    }
}

/// Steps are named `a`, `b`, `c`, ... in order.
pub(crate) fn stepped_question(id: &str, steps: &[(f64, Option<f64>)]) -> Question {
    let steps: Vec<Step> = steps
        .iter()
        .enumerate()
        .map(|(idx, (max, obtained))| Step {
            id: StepId(char::from(b'a' + idx as u8).to_string()),
            label: format!("Step {}", idx + 1),
            max_marks: *max,
            obtained_marks: *obtained,
            status: StepStatus::from_marks(*obtained, *max),
            note: None,
        })
        .collect();
    let max_marks = steps.iter().map(|step| step.max_marks).sum();
    let obtained = Some(sum_marks(steps.iter().map(|step| step.obtained_marks)));

    Question {
        id: QuestionId(id.to_string()),
        text: format!("Question {id}"),
        max_marks,
        obtained_marks: obtained,
        ai_remark: String::new(),
        status: Correctness::from_marks(obtained, max_marks),
        confidence: Confidence::High,
        region: Region { x: 0.0, y: 20.0, width: 100.0, height: 30.0 },
        transcript: String::new(),
        marking: Marking::SteppedNarrative(steps),
    }
}

pub(crate) fn session_with(questions: Vec<Question>) -> Session {
    let mut session = Session {
        id: "s-test".to_string(),
        student_name: "Test Student".to_string(),
        roll_no: None,
        subject: "Physics".to_string(),
        exam_title: None,
        total_marks: questions.iter().map(|question| question.max_marks).sum(),
        obtained_marks: 0.0,
        status: SessionStatus::Ready,
        questions,
        answer_sheet: None,
        finalized_at: None,
    };
    session.recompute_total();
    session
}

pub(crate) fn remote_document() -> SessionDocument {
    serde_json::from_value(serde_json::json!({
        "studentName": "Asha Verma",
        "rollNo": "10B-07",
        "subject": "Physics",
        "totalMarks": 7,
        "status": "ready",
        "answerSheetUrl": "/uploads/s-42/page_1.png",
        "questions": [
            {
                "id": 1,
                "question": "Define Ohm's Law.",
                "questionType": "ATOMIC",
                "maxMarks": 2,
                "obtainedMarks": null,
                "confidence": "low",
                "bbox": {"x": 5, "y": 5, "w": 90, "h": 20}
            },
            {
                "id": 2,
                "question": "Explain the working of a transformer.",
                "questionType": "STEPPED_NARRATIVE",
                "maxMarks": 5,
                "obtainedMarks": 2,
                "confidence": "high",
                "bbox": {"x": 5, "y": 30, "w": 90, "h": 40},
                "steps": [
                    {"id": "a", "label": "Principle", "maxMarks": 1, "obtainedMarks": 1, "aiStatus": "correct"},
                    {"id": "b", "label": "Coils", "maxMarks": 1, "obtainedMarks": 1, "aiStatus": "correct"},
                    {"id": "c", "label": "Diagram", "maxMarks": 2, "obtainedMarks": null, "aiStatus": "low_confidence"},
                    {"id": "d", "label": "Turns ratio", "maxMarks": 1, "obtainedMarks": 0, "aiStatus": "incorrect"}
                ]
            }
        ]
    }))
    .expect("remote document")
}
