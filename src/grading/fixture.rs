use crate::grading::marks::sum_marks;
use crate::grading::models::{Marking, Question, QuestionId, Region, Session, Step, StepId};
use crate::grading::types::{Confidence, Correctness, SessionStatus, StepStatus};

pub const FIXTURE_SESSION_PREFIX: &str = "offline-";

fn step(id: &str, label: &str, max: f64, obtained: Option<f64>, status: StepStatus) -> Step {
    Step {
        id: StepId(id.to_string()),
        label: label.to_string(),
        max_marks: max,
        obtained_marks: obtained,
        status,
        note: None,
    }
}

/// Sample session shown when the remote service cannot be reached.
pub fn fixture_session(requested_id: &str) -> Session {
    let transformer_steps = vec![
        step("a", "States mutual induction principle", 1.0, Some(1.0), StepStatus::Correct),
        step("b", "Describes primary and secondary coils", 1.0, Some(1.0), StepStatus::Correct),
        step("c", "Labelled diagram", 2.0, None, StepStatus::LowConfidence),
        step("d", "Turns ratio relation", 1.0, Some(0.0), StepStatus::Incorrect),
    ];
    let resistance_steps = vec![
        step("a", "Series combination formula", 1.0, Some(0.0), StepStatus::Incorrect),
        step("b", "Substitution", 1.0, Some(0.0), StepStatus::Incorrect),
        step("c", "Final answer with unit", 1.0, Some(0.0), StepStatus::Incorrect),
    ];

    let questions = vec![
        Question {
            id: QuestionId("1".into()),
            text: "Define Ohm's Law.".into(),
            max_marks: 2.0,
            obtained_marks: Some(2.0),
            ai_remark: "Correct definition provided.".into(),
            status: Correctness::Correct,
            confidence: Confidence::High,
            region: Region { x: 6.0, y: 12.0, width: 88.0, height: 16.0 },
            transcript: "Current through a conductor is directly proportional to the potential \
                         difference across it, provided temperature stays constant."
                .into(),
            marking: Marking::Atomic,
        },
        Question {
            id: QuestionId("2".into()),
            text: "Explain the working of a transformer.".into(),
            max_marks: 5.0,
            obtained_marks: Some(sum_marks(transformer_steps.iter().map(|s| s.obtained_marks))),
            ai_remark: "Diagram misses label for secondary coil. Explanation is good.".into(),
            status: Correctness::Partial,
            confidence: Confidence::High,
            region: Region { x: 6.0, y: 30.0, width: 88.0, height: 34.0 },
            transcript: "A transformer changes the voltage of alternating current. It works on \
                         the principle of mutual induction."
                .into(),
            marking: Marking::SteppedNarrative(transformer_steps),
        },
        Question {
            id: QuestionId("3".into()),
            text: "Calculate the equivalent resistance.".into(),
            max_marks: 3.0,
            obtained_marks: Some(0.0),
            ai_remark: "Formula applied incorrectly.".into(),
            status: Correctness::Incorrect,
            confidence: Confidence::High,
            region: Region { x: 6.0, y: 66.0, width: 88.0, height: 16.0 },
            transcript: "R = V * I".into(),
            marking: Marking::SteppedNumeric(resistance_steps),
        },
        Question {
            id: QuestionId("4".into()),
            text: "State the SI unit of resistivity.".into(),
            max_marks: 2.0,
            obtained_marks: None,
            ai_remark: "Handwriting unclear; please verify manually.".into(),
            status: Correctness::Partial,
            confidence: Confidence::Low,
            region: Region { x: 6.0, y: 84.0, width: 88.0, height: 12.0 },
            transcript: String::new(),
            marking: Marking::Atomic,
        },
    ];

    let total_marks = questions.iter().map(|question| question.max_marks).sum();
    let mut session = Session {
        id: format!("{FIXTURE_SESSION_PREFIX}{requested_id}"),
        student_name: "Rahul Sharma".into(),
        roll_no: Some("12C-42".into()),
        subject: "Physics".into(),
        exam_title: Some("Physics Mid-Term Examination".into()),
        total_marks,
        obtained_marks: 0.0,
        status: SessionStatus::Ready,
        questions,
        answer_sheet: None,
        finalized_at: None,
    };
    session.recompute_total();
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_totals_are_consistent() {
        let session = fixture_session("abc");

        assert_eq!(session.id, "offline-abc");
        assert_eq!(session.total_marks, 12.0);
        assert_eq!(session.obtained_marks(), 2.0 + 2.0 + 0.0);
        assert!(session.questions().iter().all(|q| q.region.is_within_image()));
        assert_eq!(session.summary().awaiting_entry, 2);
    }
}
