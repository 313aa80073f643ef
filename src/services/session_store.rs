use std::sync::Arc;

use crate::core::metrics::{MARK_EDITS, SESSION_LOADS};
use crate::grading::fixture::fixture_session;
use crate::grading::marks::{nudged, MarkError, MarkEvent, Nudge};
use crate::grading::models::{QuestionId, Session, StepId};
use crate::grading::types::{SessionStatus, TransitionError};
use crate::services::review_api::ReviewBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    Remote,
    /// The remote fetch failed and the built-in fixture is shown instead.
    Fixture { reason: String },
}

#[derive(Debug, Clone)]
pub struct MarkApplied {
    pub snapshot: Arc<Session>,
    pub event: MarkEvent,
}

/// Sole owner of the session for the lifetime of a review view. Every
/// mutation produces a fresh snapshot; snapshots already handed out stay
/// untouched.
#[derive(Debug)]
pub struct SessionStore {
    session: Arc<Session>,
    source: SessionSource,
}

impl SessionStore {
    pub async fn load(backend: &dyn ReviewBackend, session_id: &str) -> Self {
        match backend.fetch_session(session_id).await {
            Ok(document) => {
                metrics::counter!(SESSION_LOADS, "source" => "remote").increment(1);
                let session = document.into_session(session_id);
                tracing::info!(
                    session_id,
                    questions = session.questions().len(),
                    status = session.status().as_str(),
                    "Session loaded"
                );
                Self { session: Arc::new(session), source: SessionSource::Remote }
            }
            Err(err) => {
                metrics::counter!(SESSION_LOADS, "source" => "fixture").increment(1);
                tracing::warn!(session_id, error = %err, "Session fetch failed; showing offline fixture");
                Self {
                    session: Arc::new(fixture_session(session_id)),
                    source: SessionSource::Fixture { reason: format!("{err:#}") },
                }
            }
        }
    }

    pub fn from_session(session: Session) -> Self {
        Self { session: Arc::new(session), source: SessionSource::Remote }
    }

    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn source(&self) -> &SessionSource {
        &self.source
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.source, SessionSource::Fixture { .. })
    }

    pub fn apply_mark_update(
        &mut self,
        question_id: &QuestionId,
        step_id: Option<&StepId>,
        value: f64,
    ) -> Result<MarkApplied, MarkError> {
        // rejected edits must not clone the session
        self.session
            .question(question_id)
            .ok_or_else(|| MarkError::UnknownQuestion(question_id.clone()))?
            .max_for(step_id)?;

        let session = Arc::make_mut(&mut self.session);
        let event = session.apply_mark(question_id, step_id, value)?;

        let mode = if step_id.is_some() { "stepped" } else { "atomic" };
        metrics::counter!(MARK_EDITS, "mode" => mode).increment(1);
        tracing::debug!(
            session_id = %session.id,
            question_id = %question_id,
            step_id = step_id.map(|id| id.0.as_str()),
            value = event.value,
            session_total = session.obtained_marks(),
            "Mark updated"
        );

        Ok(MarkApplied { snapshot: self.snapshot(), event })
    }

    /// One press of the +/- control.
    pub fn nudge(
        &mut self,
        question_id: &QuestionId,
        step_id: Option<&StepId>,
        direction: Nudge,
    ) -> Result<MarkApplied, MarkError> {
        let question = self
            .session
            .question(question_id)
            .ok_or_else(|| MarkError::UnknownQuestion(question_id.clone()))?;
        if step_id.is_none() && question.steps().is_some() {
            return Err(MarkError::DerivedTotal(question_id.clone()));
        }
        let current = question.mark_for(step_id)?;
        let max = question.max_for(step_id)?;

        self.apply_mark_update(question_id, step_id, nudged(current, max, direction))
    }

    /// Optimistically marks the session completed. Returns `false` when it already was.
    pub fn mark_completed(&mut self) -> Result<bool, TransitionError> {
        let current = self.session.status();
        if current == SessionStatus::Completed {
            return Ok(false);
        }
        let next = current.transition(SessionStatus::Completed)?;

        let session = Arc::make_mut(&mut self.session);
        session.status = next;
        session.finalized_at = Some(crate::core::time::now_utc());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::types::Confidence;
    use crate::test_support::{atomic_question, session_with, stepped_question, RecordingBackend};

    #[tokio::test]
    async fn load_uses_remote_document() {
        let backend = RecordingBackend::with_document(crate::test_support::remote_document());

        let store = SessionStore::load(&backend, "s-42").await;

        assert!(!store.is_offline());
        assert_eq!(store.session().id, "s-42");
        assert_eq!(store.session().student_name, "Asha Verma");
    }

    #[tokio::test]
    async fn failed_load_falls_back_to_fixture() {
        let backend = RecordingBackend::failing();

        let store = SessionStore::load(&backend, "s-42").await;

        assert!(store.is_offline());
        assert_eq!(store.session().id, "offline-s-42");
        assert!(matches!(store.source(), SessionSource::Fixture { reason } if reason.contains("offline")));
        assert!(!store.session().questions().is_empty());
    }

    #[test]
    fn snapshots_are_not_mutated_by_later_edits() {
        let mut store = SessionStore::from_session(session_with(vec![atomic_question("q1", 2.0, Some(1.0))]));
        let before = store.snapshot();

        let applied = store.apply_mark_update(&"q1".into(), None, 2.0).expect("edit");

        assert_eq!(before.obtained_marks(), 1.0);
        assert_eq!(applied.snapshot.obtained_marks(), 2.0);
        assert_eq!(store.session().obtained_marks(), 2.0);
    }

    #[test]
    fn nudges_walk_in_half_marks_and_stop_at_bounds() {
        let mut question = atomic_question("q1", 1.0, None);
        question.confidence = Confidence::Low;
        let mut store = SessionStore::from_session(session_with(vec![question]));
        let q1: QuestionId = "q1".into();

        assert_eq!(store.nudge(&q1, None, Nudge::Up).unwrap().event.value, 0.5);
        assert_eq!(store.nudge(&q1, None, Nudge::Up).unwrap().event.value, 1.0);
        assert_eq!(store.nudge(&q1, None, Nudge::Up).unwrap().event.value, 1.0);
        assert_eq!(store.nudge(&q1, None, Nudge::Down).unwrap().event.value, 0.5);
    }

    #[test]
    fn nudging_a_stepped_total_is_rejected() {
        let mut store =
            SessionStore::from_session(session_with(vec![stepped_question("q1", &[(1.0, None)])]));
        let err = store.nudge(&"q1".into(), None, Nudge::Up).unwrap_err();
        assert_eq!(err, MarkError::DerivedTotal("q1".into()));

        let applied = store.nudge(&"q1".into(), Some(&"a".into()), Nudge::Up).expect("step nudge");
        assert_eq!(applied.snapshot.obtained_marks(), 0.5);
    }

    #[test]
    fn completion_is_monotonic() {
        let mut store = SessionStore::from_session(session_with(vec![]));

        assert_eq!(store.mark_completed(), Ok(true));
        assert_eq!(store.session().status(), SessionStatus::Completed);
        assert!(store.session().finalized_at().is_some());
        assert_eq!(store.mark_completed(), Ok(false));
    }

    #[test]
    fn sessions_still_grading_cannot_complete() {
        let mut session = session_with(vec![atomic_question("q1", 2.0, None)]);
        session.status = SessionStatus::Processing;
        let mut store = SessionStore::from_session(session);

        let err = store.mark_completed().unwrap_err();

        assert_eq!(err.from, SessionStatus::Processing);
        assert_eq!(store.session().status(), SessionStatus::Processing);
        assert!(store.session().finalized_at().is_none());
    }

    #[test]
    fn errored_sessions_cannot_complete() {
        let mut session = session_with(vec![]);
        session.status = SessionStatus::Error;
        let mut store = SessionStore::from_session(session);

        assert!(store.mark_completed().is_err());
        assert_eq!(store.session().status(), SessionStatus::Error);
    }
}
