use std::sync::Arc;

use uuid::Uuid;

use crate::core::config::Settings;
use crate::grading::marks::{MarkError, Nudge};
use crate::grading::models::{QuestionId, Session, StepId};
use crate::grading::types::TransitionError;
use crate::services::answer_sheet::AnswerSheet;
use crate::services::persistence::{FinalizeSync, PersistenceSync};
use crate::services::review_api::ReviewBackend;
use crate::services::session_store::{MarkApplied, SessionStore};
use crate::viewer::freehand::{FreehandSurface, PointerEvent, PointerOutcome, ScreenBox};
use crate::viewer::regions::{RegionBox, RegionLayer};
use crate::viewer::selection::{SelectionCoordinator, SelectionOrigin};
use crate::viewer::transform::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Status flipped locally; `acknowledged` reports the remote write.
    Finalized { acknowledged: bool },
    /// Offline sample session; only local state changed.
    FinalizedLocally,
    AlreadyCompleted,
}

/// One open review view: the session, its page, the overlays and the
/// pending remote writes.
pub struct ReviewWorkspace {
    view_id: Uuid,
    store: SessionStore,
    persistence: PersistenceSync,
    answer_sheet: AnswerSheet,
    transform: ViewTransform,
    regions: RegionLayer,
    freehand: FreehandSurface,
    selection: SelectionCoordinator,
}

impl ReviewWorkspace {
    /// Opens the view. Never fails: an unreachable service yields the offline
    /// fixture and a placeholder page.
    pub async fn open(backend: Arc<dyn ReviewBackend>, settings: &Settings, session_id: &str) -> Self {
        let view_id = Uuid::new_v4();
        let store = SessionStore::load(backend.as_ref(), session_id).await;
        let answer_sheet =
            AnswerSheet::load(backend.as_ref(), store.session().answer_sheet.as_deref()).await;
        // the offline fixture must never be written into the real session
        let persistence = if store.is_offline() {
            PersistenceSync::local_only(session_id, settings.persistence())
        } else {
            PersistenceSync::new(backend, session_id, settings.persistence())
        };

        tracing::info!(
            view_id = %view_id,
            session_id,
            offline = store.is_offline(),
            placeholder_page = answer_sheet.is_placeholder(),
            debounce_scope = persistence.scope().as_str(),
            "Review view opened"
        );

        Self {
            view_id,
            store,
            persistence,
            answer_sheet,
            transform: ViewTransform::default(),
            regions: RegionLayer::default(),
            freehand: FreehandSurface::from_settings(settings.viewer()),
            selection: SelectionCoordinator::new(settings.viewer().highlight_delay()),
        }
    }

    pub fn view_id(&self) -> Uuid {
        self.view_id
    }

    pub fn session(&self) -> &Session {
        self.store.session()
    }

    pub fn snapshot(&self) -> Arc<Session> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_offline(&self) -> bool {
        self.store.is_offline()
    }

    pub fn answer_sheet(&self) -> &AnswerSheet {
        &self.answer_sheet
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.transform
    }

    pub fn regions_mut(&mut self) -> &mut RegionLayer {
        &mut self.regions
    }

    pub fn freehand(&self) -> &FreehandSurface {
        &self.freehand
    }

    pub fn freehand_mut(&mut self) -> &mut FreehandSurface {
        &mut self.freehand
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn pending_writes(&self) -> usize {
        self.persistence.pending_count()
    }

    /// Direct entry into a mark field. Local state changes first, the remote
    /// write follows after the quiet period.
    pub fn set_mark(
        &mut self,
        question_id: &QuestionId,
        step_id: Option<&StepId>,
        value: f64,
    ) -> Result<Arc<Session>, MarkError> {
        let applied = self.store.apply_mark_update(question_id, step_id, value)?;
        Ok(self.persist(applied))
    }

    pub fn nudge(
        &mut self,
        question_id: &QuestionId,
        step_id: Option<&StepId>,
        direction: Nudge,
    ) -> Result<Arc<Session>, MarkError> {
        let applied = self.store.nudge(question_id, step_id, direction)?;
        Ok(self.persist(applied))
    }

    fn persist(&mut self, applied: MarkApplied) -> Arc<Session> {
        self.persistence.schedule(applied.event);
        applied.snapshot
    }

    pub fn region_boxes(&self) -> Vec<RegionBox> {
        self.regions.boxes(self.store.session(), self.selection.active().as_ref())
    }

    /// Click on the page at percent coordinates. While drawing, the ink layer
    /// takes the click and no region is selected.
    pub fn click_page(&mut self, x: f64, y: f64) -> Option<QuestionId> {
        if self.freehand.is_drawing() && self.freehand.is_visible() {
            return None;
        }
        let question_id = self.regions.hit_test(self.store.session(), x, y)?;
        self.selection.select(question_id, SelectionOrigin::Region)
    }

    pub fn select_from_list(&mut self, question_id: &QuestionId) -> Result<Option<QuestionId>, MarkError> {
        if self.store.session().question(question_id).is_none() {
            return Err(MarkError::UnknownQuestion(question_id.clone()));
        }
        Ok(self.selection.select(question_id.clone(), SelectionOrigin::List))
    }

    pub fn pointer(&mut self, event: PointerEvent, screen: &ScreenBox) -> PointerOutcome {
        self.freehand.handle_pointer(event, screen, self.transform.rotation())
    }

    /// Flips the session to completed locally, then flushes waiting mark
    /// writes and sends the finalize call.
    pub async fn finalize(&mut self) -> Result<FinalizeOutcome, TransitionError> {
        if !self.store.mark_completed()? {
            return Ok(FinalizeOutcome::AlreadyCompleted);
        }
        let outcome = match self.persistence.finalize().await {
            FinalizeSync::Acknowledged => FinalizeOutcome::Finalized { acknowledged: true },
            FinalizeSync::Failed => FinalizeOutcome::Finalized { acknowledged: false },
            FinalizeSync::LocalOnly => FinalizeOutcome::FinalizedLocally,
        };
        tracing::info!(
            view_id = %self.view_id,
            session_id = %self.store.session().id,
            outcome = ?outcome,
            "Session finalised"
        );
        Ok(outcome)
    }

    /// Tears the view down. Writes still inside their quiet period are dropped.
    pub fn close(mut self) {
        let dropped = self.persistence.pending_count();
        self.persistence.cancel_pending();
        self.selection.clear();
        tracing::info!(view_id = %self.view_id, dropped_writes = dropped, "Review view closed");
    }
}
