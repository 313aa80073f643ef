use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::grading::models::QuestionId;

/// Where a selection came from. Both paths produce the same highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    Region,
    List,
}

impl SelectionOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSelection {
    pub question_id: QuestionId,
    generation: u64,
}

/// At most one highlighted question, shared by the region layer and the
/// question list. The highlight clears itself after a fixed delay.
pub struct SelectionCoordinator {
    state: Arc<watch::Sender<Option<ActiveSelection>>>,
    highlight: Duration,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl SelectionCoordinator {
    pub fn new(highlight: Duration) -> Self {
        let (state, _) = watch::channel(None);
        Self { state: Arc::new(state), highlight, generation: 0, timer: None }
    }

    pub fn active(&self) -> Option<QuestionId> {
        self.state.borrow().as_ref().map(|selection| selection.question_id.clone())
    }

    pub fn is_highlighted(&self, question_id: &QuestionId) -> bool {
        self.state.borrow().as_ref().is_some_and(|selection| &selection.question_id == question_id)
    }

    /// Change feed for anything that renders the highlight.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveSelection>> {
        self.state.subscribe()
    }

    /// Selects `question_id`, or clears it right away when it is already
    /// active. Returns the question left highlighted.
    pub fn select(&mut self, question_id: QuestionId, origin: SelectionOrigin) -> Option<QuestionId> {
        self.cancel_timer();

        if self.is_highlighted(&question_id) {
            self.state.send_replace(None);
            tracing::debug!(question_id = %question_id, origin = origin.as_str(), "Selection toggled off");
            return None;
        }

        self.generation += 1;
        let generation = self.generation;
        self.state.send_replace(Some(ActiveSelection { question_id: question_id.clone(), generation }));
        tracing::debug!(question_id = %question_id, origin = origin.as_str(), "Question selected");

        let state = Arc::clone(&self.state);
        let highlight = self.highlight;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(highlight).await;
            state.send_if_modified(|current| match current {
                Some(selection) if selection.generation == generation => {
                    *current = None;
                    true
                }
                _ => false,
            });
        }));

        Some(question_id)
    }

    pub fn clear(&mut self) {
        self.cancel_timer();
        self.state.send_replace(None);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for SelectionCoordinator {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGHLIGHT: Duration = Duration::from_millis(1800);

    #[tokio::test(start_paused = true)]
    async fn region_and_list_selection_are_identical() {
        let mut from_region = SelectionCoordinator::new(HIGHLIGHT);
        let mut from_list = SelectionCoordinator::new(HIGHLIGHT);

        from_region.select("q2".into(), SelectionOrigin::Region);
        from_list.select("q2".into(), SelectionOrigin::List);

        assert_eq!(from_region.active(), from_list.active());
        assert_eq!(*from_region.subscribe().borrow(), *from_list.subscribe().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn highlight_clears_after_delay() {
        let mut selection = SelectionCoordinator::new(HIGHLIGHT);
        selection.select("q1".into(), SelectionOrigin::Region);

        tokio::time::sleep(Duration::from_millis(1700)).await;
        assert!(selection.is_highlighted(&"q1".into()));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(selection.active(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reselecting_active_question_toggles_off_immediately() {
        let mut selection = SelectionCoordinator::new(HIGHLIGHT);
        selection.select("q1".into(), SelectionOrigin::List);

        assert_eq!(selection.select("q1".into(), SelectionOrigin::Region), None);
        assert_eq!(selection.active(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn new_selection_restarts_the_timer() {
        let mut selection = SelectionCoordinator::new(HIGHLIGHT);
        selection.select("q1".into(), SelectionOrigin::Region);
        tokio::time::sleep(Duration::from_millis(1000)).await;

        selection.select("q2".into(), SelectionOrigin::List);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(selection.active(), Some("q2".into()));

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(selection.active(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_the_auto_clear() {
        let mut selection = SelectionCoordinator::new(HIGHLIGHT);
        let mut changes = selection.subscribe();
        selection.select("q3".into(), SelectionOrigin::Region);
        changes.borrow_and_update();

        changes.changed().await.expect("sender alive");
        assert!(changes.borrow().is_none());
    }
}
