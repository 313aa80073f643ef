use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::config::{DebounceScope, PersistenceSettings};
use crate::core::metrics::{record_remote_write, DEBOUNCE_COALESCED};
use crate::grading::marks::{MarkEvent, MarkTarget};
use crate::schemas::session::MarkUpdateRequest;
use crate::services::review_api::ReviewBackend;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DebounceKey {
    Session,
    Target(MarkTarget),
}

struct PendingWrite {
    event: MarkEvent,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeSync {
    Acknowledged,
    Failed,
    /// Nothing was sent; the view is not backed by the remote session.
    LocalOnly,
}

/// Debounced, fire-and-forget remote writes for one session. Local state is
/// updated before anything reaches this type; failures here are only logged.
pub struct PersistenceSync {
    backend: Option<Arc<dyn ReviewBackend>>,
    session_id: String,
    quiet_period: Duration,
    scope: DebounceScope,
    pending: HashMap<DebounceKey, PendingWrite>,
    in_flight: Vec<JoinHandle<()>>,
}

impl PersistenceSync {
    pub fn new(
        backend: Arc<dyn ReviewBackend>,
        session_id: impl Into<String>,
        settings: &PersistenceSettings,
    ) -> Self {
        Self::build(Some(backend), session_id.into(), settings)
    }

    /// Sync that never talks to the service, used while the offline fixture is shown.
    pub fn local_only(session_id: impl Into<String>, settings: &PersistenceSettings) -> Self {
        Self::build(None, session_id.into(), settings)
    }

    fn build(
        backend: Option<Arc<dyn ReviewBackend>>,
        session_id: String,
        settings: &PersistenceSettings,
    ) -> Self {
        Self {
            backend,
            session_id,
            quiet_period: settings.quiet_period(),
            scope: settings.debounce_scope,
            pending: HashMap::new(),
            in_flight: Vec::new(),
        }
    }

    pub fn scope(&self) -> DebounceScope {
        self.scope
    }

    pub fn is_local_only(&self) -> bool {
        self.backend.is_none()
    }

    /// Number of writes still waiting for their quiet period.
    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|write| !write.fired.load(Ordering::SeqCst)).count()
    }

    fn key_for(&self, event: &MarkEvent) -> DebounceKey {
        match self.scope {
            DebounceScope::Session => DebounceKey::Session,
            DebounceScope::Target => DebounceKey::Target(event.target()),
        }
    }

    /// Schedules a write for `event`, replacing any pending write under the same key.
    pub fn schedule(&mut self, event: MarkEvent) {
        let Some(backend) = self.backend.clone() else {
            tracing::trace!(
                session_id = %self.session_id,
                question_id = %event.question_id,
                "Offline view; mark kept locally"
            );
            return;
        };

        self.pending.retain(|_, write| !write.handle.is_finished());
        self.in_flight.retain(|handle| !handle.is_finished());

        let key = self.key_for(&event);
        if let Some(previous) = self.pending.remove(&key) {
            if previous.fired.load(Ordering::SeqCst) {
                self.in_flight.push(previous.handle);
            } else {
                previous.handle.abort();
                metrics::counter!(DEBOUNCE_COALESCED).increment(1);
                tracing::trace!(
                    session_id = %self.session_id,
                    question_id = %previous.event.question_id,
                    "Pending mark write superseded"
                );
            }
        }

        let fired = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(delayed_write(
            backend,
            self.session_id.clone(),
            event.clone(),
            self.quiet_period,
            Arc::clone(&fired),
        ));
        self.pending.insert(key, PendingWrite { event, fired, handle });
    }

    /// Waits for writes already on the wire, then sends every write still
    /// waiting out its quiet period.
    pub async fn flush(&mut self) {
        let mut waiting = Vec::new();
        for (_, write) in self.pending.drain() {
            if write.fired.load(Ordering::SeqCst) {
                self.in_flight.push(write.handle);
            } else {
                write.handle.abort();
                waiting.push(write.event);
            }
        }

        for handle in self.in_flight.drain(..) {
            if let Err(err) = handle.await {
                tracing::warn!(session_id = %self.session_id, error = %err, "Mark write task failed");
            }
        }

        let Some(backend) = self.backend.as_deref() else {
            return;
        };
        for event in waiting {
            send_mark(backend, &self.session_id, &event).await;
        }
    }

    /// Drops waiting writes without sending them; writes already on the wire finish.
    pub fn cancel_pending(&mut self) {
        let mut cancelled = 0usize;
        for (_, write) in self.pending.drain() {
            if !write.fired.load(Ordering::SeqCst) {
                write.handle.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::debug!(session_id = %self.session_id, cancelled, "Pending mark writes cancelled");
        }
    }

    /// Immediate finalize write, sent after every earlier mark write has
    /// completed. Failure is logged and otherwise ignored.
    pub async fn finalize(&mut self) -> FinalizeSync {
        self.flush().await;

        let Some(backend) = self.backend.as_deref() else {
            tracing::info!(session_id = %self.session_id, "Offline view; finalise kept locally");
            return FinalizeSync::LocalOnly;
        };
        match backend.finalize(&self.session_id).await {
            Ok(()) => {
                record_remote_write("finalize", true);
                tracing::info!(session_id = %self.session_id, "Session finalised remotely");
                FinalizeSync::Acknowledged
            }
            Err(err) => {
                record_remote_write("finalize", false);
                tracing::warn!(session_id = %self.session_id, error = %err, "Finalise write dropped");
                FinalizeSync::Failed
            }
        }
    }
}

impl Drop for PersistenceSync {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

async fn delayed_write(
    backend: Arc<dyn ReviewBackend>,
    session_id: String,
    event: MarkEvent,
    quiet_period: Duration,
    fired: Arc<AtomicBool>,
) {
    tokio::time::sleep(quiet_period).await;
    fired.store(true, Ordering::SeqCst);
    send_mark(backend.as_ref(), &session_id, &event).await;
}

async fn send_mark(backend: &dyn ReviewBackend, session_id: &str, event: &MarkEvent) {
    let request = MarkUpdateRequest::from(event);
    match backend.update_mark(session_id, &request).await {
        Ok(()) => {
            record_remote_write("mark", true);
            tracing::debug!(
                session_id,
                question_id = %event.question_id,
                value = event.value,
                "Mark persisted"
            );
        }
        Err(err) => {
            record_remote_write("mark", false);
            tracing::warn!(
                session_id,
                question_id = %event.question_id,
                error = %err,
                "Mark write dropped"
            );
        }
    }
}
