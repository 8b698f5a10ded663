//! Review session host.
//!
//! The four services never reference each other. [`ReviewSession`] is the
//! host that wires them to one [`StateManager`]:
//!
//! - the navigator and review dispatcher are attached to a [`KeyboardHub`]
//!   for as long as the session lives
//! - reviewer decisions become a new [`ReviewSnapshot`] for autosave
//! - autosave status transitions are forwarded into state
//! - selecting a document recomputes the confidence gate decision

pub mod store;

pub use store::{DraftStore, FileDraftStore};

use crate::keyboard::{KeyEvent, KeyboardError, KeyboardHub, ListenerGuard};
use crate::metrics::Metrics;
use crate::models::{FieldStatus, ReviewConfig, ReviewDocument, ReviewSnapshot};
use crate::services::{
    AutoSaveController, AutoSaveError, AutoSaveOptions, BoundNavigator, ConfidenceGate,
    DocumentNavigator, ReviewAction, ReviewActions, ReviewShortcutDispatcher, SaveOutcome,
};
use crate::state::{ReviewMode, StateChange, StateManager};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Shared by the key handlers and the session itself
#[derive(Clone)]
struct SessionCore {
    state: StateManager,
    autosave: Arc<AutoSaveController<ReviewSnapshot>>,
    gate: ConfidenceGate,
    metrics: Arc<Metrics>,
}

impl SessionCore {
    fn select(&self, id: &str) -> Vec<StateChange> {
        let Some(metadata) = self.state.read(|s| {
            s.documents
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.metadata)
        }) else {
            tracing::warn!("Cannot select unknown document {}", id);
            return Vec::new();
        };

        let decision = self.gate.decide(&metadata);
        if decision.requires_review {
            tracing::info!(
                "Document {} requires review ({}% confidence)",
                id,
                metadata.confidence_percent()
            );
        }
        self.metrics.record_navigation();
        self.state.select_document(id, decision)
    }

    fn apply(&self, action: ReviewAction) -> Vec<StateChange> {
        let changes = match action {
            ReviewAction::Approve => self.decide(FieldStatus::Approved),
            ReviewAction::Reject => self.decide(FieldStatus::Rejected),
            ReviewAction::Flag => self.decide(FieldStatus::Flagged),
            ReviewAction::Next => self.state.step_field(1),
            ReviewAction::Previous => self.state.step_field(-1),
            ReviewAction::Edit => self.state.request_edit().into_iter().collect(),
            ReviewAction::JumpToSource => self.state.request_source().into_iter().collect(),
            ReviewAction::Save => {
                self.autosave.request_save();
                Vec::new()
            }
        };
        tracing::debug!("Applied review action {} ({} change(s))", action, changes.len());
        changes
    }

    fn decide(&self, status: FieldStatus) -> Vec<StateChange> {
        let changes = self.state.set_focused_status(status);
        if !changes.is_empty() {
            self.autosave.update(self.state.read(|s| s.snapshot.clone()));
        }
        changes
    }
}

/// One reviewer working through one document list.
///
/// Dropping the session detaches its key listeners and stops forwarding
/// save status. Call [`shutdown`](Self::shutdown) first to flush unsaved work.
pub struct ReviewSession {
    core: SessionCore,
    hub: KeyboardHub,
    navigator: Arc<Mutex<BoundNavigator<StateManager>>>,
    dispatcher: Arc<Mutex<ReviewShortcutDispatcher>>,
    guards: Vec<ListenerGuard>,
    forwarder: JoinHandle<()>,
}

impl ReviewSession {
    /// Build a session over `documents`, restoring decisions from `saved`.
    ///
    /// The restored snapshot counts as already persisted. The first
    /// document is selected.
    ///
    /// # Errors
    /// [`AutoSaveError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(
        config: &ReviewConfig,
        hub: &KeyboardHub,
        documents: Vec<ReviewDocument>,
        saved: Option<&ReviewSnapshot>,
        store: Arc<dyn DraftStore>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, AutoSaveError> {
        let state = StateManager::new();
        state.load_documents(documents, saved);

        let options = AutoSaveOptions::from(&config.autosave).with_metrics(Arc::clone(&metrics));
        let initial = state.read(|s| s.snapshot.clone());
        let autosave = AutoSaveController::new(
            initial,
            move |snapshot: ReviewSnapshot| store.persist(snapshot),
            options,
        )?;

        let core = SessionCore {
            state: state.clone(),
            autosave: Arc::new(autosave),
            gate: ConfidenceGate::new(config.review.review_threshold),
            metrics: Arc::clone(&metrics),
        };

        let forwarder = spawn_status_forwarder(&core);

        let navigator = {
            let select_core = core.clone();
            let switcher_state = state.clone();
            let navigator = DocumentNavigator::new()
                .on_select(move |id| {
                    select_core.select(id);
                })
                .on_open_switcher(move || {
                    switcher_state.set_switcher_open(true);
                });
            Arc::new(Mutex::new(BoundNavigator::new(navigator, state.clone())))
        };

        let dispatcher = Arc::new(Mutex::new(ReviewShortcutDispatcher::new(review_actions(&core))));

        let mut guards = Vec::new();
        if config.review.document_navigation {
            guards.push(hub.attach_handler("document-navigator", Arc::clone(&navigator)));
        }
        if config.review.review_shortcuts {
            guards.push(hub.attach_handler("review-shortcuts", Arc::clone(&dispatcher)));
        }
        // Attached last so it sees whether anyone handled the key
        let key_metrics = Arc::clone(&metrics);
        guards.push(hub.attach("key-metrics", move |event: &mut KeyEvent| {
            key_metrics.record_key_dispatched();
            if !event.default_prevented() {
                key_metrics.record_key_ignored();
            }
        }));

        let session = Self {
            core,
            hub: hub.clone(),
            navigator,
            dispatcher,
            guards,
            forwarder,
        };
        session.set_mode(ReviewMode::Documents);

        if let Some(first) = session.core.state.read(|s| s.documents.first().map(|d| d.id.clone())) {
            session.select_document(&first);
        }

        tracing::info!(
            "Review session started with {} document(s), {} listener(s) attached",
            session.core.state.read(|s| s.documents.len()),
            session.guards.len()
        );
        Ok(session)
    }

    pub fn state(&self) -> &StateManager {
        &self.core.state
    }

    pub fn autosave(&self) -> &AutoSaveController<ReviewSnapshot> {
        &self.core.autosave
    }

    pub fn gate(&self) -> ConfidenceGate {
        self.core.gate
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.core.metrics
    }

    pub fn mode(&self) -> ReviewMode {
        self.core.state.read(|s| s.mode)
    }

    /// Feed one key event through the hub
    pub fn dispatch(&self, event: &mut KeyEvent) -> Result<usize, KeyboardError> {
        self.hub.dispatch(event)
    }

    /// Hand the arrow keys to the navigator (`Documents`) or the dispatcher (`Fields`).
    ///
    /// Ctrl/Cmd+K and Ctrl/Cmd+S stay live in both modes.
    pub fn set_mode(&self, mode: ReviewMode) -> Vec<StateChange> {
        let documents = mode == ReviewMode::Documents;
        self.navigator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .navigator_mut()
            .set_steps_enabled(documents);
        self.dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_field_keys_enabled(!documents);

        tracing::debug!("Review mode -> {:?}", mode);
        self.core.state.set_mode(mode)
    }

    /// Select a document by id, as the quick switcher would
    pub fn select_document(&self, id: &str) -> Vec<StateChange> {
        self.core.select(id)
    }

    pub fn close_switcher(&self) -> Vec<StateChange> {
        self.core.state.set_switcher_open(false)
    }

    /// Run a review action without a key press
    pub fn apply(&self, action: ReviewAction) -> Vec<StateChange> {
        self.core.apply(action)
    }

    /// Base prompt plus OCR guidance for the selected document.
    ///
    /// Returns `base` unchanged when nothing is selected.
    pub fn extraction_prompt(&self, base: &str) -> String {
        match self.core.state.read(|s| s.selected().map(|d| d.metadata)) {
            Some(metadata) => self.core.gate.augment_prompt(base, &metadata),
            None => base.to_string(),
        }
    }

    pub async fn save_now(&self) -> SaveOutcome {
        self.core.autosave.save_now().await
    }

    /// Flush unsaved decisions, log metrics and detach from the hub.
    ///
    /// A save still in flight is awaited first, so the last decision is
    /// persisted even when a debounced or Ctrl+S save was running.
    /// Returns `None` when there was nothing to save.
    pub async fn shutdown(self) -> Option<SaveOutcome> {
        let outcome = self.core.autosave.flush().await;
        self.core.metrics.log_summary();
        tracing::info!("Review session closed (final save: {:?})", outcome);
        outcome
    }
}

impl Drop for ReviewSession {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.guards.clear();
    }
}

fn review_actions(core: &SessionCore) -> ReviewActions {
    [
        ReviewAction::Approve,
        ReviewAction::Reject,
        ReviewAction::Flag,
        ReviewAction::Edit,
        ReviewAction::JumpToSource,
        ReviewAction::Next,
        ReviewAction::Previous,
        ReviewAction::Save,
    ]
    .into_iter()
    .fold(ReviewActions::new(), |actions, action| {
        let core = core.clone();
        actions.on(action, move || {
            core.apply(action);
        })
    })
}

fn spawn_status_forwarder(core: &SessionCore) -> JoinHandle<()> {
    let mut rx = core.autosave.subscribe();
    let state = core.state.clone();
    // Resynchronize from the controller after a lag
    let autosave = Arc::downgrade(&core.autosave);

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(save) => {
                    state.set_save_state(save);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Save status forwarder lagged by {} event(s)", skipped);
                    match autosave.upgrade() {
                        Some(autosave) => {
                            state.set_save_state(autosave.state());
                        }
                        None => break,
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Key;
    use crate::models::{ExtractionMetadata, ExtractionMethod, ReviewField, SaveStatus};
    use crate::session::store::MockDraftStore;
    use tokio::sync::Semaphore;
    use tokio::time::{Duration, sleep};

    fn document(id: &str, method: ExtractionMethod, confidence: f64) -> ReviewDocument {
        ReviewDocument {
            id: id.to_string(),
            name: id.to_string(),
            metadata: ExtractionMetadata::new(method, confidence).unwrap(),
            fields: ["total", "date"]
                .iter()
                .map(|name| ReviewField {
                    name: name.to_string(),
                    value: "1".to_string(),
                    source_page: Some(1),
                })
                .collect(),
        }
    }

    fn documents() -> Vec<ReviewDocument> {
        vec![
            document("a", ExtractionMethod::Text, 0.99),
            document("b", ExtractionMethod::Ocr, 0.5),
        ]
    }

    fn session_with(store: MockDraftStore) -> (ReviewSession, KeyboardHub) {
        let hub = KeyboardHub::new();
        let session = ReviewSession::new(
            &ReviewConfig::default(),
            &hub,
            documents(),
            None,
            Arc::new(store),
            Arc::new(Metrics::new()),
        )
        .unwrap();
        (session, hub)
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_is_autosaved() {
        let mut store = MockDraftStore::new();
        store
            .expect_persist()
            .withf(|snapshot| {
                snapshot.draft("a").and_then(|d| d.decisions.get("total"))
                    == Some(&FieldStatus::Approved)
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let (session, _hub) = session_with(store);
        session.set_mode(ReviewMode::Fields);
        session.dispatch(&mut KeyEvent::char('a')).unwrap();

        sleep(Duration::from_millis(2100)).await;
        assert_eq!(session.state().read(|s| s.save.status), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_save() {
        let gate = Arc::new(Semaphore::new(0));
        let persisted: Arc<Mutex<Vec<ReviewSnapshot>>> = Arc::new(Mutex::new(Vec::new()));

        let mut store = MockDraftStore::new();
        let (store_gate, sink) = (Arc::clone(&gate), Arc::clone(&persisted));
        store.expect_persist().times(2).returning(move |snapshot| {
            sink.lock().unwrap().push(snapshot);
            let gate = Arc::clone(&store_gate);
            Box::pin(async move {
                gate.acquire().await?.forget();
                Ok(())
            })
        });

        let (session, _hub) = session_with(store);
        session.set_mode(ReviewMode::Fields);
        session.dispatch(&mut KeyEvent::char('a')).unwrap();
        session.dispatch(&mut KeyEvent::parse("ctrl+s").unwrap()).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(session.autosave().status(), SaveStatus::Saving);

        // Decided while the Ctrl+S save is still blocked
        session.dispatch(&mut KeyEvent::parse("tab").unwrap()).unwrap();
        session.dispatch(&mut KeyEvent::char('r')).unwrap();

        let (outcome, _) = tokio::join!(session.shutdown(), async {
            sleep(Duration::from_millis(10)).await;
            gate.add_permits(2);
        });
        assert_eq!(outcome, Some(SaveOutcome::Saved));

        let persisted = persisted.lock().unwrap();
        assert_eq!(persisted.len(), 2);
        let last = persisted[1].draft("a").unwrap();
        assert_eq!(last.decisions["total"], FieldStatus::Approved);
        assert_eq!(last.decisions["date"], FieldStatus::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_recomputes_review_requirement() {
        let (session, _hub) = session_with(MockDraftStore::new());
        assert!(!session.state().read(|s| s.requires_review));

        session.dispatch(&mut KeyEvent::key(Key::ArrowRight)).unwrap();

        let state = session.state().snapshot();
        assert_eq!(state.selected_document.as_deref(), Some("b"));
        assert!(state.requires_review);
        assert!(state.justification.unwrap().contains("50%"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_routes_arrow_keys() {
        let (session, _hub) = session_with(MockDraftStore::new());
        session.set_mode(ReviewMode::Fields);

        session.dispatch(&mut KeyEvent::key(Key::ArrowRight)).unwrap();
        let state = session.state().snapshot();
        assert_eq!(state.selected_document.as_deref(), Some("a"));
        assert_eq!(state.focused_field, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_detaches_listeners() {
        let (session, hub) = session_with(MockDraftStore::new());
        assert_eq!(hub.listener_count(), 3);
        drop(session);
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extraction_prompt_for_selected_document() {
        let (session, _hub) = session_with(MockDraftStore::new());
        assert_eq!(session.extraction_prompt("Extract."), "Extract.");

        session.select_document("b");
        let prompt = session.extraction_prompt("Extract.");
        assert!(prompt.starts_with("Extract."));
        assert!(prompt.contains("0 <-> O"));
    }
}
