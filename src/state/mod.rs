// State management module
//
// This module provides the StateManager which wraps ReviewState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the host UI.

use crate::models::{
    DocumentRef, FieldStatus, ReviewDocument, ReviewField, ReviewSnapshot, SaveState, SaveStatus,
};
use crate::services::{DocumentSource, ReviewDecision};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Which keyboard surface owns the arrow keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewMode {
    /// Arrows and digits move between documents
    #[default]
    Documents,
    /// Arrows, Tab and letter keys act on fields of the selected document
    Fields,
}

/// Change events emitted when state is modified
///
/// These events are emitted to notify the host (rendering layer) about state
/// changes without requiring it to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A new document list was loaded
    DocumentsLoaded { count: usize },

    /// The selected document changed
    DocumentSelected { id: String, index: usize },

    /// Quick switcher shown or hidden
    SwitcherToggled { open: bool },

    /// Field focus moved within the selected document
    FieldFocused { index: usize, name: String },

    /// A reviewer decision was recorded
    FieldStatusChanged {
        document_id: String,
        field: String,
        status: FieldStatus,
    },

    /// The reviewer asked to edit the focused field
    EditRequested { document_id: String, field: String },

    /// The reviewer asked to see where the focused field came from
    SourceRequested {
        document_id: String,
        field: String,
        page: Option<u32>,
    },

    /// Autosave status changed
    SaveStatusChanged {
        status: SaveStatus,
        error: Option<String>,
    },

    /// Review requirement of the selected document changed
    ReviewRequirementChanged {
        requires_review: bool,
        justification: Option<String>,
    },

    /// Keyboard mode switched
    ModeChanged { mode: ReviewMode },

    /// State has been reset
    StateReset,
}

/// Single source of truth for a review session
#[derive(Clone, Debug, Default)]
pub struct ReviewState {
    pub documents: Vec<ReviewDocument>,
    pub selected_document: Option<String>,
    pub focused_field: Option<usize>,
    /// Reviewer decisions for every document; this is what autosave persists
    pub snapshot: ReviewSnapshot,
    pub save: SaveState,
    pub switcher_open: bool,
    pub mode: ReviewMode,
    pub requires_review: bool,
    pub justification: Option<String>,
}

impl ReviewState {
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected_document.as_deref()?;
        self.documents.iter().position(|d| d.id == id)
    }

    pub fn selected(&self) -> Option<&ReviewDocument> {
        self.selected_index().map(|i| &self.documents[i])
    }

    pub fn focused(&self) -> Option<(&ReviewDocument, &ReviewField)> {
        let document = self.selected()?;
        let field = document.fields.get(self.focused_field?)?;
        Some((document, field))
    }

    pub fn document_refs(&self) -> Vec<DocumentRef> {
        self.documents.iter().map(ReviewDocument::to_ref).collect()
    }
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`ReviewState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<ReviewState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with an empty session and a 100-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ReviewState::default())),
            state_tx,
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, ReviewState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, ReviewState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Clone of the entire state
    pub fn snapshot(&self) -> ReviewState {
        self.read_lock().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let pending = state_manager.read(|state| state.snapshot.pending_count());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ReviewState) -> R,
    {
        let state = self.read_lock();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs, and broadcasts one
    /// event per detected change. Returns the emitted events.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ReviewState),
    {
        let mut state = self.write_lock();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Broadcast an event that is not derived from a state diff
    pub fn emit(&self, change: StateChange) -> StateChange {
        let _ = self.state_tx.send(change.clone());
        change
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &ReviewState, new: &ReviewState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.documents != new.documents {
            changes.push(StateChange::DocumentsLoaded {
                count: new.documents.len(),
            });
        }

        if old.selected_document != new.selected_document {
            if let (Some(id), Some(index)) = (&new.selected_document, new.selected_index()) {
                changes.push(StateChange::DocumentSelected {
                    id: id.clone(),
                    index,
                });
            }
        }

        if old.switcher_open != new.switcher_open {
            changes.push(StateChange::SwitcherToggled {
                open: new.switcher_open,
            });
        }

        if old.focused_field != new.focused_field || old.selected_document != new.selected_document
        {
            if let (Some(index), Some((_, field))) = (new.focused_field, new.focused()) {
                changes.push(StateChange::FieldFocused {
                    index,
                    name: field.name.clone(),
                });
            }
        }

        // Field decisions, in document then field order
        for (doc_id, draft) in &new.snapshot.drafts {
            let old_draft = old.snapshot.drafts.get(doc_id);
            for (field, status) in &draft.decisions {
                let old_status = old_draft.and_then(|d| d.decisions.get(field));
                if old_status.is_some_and(|s| s != status) {
                    changes.push(StateChange::FieldStatusChanged {
                        document_id: doc_id.clone(),
                        field: field.clone(),
                        status: *status,
                    });
                }
            }
        }

        if old.save.status != new.save.status || old.save.error != new.save.error {
            changes.push(StateChange::SaveStatusChanged {
                status: new.save.status,
                error: new.save.error.clone(),
            });
        }

        if old.requires_review != new.requires_review || old.justification != new.justification {
            changes.push(StateChange::ReviewRequirementChanged {
                requires_review: new.requires_review,
                justification: new.justification.clone(),
            });
        }

        if old.mode != new.mode {
            changes.push(StateChange::ModeChanged { mode: new.mode });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Replace the document list, restoring any persisted decisions
    pub fn load_documents(
        &self,
        documents: Vec<ReviewDocument>,
        saved: Option<&ReviewSnapshot>,
    ) -> Vec<StateChange> {
        self.update(|state| {
            let mut snapshot = ReviewSnapshot::for_documents(&documents);
            if let Some(saved) = saved {
                snapshot.restore_from(saved);
            }
            state.snapshot = snapshot;
            state.documents = documents;

            if state.selected_index().is_none() {
                state.selected_document = None;
                state.focused_field = None;
            }
        })
    }

    /// Select a document and record its review decision
    ///
    /// Unknown ids are ignored.
    pub fn select_document(&self, id: &str, decision: ReviewDecision) -> Vec<StateChange> {
        self.update(|state| {
            let Some(document) = state.documents.iter().find(|d| d.id == id) else {
                tracing::warn!("Ignoring selection of unknown document {}", id);
                return;
            };
            let has_fields = !document.fields.is_empty();

            if state.selected_document.as_deref() != Some(id) {
                state.selected_document = Some(id.to_string());
                state.focused_field = has_fields.then_some(0);
            }
            state.switcher_open = false;
            state.requires_review = decision.requires_review;
            state.justification = decision.justification;
        })
    }

    pub fn set_switcher_open(&self, open: bool) -> Vec<StateChange> {
        self.update(|state| state.switcher_open = open)
    }

    /// Move field focus by `step` with wraparound. No-op without fields.
    pub fn step_field(&self, step: isize) -> Vec<StateChange> {
        self.update(|state| {
            let Some(count) = state.selected().map(|d| d.fields.len()) else {
                return;
            };
            if count == 0 {
                return;
            }
            let current = state.focused_field.unwrap_or(0) as isize;
            let next = (current + step).rem_euclid(count as isize) as usize;
            state.focused_field = Some(next);
        })
    }

    /// Record a decision on the focused field
    pub fn set_focused_status(&self, status: FieldStatus) -> Vec<StateChange> {
        self.update(|state| {
            let Some((doc_id, field)) = state
                .focused()
                .map(|(d, f)| (d.id.clone(), f.name.clone()))
            else {
                return;
            };
            state.snapshot.set_status(&doc_id, &field, status);
        })
    }

    pub fn set_save_state(&self, save: SaveState) -> Vec<StateChange> {
        self.update(|state| state.save = save)
    }

    pub fn set_mode(&self, mode: ReviewMode) -> Vec<StateChange> {
        self.update(|state| state.mode = mode)
    }

    /// Emit an edit request for the focused field, if any
    pub fn request_edit(&self) -> Option<StateChange> {
        let (document_id, field) =
            self.read(|s| s.focused().map(|(d, f)| (d.id.clone(), f.name.clone())))?;
        Some(self.emit(StateChange::EditRequested { document_id, field }))
    }

    /// Emit a jump-to-source request for the focused field, if any
    pub fn request_source(&self) -> Option<StateChange> {
        let (document_id, field, page) = self.read(|s| {
            s.focused()
                .map(|(d, f)| (d.id.clone(), f.name.clone(), f.source_page))
        })?;
        Some(self.emit(StateChange::SourceRequested {
            document_id,
            field,
            page,
        }))
    }

    /// Clear the session
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| *state = ReviewState::default());
        changes.push(self.emit(StateChange::StateReset));
        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

impl DocumentSource for StateManager {
    fn documents(&self) -> Vec<DocumentRef> {
        self.read(ReviewState::document_refs)
    }

    fn selected_id(&self) -> Option<String> {
        self.read(|s| s.selected_document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMetadata, ExtractionMethod};

    fn document(id: &str, fields: &[&str]) -> ReviewDocument {
        ReviewDocument {
            id: id.to_string(),
            name: id.to_uppercase(),
            metadata: ExtractionMetadata::new(ExtractionMethod::Text, 1.0).unwrap(),
            fields: fields
                .iter()
                .map(|name| ReviewField {
                    name: name.to_string(),
                    value: String::new(),
                    source_page: Some(2),
                })
                .collect(),
        }
    }

    fn no_review() -> ReviewDecision {
        ReviewDecision {
            requires_review: false,
            justification: None,
        }
    }

    fn loaded_manager() -> StateManager {
        let manager = StateManager::new();
        manager.load_documents(
            vec![document("a", &["total", "date", "vendor"]), document("b", &[])],
            None,
        );
        manager
    }

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(state.documents.is_empty());
        assert!(state.selected_document.is_none());
        assert_eq!(state.save.status, SaveStatus::Idle);
        assert_eq!(state.mode, ReviewMode::Documents);
    }

    #[test]
    fn test_load_documents() {
        let manager = StateManager::new();
        let changes = manager.load_documents(vec![document("a", &["total"])], None);

        assert_eq!(changes, vec![StateChange::DocumentsLoaded { count: 1 }]);
        assert_eq!(manager.read(|s| s.snapshot.pending_count()), 1);
    }

    #[test]
    fn test_select_document_focuses_first_field() {
        let manager = loaded_manager();
        let changes = manager.select_document("a", no_review());

        assert_eq!(
            changes[0],
            StateChange::DocumentSelected {
                id: "a".to_string(),
                index: 0
            }
        );
        assert!(changes.contains(&StateChange::FieldFocused {
            index: 0,
            name: "total".to_string()
        }));

        let changes = manager.select_document("b", no_review());
        assert_eq!(changes.len(), 1);
        assert_eq!(manager.read(|s| s.focused_field), None);
    }

    #[test]
    fn test_select_unknown_document_is_ignored() {
        let manager = loaded_manager();
        assert!(manager.select_document("zzz", no_review()).is_empty());
    }

    #[test]
    fn test_review_requirement_change() {
        let manager = loaded_manager();
        let changes = manager.select_document(
            "a",
            ReviewDecision {
                requires_review: true,
                justification: Some("low confidence".to_string()),
            },
        );
        assert!(changes.contains(&StateChange::ReviewRequirementChanged {
            requires_review: true,
            justification: Some("low confidence".to_string()),
        }));
    }

    #[test]
    fn test_step_field_wraps() {
        let manager = loaded_manager();
        manager.select_document("a", no_review());

        manager.step_field(-1);
        assert_eq!(manager.read(|s| s.focused_field), Some(2));
        manager.step_field(1);
        assert_eq!(manager.read(|s| s.focused_field), Some(0));
    }

    #[test]
    fn test_set_focused_status() {
        let manager = loaded_manager();
        manager.select_document("a", no_review());
        manager.step_field(1);

        let changes = manager.set_focused_status(FieldStatus::Rejected);
        assert_eq!(
            changes,
            vec![StateChange::FieldStatusChanged {
                document_id: "a".to_string(),
                field: "date".to_string(),
                status: FieldStatus::Rejected,
            }]
        );

        // Same decision twice is not a change
        assert!(manager.set_focused_status(FieldStatus::Rejected).is_empty());
    }

    #[test]
    fn test_requests_need_focus() {
        let manager = loaded_manager();
        assert!(manager.request_edit().is_none());

        manager.select_document("a", no_review());
        assert_eq!(
            manager.request_source(),
            Some(StateChange::SourceRequested {
                document_id: "a".to_string(),
                field: "total".to_string(),
                page: Some(2),
            })
        );
    }

    #[test]
    fn test_save_status_change() {
        let manager = StateManager::new();
        let changes = manager.set_save_state(SaveState {
            status: SaveStatus::Error,
            last_saved: None,
            error: Some("offline".to_string()),
        });
        assert_eq!(
            changes,
            vec![StateChange::SaveStatusChanged {
                status: SaveStatus::Error,
                error: Some("offline".to_string()),
            }]
        );
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.set_mode(ReviewMode::Fields);

        let event = rx.try_recv();
        assert_eq!(
            event.unwrap(),
            StateChange::ModeChanged {
                mode: ReviewMode::Fields
            }
        );
    }

    #[test]
    fn test_reset() {
        let manager = loaded_manager();
        let changes = manager.reset();
        assert!(changes.contains(&StateChange::StateReset));
        assert!(manager.read(|s| s.documents.is_empty()));
    }

    #[test]
    fn test_document_source() {
        let manager = loaded_manager();
        manager.select_document("b", no_review());
        assert_eq!(manager.documents(), vec![DocumentRef::new("a"), DocumentRef::new("b")]);
        assert_eq!(manager.selected_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_clone_state_manager() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.set_switcher_open(true);
        assert!(manager2.read(|s| s.switcher_open));
    }
}
