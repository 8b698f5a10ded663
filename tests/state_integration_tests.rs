//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple tasks
//! - Restores persisted decisions when documents are loaded

use reviewflow::models::{
    FieldStatus, ReviewDocument, ReviewField, ReviewSnapshot, SaveState, SaveStatus,
};
use reviewflow::services::ConfidenceGate;
use reviewflow::{ExtractionMetadata, ExtractionMethod, ReviewMode, StateChange, StateManager};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

fn document(id: &str, method: ExtractionMethod, confidence: f64, fields: &[&str]) -> ReviewDocument {
    ReviewDocument {
        id: id.to_string(),
        name: format!("Document {}", id),
        metadata: ExtractionMetadata::new(method, confidence).unwrap(),
        fields: fields
            .iter()
            .map(|name| ReviewField {
                name: name.to_string(),
                value: String::new(),
                source_page: None,
            })
            .collect(),
    }
}

fn queue() -> Vec<ReviewDocument> {
    vec![
        document("inv-1", ExtractionMethod::Text, 0.98, &["vendor", "total"]),
        document("scan-2", ExtractionMethod::Ocr, 0.55, &["merchant", "date", "total"]),
    ]
}

#[tokio::test]
async fn test_state_change_events_emitted() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.load_documents(queue(), None);

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");

    assert!(
        matches!(event, StateChange::DocumentsLoaded { count: 2 }),
        "Expected DocumentsLoaded event, got: {:?}",
        event
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();

    state.set_switcher_open(true);

    for rx in [&mut rx1, &mut rx2] {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        assert_eq!(event, StateChange::SwitcherToggled { open: true });
    }
}

#[tokio::test]
async fn test_selection_carries_gate_decision() {
    let state = StateManager::new();
    let gate = ConfidenceGate::default();
    let documents = queue();
    state.load_documents(documents.clone(), None);

    let changes = state.select_document("scan-2", gate.decide(&documents[1].metadata));

    assert_eq!(
        changes[0],
        StateChange::DocumentSelected {
            id: "scan-2".to_string(),
            index: 1
        }
    );
    assert!(changes.iter().any(|c| matches!(
        c,
        StateChange::ReviewRequirementChanged {
            requires_review: true,
            justification: Some(text),
        } if text.contains("55%")
    )));

    // Back to a text-layer document clears the requirement
    let changes = state.select_document("inv-1", gate.decide(&documents[0].metadata));
    assert!(changes.contains(&StateChange::ReviewRequirementChanged {
        requires_review: false,
        justification: None,
    }));
}

#[tokio::test]
async fn test_review_workflow_events() {
    let state = StateManager::new();
    state.load_documents(queue(), None);
    state.select_document("scan-2", ConfidenceGate::default().decide(&queue()[1].metadata));
    state.set_mode(ReviewMode::Fields);

    state.set_focused_status(FieldStatus::Approved);
    state.step_field(1);
    state.set_focused_status(FieldStatus::Flagged);
    state.step_field(1);
    state.set_focused_status(FieldStatus::Rejected);

    let snapshot = state.read(|s| s.snapshot.clone());
    let draft = snapshot.draft("scan-2").unwrap();
    assert_eq!(draft.decisions["merchant"], FieldStatus::Approved);
    assert_eq!(draft.decisions["date"], FieldStatus::Flagged);
    assert_eq!(draft.decisions["total"], FieldStatus::Rejected);
    assert_eq!(snapshot.pending_count(), 2);

    let edit = state.request_edit().unwrap();
    assert_eq!(
        edit,
        StateChange::EditRequested {
            document_id: "scan-2".to_string(),
            field: "total".to_string()
        }
    );
}

#[tokio::test]
async fn test_load_restores_saved_decisions() {
    let state = StateManager::new();
    state.load_documents(queue(), None);
    state.select_document("inv-1", ConfidenceGate::default().decide(&queue()[0].metadata));
    state.set_focused_status(FieldStatus::Approved);
    let saved: ReviewSnapshot = state.read(|s| s.snapshot.clone());

    let restored = StateManager::new();
    // A document dropped from the queue is ignored, a new one starts pending
    let mut documents = queue();
    documents.push(document("new-3", ExtractionMethod::Hybrid, 0.9, &["amount"]));
    restored.load_documents(documents, Some(&saved));

    restored.read(|s| {
        assert_eq!(
            s.snapshot.draft("inv-1").unwrap().decisions["vendor"],
            FieldStatus::Approved
        );
        assert_eq!(s.snapshot.draft("new-3").unwrap().pending_count(), 1);
    });
}

#[tokio::test]
async fn test_save_state_mirrors_autosave() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    state.set_save_state(SaveState {
        status: SaveStatus::Saving,
        last_saved: None,
        error: None,
    });
    // Same status again is not a change
    assert!(
        state
            .set_save_state(SaveState {
                status: SaveStatus::Saving,
                last_saved: None,
                error: None,
            })
            .is_empty()
    );

    let event = rx.recv().await.unwrap();
    assert_eq!(
        event,
        StateChange::SaveStatusChanged {
            status: SaveStatus::Saving,
            error: None
        }
    );
}

#[tokio::test]
async fn test_concurrent_state_access() {
    let state = Arc::new(StateManager::new());
    state.load_documents(queue(), None);
    state.select_document("scan-2", ConfidenceGate::default().decide(&queue()[1].metadata));

    let mut handles = vec![];

    for i in 0..10 {
        let state_clone = state.clone();
        let handle = tokio::spawn(async move {
            state_clone.step_field(if i % 2 == 0 { 1 } else { -1 });
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // Five steps forward and five back land where we started
    assert_eq!(state.read(|s| s.focused_field), Some(0));
}

#[tokio::test]
async fn test_reset_clears_session() {
    let state = StateManager::new();
    state.load_documents(queue(), None);
    state.set_switcher_open(true);

    let changes = state.reset();

    assert!(changes.contains(&StateChange::SwitcherToggled { open: false }));
    assert_eq!(changes.last(), Some(&StateChange::StateReset));
    assert!(state.read(|s| s.documents.is_empty() && s.selected_document.is_none()));
}
