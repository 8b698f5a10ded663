//! Services module - the review workflow engine.
//!
//! Four independent components, composed only by the host (see [`crate::session`]):
//!
//! - [`AutoSaveController`]: Debounced, single-flight persistence of a data snapshot with a
//!   small save-status machine (`idle -> saving -> saved | error`)
//! - [`DocumentNavigator`]: ←/→ wraparound and 1-9 absolute jumps across an ordered
//!   document list, plus the always-live Ctrl/Cmd+K quick switcher
//! - [`ReviewShortcutDispatcher`]: A/R/F/E/J, Tab/Shift+Tab, arrows and Ctrl/Cmd+S mapped to
//!   field-review callbacks
//! - [`ConfidenceGate`]: Pure review-required decisions, justifications and OCR prompt guidance
//!
//! # Design Philosophy
//!
//! The services are framework-agnostic: key events come in as [`crate::keyboard::KeyEvent`],
//! persistence is any async `Fn(T) -> anyhow::Result<()>`, and nothing here renders UI.
//!
//! # Usage Example
//!
//! ```ignore
//! use reviewflow::services::{AutoSaveController, AutoSaveOptions, ConfidenceGate};
//!
//! let autosave = AutoSaveController::new(draft, move |d| store.persist(d), AutoSaveOptions::default())?;
//! autosave.update(edited);
//!
//! let gate = ConfidenceGate::default();
//! if gate.requires_review(&document.metadata) {
//!     println!("{}", gate.justification(&document.metadata).unwrap_or_default());
//! }
//! ```

pub mod autosave;
pub mod confidence;
pub mod navigator;
pub mod shortcuts;

pub use autosave::{AutoSaveController, AutoSaveError, AutoSaveOptions, SaveFuture, SaveOutcome};
pub use confidence::{
    ConfidenceGate, DEFAULT_REVIEW_THRESHOLD, ReviewDecision, prompt_guidance, requires_review,
    review_justification,
};
pub use navigator::{BoundNavigator, DocumentNavigator, DocumentSource, NavigationEvent};
pub use shortcuts::{ReviewAction, ReviewActions, ReviewShortcutDispatcher};
