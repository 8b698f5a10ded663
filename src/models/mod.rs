//! Data models for the review workflow engine.
//!
//! - [`ExtractionMetadata`]: Extraction method + validated confidence, consumed by the confidence gate
//! - [`SaveState`]: Observable status of an autosave session
//! - [`ReviewDocument`] / [`DocumentRef`]: Documents in the review queue
//! - [`ReviewSnapshot`] / [`ReviewDraft`]: What autosave persists (per-field reviewer decisions)
//! - [`ReviewConfig`]: Settings loaded from `ReviewFlow Config.yaml`
//!
//! # Architecture Note
//!
//! Config and document structs derive `Serialize`/`Deserialize` for YAML persistence.
//! Runtime state lives in [`crate::state::ReviewState`] and is only mutated through
//! [`StateManager`](crate::state::StateManager).

pub mod config;
pub mod document;
pub mod extraction;
pub mod save_state;

pub use config::{AutoSaveSettings, LoggingSettings, ReviewConfig, ReviewSettings};
pub use document::{
    DocumentManifest, DocumentRef, FieldStatus, ManifestError, ReviewDocument, ReviewDraft,
    ReviewField, ReviewSnapshot,
};
pub use extraction::{ExtractionMetadata, ExtractionMethod, MetadataError, fraction_to_percent};
pub use save_state::{SaveState, SaveStatus};
