// ReviewFlow - Keyboard-driven review workflow engine for AI-extracted document fields
//
// This is the library crate containing the review engine: autosave, document navigation,
// review shortcuts and the confidence gate, plus the session host that wires them together.
// The binary crate (main.rs) provides a line-driven terminal harness.

pub mod config;
pub mod keyboard;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use keyboard::{KeyEvent, KeyboardHub};
pub use metrics::Metrics;
pub use models::{ExtractionMetadata, ExtractionMethod, ReviewConfig, SaveState, SaveStatus};
pub use services::{AutoSaveController, ConfidenceGate, DocumentNavigator, ReviewShortcutDispatcher};
pub use session::{DraftStore, FileDraftStore, ReviewSession};
pub use state::{ReviewMode, StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
