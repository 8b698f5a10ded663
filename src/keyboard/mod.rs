//! Keyboard primitives shared by the navigator and the review dispatcher.
//!
//! - [`KeyEvent`]: key + modifiers + focus context, with `prevent_default`
//! - [`ShortcutBinding`]: exact-modifier key-combo matching
//! - [`KeyboardHub`]: the process-wide event stream with scoped listeners ([`ListenerGuard`])

pub mod binding;
pub mod event;
pub mod hub;

pub use binding::{ShortcutBinding, ShortcutHelp, find_binding};
pub use event::{FocusTarget, Key, KeyEvent, Modifiers};
pub use hub::{KeyHandler, KeyboardHub, ListenerGuard};

use thiserror::Error;

/// Errors from the keyboard layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyboardError {
    #[error("A key event is already being dispatched")]
    DispatchInProgress,

    #[error("Invalid key combo: '{0}'")]
    InvalidCombo(String),
}
