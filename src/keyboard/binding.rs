use crate::keyboard::{Key, KeyEvent};
use std::fmt;

/// Maps one key combo to an action.
///
/// Modifier matching is exact: a binding without `ctrl` does not fire while
/// Ctrl (or Cmd) is held, and the same goes for `shift` and `alt`. The `ctrl`
/// flag is satisfied by either Ctrl or Cmd.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutBinding<A> {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub action: A,
    pub description: &'static str,
}

impl<A> ShortcutBinding<A> {
    pub fn new(key: Key, action: A, description: &'static str) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
            action,
            description,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key.matches(&event.key)
            && self.ctrl == event.modifiers.primary()
            && self.shift == event.modifiers.shift
            && self.alt == event.modifiers.alt
    }

    /// Human-readable combo, e.g. `Ctrl+Shift+Tab`
    pub fn combo(&self) -> String {
        let mut combo = String::new();
        if self.ctrl {
            combo.push_str("Ctrl+");
        }
        if self.alt {
            combo.push_str("Alt+");
        }
        if self.shift {
            combo.push_str("Shift+");
        }
        combo.push_str(&self.key.to_string());
        combo
    }

    pub fn help(&self) -> ShortcutHelp {
        ShortcutHelp {
            keys: self.combo(),
            description: self.description,
        }
    }
}

/// Find the first binding matching `event`
pub fn find_binding<'a, A>(
    bindings: &'a [ShortcutBinding<A>],
    event: &KeyEvent,
) -> Option<&'a ShortcutBinding<A>> {
    bindings.iter().find(|b| b.matches(event))
}

/// Entry in a help/legend surface. Display only, never used for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutHelp {
    pub keys: String,
    pub description: &'static str,
}

impl fmt::Display for ShortcutHelp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16} {}", self.keys, self.description)
    }
}
