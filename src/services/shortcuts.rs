use crate::keyboard::{Key, KeyEvent, KeyHandler, ShortcutBinding, ShortcutHelp, find_binding};
use std::fmt;

/// Fixed vocabulary of field-review actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewAction {
    Approve,
    Reject,
    Flag,
    Edit,
    JumpToSource,
    Next,
    Previous,
    Save,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Flag => "flag",
            ReviewAction::Edit => "edit",
            ReviewAction::JumpToSource => "jump-to-source",
            ReviewAction::Next => "next",
            ReviewAction::Previous => "previous",
            ReviewAction::Save => "save",
        };
        f.write_str(name)
    }
}

fn save_binding() -> ShortcutBinding<ReviewAction> {
    ShortcutBinding::new(Key::Char('s'), ReviewAction::Save, "Save now").with_ctrl()
}

fn field_bindings() -> Vec<ShortcutBinding<ReviewAction>> {
    vec![
        ShortcutBinding::new(Key::Char('a'), ReviewAction::Approve, "Approve field"),
        ShortcutBinding::new(Key::Char('r'), ReviewAction::Reject, "Reject field"),
        ShortcutBinding::new(Key::Char('f'), ReviewAction::Flag, "Flag for follow-up"),
        ShortcutBinding::new(Key::Char('e'), ReviewAction::Edit, "Edit value"),
        ShortcutBinding::new(Key::Char('j'), ReviewAction::JumpToSource, "Jump to source"),
        ShortcutBinding::new(Key::Tab, ReviewAction::Previous, "Previous field").with_shift(),
        ShortcutBinding::new(Key::Tab, ReviewAction::Next, "Next field"),
        ShortcutBinding::new(Key::ArrowRight, ReviewAction::Next, "Next field"),
        ShortcutBinding::new(Key::ArrowLeft, ReviewAction::Previous, "Previous field"),
    ]
}

type ActionHandler = Box<dyn FnMut() + Send>;

/// Optional callback per review action. A missing handler is a no-op.
#[derive(Default)]
pub struct ReviewActions {
    pub approve: Option<ActionHandler>,
    pub reject: Option<ActionHandler>,
    pub flag: Option<ActionHandler>,
    pub edit: Option<ActionHandler>,
    pub jump_to_source: Option<ActionHandler>,
    pub next: Option<ActionHandler>,
    pub previous: Option<ActionHandler>,
    pub save: Option<ActionHandler>,
}

impl ReviewActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for `action`, replacing any previous one
    pub fn on<F>(mut self, action: ReviewAction, handler: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        *self.slot(action) = Some(Box::new(handler));
        self
    }

    fn slot(&mut self, action: ReviewAction) -> &mut Option<ActionHandler> {
        match action {
            ReviewAction::Approve => &mut self.approve,
            ReviewAction::Reject => &mut self.reject,
            ReviewAction::Flag => &mut self.flag,
            ReviewAction::Edit => &mut self.edit,
            ReviewAction::JumpToSource => &mut self.jump_to_source,
            ReviewAction::Next => &mut self.next,
            ReviewAction::Previous => &mut self.previous,
            ReviewAction::Save => &mut self.save,
        }
    }

    fn invoke(&mut self, action: ReviewAction) -> bool {
        match self.slot(action).as_mut() {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

/// Routes key presses to field-review actions.
///
/// Ctrl/Cmd+S is checked first and fires even while typing in a text
/// control. All other bindings are suppressed in editable controls. Every
/// recognized key has its default action prevented, whether or not a
/// handler is wired.
pub struct ReviewShortcutDispatcher {
    enabled: bool,
    /// Whether the single-key field bindings are live; Ctrl/Cmd+S ignores this
    field_keys_enabled: bool,
    actions: ReviewActions,
    save: ShortcutBinding<ReviewAction>,
    bindings: Vec<ShortcutBinding<ReviewAction>>,
}

impl ReviewShortcutDispatcher {
    pub fn new(actions: ReviewActions) -> Self {
        Self {
            enabled: true,
            field_keys_enabled: true,
            actions,
            save: save_binding(),
            bindings: field_bindings(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_field_keys_enabled(&mut self, enabled: bool) {
        self.field_keys_enabled = enabled;
    }

    /// Resolve and run one key press. Returns the recognized action, if any.
    pub fn handle(&mut self, event: &mut KeyEvent) -> Option<ReviewAction> {
        if !self.enabled {
            return None;
        }

        let action = if self.save.matches(event) {
            ReviewAction::Save
        } else {
            if !self.field_keys_enabled || event.focus.is_editable() {
                return None;
            }
            find_binding(&self.bindings, event)?.action
        };

        event.prevent_default();
        let handled = self.actions.invoke(action);
        tracing::debug!("Review shortcut {} (handler wired: {})", action, handled);

        Some(action)
    }

    /// Key legend for help surfaces, derived from the vocabulary
    pub fn catalogue() -> Vec<ShortcutHelp> {
        vec![
            ShortcutHelp {
                keys: "A".to_string(),
                description: "Approve field",
            },
            ShortcutHelp {
                keys: "R".to_string(),
                description: "Reject field",
            },
            ShortcutHelp {
                keys: "F".to_string(),
                description: "Flag for follow-up",
            },
            ShortcutHelp {
                keys: "E".to_string(),
                description: "Edit value",
            },
            ShortcutHelp {
                keys: "J".to_string(),
                description: "Jump to source",
            },
            ShortcutHelp {
                keys: "Tab / →".to_string(),
                description: "Next field",
            },
            ShortcutHelp {
                keys: "Shift+Tab / ←".to_string(),
                description: "Previous field",
            },
            save_binding().help(),
        ]
    }
}

impl KeyHandler for ReviewShortcutDispatcher {
    fn handle_key(&mut self, event: &mut KeyEvent) {
        self.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{FocusTarget, Modifiers};
    use std::sync::{Arc, Mutex};

    fn recording() -> (ReviewShortcutDispatcher, Arc<Mutex<Vec<ReviewAction>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut actions = ReviewActions::new();
        for action in [
            ReviewAction::Approve,
            ReviewAction::Reject,
            ReviewAction::Flag,
            ReviewAction::Edit,
            ReviewAction::JumpToSource,
            ReviewAction::Next,
            ReviewAction::Previous,
            ReviewAction::Save,
        ] {
            let log = Arc::clone(&log);
            actions = actions.on(action, move || log.lock().unwrap().push(action));
        }
        (ReviewShortcutDispatcher::new(actions), log)
    }

    #[test]
    fn test_key_resolution() {
        let (mut dispatcher, log) = recording();
        let presses = [
            (KeyEvent::char('a'), ReviewAction::Approve),
            (KeyEvent::char('R'), ReviewAction::Reject),
            (KeyEvent::char('f'), ReviewAction::Flag),
            (KeyEvent::char('e'), ReviewAction::Edit),
            (KeyEvent::char('J'), ReviewAction::JumpToSource),
            (KeyEvent::key(Key::Tab), ReviewAction::Next),
            (KeyEvent::new(Key::Tab, Modifiers::SHIFT), ReviewAction::Previous),
            (KeyEvent::key(Key::ArrowRight), ReviewAction::Next),
            (KeyEvent::key(Key::ArrowLeft), ReviewAction::Previous),
            (KeyEvent::ctrl('s'), ReviewAction::Save),
        ];

        for (mut event, expected) in presses {
            assert_eq!(dispatcher.handle(&mut event), Some(expected));
            assert!(event.default_prevented());
        }
        assert_eq!(log.lock().unwrap().len(), 10);
    }

    #[test]
    fn test_focus_guard() {
        let (mut dispatcher, log) = recording();

        let mut event = KeyEvent::char('a').with_focus(FocusTarget::Input);
        assert_eq!(dispatcher.handle(&mut event), None);
        assert!(!event.default_prevented());

        let mut event = KeyEvent::ctrl('s').with_focus(FocusTarget::ContentEditable);
        assert_eq!(dispatcher.handle(&mut event), Some(ReviewAction::Save));
        assert!(event.default_prevented());

        assert_eq!(*log.lock().unwrap(), vec![ReviewAction::Save]);
    }

    #[test]
    fn test_unwired_handler_still_prevents_default() {
        let mut dispatcher = ReviewShortcutDispatcher::new(ReviewActions::new());
        let mut event = KeyEvent::key(Key::Tab);
        assert_eq!(dispatcher.handle(&mut event), Some(ReviewAction::Next));
        assert!(event.default_prevented());
    }

    #[test]
    fn test_unrecognized_key_ignored() {
        let (mut dispatcher, log) = recording();
        let mut event = KeyEvent::char('z');
        assert_eq!(dispatcher.handle(&mut event), None);
        assert!(!event.default_prevented());

        // Ctrl+A is not approve
        assert_eq!(dispatcher.handle(&mut KeyEvent::ctrl('a')), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_dispatcher_ignores_save() {
        let (mut dispatcher, log) = recording();
        dispatcher.set_enabled(false);
        assert_eq!(dispatcher.handle(&mut KeyEvent::ctrl('s')), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_field_keys_disabled_keeps_save() {
        let (mut dispatcher, _log) = recording();
        dispatcher.set_field_keys_enabled(false);
        assert_eq!(dispatcher.handle(&mut KeyEvent::char('a')), None);
        assert_eq!(dispatcher.handle(&mut KeyEvent::ctrl('s')), Some(ReviewAction::Save));
    }

    #[test]
    fn test_catalogue_independent_of_wiring() {
        let catalogue = ReviewShortcutDispatcher::catalogue();
        assert_eq!(catalogue.len(), 8);
        assert!(catalogue.iter().any(|h| h.keys == "Ctrl+S"));
    }
}
