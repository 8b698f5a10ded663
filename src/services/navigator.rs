use crate::keyboard::{Key, KeyEvent, KeyHandler, ShortcutBinding, ShortcutHelp, find_binding};
use crate::models::DocumentRef;

/// What a navigator key press resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Select the document with this id
    Select(String),
    /// Open the quick switcher
    OpenSwitcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavAction {
    OpenSwitcher,
    Previous,
    Next,
    Jump(usize),
}

fn switcher_binding() -> ShortcutBinding<NavAction> {
    ShortcutBinding::new(Key::Char('k'), NavAction::OpenSwitcher, "Open quick switcher").with_ctrl()
}

fn step_bindings() -> Vec<ShortcutBinding<NavAction>> {
    let mut bindings = vec![
        ShortcutBinding::new(Key::ArrowLeft, NavAction::Previous, "Previous document"),
        ShortcutBinding::new(Key::ArrowRight, NavAction::Next, "Next document"),
    ];
    bindings.extend(
        ('1'..='9')
            .zip(0usize..)
            .map(|(c, index)| ShortcutBinding::new(Key::Char(c), NavAction::Jump(index), "Jump to document N")),
    );
    bindings
}

/// Source of the live document list, re-read on every key press
pub trait DocumentSource: Send {
    fn documents(&self) -> Vec<DocumentRef>;
    fn selected_id(&self) -> Option<String>;
}

type SelectHandler = Box<dyn FnMut(&str) + Send>;
type SwitcherHandler = Box<dyn FnMut() + Send>;

/// Keyboard movement across an ordered document list.
///
/// - Ctrl/Cmd+K opens the quick switcher, even while typing in a text control
/// - ←/→ step to the previous/next document with wraparound
/// - 1..9 jump to an absolute position; out-of-range digits are ignored
///
/// Everything except Ctrl/Cmd+K is suppressed while focus is in an editable control.
/// The current index is resolved from the list on every press, never cached.
pub struct DocumentNavigator {
    enabled: bool,
    /// Whether ←/→ and digits are live; Ctrl/Cmd+K ignores this
    steps_enabled: bool,
    on_select: Option<SelectHandler>,
    on_open_switcher: Option<SwitcherHandler>,
    switcher: ShortcutBinding<NavAction>,
    steps: Vec<ShortcutBinding<NavAction>>,
}

impl DocumentNavigator {
    pub fn new() -> Self {
        Self {
            enabled: true,
            steps_enabled: true,
            on_select: None,
            on_open_switcher: None,
            switcher: switcher_binding(),
            steps: step_bindings(),
        }
    }

    pub fn on_select<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_select = Some(Box::new(handler));
        self
    }

    pub fn on_open_switcher<F>(mut self, handler: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_open_switcher = Some(Box::new(handler));
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the arrow/digit bindings on or off while keeping Ctrl/Cmd+K live
    pub fn set_steps_enabled(&mut self, enabled: bool) {
        self.steps_enabled = enabled;
    }

    /// Resolve one key press against the current list and selection.
    ///
    /// Invokes the matching callback and returns what happened, or `None`
    /// when the press was ignored.
    pub fn handle(
        &mut self,
        event: &mut KeyEvent,
        documents: &[DocumentRef],
        selected_id: Option<&str>,
    ) -> Option<NavigationEvent> {
        if !self.enabled || documents.is_empty() {
            return None;
        }

        if self.switcher.matches(event) {
            event.prevent_default();
            if let Some(handler) = self.on_open_switcher.as_mut() {
                handler();
            }
            tracing::debug!("Quick switcher requested");
            return Some(NavigationEvent::OpenSwitcher);
        }

        if !self.steps_enabled || event.focus.is_editable() {
            return None;
        }

        let action = find_binding(&self.steps, event)?.action;
        let target = resolve_target(action, documents, selected_id)?;

        event.prevent_default();
        let id = documents[target].id.clone();
        tracing::debug!("Navigating to document {} (index {})", id, target);

        if let Some(handler) = self.on_select.as_mut() {
            handler(&id);
        }
        Some(NavigationEvent::Select(id))
    }

    /// Key legend for help surfaces
    pub fn catalogue() -> Vec<ShortcutHelp> {
        vec![
            switcher_binding().help(),
            ShortcutHelp {
                keys: "←".to_string(),
                description: "Previous document",
            },
            ShortcutHelp {
                keys: "→".to_string(),
                description: "Next document",
            },
            ShortcutHelp {
                keys: "1-9".to_string(),
                description: "Jump to document N",
            },
        ]
    }
}

impl Default for DocumentNavigator {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_target(action: NavAction, documents: &[DocumentRef], selected_id: Option<&str>) -> Option<usize> {
    let len = documents.len();
    let current = selected_id.and_then(|id| documents.iter().position(|d| d.id == id));

    match action {
        // Not found counts as -1: left wraps to the end, right goes to the start
        NavAction::Previous => Some(match current {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        }),
        NavAction::Next => Some(match current {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        }),
        NavAction::Jump(index) => (index < len).then_some(index),
        NavAction::OpenSwitcher => None,
    }
}

/// A navigator bound to a live [`DocumentSource`], ready to attach to a hub
pub struct BoundNavigator<S> {
    navigator: DocumentNavigator,
    source: S,
}

impl<S: DocumentSource> BoundNavigator<S> {
    pub fn new(navigator: DocumentNavigator, source: S) -> Self {
        Self { navigator, source }
    }

    pub fn navigator_mut(&mut self) -> &mut DocumentNavigator {
        &mut self.navigator
    }
}

impl<S: DocumentSource> KeyHandler for BoundNavigator<S> {
    fn handle_key(&mut self, event: &mut KeyEvent) {
        let documents = self.source.documents();
        let selected = self.source.selected_id();
        self.navigator.handle(event, &documents, selected.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{FocusTarget, Modifiers};
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn docs(n: usize) -> Vec<DocumentRef> {
        (0..n).map(|i| DocumentRef::new(format!("doc-{}", i))).collect()
    }

    fn press(nav: &mut DocumentNavigator, key: Key, list: &[DocumentRef], selected: Option<&str>) -> Option<NavigationEvent> {
        nav.handle(&mut KeyEvent::key(key), list, selected)
    }

    #[test]
    fn test_wraparound() {
        let list = docs(4);
        let mut nav = DocumentNavigator::new();

        assert_eq!(
            press(&mut nav, Key::ArrowLeft, &list, Some("doc-0")),
            Some(NavigationEvent::Select("doc-3".to_string()))
        );
        assert_eq!(
            press(&mut nav, Key::ArrowRight, &list, Some("doc-3")),
            Some(NavigationEvent::Select("doc-0".to_string()))
        );
        assert_eq!(
            press(&mut nav, Key::ArrowRight, &list, Some("doc-1")),
            Some(NavigationEvent::Select("doc-2".to_string()))
        );
    }

    #[test]
    fn test_unknown_selection_acts_as_minus_one() {
        let list = docs(3);
        let mut nav = DocumentNavigator::new();

        assert_eq!(
            press(&mut nav, Key::ArrowRight, &list, Some("missing")),
            Some(NavigationEvent::Select("doc-0".to_string()))
        );
        assert_eq!(
            press(&mut nav, Key::ArrowLeft, &list, None),
            Some(NavigationEvent::Select("doc-2".to_string()))
        );
    }

    #[test]
    fn test_digit_jump() {
        let list = docs(5);
        let mut nav = DocumentNavigator::new();

        assert_eq!(
            press(&mut nav, Key::Char('3'), &list, Some("doc-0")),
            Some(NavigationEvent::Select("doc-2".to_string()))
        );

        let mut event = KeyEvent::char('7');
        assert_eq!(nav.handle(&mut event, &list, Some("doc-0")), None);
        assert!(!event.default_prevented());

        // '0' is not a jump key
        assert_eq!(press(&mut nav, Key::Char('0'), &list, Some("doc-0")), None);
    }

    #[test]
    fn test_disabled_or_empty_is_ignored() {
        let mut nav = DocumentNavigator::new();
        assert_eq!(press(&mut nav, Key::ArrowRight, &[], None), None);
        assert_eq!(nav.handle(&mut KeyEvent::ctrl('k'), &[], None), None);

        nav.set_enabled(false);
        assert_eq!(press(&mut nav, Key::ArrowRight, &docs(2), None), None);
        assert_eq!(nav.handle(&mut KeyEvent::ctrl('k'), &docs(2), None), None);
    }

    #[test]
    fn test_switcher_fires_inside_text_input() {
        let opened = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&opened);
        let mut nav = DocumentNavigator::new().on_open_switcher(move || *counter.lock().unwrap() += 1);

        let mut event = KeyEvent::ctrl('k').with_focus(FocusTarget::Input);
        assert_eq!(nav.handle(&mut event, &docs(2), None), Some(NavigationEvent::OpenSwitcher));
        assert!(event.default_prevented());
        assert_eq!(*opened.lock().unwrap(), 1);

        // Arrow keys are suppressed while editing
        let mut event = KeyEvent::key(Key::ArrowRight).with_focus(FocusTarget::TextArea);
        assert_eq!(nav.handle(&mut event, &docs(2), Some("doc-0")), None);
    }

    #[test]
    fn test_modifiers_block_step_bindings() {
        let list = docs(3);
        let mut nav = DocumentNavigator::new();
        let mut event = KeyEvent::new(Key::ArrowRight, Modifiers::SHIFT);
        assert_eq!(nav.handle(&mut event, &list, Some("doc-0")), None);

        let mut event = KeyEvent::ctrl('2');
        assert_eq!(nav.handle(&mut event, &list, Some("doc-0")), None);
    }

    #[test]
    fn test_on_select_receives_id() {
        let selected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&selected);
        let mut nav = DocumentNavigator::new().on_select(move |id| sink.lock().unwrap().push(id.to_string()));

        press(&mut nav, Key::ArrowRight, &docs(2), Some("doc-0"));
        press(&mut nav, Key::Char('1'), &docs(2), Some("doc-1"));

        assert_eq!(*selected.lock().unwrap(), vec!["doc-1", "doc-0"]);
    }

    #[test]
    fn test_steps_disabled_keeps_switcher() {
        let mut nav = DocumentNavigator::new();
        nav.set_steps_enabled(false);
        assert_eq!(press(&mut nav, Key::ArrowRight, &docs(2), None), None);
        assert_eq!(
            nav.handle(&mut KeyEvent::ctrl('k'), &docs(2), None),
            Some(NavigationEvent::OpenSwitcher)
        );
    }

    #[test]
    fn test_catalogue() {
        let catalogue = DocumentNavigator::catalogue();
        assert_eq!(catalogue[0].keys, "Ctrl+K");
        assert_eq!(catalogue.len(), 4);
    }

    proptest! {
        #[test]
        fn prop_right_then_left_returns_to_start(len in 1usize..40, start in 0usize..40) {
            let start = start % len;
            let list = docs(len);
            let mut nav = DocumentNavigator::new();
            let start_id = list[start].id.clone();

            let Some(NavigationEvent::Select(next)) = press(&mut nav, Key::ArrowRight, &list, Some(&start_id)) else {
                panic!("right arrow must select");
            };
            let Some(NavigationEvent::Select(back)) = press(&mut nav, Key::ArrowLeft, &list, Some(&next)) else {
                panic!("left arrow must select");
            };
            prop_assert_eq!(back, start_id);
        }
    }
}
