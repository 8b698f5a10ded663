use crate::keyboard::KeyboardError;
use std::fmt;
use std::str::FromStr;

/// A physical/logical key as delivered by the host input stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Escape,
    Backspace,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    /// Anything the engine has no binding for (F-keys, media keys, ...)
    Named(String),
}

impl Key {
    /// Case-insensitive key comparison; non-character keys compare exactly
    pub fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            (Key::Named(a), Key::Named(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }

    /// Digit value for '0'..='9'
    pub fn digit(&self) -> Option<u32> {
        match self {
            Key::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => f.write_str("Space"),
            Key::Char(c) => write!(f, "{}", c.to_uppercase()),
            Key::Tab => f.write_str("Tab"),
            Key::Enter => f.write_str("Enter"),
            Key::Escape => f.write_str("Esc"),
            Key::Backspace => f.write_str("Backspace"),
            Key::ArrowLeft => f.write_str("←"),
            Key::ArrowRight => f.write_str("→"),
            Key::ArrowUp => f.write_str("↑"),
            Key::ArrowDown => f.write_str("↓"),
            Key::Named(name) => f.write_str(name),
        }
    }
}

/// Modifier keys held during a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    /// Ctrl on Windows/Linux, Cmd on macOS
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What had input focus when the key was pressed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FocusTarget {
    /// Page body or a non-editable element
    #[default]
    Document,
    /// Single-line text input
    Input,
    /// Multi-line text area
    TextArea,
    /// Any element with inline-editable content
    ContentEditable,
    /// Other non-editable element (button, link, ...)
    Other(String),
}

impl FocusTarget {
    /// Typing into an editable control must not trigger single-key shortcuts
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            FocusTarget::Input | FocusTarget::TextArea | FocusTarget::ContentEditable
        )
    }
}

/// One key press flowing through the [`KeyboardHub`](crate::keyboard::KeyboardHub)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub focus: FocusTarget,
    default_prevented: bool,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            focus: FocusTarget::Document,
            default_prevented: false,
        }
    }

    /// Plain key press with no modifiers and document focus
    pub fn key(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        Self::key(Key::Char(c))
    }

    /// Ctrl+`c` (counts as the primary modifier on every platform)
    pub fn ctrl(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::CTRL)
    }

    pub fn with_focus(mut self, focus: FocusTarget) -> Self {
        self.focus = focus;
        self
    }

    /// Suppress the host's default handling (e.g. Tab moving focus)
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Parse a key combo such as `ctrl+s`, `shift+tab`, `cmd+k`, `right` or `3`.
    ///
    /// # Errors
    /// Returns [`KeyboardError::InvalidCombo`] for empty input, unknown
    /// modifiers, or unknown multi-character key names.
    pub fn parse(combo: &str) -> Result<Self, KeyboardError> {
        let combo = combo.trim();
        if combo.is_empty() {
            return Err(KeyboardError::InvalidCombo(combo.to_string()));
        }

        // A lone "+" is the plus key, not a separator
        if combo == "+" {
            return Ok(Self::char('+'));
        }

        let parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        let (key_part, modifier_parts) = parts
            .split_last()
            .ok_or_else(|| KeyboardError::InvalidCombo(combo.to_string()))?;

        let mut modifiers = Modifiers::NONE;
        for part in modifier_parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "cmd" | "meta" | "super" => modifiers.meta = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                _ => return Err(KeyboardError::InvalidCombo(combo.to_string())),
            }
        }

        let key = parse_key(key_part).ok_or_else(|| KeyboardError::InvalidCombo(combo.to_string()))?;
        Ok(Self::new(key, modifiers))
    }
}

impl FromStr for KeyEvent {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyEvent::parse(s)
    }
}

fn parse_key(name: &str) -> Option<Key> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Char(c));
    }

    let key = match name.to_ascii_lowercase().as_str() {
        "tab" => Key::Tab,
        "enter" | "return" => Key::Enter,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "space" => Key::Char(' '),
        "left" | "arrowleft" => Key::ArrowLeft,
        "right" | "arrowright" => Key::ArrowRight,
        "up" | "arrowup" => Key::ArrowUp,
        "down" | "arrowdown" => Key::ArrowDown,
        other if other.starts_with('f') && other[1..].parse::<u8>().is_ok() => {
            Key::Named(other.to_ascii_uppercase())
        }
        _ => return None,
    };
    Some(key)
}
