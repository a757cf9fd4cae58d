//! Keyboard key definitions and event encoding.

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::methods::{InputDispatchKeyEvent, KeyEventKind};

// ============================================================================
// Modifier Bits
// ============================================================================

/// Alt modifier bit.
pub const MODIFIER_ALT: u8 = 1;
/// Control modifier bit.
pub const MODIFIER_CTRL: u8 = 2;
/// Meta/Command modifier bit.
pub const MODIFIER_META: u8 = 4;
/// Shift modifier bit.
pub const MODIFIER_SHIFT: u8 = 8;

// ============================================================================
// Key Enum
// ============================================================================

/// A physical key.
///
/// Use [`Key::Char`] for printable characters; the event encoding derives
/// `key`, `code` and `text` from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // ========================================================================
    // Modifiers
    // ========================================================================
    /// Alt key.
    Alt,
    /// Control key.
    Control,
    /// Meta/Command key.
    Meta,
    /// Shift key.
    Shift,

    // ========================================================================
    // Navigation & Control
    // ========================================================================
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Escape key.
    Escape,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Space bar.
    Space,

    // ========================================================================
    // Arrows & Paging
    // ========================================================================
    /// Arrow Up.
    ArrowUp,
    /// Arrow Down.
    ArrowDown,
    /// Arrow Left.
    ArrowLeft,
    /// Arrow Right.
    ArrowRight,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page Up key.
    PageUp,
    /// Page Down key.
    PageDown,

    // ========================================================================
    // Printable
    // ========================================================================
    /// A printable character key.
    Char(char),
}

/// Wire description of one key.
struct KeyDescriptor {
    key: String,
    code: String,
    key_code: u32,
    text: Option<String>,
}

impl Key {
    /// The modifier bit this key contributes, zero for non-modifiers.
    #[inline]
    #[must_use]
    pub fn modifier_bit(self) -> u8 {
        match self {
            Key::Alt => MODIFIER_ALT,
            Key::Control => MODIFIER_CTRL,
            Key::Meta => MODIFIER_META,
            Key::Shift => MODIFIER_SHIFT,
            _ => 0,
        }
    }

    /// Returns whether this key produces printable output.
    #[inline]
    #[must_use]
    pub fn is_printable(self) -> bool {
        matches!(self, Key::Char(_) | Key::Space)
    }

    fn descriptor(self) -> KeyDescriptor {
        let fixed = |key: &str, code: &str, key_code: u32| KeyDescriptor {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            text: None,
        };

        match self {
            Key::Alt => fixed("Alt", "AltLeft", 18),
            Key::Control => fixed("Control", "ControlLeft", 17),
            Key::Meta => fixed("Meta", "MetaLeft", 91),
            Key::Shift => fixed("Shift", "ShiftLeft", 16),
            Key::Enter => KeyDescriptor {
                text: Some("\r".to_string()),
                ..fixed("Enter", "Enter", 13)
            },
            Key::Tab => fixed("Tab", "Tab", 9),
            Key::Escape => fixed("Escape", "Escape", 27),
            Key::Backspace => fixed("Backspace", "Backspace", 8),
            Key::Delete => fixed("Delete", "Delete", 46),
            Key::Space => KeyDescriptor {
                text: Some(" ".to_string()),
                ..fixed(" ", "Space", 32)
            },
            Key::ArrowUp => fixed("ArrowUp", "ArrowUp", 38),
            Key::ArrowDown => fixed("ArrowDown", "ArrowDown", 40),
            Key::ArrowLeft => fixed("ArrowLeft", "ArrowLeft", 37),
            Key::ArrowRight => fixed("ArrowRight", "ArrowRight", 39),
            Key::Home => fixed("Home", "Home", 36),
            Key::End => fixed("End", "End", 35),
            Key::PageUp => fixed("PageUp", "PageUp", 33),
            Key::PageDown => fixed("PageDown", "PageDown", 34),
            Key::Char(c) => char_descriptor(c),
        }
    }

    /// Encodes a key event carrying the given modifier mask.
    ///
    /// Printable keys carry their text on key-down only.
    #[must_use]
    pub(crate) fn encode(self, kind: KeyEventKind, modifiers: u8) -> InputDispatchKeyEvent {
        let descriptor = self.descriptor();

        let text = match kind {
            KeyEventKind::KeyDown | KeyEventKind::Char => descriptor.text,
            _ => None,
        };

        InputDispatchKeyEvent {
            kind,
            modifiers,
            key: Some(descriptor.key),
            code: (!descriptor.code.is_empty()).then_some(descriptor.code),
            text,
            windows_virtual_key_code: (descriptor.key_code != 0).then_some(descriptor.key_code),
            location: None,
        }
    }
}

fn char_descriptor(c: char) -> KeyDescriptor {
    let code = if c.is_ascii_alphabetic() {
        format!("Key{}", c.to_ascii_uppercase())
    } else if c.is_ascii_digit() {
        format!("Digit{c}")
    } else {
        String::new()
    };

    let key_code = if c.is_ascii_alphanumeric() {
        c.to_ascii_uppercase() as u32
    } else {
        0
    };

    KeyDescriptor {
        key: c.to_string(),
        code,
        key_code,
        text: Some(c.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        assert_eq!(Key::Alt.modifier_bit(), 1);
        assert_eq!(Key::Control.modifier_bit(), 2);
        assert_eq!(Key::Meta.modifier_bit(), 4);
        assert_eq!(Key::Shift.modifier_bit(), 8);
        assert_eq!(Key::Enter.modifier_bit(), 0);
        assert_eq!(Key::Char('a').modifier_bit(), 0);
    }

    #[test]
    fn test_char_encoding() {
        let event = Key::Char('a').encode(KeyEventKind::KeyDown, 0);
        assert_eq!(event.key.as_deref(), Some("a"));
        assert_eq!(event.code.as_deref(), Some("KeyA"));
        assert_eq!(event.text.as_deref(), Some("a"));
        assert_eq!(event.windows_virtual_key_code, Some(65));
    }

    #[test]
    fn test_key_up_carries_no_text() {
        let down = Key::Char('x').encode(KeyEventKind::KeyDown, 0);
        let up = Key::Char('x').encode(KeyEventKind::KeyUp, 0);

        assert!(down.text.is_some());
        assert!(up.text.is_none());
    }

    #[test]
    fn test_modifier_mask_is_carried() {
        let event = Key::Char('a').encode(KeyEventKind::KeyDown, MODIFIER_SHIFT | MODIFIER_CTRL);
        assert_eq!(event.modifiers, 10);
    }

    #[test]
    fn test_printable() {
        assert!(Key::Space.is_printable());
        assert!(Key::Char('7').is_printable());
        assert!(!Key::Escape.is_printable());
    }
}
