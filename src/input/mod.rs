//! Input devices.
//!
//! The keyboard and mouse are stateful: the pressed-key set and the held
//! button stack live with the page attachment and are shared by every
//! clone. Device state is locked across the protocol call that emits the
//! event, so two concurrent presses can never interleave into events
//! with inconsistent modifier masks. Touch is stateless.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `key` | [`Key`] definitions and event encoding |
//! | `keyboard` | [`Keyboard`], [`KeyActions`], text insertion |
//! | `mouse` | [`Mouse`]: movement, buttons, scrolling |
//! | `touch` | [`Touch`]: stateless touch sequences |

// ============================================================================
// Submodules
// ============================================================================

mod key;
mod keyboard;
mod mouse;
mod touch;

// ============================================================================
// Re-exports
// ============================================================================

pub use key::Key;
pub use keyboard::{Keyboard, KeyAction, KeyActionKind, KeyActions};
pub use mouse::Mouse;
pub use touch::Touch;

pub(crate) use keyboard::KeyboardState;
pub(crate) use mouse::MouseState;

// ============================================================================
// Page Accessors
// ============================================================================

use crate::page::Page;

impl Page {
    /// The page's keyboard.
    #[inline]
    #[must_use]
    pub fn keyboard(&self) -> Keyboard<'_> {
        Keyboard::new(self)
    }

    /// The page's mouse.
    #[inline]
    #[must_use]
    pub fn mouse(&self) -> Mouse<'_> {
        Mouse::new(self)
    }

    /// The page's touch device.
    #[inline]
    #[must_use]
    pub fn touch(&self) -> Touch<'_> {
        Touch::new(self)
    }

    /// Starts a deferred keyboard action sequence, useful for shortcuts
    /// like ctrl+enter.
    #[inline]
    #[must_use]
    pub fn key_actions(&self) -> KeyActions<'_> {
        KeyActions::new(self)
    }
}
