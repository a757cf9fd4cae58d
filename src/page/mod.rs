//! Page control.
//!
//! Each [`Page`] is a handle to one attached target: a top-level page or,
//! through [`Element::frame`], an iframe sharing the parent's target. A
//! page holds as little state as possible (identity, a cancellation
//! scope, and shared handles to the JS context slot and input devices)
//! so clones stay cheap and consistent.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Page struct, clones, scopes, domain guards |
//! | `navigation` | navigate, reload, close, history, wait_open |
//! | `evaluate` | JS evaluation, context handle, helper injection |
//! | `wait` | Event, idle and stability wait primitives |
//! | `dialog` | JavaScript and file chooser dialogs |
//! | `screenshot` | Viewport, full-page and scroll screenshots |
//! | `resources` | Cookies, headers, viewport, resource content |
//! | `element` | Remote element handles |

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod dialog;
mod element;
mod evaluate;
mod navigation;
mod resources;
mod screenshot;
mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{DomainGuard, Page};

#[cfg(test)]
pub(crate) use self::core::tests as core_tests;
pub use dialog::{DialogHandle, FileChooser};
pub use element::Element;
pub use evaluate::Eval;
pub use screenshot::ScrollScreenshotOptions;
pub use wait::DEFAULT_EXCLUDED_TYPES;
