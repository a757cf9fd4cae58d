//! Chromium automation over the Chrome DevTools Protocol.
//!
//! This library drives Chromium-family browsers through a single duplex
//! WebSocket carrying multiplexed control over many targets (pages,
//! iframes, workers). On top of the protocol's asynchronous
//! request/response + event model it provides a high-level page API with
//! robust event subscription, scoped cancellation, and idle/stability
//! waiting primitives.
//!
//! # Architecture
//!
//! - One [`transport::Connection`] per browser; calls are correlated by a
//!   monotonic id, events fan out through a re-broadcast [`broker`].
//! - Each [`Page`] is an attachment (session) to one target, with its own
//!   cancellation [`Scope`]; the session dispatcher cancels it when the
//!   browser destroys the target.
//! - Every wait primitive is two-step: subscribe first, then trigger the
//!   action, then await. No event can slip between.
//!
//! # Quick Start
//!
//! ```no_run
//! use chromium_driver::{Browser, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let browser = Browser::connect("ws://127.0.0.1:9222/devtools/browser/abc").await?;
//!
//!     let page = browser.new_page("https://example.com").await?;
//!     page.wait_stable(std::time::Duration::from_millis(300)).await?;
//!
//!     let title = page.eval("() => document.title").await?;
//!     println!("title: {}", title.value);
//!
//!     page.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Browser facade: connect, attach, targets |
//! | [`page`] | Page controller: navigation, waits, screenshots |
//! | [`input`] | Keyboard, mouse and touch devices |
//! | [`broker`] | Re-broadcast event fan-out |
//! | [`scope`] | Cancellation scopes and poll pacing |
//! | [`protocol`] | Wire message, event and method types |
//! | [`transport`] | WebSocket connection (internal) |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Re-broadcast event fan-out.
pub mod broker;

/// Browser facade over one DevTools connection.
pub mod browser;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers for protocol entities.
pub mod identifiers;

mod imaging;

/// Input devices: keyboard, mouse, touch.
pub mod input;

/// Page controller and wait primitives.
pub mod page;

/// Protocol message types.
pub mod protocol;

/// Cancellation scopes and poll pacing.
pub mod scope;

mod session;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{Browser, BrowserBuilder, BrowserOptions};

// Page types
pub use page::{
    DEFAULT_EXCLUDED_TYPES, DialogHandle, DomainGuard, Element, Eval, FileChooser, Page,
    ScrollScreenshotOptions,
};

// Input types
pub use input::{Key, KeyAction, KeyActionKind, KeyActions, Keyboard, Mouse, Touch};

// Scope types
pub use scope::{Scope, Sleeper};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{
    CallId, FrameId, NetworkRequestId, RemoteObjectId, SessionId, TargetId, WindowId,
};

// Protocol types commonly used in signatures
pub use protocol::events::{LifecycleEventName, ResourceType};
pub use protocol::methods::{
    MouseButton, Point, Rect, ScreenshotFormat, TouchPoint, WindowBounds, WindowState,
};
