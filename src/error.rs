//! Error types for the driver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chromium_driver::{Result, Error};
//!
//! async fn example(page: &Page) -> Result<()> {
//!     page.navigate("https://example.com").await?;
//!     page.wait_load().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Cancellation | [`Error::Cancelled`] |
//! | Remote | [`Error::Remote`] |
//! | Navigation | [`Error::Navigation`], [`Error::PageCloseCanceled`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Decode`], [`Error::Protocol`] |
//! | Execution | [`Error::Script`], [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Constants
// ============================================================================

/// Error message Chromium reports when a page is closed mid-navigation.
///
/// `Page.close` returns this transiently while the target navigates; the
/// close loop retries until the browser accepts the command.
pub(crate) const NOT_ATTACHED_TO_ACTIVE_PAGE: &str = "Not attached to an active page";

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Cancellation
    // ========================================================================
    /// The operation's scope was cancelled.
    ///
    /// Returned as the terminal result of any suspended operation whose
    /// page closed, whose deadline passed, or whose scope was cancelled
    /// explicitly. Never retried.
    #[error("Scope cancelled")]
    Cancelled,

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The browser returned an error for a protocol call.
    #[error("{method}: {message} (code {code})")]
    Remote {
        /// Method that failed.
        method: String,
        /// Protocol error code.
        code: i64,
        /// Error message from the browser.
        message: String,
    },

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// `Page.navigate` reported a load failure.
    ///
    /// Distinct from transport failures so callers can discriminate a bad
    /// URL or blocked load from a dead connection.
    #[error("Navigation failed: {text}")]
    Navigation {
        /// The `errorText` reported by the browser.
        text: String,
    },

    /// A `beforeunload` handler denied closing the page.
    ///
    /// The page remains alive after this error.
    #[error("Page close canceled by beforeunload handler")]
    PageCloseCanceled,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The transport closed while operations were in flight.
    ///
    /// Fatal: every page's scope cancels, there is no recovery.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A received payload failed to decode into the expected shape.
    ///
    /// Fatal to the call; not retried.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// JavaScript evaluation threw an exception.
    #[error("Script error: {message}")]
    Script {
        /// Exception text from the page.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<WsError>),

    /// Image decode/encode error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a remote error from a protocol error object.
    #[inline]
    pub fn remote(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a navigation error.
    #[inline]
    pub fn navigation(text: impl Into<String>) -> Self {
        Self::Navigation { text: text.into() }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a cancellation error.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a navigation failure.
    #[inline]
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation { .. })
    }

    /// Returns `true` for the transient "not attached to an active page"
    /// remote error observed while a target navigates.
    #[must_use]
    pub fn is_not_attached(&self) -> bool {
        matches!(self, Self::Remote { message, .. } if message == NOT_ATTACHED_TO_ACTIVE_PAGE)
    }
}

// ============================================================================
// Tests
// ============================================================================
