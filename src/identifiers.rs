//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time. All
//! browser-assigned identifiers are opaque strings; only the call
//! correlation id ([`CallId`]) is numeric, allocated monotonically by the
//! transport.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// String Id Macro
// ============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the id as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the id is unset.
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Browser-assigned identifier for a navigable context (top-level page,
    /// iframe, worker). Stable across same-origin navigations.
    TargetId
}

string_id! {
    /// Identifier for an attachment of a controller to a target.
    ///
    /// Namespaces all traffic for that target on the shared transport.
    /// Multiple controllers may attach to the same target.
    SessionId
}

string_id! {
    /// Identifier of a browsing context (JS execution realm).
    ///
    /// A top-level page has one; iframes add more sharing the parent's
    /// [`TargetId`].
    FrameId
}

string_id! {
    /// Identifier of an in-flight network request.
    ///
    /// Redirects reuse the same id across multiple `requestWillBeSent`
    /// events.
    NetworkRequestId
}

string_id! {
    /// Identifier of a remote JavaScript object held by the browser.
    RemoteObjectId
}

// ============================================================================
// CallId
// ============================================================================

/// Correlation id for a protocol call.
///
/// Allocated monotonically by the transport; responses are matched by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Identifier of an OS-level browser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let target: TargetId = "E8BF3B3B6A3A".into();
        assert_eq!(target.to_string(), "E8BF3B3B6A3A");
        assert_eq!(CallId(42).to_string(), "42");
    }

    #[test]
    fn test_transparent_serde() {
        let session = SessionId::from("ABC123");
        let json = serde_json::to_string(&session).expect("serialize");
        assert_eq!(json, "\"ABC123\"");

        let back: SessionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, session);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        fn takes_target(_: &TargetId) {}
        takes_target(&TargetId::from("t"));
        // SessionId does not coerce; the type system keeps them apart.
    }

    #[test]
    fn test_is_empty() {
        assert!(SessionId::default().is_empty());
        assert!(!SessionId::from("s").is_empty());
    }
}
