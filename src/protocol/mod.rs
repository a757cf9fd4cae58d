//! DevTools protocol message types.
//!
//! The protocol is JSON over a single duplex channel. Outgoing traffic is
//! calls correlated by a monotonic id; inbound traffic is responses (have
//! an `id`) and events (have a `method`). Events addressed to a target
//! carry the `sessionId` of the attachment.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Wire frames: [`Call`], [`Response`], [`Envelope`] |
//! | `events` | Typed event shapes implementing [`ProtocolEvent`] |
//! | `methods` | Typed command params/results implementing [`Command`] |

// ============================================================================
// Submodules
// ============================================================================

pub mod events;
pub mod message;
pub mod methods;

// ============================================================================
// Re-exports
// ============================================================================

pub use events::ProtocolEvent;
pub use message::{Call, Envelope, Message, RemoteError, Response};
pub use methods::Command;
