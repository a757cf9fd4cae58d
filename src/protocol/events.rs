//! Typed event shapes.
//!
//! Each event names its wire method and deserializes from the envelope
//! payload. Consumers attempt a decode; a mismatch is not an error.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;

use crate::identifiers::{FrameId, NetworkRequestId, SessionId, TargetId};

// ============================================================================
// ProtocolEvent
// ============================================================================

/// A typed event shape bound to a wire method name.
pub trait ProtocolEvent: serde::de::DeserializeOwned {
    /// Wire method in `Domain.event` format.
    const METHOD: &'static str;
}

macro_rules! protocol_event {
    ($name:ident, $method:literal) => {
        impl ProtocolEvent for $name {
            const METHOD: &'static str = $method;
        }
    };
}

// ============================================================================
// Page Domain
// ============================================================================

/// A frame committed a navigation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFrameNavigated {
    /// The navigated frame.
    pub frame: FrameInfo,
}
protocol_event!(PageFrameNavigated, "Page.frameNavigated");

/// Frame description carried by navigation events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    /// Frame id.
    pub id: FrameId,
    /// Parent frame id; absent for the top-level frame.
    #[serde(default)]
    pub parent_id: Option<FrameId>,
    /// Current document URL.
    #[serde(default)]
    pub url: String,
}

/// A lifecycle milestone fired for a frame.
///
/// Only delivered while lifecycle events are enabled on the session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLifecycleEvent {
    /// Frame the milestone belongs to.
    pub frame_id: FrameId,
    /// Milestone name, e.g. `networkAlmostIdle`.
    pub name: String,
    /// Monotonic timestamp in seconds.
    #[serde(default)]
    pub timestamp: f64,
}
protocol_event!(PageLifecycleEvent, "Page.lifecycleEvent");

/// Well-known lifecycle milestone names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEventName {
    /// Document initialized.
    Init,
    /// `load` fired.
    Load,
    /// `DOMContentLoaded` fired.
    DomContentLoaded,
    /// Network mostly quiet (≤ 2 in-flight requests).
    NetworkAlmostIdle,
    /// Network fully quiet.
    NetworkIdle,
    /// First paint.
    FirstPaint,
    /// First contentful paint.
    FirstContentfulPaint,
}

impl LifecycleEventName {
    /// Wire name of the milestone.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkAlmostIdle => "networkAlmostIdle",
            Self::NetworkIdle => "networkIdle",
            Self::FirstPaint => "firstPaint",
            Self::FirstContentfulPaint => "firstContentfulPaint",
        }
    }
}

/// A JavaScript dialog (alert, confirm, prompt, beforeunload) opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageJavascriptDialogOpening {
    /// URL of the frame that opened the dialog.
    #[serde(default)]
    pub url: String,
    /// Dialog message text.
    #[serde(default)]
    pub message: String,
    /// Dialog kind: `alert`, `confirm`, `prompt` or `beforeunload`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Default prompt text, for `prompt` dialogs.
    #[serde(default)]
    pub default_prompt: Option<String>,
}
protocol_event!(PageJavascriptDialogOpening, "Page.javascriptDialogOpening");

/// A JavaScript dialog was handled.
///
/// `result == false` on a `beforeunload` dialog means the user (or
/// handler) kept the page open.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageJavascriptDialogClosed {
    /// Whether the dialog was accepted.
    pub result: bool,
    /// Text entered into a prompt.
    #[serde(default)]
    pub user_input: String,
}
protocol_event!(PageJavascriptDialogClosed, "Page.javascriptDialogClosed");

/// A file chooser opened while interception is enabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFileChooserOpened {
    /// Frame that opened the chooser.
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    /// `selectSingle` or `selectMultiple`.
    #[serde(default)]
    pub mode: String,
    /// Backing node of the `<input type=file>` element.
    #[serde(default)]
    pub backend_node_id: Option<i64>,
}
protocol_event!(PageFileChooserOpened, "Page.fileChooserOpened");

// ============================================================================
// Network Domain
// ============================================================================

/// Resource types reported by the network domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    Prefetch,
    EventSource,
    WebSocket,
    Manifest,
    SignedExchange,
    Ping,
    #[serde(rename = "CSPViolationReport")]
    CspViolationReport,
    Preflight,
    #[serde(other)]
    Other,
}

/// Request description inside [`NetworkRequestWillBeSent`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    /// Request URL.
    pub url: String,
    /// HTTP method.
    #[serde(default)]
    pub method: String,
}

/// A request is about to leave the browser.
///
/// Redirects fire this again with the same request id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequestWillBeSent {
    /// In-flight request id.
    pub request_id: NetworkRequestId,
    /// The request itself.
    pub request: RequestInfo,
    /// Resource type, when known.
    #[serde(default, rename = "type")]
    pub resource_type: Option<ResourceType>,
}
protocol_event!(NetworkRequestWillBeSent, "Network.requestWillBeSent");

/// A request finished loading.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLoadingFinished {
    /// Finished request id.
    pub request_id: NetworkRequestId,
}
protocol_event!(NetworkLoadingFinished, "Network.loadingFinished");

/// A request failed to load.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLoadingFailed {
    /// Failed request id.
    pub request_id: NetworkRequestId,
    /// Failure description.
    #[serde(default)]
    pub error_text: String,
    /// Whether the load was cancelled.
    #[serde(default)]
    pub canceled: bool,
}
protocol_event!(NetworkLoadingFailed, "Network.loadingFailed");

// ============================================================================
// Target Domain
// ============================================================================

/// Description of a target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Target id.
    pub target_id: TargetId,
    /// Target kind: `page`, `iframe`, `worker`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Current document title.
    #[serde(default)]
    pub title: String,
    /// Current document URL.
    #[serde(default)]
    pub url: String,
    /// Whether a controller is attached.
    #[serde(default)]
    pub attached: bool,
    /// Target that opened this one, if any.
    #[serde(default)]
    pub opener_id: Option<TargetId>,
}

/// A target appeared.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTargetCreated {
    /// The new target.
    pub target_info: TargetInfo,
}
protocol_event!(TargetTargetCreated, "Target.targetCreated");

/// A target was destroyed. Authoritative end-of-page signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTargetDestroyed {
    /// The destroyed target.
    pub target_id: TargetId,
}
protocol_event!(TargetTargetDestroyed, "Target.targetDestroyed");

/// A session detached from its target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetachedFromTarget {
    /// The detached session.
    pub session_id: SessionId,
}
protocol_event!(TargetDetachedFromTarget, "Target.detachedFromTarget");

// ============================================================================
// Tests
// ============================================================================
