//! Typed command params and results.
//!
//! Each command struct serializes to the `params` object of a call and
//! names its wire method plus the result shape it deserializes. Commands
//! are issued through the page (session-addressed) or through
//! [`Browser::execute`](crate::browser::Browser::execute).
//!
//! Only the subset of the protocol this crate consumes is modeled here;
//! unknown response fields are ignored by serde.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{FrameId, RemoteObjectId, SessionId, TargetId, WindowId};

// ============================================================================
// Command
// ============================================================================

/// A typed protocol command.
pub trait Command: Serialize {
    /// Wire method in `Domain.method` format.
    const METHOD: &'static str;

    /// Shape of the success result.
    type Result: serde::de::DeserializeOwned;
}

/// Result of commands that return no data.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Empty {}

macro_rules! command {
    ($name:ident, $method:literal, $result:ty) => {
        impl Command for $name {
            const METHOD: &'static str = $method;
            type Result = $result;
        }
    };
}

// ============================================================================
// Geometry
// ============================================================================

/// A point in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    #[inline]
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference.
    #[inline]
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scales both components.
    #[inline]
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// A size in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Size {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Capture clip region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Page scale factor.
    pub scale: f64,
}

/// Axis-aligned box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Visual viewport metrics.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualViewport {
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub client_width: f64,
    #[serde(default)]
    pub client_height: f64,
}

// ============================================================================
// Page Domain
// ============================================================================

/// Enables page domain notifications.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageEnable {}
command!(PageEnable, "Page.enable", Empty);

/// Disables page domain notifications.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageDisable {}
command!(PageDisable, "Page.disable", Empty);

/// Navigates the frame to a URL.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNavigate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Result of [`PageNavigate`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNavigateResult {
    /// Frame the navigation committed in.
    pub frame_id: FrameId,
    /// Non-empty when the navigation failed at the HTTP layer.
    #[serde(default)]
    pub error_text: Option<String>,
}
command!(PageNavigate, "Page.navigate", PageNavigateResult);

/// Stops the in-flight load and pending resource fetches.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageStopLoading {}
command!(PageStopLoading, "Page.stopLoading", Empty);

/// Asks the page to close, running beforeunload handlers.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageClose {}
command!(PageClose, "Page.close", Empty);

/// Toggles lifecycle event delivery.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetLifecycleEventsEnabled {
    pub enabled: bool,
}
command!(PageSetLifecycleEventsEnabled, "Page.setLifecycleEventsEnabled", Empty);

/// Toggles file chooser interception.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetInterceptFileChooserDialog {
    pub enabled: bool,
}
command!(
    PageSetInterceptFileChooserDialog,
    "Page.setInterceptFileChooserDialog",
    Empty
);

/// Answers an open JavaScript dialog.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHandleJavaScriptDialog {
    pub accept: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
}
command!(PageHandleJavaScriptDialog, "Page.handleJavaScriptDialog", Empty);

/// Screenshot formats accepted by [`PageCaptureScreenshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

/// Captures a screenshot of the visible viewport or a clip.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCaptureScreenshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ScreenshotFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_surface: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_beyond_viewport: Option<bool>,
}

/// Result of [`PageCaptureScreenshot`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCaptureScreenshotResult {
    /// Base64-encoded image data.
    pub data: String,
}
command!(PageCaptureScreenshot, "Page.captureScreenshot", PageCaptureScreenshotResult);

/// Queries layout metrics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageGetLayoutMetrics {}

/// Result of [`PageGetLayoutMetrics`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGetLayoutMetricsResult {
    /// Document content size in CSS pixels.
    #[serde(default)]
    pub css_content_size: Option<Size>,
    /// Visual viewport in CSS pixels.
    #[serde(default)]
    pub css_visual_viewport: Option<VisualViewport>,
}
command!(PageGetLayoutMetrics, "Page.getLayoutMetrics", PageGetLayoutMetricsResult);

/// Fetches the content of a resource loaded by the frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGetResourceContent {
    pub frame_id: FrameId,
    pub url: String,
}

/// Result of [`PageGetResourceContent`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGetResourceContentResult {
    pub content: String,
    #[serde(default)]
    pub base64_encoded: bool,
}
command!(PageGetResourceContent, "Page.getResourceContent", PageGetResourceContentResult);

/// Registers a script evaluated on every new document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAddScriptToEvaluateOnNewDocument {
    pub source: String,
}

/// Result of [`PageAddScriptToEvaluateOnNewDocument`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAddScriptToEvaluateOnNewDocumentResult {
    pub identifier: String,
}
command!(
    PageAddScriptToEvaluateOnNewDocument,
    "Page.addScriptToEvaluateOnNewDocument",
    PageAddScriptToEvaluateOnNewDocumentResult
);

/// Removes a script registered on new documents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRemoveScriptToEvaluateOnNewDocument {
    pub identifier: String,
}
command!(
    PageRemoveScriptToEvaluateOnNewDocument,
    "Page.removeScriptToEvaluateOnNewDocument",
    Empty
);

/// Replaces the frame's document HTML.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetDocumentContent {
    pub frame_id: FrameId,
    pub html: String,
}
command!(PageSetDocumentContent, "Page.setDocumentContent", Empty);

/// Reads the navigation history.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageGetNavigationHistory {}

/// One history entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Result of [`PageGetNavigationHistory`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGetNavigationHistoryResult {
    pub current_index: i64,
    pub entries: Vec<NavigationEntry>,
}
command!(PageGetNavigationHistory, "Page.getNavigationHistory", PageGetNavigationHistoryResult);

/// Clears the navigation history.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageResetNavigationHistory {}
command!(PageResetNavigationHistory, "Page.resetNavigationHistory", Empty);

// ============================================================================
// Emulation Domain
// ============================================================================

/// Overrides device screen dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulationSetDeviceMetricsOverride {
    pub width: u64,
    pub height: u64,
    pub device_scale_factor: f64,
    pub mobile: bool,
}
command!(
    EmulationSetDeviceMetricsOverride,
    "Emulation.setDeviceMetricsOverride",
    Empty
);

/// Clears the device metrics override.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EmulationClearDeviceMetricsOverride {}
command!(
    EmulationClearDeviceMetricsOverride,
    "Emulation.clearDeviceMetricsOverride",
    Empty
);

// ============================================================================
// DOMSnapshot Domain
// ============================================================================

/// Enables the DOM snapshot domain. Idempotent.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DomSnapshotEnable {}
command!(DomSnapshotEnable, "DOMSnapshot.enable", Empty);

/// Captures a flattened document snapshot.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshotCaptureSnapshot {
    /// Computed style allow-list; empty captures none.
    pub computed_styles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_paint_order: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_dom_rects: Option<bool>,
}

/// Result of [`DomSnapshotCaptureSnapshot`].
///
/// `strings` is the shared table every string property in `documents`
/// indexes into; stability comparison works on the table alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshotCaptureSnapshotResult {
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub strings: Vec<String>,
}
command!(
    DomSnapshotCaptureSnapshot,
    "DOMSnapshot.captureSnapshot",
    DomSnapshotCaptureSnapshotResult
);

// ============================================================================
// Network Domain
// ============================================================================

/// Enables network event delivery.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEnable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_post_data_size: Option<u64>,
}
command!(NetworkEnable, "Network.enable", Empty);

/// Disables network event delivery.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NetworkDisable {}
command!(NetworkDisable, "Network.disable", Empty);

/// A cookie as reported by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub expires: f64,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

/// Cookie parameters for [`NetworkSetCookies`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieParam {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
}

/// Reads cookies visible to the given URLs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkGetCookies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Result of [`NetworkGetCookies`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkGetCookiesResult {
    pub cookies: Vec<Cookie>,
}
command!(NetworkGetCookies, "Network.getCookies", NetworkGetCookiesResult);

/// Sets multiple cookies.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSetCookies {
    pub cookies: Vec<CookieParam>,
}
command!(NetworkSetCookies, "Network.setCookies", Empty);

/// Clears all browser cookies.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NetworkClearBrowserCookies {}
command!(NetworkClearBrowserCookies, "Network.clearBrowserCookies", Empty);

/// Sends extra HTTP headers with every request from this page.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSetExtraHttpHeaders {
    pub headers: serde_json::Map<String, Value>,
}
command!(NetworkSetExtraHttpHeaders, "Network.setExtraHTTPHeaders", Empty);

/// Overrides the user agent string.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSetUserAgentOverride {
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}
command!(NetworkSetUserAgentOverride, "Network.setUserAgentOverride", Empty);

/// Blocks requests whose URL matches any of the patterns.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSetBlockedUrls {
    pub urls: Vec<String>,
}
command!(NetworkSetBlockedUrls, "Network.setBlockedURLs", Empty);

// ============================================================================
// Runtime Domain
// ============================================================================

/// A remote JavaScript value or object reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// JS type: `object`, `function`, `string`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Reference id; absent for primitive values.
    #[serde(default)]
    pub object_id: Option<RemoteObjectId>,
    /// Primitive value, when returned by value.
    #[serde(default)]
    pub value: Value,
    /// Object subtype, e.g. `node`.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Preview description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Exception details when an evaluation throws.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best-effort human-readable exception text.
    #[must_use]
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

/// Evaluates an expression in the page.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvaluate {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

/// Result of [`RuntimeEvaluate`] and [`RuntimeCallFunctionOn`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvaluateResult {
    #[serde(default)]
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}
command!(RuntimeEvaluate, "Runtime.evaluate", RuntimeEvaluateResult);

/// Argument to [`RuntimeCallFunctionOn`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

/// Calls a function with a given receiver object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCallFunctionOn {
    pub function_declaration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<CallArgument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
}
command!(RuntimeCallFunctionOn, "Runtime.callFunctionOn", RuntimeEvaluateResult);

/// Releases a remote object reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeReleaseObject {
    pub object_id: RemoteObjectId,
}
command!(RuntimeReleaseObject, "Runtime.releaseObject", Empty);

// ============================================================================
// DOM Domain
// ============================================================================

/// Assigns files to a file input element.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSetFileInputFiles {
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}
command!(DomSetFileInputFiles, "DOM.setFileInputFiles", Empty);

/// Describes the node behind a remote object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomDescribeNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

/// Node description subset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub backend_node_id: Option<i64>,
    /// Content document frame, for `<iframe>` nodes.
    #[serde(default)]
    pub frame_id: Option<FrameId>,
}

/// Result of [`DomDescribeNode`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomDescribeNodeResult {
    pub node: NodeDescription,
}
command!(DomDescribeNode, "DOM.describeNode", DomDescribeNodeResult);

/// Reads the content quads of an element.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomGetContentQuads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

/// Result of [`DomGetContentQuads`]: quads as flat `[x1,y1,...,x4,y4]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomGetContentQuadsResult {
    #[serde(default)]
    pub quads: Vec<Vec<f64>>,
}
command!(DomGetContentQuads, "DOM.getContentQuads", DomGetContentQuadsResult);

/// Scrolls the element's node into view if needed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomScrollIntoViewIfNeeded {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}
command!(DomScrollIntoViewIfNeeded, "DOM.scrollIntoViewIfNeeded", Empty);

// ============================================================================
// Input Domain
// ============================================================================

/// Key event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
    RawKeyDown,
    Char,
}

/// Dispatches a key event to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDispatchKeyEvent {
    #[serde(rename = "type")]
    pub kind: KeyEventKind,
    pub modifiers: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<u32>,
}
command!(InputDispatchKeyEvent, "Input.dispatchKeyEvent", Empty);

/// Mouse event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventKind {
    MousePressed,
    MouseReleased,
    MouseMoved,
    MouseWheel,
}

/// Mouse buttons as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    None,
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

impl MouseButton {
    /// Bit in the `buttons` bitmask.
    #[must_use]
    pub fn bit(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Left => 1,
            Self::Right => 2,
            Self::Middle => 4,
            Self::Back => 8,
            Self::Forward => 16,
        }
    }
}

/// Dispatches a mouse event to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDispatchMouseEvent {
    #[serde(rename = "type")]
    pub kind: MouseEventKind,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}
command!(InputDispatchMouseEvent, "Input.dispatchMouseEvent", Empty);

/// Touch event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TouchEventKind {
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
}

/// One finger in a touch event.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<f64>,
}

/// Dispatches a touch event to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDispatchTouchEvent {
    #[serde(rename = "type")]
    pub kind: TouchEventKind,
    pub touch_points: Vec<TouchPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<u8>,
}
command!(InputDispatchTouchEvent, "Input.dispatchTouchEvent", Empty);

/// Inserts text as if pasted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInsertText {
    pub text: String,
}
command!(InputInsertText, "Input.insertText", Empty);

// ============================================================================
// Target Domain
// ============================================================================

/// Opens a new target.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreateTarget {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
}

/// Result of [`TargetCreateTarget`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreateTargetResult {
    pub target_id: TargetId,
}
command!(TargetCreateTarget, "Target.createTarget", TargetCreateTargetResult);

/// Attaches a controller to a target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAttachToTarget {
    pub target_id: TargetId,
    /// Must be `true`: traffic multiplexes over the shared transport.
    pub flatten: bool,
}

/// Result of [`TargetAttachToTarget`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAttachToTargetResult {
    pub session_id: SessionId,
}
command!(TargetAttachToTarget, "Target.attachToTarget", TargetAttachToTargetResult);

/// Focuses a target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetActivateTarget {
    pub target_id: TargetId,
}
command!(TargetActivateTarget, "Target.activateTarget", Empty);

/// Lists all targets.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TargetGetTargets {}

/// Result of [`TargetGetTargets`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGetTargetsResult {
    pub target_infos: Vec<super::events::TargetInfo>,
}
command!(TargetGetTargets, "Target.getTargets", TargetGetTargetsResult);

/// Reads one target's description.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGetTargetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
}

/// Result of [`TargetGetTargetInfo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGetTargetInfoResult {
    pub target_info: super::events::TargetInfo,
}
command!(TargetGetTargetInfo, "Target.getTargetInfo", TargetGetTargetInfoResult);

// ============================================================================
// Browser Domain
// ============================================================================

/// OS window show states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
}

/// OS window position and size.
///
/// Fields are optional both ways: the browser omits ones it cannot
/// report, and a set call applies only the fields present. Position and
/// size are ignored unless the state is `Normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_state: Option<WindowState>,
}

/// Resolves the OS window hosting a target.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserGetWindowForTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
}

/// Result of [`BrowserGetWindowForTarget`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserGetWindowForTargetResult {
    pub window_id: WindowId,
    #[serde(default)]
    pub bounds: WindowBounds,
}
command!(
    BrowserGetWindowForTarget,
    "Browser.getWindowForTarget",
    BrowserGetWindowForTargetResult
);

/// Reads an OS window's bounds.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserGetWindowBounds {
    pub window_id: WindowId,
}

/// Result of [`BrowserGetWindowBounds`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserGetWindowBoundsResult {
    pub bounds: WindowBounds,
}
command!(
    BrowserGetWindowBounds,
    "Browser.getWindowBounds",
    BrowserGetWindowBoundsResult
);

/// Moves, resizes or changes the state of an OS window.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSetWindowBounds {
    pub window_id: WindowId,
    pub bounds: WindowBounds,
}
command!(BrowserSetWindowBounds, "Browser.setWindowBounds", Empty);

/// Reads browser version metadata.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BrowserGetVersion {}

/// Result of [`BrowserGetVersion`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserGetVersionResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub user_agent: String,
}
command!(BrowserGetVersion, "Browser.getVersion", BrowserGetVersionResult);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_result_decode() {
        let json = serde_json::json!({ "frameId": "F1", "loaderId": "L1", "errorText": "net::ERR_ABORTED" });
        let result: PageNavigateResult = serde_json::from_value(json).expect("decode");
        assert_eq!(result.error_text.as_deref(), Some("net::ERR_ABORTED"));
    }

    #[test]
    fn test_mouse_event_serialization() {
        let event = InputDispatchMouseEvent {
            kind: MouseEventKind::MousePressed,
            x: 10.0,
            y: 20.0,
            button: Some(MouseButton::Left),
            buttons: Some(1),
            click_count: Some(1),
            modifiers: Some(8),
            delta_x: None,
            delta_y: None,
        };

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "mousePressed");
        assert_eq!(json["button"], "left");
        assert_eq!(json["buttons"], 1);
        assert_eq!(json["modifiers"], 8);
        assert!(json.get("deltaX").is_none());
    }

    #[test]
    fn test_mouse_button_bits() {
        assert_eq!(MouseButton::Left.bit(), 1);
        assert_eq!(MouseButton::Right.bit(), 2);
        assert_eq!(MouseButton::Middle.bit(), 4);
        assert_eq!(MouseButton::None.bit(), 0);
    }

    #[test]
    fn test_key_event_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(KeyEventKind::KeyDown).expect("serialize"),
            "keyDown"
        );
        assert_eq!(
            serde_json::to_value(KeyEventKind::RawKeyDown).expect("serialize"),
            "rawKeyDown"
        );
    }

    #[test]
    fn test_screenshot_format_wire_names() {
        assert_eq!(
            serde_json::to_value(ScreenshotFormat::Jpeg).expect("serialize"),
            "jpeg"
        );
    }

    #[test]
    fn test_empty_result_ignores_fields() {
        let _: Empty = serde_json::from_str("{}").expect("decode");
        let _: Empty = serde_json::from_str(r#"{"extra":1}"#).expect("decode");
    }

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(0.0, 0.0);
        let step = Point::new(6.0, 6.0).minus(p).scale(1.0 / 3.0);
        assert_eq!(p.add(step), Point::new(2.0, 2.0));
    }

    #[test]
    fn test_window_bounds_serialization() {
        let set = BrowserSetWindowBounds {
            window_id: WindowId(7),
            bounds: WindowBounds {
                left: Some(10),
                top: Some(20),
                width: None,
                height: None,
                window_state: Some(WindowState::Normal),
            },
        };

        let json = serde_json::to_value(&set).expect("serialize");
        assert_eq!(json["windowId"], 7);
        assert_eq!(json["bounds"]["left"], 10);
        assert_eq!(json["bounds"]["windowState"], "normal");
        assert!(json["bounds"].get("width").is_none());
    }

    #[test]
    fn test_window_for_target_result_decode() {
        let json = serde_json::json!({
            "windowId": 3,
            "bounds": { "left": 0, "top": 0, "width": 1280, "height": 720, "windowState": "maximized" }
        });

        let result: BrowserGetWindowForTargetResult =
            serde_json::from_value(json).expect("decode");
        assert_eq!(result.window_id, WindowId(3));
        assert_eq!(result.bounds.window_state, Some(WindowState::Maximized));
    }

    #[test]
    fn test_command_method_names() {
        assert_eq!(PageNavigate::METHOD, "Page.navigate");
        assert_eq!(DomSnapshotCaptureSnapshot::METHOD, "DOMSnapshot.captureSnapshot");
        assert_eq!(NetworkSetExtraHttpHeaders::METHOD, "Network.setExtraHTTPHeaders");
    }
}
