//! Core Page struct, clones and scope plumbing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::broker::Broker;
use crate::browser::Browser;
use crate::error::Result;
use crate::identifiers::{FrameId, RemoteObjectId, SessionId, TargetId};
use crate::input::{KeyboardState, MouseState};
use crate::protocol::Envelope;
use crate::protocol::methods::{Command, EmulationSetDeviceMetricsOverride};
use crate::scope::{Scope, Sleeper};

use super::element::Element;

// ============================================================================
// Shared Handles
// ============================================================================

/// Mutable slot holding the current JS execution context (the realm's
/// `window` object id).
///
/// Shared by pointer between a page and its clones so a navigation on the
/// root clears it for all of them.
pub(crate) type JsContextSlot = Arc<AsyncMutex<Option<RemoteObjectId>>>;

/// Injected helper functions, keyed by execution context then helper name.
pub(crate) type HelpersMap =
    Arc<AsyncMutex<FxHashMap<RemoteObjectId, FxHashMap<&'static str, RemoteObjectId>>>>;

/// Stateful input devices of a page. One per attachment, shared by every
/// clone; state is locked across the emitting call so concurrent callers
/// never observe a half-updated modifier mask.
pub(crate) struct Devices {
    pub(crate) keyboard: AsyncMutex<KeyboardState>,
    pub(crate) mouse: AsyncMutex<MouseState>,
}

/// Refcounts of enabled protocol domains for one page.
#[derive(Default)]
pub(crate) struct DomainCounters {
    counts: Mutex<FxHashMap<&'static str, usize>>,
}

impl DomainCounters {
    /// Returns `true` if this acquisition is the first for `key`.
    pub(crate) fn acquire(&self, key: &'static str) -> bool {
        let mut counts = self.counts.lock();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns `true` if this release was the last for `key`.
    pub(crate) fn release(&self, key: &'static str) -> bool {
        let mut counts = self.counts.lock();
        match counts.get_mut(key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                counts.remove(key);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Page
// ============================================================================

/// Handle to one attached target.
///
/// Cloning produces an alias sharing the session, devices and JS context
/// slot; [`Page::with_cancel`] and [`Page::with_timeout`] derive aliases
/// with a narrower scope.
#[derive(Clone)]
pub struct Page {
    pub(crate) browser: Browser,
    pub(crate) target_id: TargetId,
    pub(crate) session_id: SessionId,
    pub(crate) frame_id: FrameId,
    pub(crate) scope: Scope,
    pub(crate) sleeper: Sleeper,
    /// Per-page event stream, fed by the session dispatcher.
    pub(crate) events: Broker<Envelope>,
    /// Current execution context; may be pinned to an iframe realm.
    pub(crate) js_ctx: JsContextSlot,
    /// The root frame's context slot; navigations clear through this one.
    pub(crate) root_js_ctx: JsContextSlot,
    pub(crate) helpers: HelpersMap,
    pub(crate) devices: Arc<Devices>,
    pub(crate) domains: Arc<DomainCounters>,
    /// Last device metrics override set through this page, for restore.
    pub(crate) device_metrics: Arc<Mutex<Option<EmulationSetDeviceMetricsOverride>>>,
    /// Host element when this page is an iframe view.
    pub(crate) host_element: Option<Arc<Element>>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("target_id", &self.target_id)
            .field("session_id", &self.session_id)
            .field("frame_id", &self.frame_id)
            .field("iframe", &self.is_iframe())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates the root page handle for a fresh attachment.
    pub(crate) fn new(
        browser: Browser,
        target_id: TargetId,
        session_id: SessionId,
        scope: Scope,
        events: Broker<Envelope>,
    ) -> Self {
        // The top-level frame id equals the target id.
        let frame_id = FrameId::from(target_id.as_str());
        let js_ctx: JsContextSlot = Arc::new(AsyncMutex::new(None));
        let sleeper = browser.inner.options.sleeper;

        Self {
            browser,
            target_id,
            session_id,
            frame_id,
            scope,
            sleeper,
            events,
            root_js_ctx: Arc::clone(&js_ctx),
            js_ctx,
            helpers: Arc::new(AsyncMutex::new(FxHashMap::default())),
            devices: Arc::new(Devices {
                keyboard: AsyncMutex::new(KeyboardState::default()),
                mouse: AsyncMutex::new(MouseState::default()),
            }),
            domains: Arc::new(DomainCounters::default()),
            device_metrics: Arc::new(Mutex::new(None)),
            host_element: None,
        }
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Target this page controls.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    /// Session namespacing this page's traffic.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Browsing context this page addresses.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    /// `true` when this handle views an iframe rather than the root frame.
    #[inline]
    #[must_use]
    pub fn is_iframe(&self) -> bool {
        self.host_element.is_some()
    }

    /// The page's cancellation scope.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Browser this page belongs to.
    #[inline]
    #[must_use]
    pub fn browser(&self) -> &Browser {
        &self.browser
    }
}

// ============================================================================
// Page - Scope Plumbing
// ============================================================================

impl Page {
    /// Returns an alias with its own child scope.
    ///
    /// Cancelling the alias (via [`Page::scope`]) aborts operations rooted
    /// on it without affecting this page.
    #[must_use]
    pub fn with_cancel(&self) -> Page {
        let mut page = self.clone();
        page.scope = self.scope.child();
        page
    }

    /// Returns an alias whose scope auto-cancels after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Page {
        let mut page = self.clone();
        page.scope = self.scope.child_with_timeout(timeout);
        page
    }

    /// Returns an alias using `sleeper` for poll-based waits.
    #[must_use]
    pub fn with_sleeper(&self, sleeper: Sleeper) -> Page {
        let mut page = self.clone();
        page.sleeper = sleeper;
        page
    }

    /// Pauses when the browser was configured with slow motion.
    pub(crate) async fn try_slow_motion(&self) {
        if let Some(delay) = self.browser.inner.options.slow_motion {
            let _ = self.scope.sleep(delay).await;
        }
    }
}

// ============================================================================
// Page - Calls
// ============================================================================

impl Page {
    /// Issues a typed command on this page's session.
    pub(crate) async fn call<C: Command>(&self, cmd: &C) -> Result<C::Result> {
        self.browser
            .execute_on(&self.scope, &self.session_id, cmd)
            .await
    }

    /// Issues a raw call on this page's session.
    pub(crate) async fn call_raw(&self, method: &str, params: Value) -> Result<Value> {
        self.browser
            .inner
            .connection
            .call(&self.scope, Some(&self.session_id), method, params)
            .await
    }
}

// ============================================================================
// Domain Guards
// ============================================================================

/// Scoped acquisition of a protocol domain.
///
/// Domains enabled by a wait are restored on exit: the last guard of a
/// domain issues the disable call. Prefer [`DomainGuard::release`]; a
/// plain drop disables in a background task.
#[must_use = "dropping the guard disables the domain immediately"]
pub struct DomainGuard {
    page: Page,
    key: &'static str,
    disable_method: &'static str,
    released: bool,
}

impl DomainGuard {
    /// Releases the acquisition, disabling the domain if this was the
    /// last holder. The disable outcome is ignored, matching best-effort
    /// restore semantics.
    pub async fn release(mut self) {
        self.released = true;
        if self.page.domains.release(self.key) {
            let _ = self
                .page
                .call_raw(self.disable_method, serde_json::json!({}))
                .await;
        }
    }
}

impl Drop for DomainGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.page.domains.release(self.key) {
            let page = self.page.clone();
            let method = self.disable_method;
            tokio::spawn(async move {
                let _ = page.call_raw(method, serde_json::json!({})).await;
            });
        }
    }
}

impl Page {
    /// Enables a domain, refcounted per page.
    ///
    /// The first acquisition issues `enable`; the guard's release issues
    /// `disable_method` once no holder remains.
    pub(crate) async fn enable_domain<C: Command>(
        &self,
        enable: &C,
        disable_method: &'static str,
    ) -> Result<DomainGuard> {
        if self.domains.acquire(C::METHOD)
            && let Err(e) = self.call(enable).await
        {
            self.domains.release(C::METHOD);
            return Err(e);
        }

        Ok(DomainGuard {
            page: self.clone(),
            key: C::METHOD,
            disable_method,
            released: false,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::methods::PageEnable;
    use crate::transport::Connection;
    use crate::transport::pipe::{AutoPipe, AutoReply};

    /// Attached page over an auto-responding pipe.
    pub(crate) async fn stub_page() -> (Page, AutoPipe) {
        stub_page_with(|_| AutoReply::Result(json!({}))).await
    }

    pub(crate) async fn stub_page_with<F>(responder: F) -> (Page, AutoPipe)
    where
        F: Fn(&crate::transport::pipe::Outgoing) -> AutoReply + Send + 'static,
    {
        let (conn, pipe) = Connection::pipe();
        let auto = pipe.auto_with(move |call| match call.method.as_str() {
            "Target.createTarget" => AutoReply::Result(json!({ "targetId": "T1" })),
            "Target.attachToTarget" => AutoReply::Result(json!({ "sessionId": "S1" })),
            _ => responder(call),
        });
        let browser = Browser::over(conn);
        let page = browser.new_page("").await.expect("new page");
        (page, auto)
    }

    #[tokio::test]
    async fn test_clone_shares_js_ctx_slot() {
        let (page, _auto) = stub_page().await;
        let clone = page.clone();

        *page.js_ctx.lock().await = Some(RemoteObjectId::from("CTX1"));
        assert_eq!(
            clone.js_ctx.lock().await.clone(),
            Some(RemoteObjectId::from("CTX1"))
        );
    }

    #[tokio::test]
    async fn test_with_cancel_narrows_scope() {
        let (page, _auto) = stub_page().await;
        let narrow = page.with_cancel();

        narrow.scope().cancel();
        assert!(narrow.scope().is_cancelled());
        assert!(!page.scope().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_auto_cancels() {
        let (page, _auto) = stub_page().await;
        let bounded = page.with_timeout(Duration::from_millis(20));

        bounded.scope().cancelled().await;
        assert!(!page.scope().is_cancelled());
    }

    #[tokio::test]
    async fn test_domain_guard_refcounts() {
        use crate::protocol::methods::DomSnapshotEnable;

        let (page, auto) = stub_page().await;

        let a = page
            .enable_domain(&DomSnapshotEnable {}, "DOMSnapshot.disable")
            .await
            .expect("enable");
        let b = page
            .enable_domain(&DomSnapshotEnable {}, "DOMSnapshot.disable")
            .await
            .expect("enable");

        // Only the first acquisition issued the enable call.
        assert_eq!(auto.calls_of("DOMSnapshot.enable").len(), 1);

        b.release().await;
        assert!(auto.calls_of("DOMSnapshot.disable").is_empty());

        a.release().await;
        auto.wait_for_call("DOMSnapshot.disable").await;
    }

    #[tokio::test]
    async fn test_page_domain_survives_scoped_acquisition() {
        let (page, auto) = stub_page().await;

        // The attachment holds Page.enable; a wait's acquisition must not
        // disable it on restore.
        let guard = page
            .enable_domain(&PageEnable {}, "Page.disable")
            .await
            .expect("enable");
        guard.release().await;

        assert!(auto.calls_of("Page.disable").is_empty());
    }
}
