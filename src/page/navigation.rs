//! Navigation, reload and the close handshake.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::events::{
    PageFrameNavigated, PageJavascriptDialogClosed, TargetInfo, TargetTargetCreated,
    TargetTargetDestroyed,
};
use crate::protocol::methods::{
    NavigationEntry, PageClose, PageGetNavigationHistory, PageNavigate,
    PageResetNavigationHistory, PageStopLoading, TargetActivateTarget,
};

use super::Page;
use super::evaluate::Eval;

// ============================================================================
// Constants
// ============================================================================

/// Pause between `Page.close` retries while the target navigates.
const CLOSE_RETRY_PAUSE: Duration = Duration::from_millis(100);

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Navigates to `url`; an empty string loads `about:blank`.
    ///
    /// Returns once the server responds with HTTP headers, not after the
    /// page load. Any in-flight load is stopped first, best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Navigation`] when the browser reports a load
    /// failure such as `net::ERR_NAME_NOT_RESOLVED`.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let url = if url.is_empty() { "about:blank" } else { url };

        let _ = self.stop_loading().await;

        debug!(url, target = %self.target_id, "navigating");
        let result = self
            .call(&PageNavigate {
                url: url.to_string(),
                referrer: None,
            })
            .await?;

        if let Some(text) = result.error_text
            && !text.is_empty()
        {
            return Err(Error::navigation(text));
        }

        // The old execution context is gone; the next evaluation
        // re-initializes it.
        self.unset_js_context().await;

        Ok(())
    }

    /// Reloads the page and waits for its frame to re-navigate.
    pub async fn reload(&self) -> Result<()> {
        let page = self.with_cancel();

        let frame_id = page.frame_id.clone();
        let wait = page.each_event(move |envelope| {
            Ok(envelope
                .decode::<PageFrameNavigated>()
                .is_some_and(|e| e.frame.id == frame_id))
        });

        // The protocol reload only applies to top-level frames; going
        // through the page's own realm works for iframes too.
        let triggered = page
            .evaluate(&Eval::new("() => location.reload()").by_user())
            .await;
        if let Err(e) = triggered {
            page.scope.cancel();
            return Err(e);
        }

        let waited = wait.await;
        page.scope.cancel();
        waited?;

        self.unset_js_context().await;
        Ok(())
    }

    /// Navigates one entry back in history.
    pub async fn navigate_back(&self) -> Result<()> {
        // Not the protocol API: it does not work for iframes.
        self.evaluate(&Eval::new("() => history.back()").by_user())
            .await?;
        Ok(())
    }

    /// Navigates one entry forward in history.
    pub async fn navigate_forward(&self) -> Result<()> {
        self.evaluate(&Eval::new("() => history.forward()").by_user())
            .await?;
        Ok(())
    }

    /// Stops the in-flight load and pending fetches.
    pub async fn stop_loading(&self) -> Result<()> {
        self.call(&PageStopLoading {}).await?;
        Ok(())
    }

    /// Reads the navigation history.
    pub async fn navigation_history(&self) -> Result<(i64, Vec<NavigationEntry>)> {
        let history = self.call(&PageGetNavigationHistory {}).await?;
        Ok((history.current_index, history.entries))
    }

    /// Clears the navigation history.
    pub async fn reset_navigation_history(&self) -> Result<()> {
        self.call(&PageResetNavigationHistory {}).await?;
        Ok(())
    }

    /// Focuses this page's target.
    pub async fn activate(&self) -> Result<()> {
        self.browser
            .execute(&TargetActivateTarget {
                target_id: self.target_id.clone(),
            })
            .await?;
        Ok(())
    }

    /// Target metadata such as the current URL and title.
    pub async fn info(&self) -> Result<TargetInfo> {
        self.browser.target_info(&self.target_id).await
    }
}

// ============================================================================
// Page - Close
// ============================================================================

impl Page {
    /// Closes the page, running its `beforeunload` hooks.
    ///
    /// Serialized across all pages by the browser's targets lock. The
    /// close command is retried while the browser reports the transient
    /// "not attached to an active page" state seen during navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PageCloseCanceled`] when a `beforeunload` handler
    /// kept the page open; the page stays usable.
    pub async fn close(&self) -> Result<()> {
        let _targets = self.browser.inner.targets_lock.lock().await;

        // Subscribe to the browser-wide stream before issuing the close,
        // so neither outcome signal can slip past.
        let watch_scope = self.scope.child();
        let mut messages = self.browser.events(&watch_scope);

        loop {
            match self.call(&PageClose {}).await {
                Err(e) if e.is_not_attached() => {
                    warn!(target = %self.target_id, "close while navigating, retrying");
                    self.scope.sleep(CLOSE_RETRY_PAUSE).await?;
                }
                Err(e) => return Err(e),
                Ok(_) => break,
            }
        }

        let mut success = true;
        loop {
            match messages.recv().await {
                Ok(Some(envelope)) => {
                    if let Some(destroyed) = envelope.decode::<TargetTargetDestroyed>() {
                        if destroyed.target_id == self.target_id {
                            break;
                        }
                    } else if envelope.is_for(&self.session_id)
                        && let Some(closed) = envelope.decode::<PageJavascriptDialogClosed>()
                    {
                        success = closed.result;
                        if !success {
                            break;
                        }
                    }
                }
                // Stream end or page scope cancelled: the target is gone.
                Ok(None) | Err(_) => break,
            }
        }
        watch_scope.cancel();

        if success {
            debug!(target = %self.target_id, "page closed");
            self.cleanup_states().await;
            Ok(())
        } else {
            Err(Error::PageCloseCanceled)
        }
    }

    /// Drops per-page cached state after the target is gone.
    pub(crate) async fn cleanup_states(&self) {
        *self.root_js_ctx.lock().await = None;
        self.helpers.lock().await.clear();
        *self.device_metrics.lock() = None;
    }
}

// ============================================================================
// Page - New Targets
// ============================================================================

impl Page {
    /// Subscribes now and returns a future resolving with the next page
    /// opened by this one (`window.open`, target=_blank).
    pub fn wait_open(&self) -> impl Future<Output = Result<Page>> + use<> {
        let browser = self.browser.clone();
        let opener = self.target_id.clone();
        let mut sub = browser.events(&self.scope);

        async move {
            loop {
                match sub.recv().await? {
                    Some(envelope) => {
                        if let Some(created) = envelope.decode::<TargetTargetCreated>()
                            && created.target_info.opener_id.as_ref() == Some(&opener)
                        {
                            return browser.attach_page(created.target_info.target_id).await;
                        }
                    }
                    None => return Err(Error::ConnectionClosed),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::core::tests::{stub_page, stub_page_with};
    use super::*;

    use serde_json::json;

    use crate::identifiers::SessionId;
    use crate::transport::pipe::AutoReply;

    fn session() -> SessionId {
        SessionId::from("S1")
    }

    #[tokio::test]
    async fn test_navigate_defaults_to_blank_and_stops_loading() {
        let (page, auto) = stub_page_with(|call| match call.method.as_str() {
            "Page.navigate" => AutoReply::Result(json!({ "frameId": "T1" })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        page.navigate("").await.expect("navigate");

        auto.wait_for_call("Page.stopLoading").await;
        let navigate = auto.wait_for_call("Page.navigate").await;
        assert_eq!(navigate.params["url"], "about:blank");
    }

    #[tokio::test]
    async fn test_navigate_error_text_is_distinct() {
        let (page, _auto) = stub_page_with(|call| match call.method.as_str() {
            "Page.navigate" => AutoReply::Result(json!({
                "frameId": "T1",
                "errorText": "net::ERR_NAME_NOT_RESOLVED"
            })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        let err = page.navigate("https://nope.invalid").await.unwrap_err();
        assert!(err.is_navigation());
    }

    #[tokio::test]
    async fn test_navigate_clears_js_context() {
        let (page, _auto) = stub_page_with(|call| match call.method.as_str() {
            "Page.navigate" => AutoReply::Result(json!({ "frameId": "T1" })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        *page.js_ctx.lock().await = Some(crate::identifiers::RemoteObjectId::from("CTX"));
        page.navigate("https://example.com").await.expect("navigate");

        assert!(page.js_ctx.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_reload_waits_for_own_frame() {
        let (page, auto) = stub_page_with(|call| match call.method.as_str() {
            "Runtime.evaluate" => AutoReply::Result(json!({
                "result": { "type": "object", "objectId": "WIN1" }
            })),
            "Runtime.callFunctionOn" => AutoReply::Result(json!({
                "result": { "type": "undefined" }
            })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        let driver = tokio::spawn({
            let page = page.clone();
            async move { page.reload().await }
        });

        // Wait for the reload evaluation to be issued, then emit a foreign
        // frame (ignored) and the page's own frame.
        auto.wait_for_call("Runtime.callFunctionOn").await;
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "OTHER", "url": "x" }
        }));
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "T1", "url": "about:blank" }
        }));

        driver.await.expect("join").expect("reload");
        assert!(page.js_ctx.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_close_success_on_target_destroyed() {
        let (page, auto) = stub_page().await;

        let driver = tokio::spawn({
            let page = page.clone();
            async move { page.close().await }
        });

        auto.wait_for_call("Page.close").await;
        auto.event(None, "Target.targetDestroyed", json!({ "targetId": "T1" }));

        driver.await.expect("join").expect("close");
    }

    #[tokio::test]
    async fn test_close_denied_by_beforeunload() {
        let (page, auto) = stub_page().await;

        let driver = tokio::spawn({
            let page = page.clone();
            async move { page.close().await }
        });

        auto.wait_for_call("Page.close").await;
        auto.event(Some(&session()), "Page.javascriptDialogClosed", json!({
            "result": false, "userInput": ""
        }));

        let err = driver.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::PageCloseCanceled));

        // The page is still alive: its scope was not cancelled.
        assert!(!page.scope().is_cancelled());
    }

    #[tokio::test]
    async fn test_close_retries_while_not_attached() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

        let (page, auto) = stub_page_with(|call| match call.method.as_str() {
            "Page.close" => {
                if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                    AutoReply::Error {
                        code: -32000,
                        message: "Not attached to an active page".into(),
                    }
                } else {
                    AutoReply::Result(json!({}))
                }
            }
            _ => AutoReply::Result(json!({})),
        })
        .await;

        let driver = tokio::spawn({
            let page = page.clone();
            async move { page.close().await }
        });

        auto.wait_for_calls("Page.close", 2).await;
        auto.event(None, "Target.targetDestroyed", json!({ "targetId": "T1" }));

        driver.await.expect("join").expect("close");
    }

    #[tokio::test]
    async fn test_wait_open_matches_opener() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_open();

        auto.event(None, "Target.targetCreated", json!({
            "targetInfo": { "targetId": "T9", "type": "page", "url": "", "openerId": "SOMEONE_ELSE" }
        }));
        auto.event(None, "Target.targetCreated", json!({
            "targetInfo": { "targetId": "T2", "type": "page", "url": "", "openerId": "T1" }
        }));

        let opened = wait.await.expect("wait open");
        assert_eq!(opened.target_id().as_str(), "T2");
    }
}
