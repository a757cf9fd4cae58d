//! Wait primitives.
//!
//! Every primitive follows the two-step pattern: the subscription to the
//! page's event stream is taken synchronously when the primitive is
//! built, and the returned future performs the wait. Trigger the observed
//! action *between* the two steps and no event can be missed:
//!
//! ```ignore
//! let wait = page.wait_event::<PageFrameNavigated>();   // step 1: subscribe
//! page.navigate("https://example.com").await?;          // trigger
//! let event = wait.await?;                              // step 2: wait
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::NetworkRequestId;
use crate::protocol::Envelope;
use crate::protocol::events::{
    LifecycleEventName, NetworkLoadingFailed, NetworkLoadingFinished, NetworkRequestWillBeSent,
    PageLifecycleEvent, ProtocolEvent, ResourceType,
};
use crate::protocol::methods::{
    DomSnapshotCaptureSnapshot, DomSnapshotCaptureSnapshotResult, DomSnapshotEnable,
    PageSetLifecycleEventsEnabled,
};

use super::evaluate::Eval;
use super::Page;

// ============================================================================
// Constants
// ============================================================================

/// Resource types ignored by request-idle waits unless overridden:
/// long-lived or decorative loads that would keep the counter busy.
pub const DEFAULT_EXCLUDED_TYPES: &[ResourceType] = &[
    ResourceType::WebSocket,
    ResourceType::EventSource,
    ResourceType::Media,
    ResourceType::Image,
    ResourceType::Font,
];

/// JS helper resolving once `window.onload` has fired.
const JS_WAIT_LOAD: &str = "() => new Promise(resolve => {
    if (document.readyState === 'complete') return resolve();
    window.addEventListener('load', () => resolve(), { once: true });
})";

/// JS helper resolving on the next idle callback.
const JS_WAIT_IDLE: &str =
    "ms => new Promise(resolve => window.requestIdleCallback(() => resolve(), { timeout: ms }))";

// ============================================================================
// Page - Event Waits
// ============================================================================

impl Page {
    /// Subscribes now and returns a future resolving on the next event of
    /// shape `E` on this session.
    pub fn wait_event<E: ProtocolEvent>(&self) -> impl Future<Output = Result<E>> + use<E> {
        let mut sub = self.events.subscribe(&self.scope);

        async move {
            loop {
                match sub.recv().await? {
                    Some(envelope) => {
                        if let Some(event) = envelope.decode::<E>() {
                            return Ok(event);
                        }
                    }
                    None => return Err(Error::ConnectionClosed),
                }
            }
        }
    }

    /// Subscribes now and returns a future feeding every envelope on this
    /// session to `handler` until it returns `Ok(true)`.
    ///
    /// The future also resolves (with `Ok(())`) when the page's event
    /// stream ends, and fails with
    /// [`Error::Cancelled`] when the scope does.
    pub fn each_event<F>(&self, mut handler: F) -> impl Future<Output = Result<()>> + use<F>
    where
        F: FnMut(&Envelope) -> Result<bool>,
    {
        let mut sub = self.events.subscribe(&self.scope);

        async move {
            loop {
                match sub.recv().await? {
                    Some(envelope) => {
                        if handler(&envelope)? {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                }
            }
        }
    }

    /// Enables lifecycle events and returns a future resolving on the
    /// named milestone, usually
    /// [`LifecycleEventName::NetworkAlmostIdle`]. Lifecycle events are
    /// disabled again when the wait resolves.
    pub async fn wait_navigation(
        &self,
        name: LifecycleEventName,
    ) -> Result<impl Future<Output = Result<()>> + use<>> {
        self.call(&PageSetLifecycleEventsEnabled { enabled: true })
            .await?;

        let wanted = name.as_str();
        let wait = self.each_event(move |envelope| {
            Ok(envelope
                .decode::<PageLifecycleEvent>()
                .is_some_and(|e| e.name == wanted))
        });

        let page = self.clone();
        Ok(async move {
            let result = wait.await;
            // Restore regardless of how the wait ended.
            let _ = page
                .call(&PageSetLifecycleEventsEnabled { enabled: false })
                .await;
            result
        })
    }
}

// ============================================================================
// Page - Request Idle
// ============================================================================

impl Page {
    /// Subscribes now and returns a future resolving once no tracked
    /// request has been in flight for `idle` continuously.
    ///
    /// `idle` is the minimum idle gap, not a timeout; bound the wait with
    /// [`Page::with_timeout`] if needed. `includes`/`excludes` are regex
    /// filters over request URLs (empty `includes` matches everything).
    /// `exclude_types` defaults to [`DEFAULT_EXCLUDED_TYPES`].
    ///
    /// Redirects reuse their request id and are counted once.
    pub fn wait_request_idle(
        &self,
        idle: Duration,
        includes: &[&str],
        excludes: &[&str],
        exclude_types: Option<&[ResourceType]>,
    ) -> impl Future<Output = Result<()>> + use<> {
        let includes: Vec<String> = if includes.is_empty() {
            vec![String::new()]
        } else {
            includes.iter().map(|s| (*s).to_string()).collect()
        };
        let excludes: Vec<String> = excludes.iter().map(|s| (*s).to_string()).collect();
        let excluded_types: Vec<ResourceType> = exclude_types
            .unwrap_or(DEFAULT_EXCLUDED_TYPES)
            .to_vec();

        let mut sub = self.events.subscribe(&self.scope);

        async move {
            let includes = compile_all(&includes)?;
            let excludes = compile_all(&excludes)?;

            let mut waiting: FxHashMap<NetworkRequestId, String> = FxHashMap::default();
            // The set starts empty, so the idle gap is armed immediately.
            let mut idle_at = Instant::now() + idle;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(idle_at), if waiting.is_empty() => {
                        return Ok(());
                    }

                    received = sub.recv() => {
                        let Some(envelope) = received? else {
                            return Err(Error::ConnectionClosed);
                        };

                        if let Some(sent) = envelope.decode::<NetworkRequestWillBeSent>() {
                            if sent
                                .resource_type
                                .is_some_and(|t| excluded_types.contains(&t))
                            {
                                continue;
                            }
                            if !url_matches(&sent.request.url, &includes, &excludes) {
                                continue;
                            }
                            // Redirects reuse ids; count each request once.
                            if !waiting.contains_key(&sent.request_id) {
                                trace!(id = %sent.request_id, url = %sent.request.url, "request in flight");
                                waiting.insert(sent.request_id, sent.request.url);
                            }
                        } else if let Some(finished) = envelope.decode::<NetworkLoadingFinished>() {
                            settle(&mut waiting, &finished.request_id, idle, &mut idle_at);
                        } else if let Some(failed) = envelope.decode::<NetworkLoadingFailed>() {
                            settle(&mut waiting, &failed.request_id, idle, &mut idle_at);
                        }
                    }
                }
            }
        }
    }
}

/// Removes a settled request; re-arms the idle gap when the set empties.
fn settle(
    waiting: &mut FxHashMap<NetworkRequestId, String>,
    id: &NetworkRequestId,
    idle: Duration,
    idle_at: &mut Instant,
) {
    if waiting.remove(id).is_some() && waiting.is_empty() {
        *idle_at = Instant::now() + idle;
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<regex::Regex>> {
    patterns
        .iter()
        .map(|p| {
            regex::Regex::new(p)
                .map_err(|e| Error::protocol(format!("invalid url filter {p:?}: {e}")))
        })
        .collect()
}

fn url_matches(url: &str, includes: &[regex::Regex], excludes: &[regex::Regex]) -> bool {
    includes.iter().any(|re| re.is_match(url)) && !excludes.iter().any(|re| re.is_match(url))
}

// ============================================================================
// Page - DOM Stability
// ============================================================================

impl Page {
    /// Captures a flattened DOM snapshot.
    ///
    /// The enable call's outcome is ignored; enabling an already enabled
    /// domain is idempotent.
    pub async fn capture_dom_snapshot(&self) -> Result<DomSnapshotCaptureSnapshotResult> {
        let _ = self.call(&DomSnapshotEnable {}).await;

        self.call(&DomSnapshotCaptureSnapshot {
            computed_styles: Vec::new(),
            include_paint_order: Some(true),
            include_dom_rects: Some(true),
        })
        .await
    }

    /// Waits until the DOM changes by at most `max_diff` (a ratio in
    /// `0..=1`) across a window of `interval`.
    ///
    /// `interval` is the minimum stable time, not a timeout. The change
    /// ratio is computed over the snapshot's shared string table via
    /// longest common subsequence, which is cheap and resistant to
    /// attribute reshuffling.
    pub async fn wait_dom_stable(&self, interval: Duration, max_diff: f64) -> Result<()> {
        let mut previous = self.capture_dom_snapshot().await?.strings;

        loop {
            self.scope.sleep(interval).await?;

            let current = self.capture_dom_snapshot().await?.strings;
            let diff = change_ratio(&previous, &current);
            debug!(diff, "dom stability probe");

            if diff <= max_diff {
                return Ok(());
            }
            previous = current;
        }
    }

    /// Waits until the page is stable for `interval`: loaded, no request
    /// in flight, and an unchanged DOM.
    pub async fn wait_stable(&self, interval: Duration) -> Result<()> {
        let (load, idle, dom) = tokio::join!(
            self.wait_load(),
            self.wait_request_idle(interval, &[], &[], None),
            self.wait_dom_stable(interval, 0.0),
        );

        load.and(idle).and(dom)
    }
}

/// `1 − lcs(prev, curr) / len(curr)`; zero when both tables are empty.
fn change_ratio(previous: &[String], current: &[String]) -> f64 {
    if current.is_empty() {
        return if previous.is_empty() { 0.0 } else { 1.0 };
    }
    1.0 - lcs_len(previous, current) as f64 / current.len() as f64
}

/// Longest-common-subsequence length over two string tables.
///
/// Common prefix and suffix are trimmed first; the remainder runs the
/// classic two-row dynamic program.
fn lcs_len(a: &[String], b: &[String]) -> usize {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let a = &a[prefix..];
    let b = &b[prefix..];

    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a = &a[..a.len() - suffix];
    let b = &b[..b.len() - suffix];

    let mut row = vec![0usize; b.len() + 1];
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }

    prefix + suffix + row[b.len()]
}

// ============================================================================
// Page - Poll Waits
// ============================================================================

impl Page {
    /// Waits for the `window.onload` event; resolves immediately if it
    /// already fired.
    pub async fn wait_load(&self) -> Result<()> {
        self.call_helper("waitLoad", JS_WAIT_LOAD, Vec::new())
            .await?;
        Ok(())
    }

    /// Waits until the next `window.requestIdleCallback` fires, at most
    /// `timeout` later.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<()> {
        self.call_helper(
            "waitIdle",
            JS_WAIT_IDLE,
            vec![json!(timeout.as_millis() as u64)],
        )
        .await?;
        Ok(())
    }

    /// Waits until the next repaint.
    ///
    /// Runs on the root frame; iframes do not fire
    /// `requestAnimationFrame` while throttled.
    pub async fn wait_repaint(&self) -> Result<()> {
        self.root_view()
            .eval("() => new Promise(resolve => requestAnimationFrame(() => resolve()))")
            .await?;
        Ok(())
    }

    /// Polls `opts` via the page sleeper until it evaluates truthy.
    pub async fn wait(&self, opts: &Eval) -> Result<()> {
        let mut backoff = self.sleeper.start();

        loop {
            let result = self.evaluate(opts).await?;
            if result.value.as_bool().unwrap_or(false) {
                return Ok(());
            }
            backoff.pause(&self.scope).await?;
        }
    }

    /// Waits until more than `count` elements match `selector`.
    pub async fn wait_elements_more_than(&self, selector: &str, count: usize) -> Result<()> {
        self.wait(
            &Eval::new("(s, n) => document.querySelectorAll(s).length > n")
                .arg(selector)
                .arg(count),
        )
        .await
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
    use crate::protocol::events::PageFrameNavigated;
    use crate::transport::pipe::AutoReply;

    fn session() -> SessionId {
        SessionId::from("S1")
    }

    #[tokio::test]
    async fn test_wait_event_resolves_on_match() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_event::<PageFrameNavigated>();
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "T1", "url": "about:blank" }
        }));

        let event = wait.await.expect("wait");
        assert_eq!(event.frame.id.as_str(), "T1");
    }

    #[tokio::test]
    async fn test_wait_event_ignores_other_methods() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_event::<PageFrameNavigated>();
        auto.event(Some(&session()), "Page.lifecycleEvent", json!({
            "frameId": "T1", "name": "load"
        }));
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "T1", "url": "about:blank" }
        }));

        wait.await.expect("wait");
    }

    #[tokio::test]
    async fn test_two_step_wait_around_navigation() {
        let (page, auto) = stub_page_with(|call| match call.method.as_str() {
            "Page.navigate" => AutoReply::Result(json!({ "frameId": "T1" })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        // Subscribe, then trigger: the wait must observe the event.
        let wait = page.wait_event::<PageFrameNavigated>();
        page.navigate("about:blank").await.expect("navigate");
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "T1", "url": "about:blank" }
        }));
        wait.await.expect("wait");

        // Trigger, then subscribe: the earlier event must not be seen.
        page.navigate("about:blank").await.expect("navigate");
        auto.event(Some(&session()), "Page.frameNavigated", json!({
            "frame": { "id": "T1", "url": "about:blank" }
        }));
        // Let the dispatcher drain the event before subscribing late.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let late = page.wait_event::<PageFrameNavigated>();
        let outcome = tokio::time::timeout(Duration::from_millis(50), late).await;
        assert!(outcome.is_err(), "late subscriber saw an earlier event");
    }

    #[tokio::test]
    async fn test_target_destroyed_cancels_suspended_wait() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_event::<PageFrameNavigated>();
        auto.event(None, "Target.targetDestroyed", json!({ "targetId": "T1" }));

        // The dispatcher cancels the page scope; the suspended wait
        // completes with Cancelled.
        assert!(wait.await.unwrap_err().is_cancelled());
        assert!(page.scope().is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_event_fails_on_scope_cancel() {
        let (page, _auto) = stub_page().await;

        let wait = page.wait_event::<PageFrameNavigated>();
        page.scope().cancel();

        assert!(wait.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_each_event_stops_on_true() {
        let (page, auto) = stub_page().await;

        let mut seen = 0;
        let wait = page.each_event(move |envelope| {
            if envelope.decode::<PageLifecycleEvent>().is_some() {
                seen += 1;
                return Ok(seen == 2);
            }
            Ok(false)
        });

        for _ in 0..2 {
            auto.event(Some(&session()), "Page.lifecycleEvent", json!({
                "frameId": "T1", "name": "load"
            }));
        }

        wait.await.expect("wait");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_idle_waits_minimum_gap() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_request_idle(Duration::from_millis(100), &[], &[], None);

        auto.event(Some(&session()), "Network.requestWillBeSent", json!({
            "requestId": "1", "request": { "url": "/a", "method": "GET" }, "type": "Fetch"
        }));

        let started = Instant::now();
        // Allow the event to reach the tracker before the request settles.
        tokio::time::sleep(Duration::from_millis(10)).await;
        auto.event(Some(&session()), "Network.loadingFinished", json!({ "requestId": "1" }));

        wait.await.expect("wait");
        assert!(started.elapsed() >= Duration::from_millis(110));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_idle_dedupes_redirect_ids() {
        let (page, auto) = stub_page().await;

        let wait = page.wait_request_idle(Duration::from_millis(100), &[], &[], None);

        // A redirect re-announces the same request id.
        auto.event(Some(&session()), "Network.requestWillBeSent", json!({
            "requestId": "1", "request": { "url": "/a", "method": "GET" }, "type": "Fetch"
        }));
        auto.event(Some(&session()), "Network.requestWillBeSent", json!({
            "requestId": "1", "request": { "url": "/b", "method": "GET" }, "type": "Fetch"
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;
        auto.event(Some(&session()), "Network.loadingFinished", json!({ "requestId": "1" }));

        // One loadingFinished settles the counter; were the redirect
        // counted twice this would hang past the idle gap.
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("resolved")
            .expect("wait");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_idle_excludes_types_and_urls() {
        let (page, auto) = stub_page().await;

        let wait =
            page.wait_request_idle(Duration::from_millis(50), &[], &["analytics"], None);

        // Image type and analytics URL are both ignored; nothing tracked.
        auto.event(Some(&session()), "Network.requestWillBeSent", json!({
            "requestId": "1", "request": { "url": "/pic.png", "method": "GET" }, "type": "Image"
        }));
        auto.event(Some(&session()), "Network.requestWillBeSent", json!({
            "requestId": "2", "request": { "url": "/analytics/ping", "method": "GET" }, "type": "Fetch"
        }));

        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("resolved")
            .expect("wait");
    }

    #[tokio::test]
    async fn test_wait_navigation_toggles_lifecycle_events() {
        let (page, auto) = stub_page().await;

        let wait = page
            .wait_navigation(LifecycleEventName::NetworkAlmostIdle)
            .await
            .expect("arm");

        let enables = auto.calls_of("Page.setLifecycleEventsEnabled");
        assert_eq!(enables.len(), 1);
        assert_eq!(enables[0].params["enabled"], true);

        auto.event(Some(&session()), "Page.lifecycleEvent", json!({
            "frameId": "T1", "name": "networkAlmostIdle"
        }));
        wait.await.expect("wait");

        let toggles = auto
            .wait_for_calls("Page.setLifecycleEventsEnabled", 2)
            .await;
        assert_eq!(toggles[1].params["enabled"], false);
    }

    #[tokio::test]
    async fn test_dom_snapshot_enable_error_is_ignored() {
        let (page, _auto) = stub_page_with(|call| match call.method.as_str() {
            "DOMSnapshot.enable" => AutoReply::Error {
                code: -32000,
                message: "already enabled".into(),
            },
            "DOMSnapshot.captureSnapshot" => AutoReply::Result(json!({
                "documents": [], "strings": ["a", "b"]
            })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        let snapshot = page.capture_dom_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.strings, vec!["a", "b"]);
    }

    #[test]
    fn test_lcs_len() {
        let a: Vec<String> = ["x", "a", "b", "c"].map(String::from).to_vec();
        let b: Vec<String> = ["a", "b", "y", "c"].map(String::from).to_vec();
        assert_eq!(lcs_len(&a, &b), 3);

        assert_eq!(lcs_len(&a, &a), 4);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn test_change_ratio_edges() {
        let a: Vec<String> = ["a", "b"].map(String::from).to_vec();
        let disjoint: Vec<String> = ["c", "d"].map(String::from).to_vec();

        assert_eq!(change_ratio(&a, &a), 0.0);
        assert_eq!(change_ratio(&[], &[]), 0.0);
        assert_eq!(change_ratio(&a, &[]), 1.0);
        assert_eq!(change_ratio(&a, &disjoint), 1.0);
        assert!(change_ratio(&a, &["a", "x"].map(String::from).to_vec()) - 0.5 < 1e-9);
    }

    #[test]
    fn test_url_matches_defaults() {
        let all = compile_all(&[String::new()]).expect("compile");
        let none: Vec<regex::Regex> = Vec::new();

        assert!(url_matches("https://example.com/x", &all, &none));

        let excludes = compile_all(&["\\.png$".to_string()]).expect("compile");
        assert!(!url_matches("https://example.com/a.png", &all, &excludes));
    }
}
