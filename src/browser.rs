//! Browser connection facade.
//!
//! A [`Browser`] owns the DevTools connection and the process-wide state
//! shared by every page: the root cancellation scope, the session
//! registry, and the targets lock that serializes
//! [`Page::close`](crate::page::Page::close) (Chromium tolerates at most
//! one concurrent close cleanly).
//!
//! # Example
//!
//! ```ignore
//! use chromium_driver::Browser;
//!
//! let browser = Browser::builder()
//!     .slow_motion(std::time::Duration::from_millis(50))
//!     .connect("ws://127.0.0.1:9222/devtools/browser/abc")
//!     .await?;
//!
//! let page = browser.new_page("https://example.com").await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::broker::{Broker, Subscription};
use crate::error::Result;
use crate::identifiers::{SessionId, TargetId};
use crate::page::Page;
use crate::protocol::Envelope;
use crate::protocol::events::TargetInfo;
use crate::protocol::methods::{
    BrowserGetVersion, BrowserGetVersionResult, Command, NetworkEnable, PageEnable,
    TargetActivateTarget, TargetAttachToTarget, TargetCreateTarget, TargetGetTargetInfo,
    TargetGetTargets,
};
use crate::scope::{Scope, Sleeper};
use crate::session::{SessionRegistry, spawn_dispatcher};
use crate::transport::Connection;

// ============================================================================
// Options
// ============================================================================

/// Behavioral knobs shared by every page of a browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Back-off policy for poll-based waits.
    pub sleeper: Sleeper,
    /// Pause inserted before each input action, for watching a session
    /// unfold at human speed.
    pub slow_motion: Option<Duration>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            sleeper: Sleeper::default(),
            slow_motion: None,
        }
    }
}

// ============================================================================
// BrowserBuilder
// ============================================================================

/// Builder for a configured [`Browser`].
#[derive(Debug, Default)]
pub struct BrowserBuilder {
    options: BrowserOptions,
}

impl BrowserBuilder {
    /// Sets the poll back-off policy.
    #[must_use]
    pub fn sleeper(mut self, sleeper: Sleeper) -> Self {
        self.options.sleeper = sleeper;
        self
    }

    /// Inserts a pause before each input action.
    #[must_use]
    pub fn slow_motion(mut self, delay: Duration) -> Self {
        self.options.slow_motion = Some(delay);
        self
    }

    /// Connects to a DevTools WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) if the
    /// handshake fails.
    pub async fn connect(self, ws_url: &str) -> Result<Browser> {
        let connection = Connection::connect(ws_url).await?;
        Ok(Browser::assemble(connection, self.options))
    }
}

// ============================================================================
// Browser
// ============================================================================

pub(crate) struct BrowserInner {
    pub(crate) connection: Connection,
    pub(crate) scope: Scope,
    /// Serializes `Page::close` across all pages.
    pub(crate) targets_lock: AsyncMutex<()>,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) options: BrowserOptions,
}

/// Handle to a browser over one DevTools connection.
///
/// Cheap to clone; all clones share the connection and registry.
#[derive(Clone)]
pub struct Browser {
    pub(crate) inner: Arc<BrowserInner>,
}

impl Browser {
    /// Starts building a configured browser handle.
    #[must_use]
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::default()
    }

    /// Connects with default options.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        Self::builder().connect(ws_url).await
    }

    fn assemble(connection: Connection, options: BrowserOptions) -> Self {
        Self {
            inner: Arc::new(BrowserInner {
                connection,
                scope: Scope::root(),
                targets_lock: AsyncMutex::new(()),
                registry: Arc::new(SessionRegistry::default()),
                options,
            }),
        }
    }

    /// Test constructor over an in-memory transport.
    #[cfg(test)]
    pub(crate) fn over(connection: Connection) -> Self {
        Self::assemble(connection, BrowserOptions::default())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Issues a typed command on the browser session.
    pub async fn execute<C: Command>(&self, cmd: &C) -> Result<C::Result> {
        self.inner
            .connection
            .execute(&self.inner.scope, None, cmd)
            .await
    }

    /// Issues a typed command on a specific session, under `scope`.
    pub(crate) async fn execute_on<C: Command>(
        &self,
        scope: &Scope,
        session: &SessionId,
        cmd: &C,
    ) -> Result<C::Result> {
        self.inner
            .connection
            .execute(scope, Some(session), cmd)
            .await
    }

    /// Browser version metadata.
    pub async fn version(&self) -> Result<BrowserGetVersionResult> {
        self.execute(&BrowserGetVersion {}).await
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Opens a new page target and attaches to it.
    ///
    /// An empty `url` opens `about:blank`.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let url = if url.is_empty() { "about:blank" } else { url };

        let created = self
            .execute(&TargetCreateTarget {
                url: url.to_string(),
                width: None,
                height: None,
            })
            .await?;

        self.attach_page(created.target_id).await
    }

    /// Attaches a controller to an existing target.
    ///
    /// Spawns the page's event dispatcher before enabling domains so no
    /// early event is lost, then enables `Page` and `Network`
    /// notifications.
    pub async fn attach_page(&self, target_id: TargetId) -> Result<Page> {
        let attached = self
            .execute(&TargetAttachToTarget {
                target_id: target_id.clone(),
                flatten: true,
            })
            .await?;
        let session_id = attached.session_id;

        debug!(target = %target_id, session = %session_id, "attached to target");

        let scope = self.inner.scope.child();
        let events = Broker::new();

        self.inner
            .registry
            .register(session_id.clone(), target_id.clone());
        spawn_dispatcher(
            &self.inner.connection,
            Arc::clone(&self.inner.registry),
            scope.clone(),
            session_id.clone(),
            target_id.clone(),
            events.clone(),
        );

        let page = Page::new(self.clone(), target_id, session_id, scope, events);

        // The attachment holds these domains for the page's lifetime, so a
        // wait's scoped acquisition never disables them on restore.
        page.domains.acquire(PageEnable::METHOD);
        page.call(&PageEnable {}).await?;
        page.domains.acquire(NetworkEnable::METHOD);
        page.call(&NetworkEnable {
            max_post_data_size: None,
        })
        .await?;

        Ok(page)
    }

    /// Lists all targets known to the browser.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        Ok(self.execute(&TargetGetTargets {}).await?.target_infos)
    }

    /// Attaches to every target of kind `page`.
    pub async fn pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for info in self.targets().await? {
            if info.kind == "page" {
                pages.push(self.attach_page(info.target_id).await?);
            }
        }
        Ok(pages)
    }

    /// Focuses a target.
    pub async fn activate_target(&self, target_id: &TargetId) -> Result<()> {
        self.execute(&TargetActivateTarget {
            target_id: target_id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Reads one target's description.
    pub async fn target_info(&self, target_id: &TargetId) -> Result<TargetInfo> {
        Ok(self
            .execute(&TargetGetTargetInfo {
                target_id: Some(target_id.clone()),
            })
            .await?
            .target_info)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Subscribes to the raw inbound event stream under `scope`.
    ///
    /// Needed for browser-level waits such as
    /// [`Page::wait_open`](crate::page::Page::wait_open).
    #[must_use]
    pub fn events(&self, scope: &Scope) -> Subscription<Envelope> {
        self.inner.connection.events(scope)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Root scope every page scope derives from.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Disconnects from the browser, cancelling every page.
    ///
    /// The browser process keeps running; only this controller detaches.
    pub fn disconnect(&self) {
        self.inner.scope.cancel();
        self.inner.connection.shutdown();
    }

    /// Number of sessions currently attached.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.registry.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::transport::pipe::{AutoPipe, AutoReply};

    pub(crate) fn stub_browser() -> (Browser, AutoPipe) {
        let (conn, pipe) = Connection::pipe();
        let auto = pipe.auto_with(|call| match call.method.as_str() {
            "Target.createTarget" => AutoReply::Result(json!({ "targetId": "T1" })),
            "Target.attachToTarget" => AutoReply::Result(json!({ "sessionId": "S1" })),
            "Target.getTargets" => AutoReply::Result(json!({
                "targetInfos": [
                    { "targetId": "T1", "type": "page", "url": "about:blank" },
                    { "targetId": "W1", "type": "service_worker", "url": "" }
                ]
            })),
            _ => AutoReply::Result(json!({})),
        });
        (Browser::over(conn), auto)
    }

    #[tokio::test]
    async fn test_new_page_attach_flow() {
        let (browser, auto) = stub_browser();

        let page = browser.new_page("").await.expect("new page");
        assert_eq!(page.target_id().as_str(), "T1");
        assert_eq!(page.session_id().as_str(), "S1");
        assert_eq!(browser.session_count(), 1);

        let created = auto.wait_for_call("Target.createTarget").await;
        assert_eq!(created.params["url"], "about:blank");

        // Domains are enabled on the new session.
        let enabled = auto.wait_for_call("Page.enable").await;
        assert_eq!(
            enabled.session_id.as_ref().map(SessionId::as_str),
            Some("S1")
        );
        auto.wait_for_call("Network.enable").await;
    }

    #[tokio::test]
    async fn test_pages_attaches_only_page_targets() {
        let (browser, _auto) = stub_browser();

        let pages = browser.pages().await.expect("pages");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].target_id().as_str(), "T1");
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pages() {
        let (browser, _auto) = stub_browser();
        let page = browser.new_page("").await.expect("new page");

        browser.disconnect();
        page.scope().cancelled().await;
        assert!(page.scope().is_cancelled());
    }

    #[tokio::test]
    async fn test_transport_close_is_fatal_to_pages() {
        let (browser, auto) = stub_browser();
        let page = browser.new_page("").await.expect("new page");

        auto.close();
        page.scope().cancelled().await;
        assert!(page.scope().is_cancelled());
    }
}
