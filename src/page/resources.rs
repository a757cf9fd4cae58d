//! Page resources, cookies and emulation state.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;

use crate::error::{Error, Result};
use crate::identifiers::WindowId;
use crate::protocol::methods::{
    BrowserGetWindowBounds, BrowserGetWindowForTarget, BrowserSetWindowBounds, Cookie,
    CookieParam, EmulationClearDeviceMetricsOverride, EmulationSetDeviceMetricsOverride,
    NetworkClearBrowserCookies, NetworkEnable, NetworkGetCookies, NetworkSetBlockedUrls,
    NetworkSetCookies, NetworkSetExtraHttpHeaders, NetworkSetUserAgentOverride,
    PageAddScriptToEvaluateOnNewDocument, PageGetResourceContent,
    PageRemoveScriptToEvaluateOnNewDocument, PageSetDocumentContent, WindowBounds,
};

use super::Page;
use super::core::DomainGuard;

// ============================================================================
// Page - Resources
// ============================================================================

impl Page {
    /// Fetches the content of a resource loaded by this frame, such as an
    /// image or stylesheet.
    pub async fn get_resource(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .call(&PageGetResourceContent {
                frame_id: self.frame_id.clone(),
                url: url.to_string(),
            })
            .await?;

        if res.base64_encoded {
            Base64Standard
                .decode(&res.content)
                .map_err(|e| Error::decode(format!("resource payload: {e}")))
        } else {
            Ok(res.content.into_bytes())
        }
    }

    /// The page's HTML.
    pub async fn html(&self) -> Result<String> {
        let res = self
            .eval("() => document.documentElement.outerHTML")
            .await?;
        Ok(res.value.as_str().unwrap_or_default().to_string())
    }

    /// Replaces the frame's document content.
    pub async fn set_document_content(&self, html: &str) -> Result<()> {
        self.call(&PageSetDocumentContent {
            frame_id: self.frame_id.clone(),
            html: html.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Registers a script evaluated in every new document before any of
    /// the page's own scripts run. Returns a removal handle.
    pub async fn eval_on_new_document(
        &self,
        source: &str,
    ) -> Result<impl AsyncFnOnce() -> Result<()> + use<>> {
        let res = self
            .call(&PageAddScriptToEvaluateOnNewDocument {
                source: source.to_string(),
            })
            .await?;

        let page = self.clone();
        Ok(async move || {
            page.call(&PageRemoveScriptToEvaluateOnNewDocument {
                identifier: res.identifier,
            })
            .await?;
            Ok(())
        })
    }
}

// ============================================================================
// Page - Cookies
// ============================================================================

impl Page {
    /// Cookies applicable to `urls`; with no URLs, those of the current
    /// page.
    pub async fn cookies(&self, urls: Vec<String>) -> Result<Vec<Cookie>> {
        let urls = if urls.is_empty() {
            vec![self.info().await?.url]
        } else {
            urls
        };

        Ok(self
            .call(&NetworkGetCookies { urls: Some(urls) })
            .await?
            .cookies)
    }

    /// Sets cookies.
    pub async fn set_cookies(&self, cookies: Vec<CookieParam>) -> Result<()> {
        self.call(&NetworkSetCookies { cookies }).await?;
        Ok(())
    }

    /// Clears all browser cookies.
    pub async fn clear_cookies(&self) -> Result<()> {
        self.call(&NetworkClearBrowserCookies {}).await?;
        Ok(())
    }
}

// ============================================================================
// Page - Network Overrides
// ============================================================================

impl Page {
    /// Sends extra HTTP headers with every request from this page.
    ///
    /// Requires network events for the lifetime of the override; the
    /// returned guard restores the domain.
    pub async fn set_extra_headers(&self, pairs: &[(&str, &str)]) -> Result<DomainGuard> {
        let guard = self
            .enable_domain(
                &NetworkEnable {
                    max_post_data_size: None,
                },
                "Network.disable",
            )
            .await?;

        let mut headers = serde_json::Map::new();
        for (name, value) in pairs {
            headers.insert((*name).to_string(), serde_json::json!(value));
        }

        self.call(&NetworkSetExtraHttpHeaders { headers }).await?;
        Ok(guard)
    }

    /// Overrides the user agent.
    pub async fn set_user_agent(&self, req: NetworkSetUserAgentOverride) -> Result<()> {
        self.call(&req).await?;
        Ok(())
    }

    /// Blocks requests whose URL matches any pattern (`*` wildcards).
    ///
    /// An empty list is a no-op rather than block-everything.
    pub async fn set_blocked_urls(&self, patterns: &[&str]) -> Result<()> {
        if patterns.is_empty() {
            return Ok(());
        }
        self.call(&NetworkSetBlockedUrls {
            urls: patterns.iter().map(|p| (*p).to_string()).collect(),
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// Page - Viewport
// ============================================================================

impl Page {
    /// Overrides device screen metrics, recording the override so
    /// full-page screenshots can restore it.
    pub async fn set_viewport(&self, view: EmulationSetDeviceMetricsOverride) -> Result<()> {
        self.call(&view).await?;
        *self.device_metrics.lock() = Some(view);
        Ok(())
    }

    /// Clears the device metrics override.
    pub async fn clear_viewport(&self) -> Result<()> {
        self.call(&EmulationClearDeviceMetricsOverride {}).await?;
        *self.device_metrics.lock() = None;
        Ok(())
    }
}

// ============================================================================
// Page - OS Window
// ============================================================================

impl Page {
    /// The OS window hosting this page's target.
    async fn window_id(&self) -> Result<WindowId> {
        let res = self
            .call(&BrowserGetWindowForTarget {
                target_id: Some(self.target_id.clone()),
            })
            .await?;
        Ok(res.window_id)
    }

    /// Position, size and state of the hosting OS window.
    ///
    /// Unrelated to [`Page::set_viewport`], which emulates device metrics
    /// inside the page.
    pub async fn get_window(&self) -> Result<WindowBounds> {
        let window_id = self.window_id().await?;
        let res = self.call(&BrowserGetWindowBounds { window_id }).await?;
        Ok(res.bounds)
    }

    /// Moves, resizes or changes the state of the hosting OS window.
    ///
    /// Only the fields present in `bounds` are applied.
    pub async fn set_window(&self, bounds: WindowBounds) -> Result<()> {
        let window_id = self.window_id().await?;
        self.call(&BrowserSetWindowBounds { window_id, bounds })
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
