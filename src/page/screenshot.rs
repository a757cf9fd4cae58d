//! Screenshot capture.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tracing::debug;

use crate::error::{Error, Result};
use crate::imaging;
use crate::protocol::methods::{
    PageCaptureScreenshot, PageGetLayoutMetrics, ScreenshotFormat, Viewport,
};

use super::Page;

// ============================================================================
// Options
// ============================================================================

/// Options for [`Page::scroll_screenshot`].
#[derive(Debug, Clone)]
pub struct ScrollScreenshotOptions {
    /// Image format; PNG and JPEG only.
    pub format: ScreenshotFormat,
    /// JPEG compression quality (0-100).
    pub quality: Option<u8>,
    /// Pixels to skip from the top of every slice after the first, hiding
    /// a fixed header that would repeat in each slice.
    pub fixed_top: f64,
    /// Pixels to skip from the bottom of every slice.
    pub fixed_bottom: f64,
    /// DOM-stability window waited between scrolls.
    pub wait_per_scroll: Duration,
}

impl Default for ScrollScreenshotOptions {
    fn default() -> Self {
        Self {
            format: ScreenshotFormat::Png,
            quality: None,
            fixed_top: 0.0,
            fixed_bottom: 0.0,
            wait_per_scroll: Duration::from_millis(300),
        }
    }
}

// ============================================================================
// Page - Screenshot
// ============================================================================

impl Page {
    /// Captures a screenshot.
    ///
    /// With `full_page`, the device metrics are temporarily overridden to
    /// the document content size so the whole page fits one capture; the
    /// prior override is re-applied afterwards (or cleared when none was
    /// set).
    pub async fn screenshot(
        &self,
        full_page: bool,
        req: PageCaptureScreenshot,
    ) -> Result<Vec<u8>> {
        if !full_page {
            let shot = self.call(&req).await?;
            return decode_image(&shot.data);
        }

        let metrics = self.call(&PageGetLayoutMetrics {}).await?;
        let content = metrics
            .css_content_size
            .ok_or_else(|| Error::protocol("layout metrics carry no content size"))?;

        let previous = self.device_metrics.lock().clone();
        let mut view = previous.clone().unwrap_or_default();
        view.width = content.width as u64;
        view.height = content.height as u64;
        self.set_viewport(view).await?;

        let shot = self.call(&req).await;

        // Recover the viewport even when the capture failed.
        let restored = match previous {
            Some(view) => self.set_viewport(view).await,
            None => self.clear_viewport().await,
        };
        if let Err(e) = restored {
            debug!(error = %e, "viewport restore failed");
        }

        decode_image(&shot?.data)
    }

    /// Captures the whole page by scrolling and splicing viewport-sized
    /// slices, without touching the device metrics.
    ///
    /// Elements with fixed positioning repeat in every slice; set
    /// [`ScrollScreenshotOptions::fixed_top`] to crop a sticky header out
    /// of all slices after the first.
    pub async fn scroll_screenshot(&self, opts: &ScrollScreenshotOptions) -> Result<Vec<u8>> {
        if !matches!(opts.format, ScreenshotFormat::Png | ScreenshotFormat::Jpeg) {
            return Err(Error::protocol(
                "scroll screenshot supports only png and jpeg formats",
            ));
        }

        let metrics = self.call(&PageGetLayoutMetrics {}).await?;
        let (content, viewport) = match (metrics.css_content_size, metrics.css_visual_viewport) {
            (Some(content), Some(viewport)) => (content, viewport),
            _ => return Err(Error::protocol("layout metrics carry no content size")),
        };

        let viewport_height = viewport.client_height;
        let content_height = content.height;
        let scroll_step = viewport_height - (opts.fixed_top + opts.fixed_bottom);

        let mut scroll_top = 0.0;
        let mut slices = Vec::new();

        loop {
            let mut clip = Viewport {
                x: 0.0,
                y: scroll_top,
                width: viewport.client_width,
                height: 0.0,
                scale: 1.0,
            };

            if scroll_top + viewport_height > content_height {
                clip.height = content_height - scroll_top;
            } else {
                clip.height = scroll_step;
                if scroll_top != 0.0 {
                    clip.y += opts.fixed_top;
                }
            }

            let shot = self
                .call(&PageCaptureScreenshot {
                    format: Some(opts.format),
                    quality: opts.quality,
                    clip: Some(clip),
                    from_surface: Some(false),
                    capture_beyond_viewport: Some(false),
                })
                .await?;
            slices.push(decode_image(&shot.data)?);

            scroll_top += scroll_step;
            if scroll_top >= content_height {
                break;
            }

            self.mouse().scroll(0.0, scroll_step, 1).await?;
            self.wait_dom_stable(opts.wait_per_scroll, 0.0).await?;
        }

        debug!(slices = slices.len(), "splicing scroll screenshot");
        imaging::splice_vertical(&slices, opts.format, opts.quality)
    }
}

fn decode_image(data: &str) -> Result<Vec<u8>> {
    Base64Standard
        .decode(data)
        .map_err(|e| Error::decode(format!("screenshot payload: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::core::tests::stub_page_with;
    use super::*;

    use serde_json::json;

    use crate::protocol::methods::EmulationSetDeviceMetricsOverride;
    use crate::transport::pipe::AutoReply;

    const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn screenshot_responder(call: &crate::transport::pipe::Outgoing) -> AutoReply {
        match call.method.as_str() {
            "Page.getLayoutMetrics" => AutoReply::Result(json!({
                "cssContentSize": { "width": 800.0, "height": 2000.0 },
                "cssVisualViewport": {
                    "offsetX": 0.0, "offsetY": 0.0,
                    "clientWidth": 800.0, "clientHeight": 600.0
                }
            })),
            "Page.captureScreenshot" => AutoReply::Result(json!({ "data": TINY_PNG_B64 })),
            _ => AutoReply::Result(json!({})),
        }
    }

    #[tokio::test]
    async fn test_full_page_clears_override_when_none_was_set() {
        let (page, auto) = stub_page_with(screenshot_responder).await;

        let bytes = page
            .screenshot(true, PageCaptureScreenshot::default())
            .await
            .expect("screenshot");
        assert!(!bytes.is_empty());

        let set = auto.wait_for_call("Emulation.setDeviceMetricsOverride").await;
        assert_eq!(set.params["width"], 800);
        assert_eq!(set.params["height"], 2000);

        // No override existed before, so the temporary one is cleared.
        auto.wait_for_call("Emulation.clearDeviceMetricsOverride").await;
        assert!(page.device_metrics.lock().is_none());
    }

    #[tokio::test]
    async fn test_full_page_restores_prior_override() {
        let (page, auto) = stub_page_with(screenshot_responder).await;

        page.set_viewport(EmulationSetDeviceMetricsOverride {
            width: 1280,
            height: 720,
            device_scale_factor: 2.0,
            mobile: false,
        })
        .await
        .expect("set viewport");

        page.screenshot(true, PageCaptureScreenshot::default())
            .await
            .expect("screenshot");

        let sets = auto
            .wait_for_calls("Emulation.setDeviceMetricsOverride", 3)
            .await;
        // Caller override, content-size override, then the restore.
        assert_eq!(sets[2].params["width"], 1280);
        assert_eq!(sets[2].params["height"], 720);
        assert!(auto.calls_of("Emulation.clearDeviceMetricsOverride").is_empty());

        let kept = page.device_metrics.lock().clone().expect("override kept");
        assert_eq!(kept.width, 1280);
    }

    #[tokio::test]
    async fn test_viewport_screenshot_decodes_payload() {
        let (page, _auto) = stub_page_with(screenshot_responder).await;

        let bytes = page
            .screenshot(false, PageCaptureScreenshot::default())
            .await
            .expect("screenshot");
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_scroll_screenshot_rejects_webp() {
        let (page, _auto) = stub_page_with(screenshot_responder).await;

        let err = page
            .scroll_screenshot(&ScrollScreenshotOptions {
                format: ScreenshotFormat::Webp,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("png and jpeg"));
    }
}
