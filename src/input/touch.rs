//! Touch device.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::page::Page;
use crate::protocol::methods::{InputDispatchTouchEvent, TouchEventKind, TouchPoint};

// ============================================================================
// Touch
// ============================================================================

/// The page's touch device: a hand whose fingers are [`TouchPoint`]s.
///
/// Touch events are stateless; the struct only namespaces the API. Events
/// carry the keyboard's current modifier mask.
pub struct Touch<'p> {
    page: &'p Page,
}

impl<'p> Touch<'p> {
    pub(crate) fn new(page: &'p Page) -> Self {
        Self { page }
    }

    /// Starts a touch with the given points.
    pub async fn start(&self, points: &[TouchPoint]) -> Result<()> {
        // Touch dispatch can race the first paint and get swallowed
        // (crbug.com/613219); waiting two repaints avoids it.
        let _ = self.page.wait_repaint().await;
        let _ = self.page.wait_repaint().await;

        self.dispatch(TouchEventKind::TouchStart, points.to_vec())
            .await
    }

    /// Moves touch points; track them via [`TouchPoint::id`].
    pub async fn move_points(&self, points: &[TouchPoint]) -> Result<()> {
        self.dispatch(TouchEventKind::TouchMove, points.to_vec())
            .await
    }

    /// Ends the touch.
    pub async fn end(&self) -> Result<()> {
        self.dispatch(TouchEventKind::TouchEnd, Vec::new()).await
    }

    /// Cancels the touch.
    pub async fn cancel(&self) -> Result<()> {
        self.dispatch(TouchEventKind::TouchCancel, Vec::new()).await
    }

    /// Taps at a point: touch start followed by touch end.
    pub async fn tap(&self, x: f64, y: f64) -> Result<()> {
        self.page.try_slow_motion().await;

        self.start(&[TouchPoint { x, y, id: None }]).await?;
        self.end().await
    }

    async fn dispatch(&self, kind: TouchEventKind, touch_points: Vec<TouchPoint>) -> Result<()> {
        let modifiers = self.page.devices.keyboard.lock().await.modifiers();

        self.page
            .call(&InputDispatchTouchEvent {
                kind,
                touch_points,
                modifiers: Some(modifiers),
            })
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
