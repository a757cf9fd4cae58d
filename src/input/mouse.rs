//! Mouse device.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::error::Result;
use crate::page::Page;
use crate::protocol::methods::{
    InputDispatchMouseEvent, MouseButton, MouseEventKind, Point,
};

// ============================================================================
// MouseState
// ============================================================================

/// Cursor position and held buttons.
///
/// The button stack preserves press order; the wire `buttons` field is
/// the bitmask over the whole stack.
#[derive(Debug, Default)]
pub(crate) struct MouseState {
    pos: Point,
    buttons: Vec<MouseButton>,
}

/// Splits the stack into the acting button (most recent) and the bitmask
/// over all held buttons.
fn encode_buttons(buttons: &[MouseButton]) -> (MouseButton, u32) {
    let mask = buttons.iter().fold(0, |mask, b| mask | b.bit());
    let acting = buttons.last().copied().unwrap_or(MouseButton::None);
    (acting, mask)
}

// ============================================================================
// Mouse
// ============================================================================

/// The page's mouse; always addresses the main frame.
pub struct Mouse<'p> {
    page: &'p Page,
}

impl<'p> Mouse<'p> {
    pub(crate) fn new(page: &'p Page) -> Self {
        Self { page }
    }

    /// Current cursor position.
    pub async fn position(&self) -> Point {
        self.page.devices.mouse.lock().await.pos
    }

    /// Buttons currently held, in press order.
    pub async fn buttons(&self) -> Vec<MouseButton> {
        self.page.devices.mouse.lock().await.buttons.clone()
    }

    /// Moves the cursor to an absolute position.
    ///
    /// The tracked position updates only when the dispatch succeeds.
    pub async fn move_to(&self, to: Point) -> Result<()> {
        self.page.try_slow_motion().await;

        let mut state = self.page.devices.mouse.lock().await;
        let (button, buttons) = encode_buttons(&state.buttons);

        self.page
            .call(&InputDispatchMouseEvent {
                kind: MouseEventKind::MouseMoved,
                x: to.x,
                y: to.y,
                button: Some(button),
                buttons: Some(buttons),
                click_count: None,
                modifiers: Some(self.keyboard_modifiers().await),
                delta_x: None,
                delta_y: None,
            })
            .await?;

        state.pos = to;
        Ok(())
    }

    /// Moves along a guide function.
    ///
    /// Each call returns the next position; returning `stop = true` emits
    /// that final position and ends the move.
    pub async fn move_along<F>(&self, mut guide: F) -> Result<()>
    where
        F: FnMut() -> (Point, bool),
    {
        loop {
            let (point, stop) = guide();
            if stop {
                return self.move_to(point).await;
            }
            self.move_to(point).await?;
        }
    }

    /// Moves to `to` linearly in `steps` intermediate moves.
    pub async fn move_linear(&self, to: Point, steps: usize) -> Result<()> {
        let steps = steps.max(1);
        let mut current = self.position().await;
        let step = to.minus(current).scale(1.0 / steps as f64);
        let mut count = 0;

        self.move_along(move || {
            count += 1;
            if count == steps {
                return (to, true);
            }
            current = current.add(step);
            (current, false)
        })
        .await
    }

    /// Scrolls by the relative offset, split over `steps` wheel events at
    /// the current position.
    pub async fn scroll(&self, offset_x: f64, offset_y: f64, steps: usize) -> Result<()> {
        self.page.try_slow_motion().await;

        let state = self.page.devices.mouse.lock().await;
        let (button, buttons) = encode_buttons(&state.buttons);

        let steps = steps.max(1);
        let step_x = offset_x / steps as f64;
        let step_y = offset_y / steps as f64;
        trace!(offset_x, offset_y, steps, "scroll");

        for _ in 0..steps {
            self.page
                .call(&InputDispatchMouseEvent {
                    kind: MouseEventKind::MouseWheel,
                    x: state.pos.x,
                    y: state.pos.y,
                    button: Some(button),
                    buttons: Some(buttons),
                    click_count: None,
                    modifiers: Some(self.keyboard_modifiers().await),
                    delta_x: Some(step_x),
                    delta_y: Some(step_y),
                })
                .await?;
        }
        Ok(())
    }

    /// Presses and holds a button.
    ///
    /// The event's `button` is the acting button; `buttons` is the mask
    /// including it.
    pub async fn down(&self, button: MouseButton, click_count: u32) -> Result<()> {
        let mut state = self.page.devices.mouse.lock().await;

        let mut held = state.buttons.clone();
        held.push(button);
        let (_, buttons) = encode_buttons(&held);

        self.page
            .call(&InputDispatchMouseEvent {
                kind: MouseEventKind::MousePressed,
                x: state.pos.x,
                y: state.pos.y,
                button: Some(button),
                buttons: Some(buttons),
                click_count: Some(click_count),
                modifiers: Some(self.keyboard_modifiers().await),
                delta_x: None,
                delta_y: None,
            })
            .await?;

        state.buttons = held;
        Ok(())
    }

    /// Releases a held button, removing its first entry from the stack.
    pub async fn up(&self, button: MouseButton, click_count: u32) -> Result<()> {
        let mut state = self.page.devices.mouse.lock().await;

        let mut held = state.buttons.clone();
        if let Some(index) = held.iter().position(|b| *b == button) {
            held.remove(index);
        }
        let (_, buttons) = encode_buttons(&held);

        self.page
            .call(&InputDispatchMouseEvent {
                kind: MouseEventKind::MouseReleased,
                x: state.pos.x,
                y: state.pos.y,
                button: Some(button),
                buttons: Some(buttons),
                click_count: Some(click_count),
                modifiers: Some(self.keyboard_modifiers().await),
                delta_x: None,
                delta_y: None,
            })
            .await?;

        state.buttons = held;
        Ok(())
    }

    /// Clicks: [`Mouse::down`] followed by [`Mouse::up`].
    pub async fn click(&self, button: MouseButton, click_count: u32) -> Result<()> {
        self.page.try_slow_motion().await;
        self.down(button, click_count).await?;
        self.up(button, click_count).await
    }

    /// Snapshot of the keyboard modifier mask, read under the keyboard
    /// lock.
    async fn keyboard_modifiers(&self) -> u8 {
        self.page.devices.keyboard.lock().await.modifiers()
    }
}

// ============================================================================
// Tests
// ============================================================================
