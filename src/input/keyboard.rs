//! Keyboard device and deferred key action sequences.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::Result;
use crate::page::Page;
use crate::protocol::methods::{InputInsertText, KeyEventKind};

use super::key::Key;

// ============================================================================
// KeyboardState
// ============================================================================

/// Currently pressed keys.
///
/// A pressed key must be released before it can be pressed again; the
/// modifier mask is a pure function of this set.
#[derive(Debug, Default)]
pub(crate) struct KeyboardState {
    pressed: FxHashSet<Key>,
}

impl KeyboardState {
    /// Modifier bitmask derived from the pressed set.
    pub(crate) fn modifiers(&self) -> u8 {
        self.pressed.iter().fold(0, |mask, key| mask | key.modifier_bit())
    }
}

// ============================================================================
// Keyboard
// ============================================================================

/// The page's keyboard; always addresses the main frame.
pub struct Keyboard<'p> {
    page: &'p Page,
}

impl<'p> Keyboard<'p> {
    pub(crate) fn new(page: &'p Page) -> Self {
        Self { page }
    }

    /// Presses the key down.
    ///
    /// The key-down event carries the modifier mask *including* this key.
    /// For characters not on a keyboard (such as CJK input), use
    /// [`Page::insert_text`] instead.
    pub async fn press(&self, key: Key) -> Result<()> {
        self.page.try_slow_motion().await;

        let mut state = self.page.devices.keyboard.lock().await;
        state.pressed.insert(key);
        trace!(?key, modifiers = state.modifiers(), "key down");

        self.page
            .call(&key.encode(KeyEventKind::KeyDown, state.modifiers()))
            .await?;
        Ok(())
    }

    /// Releases the key; a no-op when it is not pressed.
    ///
    /// The key-up event carries the *post-removal* modifier mask, so
    /// releasing Shift lowers the Shift bit for the key-up itself.
    pub async fn release(&self, key: Key) -> Result<()> {
        let mut state = self.page.devices.keyboard.lock().await;
        if !state.pressed.remove(&key) {
            return Ok(());
        }
        trace!(?key, modifiers = state.modifiers(), "key up");

        self.page
            .call(&key.encode(KeyEventKind::KeyUp, state.modifiers()))
            .await?;
        Ok(())
    }

    /// Presses and releases each key in order.
    pub async fn type_keys(&self, keys: &[Key]) -> Result<()> {
        for &key in keys {
            self.press(key).await?;
            self.release(key).await?;
        }
        Ok(())
    }

    /// Snapshot of the pressed set.
    pub async fn pressed(&self) -> Vec<Key> {
        self.page
            .devices
            .keyboard
            .lock()
            .await
            .pressed
            .iter()
            .copied()
            .collect()
    }

    /// Current modifier bitmask.
    pub async fn modifiers(&self) -> u8 {
        self.page.devices.keyboard.lock().await.modifiers()
    }
}

// ============================================================================
// Page - Text Insertion
// ============================================================================

impl Page {
    /// Inserts text at the cursor as if pasted.
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.try_slow_motion().await;
        self.call(&InputInsertText {
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// KeyActions
// ============================================================================

/// One scheduled keyboard action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAction {
    /// What to do with the key.
    pub kind: KeyActionKind,
    /// The key acted on.
    pub key: Key,
}

/// Kinds of scheduled keyboard actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyActionKind {
    /// Press and hold.
    Press,
    /// Release.
    Release,
    /// Press then release.
    Type,
}

/// Deferred keyboard action sequence.
///
/// Running the sequence appends a release for every key whose final state
/// would be pressed, so no key is left held:
///
/// ```ignore
/// page.key_actions()
///     .press(Key::Control)
///     .type_key(Key::Enter)
///     .run()
///     .await?;  // Control is released at the end
/// ```
pub struct KeyActions<'p> {
    page: &'p Page,
    actions: Vec<KeyAction>,
}

impl<'p> KeyActions<'p> {
    pub(crate) fn new(page: &'p Page) -> Self {
        Self {
            page,
            actions: Vec::new(),
        }
    }

    /// Schedules a press; a matching release is guaranteed by
    /// [`KeyActions::run`].
    #[must_use]
    pub fn press(mut self, key: Key) -> Self {
        self.actions.push(KeyAction {
            kind: KeyActionKind::Press,
            key,
        });
        self
    }

    /// Schedules a release.
    #[must_use]
    pub fn release(mut self, key: Key) -> Self {
        self.actions.push(KeyAction {
            kind: KeyActionKind::Release,
            key,
        });
        self
    }

    /// Schedules a press immediately followed by a release.
    #[must_use]
    pub fn type_key(mut self, key: Key) -> Self {
        self.actions.push(KeyAction {
            kind: KeyActionKind::Type,
            key,
        });
        self
    }

    /// Runs the balanced sequence.
    pub async fn run(self) -> Result<()> {
        let keyboard = self.page.keyboard();

        for action in Self::balance(self.actions) {
            match action.kind {
                KeyActionKind::Press => keyboard.press(action.key).await?,
                KeyActionKind::Release => keyboard.release(action.key).await?,
                KeyActionKind::Type => {
                    keyboard.press(action.key).await?;
                    keyboard.release(action.key).await?;
                }
            }
        }
        Ok(())
    }

    /// Appends a release for every key left pressed by the schedule, such
    /// as: p1,p2,p1,r1 becomes p1,p2,p1,r1,r2.
    fn balance(mut actions: Vec<KeyAction>) -> Vec<KeyAction> {
        let mut held: FxHashMap<Key, bool> = FxHashMap::default();
        for action in &actions {
            held.insert(action.key, action.kind == KeyActionKind::Press);
        }

        for (key, pressed) in held {
            if pressed {
                actions.push(KeyAction {
                    kind: KeyActionKind::Release,
                    key,
                });
            }
        }
        actions
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::page::core_tests::stub_page;

    /// `(kind, key, modifiers)` triples of dispatched key events.
    async fn key_events(auto: &crate::transport::pipe::AutoPipe) -> Vec<(String, String, u64)> {
        auto.calls_of("Input.dispatchKeyEvent")
            .iter()
            .map(|c| {
                (
                    c.params["type"].as_str().unwrap_or_default().to_string(),
                    c.params["key"].as_str().unwrap_or_default().to_string(),
                    c.params["modifiers"].as_u64().unwrap_or_default(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_release_carries_post_removal_modifiers() {
        let (page, auto) = stub_page().await;
        let keyboard = page.keyboard();

        keyboard.press(Key::Shift).await.expect("press");
        keyboard.press(Key::Char('a')).await.expect("press");
        keyboard.release(Key::Shift).await.expect("release");
        keyboard.release(Key::Char('a')).await.expect("release");

        let events = key_events(&auto).await;
        assert_eq!(events.len(), 4);

        // Shift's own key-down raises the bit; both key-ups carry the
        // post-removal mask.
        assert_eq!(events[0], ("keyDown".into(), "Shift".into(), 8));
        assert_eq!(events[1], ("keyDown".into(), "a".into(), 8));
        assert_eq!(events[2], ("keyUp".into(), "Shift".into(), 0));
        assert_eq!(events[3], ("keyUp".into(), "a".into(), 0));
    }

    #[tokio::test]
    async fn test_release_unpressed_key_is_noop() {
        let (page, auto) = stub_page().await;

        page.keyboard().release(Key::Enter).await.expect("release");
        assert!(auto.calls_of("Input.dispatchKeyEvent").is_empty());
    }

    #[tokio::test]
    async fn test_type_leaves_pressed_set_unchanged() {
        let (page, _auto) = stub_page().await;
        let keyboard = page.keyboard();

        keyboard.press(Key::Control).await.expect("press");
        keyboard
            .type_keys(&[Key::Char('h'), Key::Char('i')])
            .await
            .expect("type");

        let pressed = keyboard.pressed().await;
        assert_eq!(pressed, vec![Key::Control]);
        assert_eq!(keyboard.modifiers().await, 2);
    }

    #[tokio::test]
    async fn test_modifiers_is_function_of_pressed_set() {
        let (page, _auto) = stub_page().await;
        let keyboard = page.keyboard();

        assert_eq!(keyboard.modifiers().await, 0);

        keyboard.press(Key::Shift).await.expect("press");
        keyboard.press(Key::Meta).await.expect("press");
        assert_eq!(keyboard.modifiers().await, 8 | 4);

        keyboard.release(Key::Shift).await.expect("release");
        keyboard.release(Key::Meta).await.expect("release");
        assert_eq!(keyboard.modifiers().await, 0);
        assert!(keyboard.pressed().await.is_empty());
    }

    #[tokio::test]
    async fn test_key_actions_balance_releases_held_keys() {
        let (page, auto) = stub_page().await;

        page.key_actions()
            .press(Key::Control)
            .press(Key::Shift)
            .press(Key::Control)
            .run()
            .await
            .expect("run");

        // No key is left held by the sequence.
        assert!(page.keyboard().pressed().await.is_empty());

        let events = key_events(&auto).await;
        let ups: Vec<_> = events.iter().filter(|(kind, _, _)| kind == "keyUp").collect();
        assert_eq!(ups.len(), 2);
        assert_eq!(ups.iter().filter(|(_, key, _)| key == "Control").count(), 1);
        assert_eq!(ups.iter().filter(|(_, key, _)| key == "Shift").count(), 1);
    }

    #[tokio::test]
    async fn test_insert_text() {
        let (page, auto) = stub_page().await;

        page.insert_text("你好").await.expect("insert");
        let call = auto.wait_for_call("Input.insertText").await;
        assert_eq!(call.params["text"], "你好");
    }

    #[test]
    fn test_balance_appends_missing_releases() {
        let schedule = vec![
            KeyAction { kind: KeyActionKind::Press, key: Key::Control },
            KeyAction { kind: KeyActionKind::Press, key: Key::Shift },
            KeyAction { kind: KeyActionKind::Release, key: Key::Control },
        ];

        let balanced = KeyActions::balance(schedule);
        assert_eq!(balanced.len(), 4);
        assert_eq!(
            balanced[3],
            KeyAction { kind: KeyActionKind::Release, key: Key::Shift }
        );
    }

    #[test]
    fn test_balance_ignores_typed_keys() {
        let schedule = vec![
            KeyAction { kind: KeyActionKind::Type, key: Key::Enter },
            KeyAction { kind: KeyActionKind::Press, key: Key::Alt },
            KeyAction { kind: KeyActionKind::Type, key: Key::Alt },
        ];

        // Alt's final action is Type, which releases it.
        let balanced = KeyActions::balance(schedule);
        assert_eq!(balanced.len(), 3);
    }

    #[test]
    fn test_balance_repeated_press_releases_once() {
        let schedule = vec![
            KeyAction { kind: KeyActionKind::Press, key: Key::Control },
            KeyAction { kind: KeyActionKind::Press, key: Key::Shift },
            KeyAction { kind: KeyActionKind::Press, key: Key::Control },
        ];

        let balanced = KeyActions::balance(schedule);
        let releases: Vec<_> = balanced
            .iter()
            .filter(|a| a.kind == KeyActionKind::Release)
            .collect();

        assert_eq!(releases.len(), 2);
        assert!(releases.iter().any(|a| a.key == Key::Control));
        assert!(releases.iter().any(|a| a.key == Key::Shift));
    }
}
