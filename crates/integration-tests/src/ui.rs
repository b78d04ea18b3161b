//! Contract of the UI-automation service the suite drives.

use async_trait::async_trait;
use cadence_core::Result;
use crossterm::event::KeyEvent;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// A button picked by position on screen or by its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ButtonRef {
    /// 0-based position among the visible buttons
    Index(usize),
    /// Button label
    Label(String),
}

impl Display for ButtonRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "button #{index}"),
            Self::Label(label) => write!(f, "button '{label}'"),
        }
    }
}

/// Simulated input against the application under test.
///
/// Methods that act on an element fail with
/// [`cadence_core::Error::ActionTargetNotFound`] when the element is not
/// on screen at the time of the call; searching with patience is the
/// caller's job (see [`UiAutomation::wait_for_text`]).
#[async_trait]
pub trait UiAutomation: Send + Sync {
    /// Wait up to `timeout` for `text` to be visible.
    ///
    /// # Errors
    /// Returns an error if the screen contents cannot be read
    async fn wait_for_text(&self, text: &str, timeout: Duration) -> Result<bool>;

    /// Tap the element showing `text`.
    async fn click_text(&self, text: &str) -> Result<()>;

    /// Long-press the element showing `text`.
    async fn long_click_text(&self, text: &str) -> Result<()>;

    /// Tap a button.
    async fn click_button(&self, button: &ButtonRef) -> Result<()>;

    /// Deliver a raw key event.
    async fn send_key(&self, key: KeyEvent) -> Result<()>;

    /// Empty the edit field at `index`.
    async fn clear_field(&self, index: usize) -> Result<()>;

    /// Type `text` into the edit field at `index`.
    async fn enter_text(&self, index: usize, text: &str) -> Result<()>;

    /// Scroll the current list towards its top.
    async fn scroll_up(&self);

    /// Name of the screen in the foreground.
    fn current_screen(&self) -> String;

    /// Close every screen the session opened.
    fn finish_opened_activities(&self);
}
