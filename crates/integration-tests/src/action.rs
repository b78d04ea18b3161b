//! Action driver: one simulated UI interaction per [`ActionSpec`].
//!
//! The driver never looks at the store. Each target is searched for within
//! the configured window, the interaction is issued, and a single settle
//! wait lets the UI register it before control returns.

use crate::keys::parse_key;
use crate::session::UiSession;
use crate::ui::ButtonRef;
use cadence_core::{Clock, Error, Result, UiConfig, WaitTier};
use serde::{Deserialize, Serialize};
use std::slice;
use std::time::Duration;
use tokio::time::Instant;

const MIN_REFRESH_STEP: Duration = Duration::from_millis(1);

const fn default_true() -> bool {
    true
}

/// A single UI interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Open the options menu and pick an item
    SelectMenu {
        /// Menu item label
        item: String,
    },
    /// Tap visible text
    ClickText {
        /// Text to tap
        text: String,
    },
    /// Long-press visible text
    LongClickText {
        /// Text to long-press
        text: String,
    },
    /// Type into an edit field
    EnterText {
        /// 0-based field index
        #[serde(default)]
        field: usize,
        /// Text to type
        text: String,
        /// Empty the field first
        #[serde(default = "default_true")]
        clear: bool,
    },
    /// Tap a button by index or label
    ClickButton {
        /// Button to tap
        button: ButtonRef,
    },
    /// Send raw key events, e.g. `["menu"]`
    SendKeys {
        /// Key names
        keys: Vec<String>,
    },
    /// Scroll the list up until `text` shows, then long-press it
    LongClickAfterRefresh {
        /// Text to long-press
        text: String,
    },
    /// Tap text and tap again if it is still showing after a short wait
    ClickTextWithRetry {
        /// Text to tap
        text: String,
    },
    /// Fail unless the foreground screen is `screen`
    AssertScreen {
        /// Expected screen name
        screen: String,
    },
}

/// Issues [`ActionSpec`]s through a [`UiSession`].
#[derive(Debug)]
pub struct ActionDriver<'session> {
    session: &'session UiSession,
    clock: Clock,
    config: UiConfig,
}

impl<'session> ActionDriver<'session> {
    /// Driver over `session` with the given timing.
    pub fn new(session: &'session UiSession, clock: Clock, config: UiConfig) -> Self {
        Self {
            session,
            clock,
            config,
        }
    }

    /// Perform one action, then settle.
    ///
    /// # Errors
    /// Returns [`Error::ActionTargetNotFound`] if the target never showed and
    /// [`Error::UnexpectedScreen`] if a screen assertion failed
    pub async fn perform(&self, action: &ActionSpec) -> Result<()> {
        self.perform_sequence(slice::from_ref(action)).await
    }

    /// Perform a gesture made of several actions, settling once at the end.
    ///
    /// # Errors
    /// Stops at the first failing action; see [`Self::perform`]
    pub async fn perform_sequence(&self, actions: &[ActionSpec]) -> Result<()> {
        for action in actions {
            tracing::debug!("action: {action:?}");
            self.dispatch(action).await?;
        }
        self.clock.sleep(self.config.settle).await;
        Ok(())
    }

    async fn dispatch(&self, action: &ActionSpec) -> Result<()> {
        match action {
            ActionSpec::SelectMenu { item } => {
                let menu = parse_key("menu").map_err(Error::Config)?;
                self.session.send_key(menu).await?;
                self.find(item, self.config.search_timeout()).await?;
                self.session.click_text(item).await
            }
            ActionSpec::ClickText { text } => {
                self.find(text, self.config.search_timeout()).await?;
                self.session.click_text(text).await
            }
            ActionSpec::LongClickText { text } => {
                self.find(text, self.config.search_timeout()).await?;
                self.session.long_click_text(text).await
            }
            ActionSpec::EnterText { field, text, clear } => {
                if *clear {
                    self.session.clear_field(*field).await?;
                }
                self.session.enter_text(*field, text).await
            }
            ActionSpec::ClickButton { button } => {
                if let ButtonRef::Label(label) = button {
                    self.find(label, self.config.search_timeout()).await?;
                }
                self.session.click_button(button).await
            }
            ActionSpec::SendKeys { keys } => {
                for key in keys {
                    let event = parse_key(key).map_err(Error::Config)?;
                    self.session.send_key(event).await?;
                }
                Ok(())
            }
            ActionSpec::LongClickAfterRefresh { text } => self.long_click_after_refresh(text).await,
            ActionSpec::ClickTextWithRetry { text } => self.click_text_with_retry(text).await,
            ActionSpec::AssertScreen { screen } => {
                let actual = self.session.current_screen();
                if actual == *screen {
                    Ok(())
                } else {
                    Err(Error::UnexpectedScreen {
                        expected: screen.clone(),
                        actual,
                    })
                }
            }
        }
    }

    /// Wait for `text` within `timeout` or fail with the search window.
    async fn find(&self, text: &str, timeout: Duration) -> Result<()> {
        if self.session.wait_for_text(text, timeout).await? {
            Ok(())
        } else {
            Err(Error::ActionTargetNotFound {
                target: text.to_owned(),
                timeout_ms: duration_ms(timeout),
            })
        }
    }

    /// A freshly scanned item may take a while to reach the list: scroll up
    /// and look again in short slices until the refresh window closes.
    async fn long_click_after_refresh(&self, text: &str) -> Result<()> {
        let window = self.config.list_refresh_timeout();
        let step = self.config.list_refresh_step().max(MIN_REFRESH_STEP);
        let start = Instant::now();

        loop {
            self.session.scroll_up().await;
            if self.session.wait_for_text(text, step).await? {
                return self.session.long_click_text(text).await;
            }
            if start.elapsed() >= window {
                return Err(Error::ActionTargetNotFound {
                    target: text.to_owned(),
                    timeout_ms: duration_ms(window),
                });
            }
        }
    }

    /// Some menus swallow the first tap; tap once more if the text is still
    /// there after a short wait.
    async fn click_text_with_retry(&self, text: &str) -> Result<()> {
        let short = self.clock.tiers().duration(WaitTier::Short);
        self.find(text, short).await?;
        self.session.click_text(text).await?;

        if self.session.wait_for_text(text, short).await? {
            tracing::debug!("'{text}' still showing after click, clicking again");
            self.session.click_text(text).await?;
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
