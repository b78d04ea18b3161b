//! Scoped ownership of the UI-automation handle.

use crate::ui::UiAutomation;
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// A UI session held for the length of one scenario.
///
/// Dropping the session finishes every activity it opened, so a scenario
/// that fails part-way still leaves the application at rest.
pub struct UiSession {
    automation: Arc<dyn UiAutomation>,
}

impl UiSession {
    /// Take the automation handle for one scenario.
    pub fn acquire(automation: Arc<dyn UiAutomation>) -> Self {
        tracing::debug!("UI session acquired on {}", automation.current_screen());
        Self { automation }
    }
}

impl Deref for UiSession {
    type Target = dyn UiAutomation;

    fn deref(&self) -> &Self::Target {
        self.automation.as_ref()
    }
}

impl Drop for UiSession {
    fn drop(&mut self) {
        self.automation.finish_opened_activities();
        tracing::debug!("UI session released");
    }
}

impl Debug for UiSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiSession")
            .field("screen", &self.automation.current_screen())
            .finish()
    }
}
