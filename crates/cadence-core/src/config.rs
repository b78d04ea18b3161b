//! Timing, convergence and UI-driver configuration.

use crate::clock::{Clock, WaitTier, WaitTiers};
use crate::error::{Error, Result};
use crate::poller::{ConvergencePolicy, PollBudget};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`TimingConfig::unit_ms`].
pub const ENV_TIME_UNIT_MS: &str = "CADENCE_TIME_UNIT_MS";

/// Complete suite configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Wait tier durations
    pub timing: TimingConfig,
    /// Poll budgets
    pub convergence: ConvergenceConfig,
    /// Action driver timeouts
    pub ui: UiConfig,
}

/// Wait tiers expressed as multiples of a base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Base unit in milliseconds
    pub unit_ms: u64,
    /// Units in a short wait
    pub short_units: u32,
    /// Units in a long wait
    pub long_units: u32,
    /// Units in a very long wait
    pub very_long_units: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unit_ms: 1000,
            short_units: 1,
            long_units: 2,
            very_long_units: 6,
        }
    }
}

/// Retry stages for presence and absence polls.
///
/// Each list names the waits that follow the immediate first query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Floor on any retry wait, in timing units
    pub poll_interval_units: u32,
    /// Retry waits when waiting for a record to appear
    pub presence_stages: Vec<WaitTier>,
    /// Retry waits when waiting for a record to disappear
    pub absence_stages: Vec<WaitTier>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_units: 1,
            presence_stages: vec![WaitTier::Long],
            absence_stages: vec![WaitTier::Long, WaitTier::VeryLong],
        }
    }
}

/// Action driver timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long to look for a UI element before giving up
    pub search_timeout_ms: u64,
    /// Wait after each action so the UI can register it
    pub settle: WaitTier,
    /// Total time to wait for a list to show a freshly scanned item
    pub list_refresh_timeout_ms: u64,
    /// Slice of the list refresh wait spent per scroll
    pub list_refresh_step_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            search_timeout_ms: 5000,
            settle: WaitTier::Short,
            list_refresh_timeout_ms: 30_000,
            list_refresh_step_ms: 200,
        }
    }
}

impl UiConfig {
    /// Element search window.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Total list refresh window.
    pub fn list_refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.list_refresh_timeout_ms)
    }

    /// Per-scroll slice of the list refresh window.
    pub fn list_refresh_step(&self) -> Duration {
        Duration::from_millis(self.list_refresh_step_ms)
    }
}

impl CadenceConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML for this shape
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a specific file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save config to a specific file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load from `path`, falling back to defaults if it is missing or
    /// unreadable, then apply environment overrides.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = if path.exists() {
            Self::load_from_file(path).unwrap_or_else(|error| {
                tracing::warn!("Failed to load config from {}: {error}", path.display());
                tracing::warn!("Using default configuration");
                Self::default()
            })
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Apply `CADENCE_TIME_UNIT_MS` if set to a valid integer.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = env::var(ENV_TIME_UNIT_MS) {
            self.override_unit_ms(&raw);
        }
    }

    fn override_unit_ms(&mut self, raw: &str) {
        match raw.trim().parse::<u64>() {
            Ok(unit_ms) => self.timing.unit_ms = unit_ms,
            Err(error) => tracing::warn!("Ignoring {ENV_TIME_UNIT_MS}={raw:?}: {error}"),
        }
    }

    /// Base timing unit.
    pub fn unit(&self) -> Duration {
        Duration::from_millis(self.timing.unit_ms)
    }

    /// Concrete wait tier durations.
    pub fn tiers(&self) -> WaitTiers {
        WaitTiers::from_unit(
            self.unit(),
            self.timing.short_units,
            self.timing.long_units,
            self.timing.very_long_units,
        )
    }

    /// Clock over [`Self::tiers`].
    pub fn clock(&self) -> Clock {
        Clock::new(self.tiers())
    }

    /// Floor on retry waits.
    pub fn poll_interval(&self) -> Duration {
        self.unit()
            .saturating_mul(self.convergence.poll_interval_units)
    }

    /// Validated per-expectation poll budgets.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a stage list is empty or a stage is
    /// shorter than the poll interval
    pub fn policy(&self) -> Result<ConvergencePolicy> {
        if self.timing.unit_ms == 0 {
            return Err(Error::Config("timing.unit_ms must be positive".to_owned()));
        }
        let tiers = self.tiers();
        let interval = self.poll_interval();
        Ok(ConvergencePolicy {
            presence: PollBudget::staged(interval, &tiers, &self.convergence.presence_stages)?,
            absence: PollBudget::staged(interval, &tiers, &self.convergence.absence_stages)?,
        })
    }
}
