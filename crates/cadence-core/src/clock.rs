//! Blocking wait primitive with fixed duration tiers.
//!
//! Every retry loop in the suite speaks in terms of [`WaitTier`]s rather than
//! raw durations, so a single base unit rescales the whole suite.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::sleep;

/// Named wait durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitTier {
    /// One unit (UI settle time)
    Short,
    /// Two units
    Long,
    /// Six units (media scanner round trip)
    VeryLong,
}

/// Concrete durations for each [`WaitTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTiers {
    /// Duration of [`WaitTier::Short`]
    pub short: Duration,
    /// Duration of [`WaitTier::Long`]
    pub long: Duration,
    /// Duration of [`WaitTier::VeryLong`]
    pub very_long: Duration,
}

impl WaitTiers {
    /// Build tiers as multiples of a base unit.
    pub fn from_unit(unit: Duration, short: u32, long: u32, very_long: u32) -> Self {
        Self {
            short: unit.saturating_mul(short),
            long: unit.saturating_mul(long),
            very_long: unit.saturating_mul(very_long),
        }
    }

    /// Duration associated with `tier`.
    pub fn duration(&self, tier: WaitTier) -> Duration {
        match tier {
            WaitTier::Short => self.short,
            WaitTier::Long => self.long,
            WaitTier::VeryLong => self.very_long,
        }
    }
}

impl Default for WaitTiers {
    /// 1s / 2s / 6s
    fn default() -> Self {
        Self::from_unit(Duration::from_millis(1000), 1, 2, 6)
    }
}

/// Handle that cuts the current wait of a [`Clock`] short.
///
/// Only waits already in progress are affected; an interrupt with nobody
/// waiting is a no-op.
#[derive(Debug, Clone, Default)]
pub struct WaitInterrupt {
    notify: Arc<Notify>,
}

impl WaitInterrupt {
    /// Wake every wait currently in progress.
    pub fn interrupt(&self) {
        self.notify.notify_waiters();
    }
}

/// Tiered sleeper shared by the poller and the action driver.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    tiers: WaitTiers,
    interrupt: WaitInterrupt,
}

impl Clock {
    /// Create a clock over the given tiers.
    #[must_use]
    pub fn new(tiers: WaitTiers) -> Self {
        Self {
            tiers,
            interrupt: WaitInterrupt::default(),
        }
    }

    /// The tier durations this clock sleeps for.
    pub fn tiers(&self) -> &WaitTiers {
        &self.tiers
    }

    /// Handle for interrupting waits on this clock (and its clones).
    #[must_use]
    pub fn interrupt_handle(&self) -> WaitInterrupt {
        self.interrupt.clone()
    }

    /// Wait for the duration of `tier`.
    pub async fn sleep(&self, tier: WaitTier) {
        self.sleep_for(self.tiers.duration(tier)).await;
    }

    /// Wait for an arbitrary duration.
    ///
    /// An interrupt ends the wait early and is logged; it never surfaces to
    /// the caller as a failure.
    pub async fn sleep_for(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        let interrupted = self.interrupt.notify.notified();
        select! {
            () = sleep(duration) => {}
            () = interrupted => {
                tracing::debug!("wait interrupted after less than {duration:?}");
            }
        }
    }
}
