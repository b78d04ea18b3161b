//! Timing unit override picked up by the scenario runner.
//!
//! Kept in its own test binary: it is the only test here, so setting the
//! variable cannot race another thread reading the environment.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        unsafe_code,
        reason = "Test allows"
    )
)]

use cadence_core::WaitTier;
use cadence_core::config::ENV_TIME_UNIT_MS;
use cadence_core::logging::init_test_tracing;
use integration_tests::ScenarioRunner;
use std::env;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_time_unit_override_scales_scenario_timing() {
    init_test_tracing();
    // SAFETY: Setting environment variable before any concurrent access
    unsafe {
        env::set_var(ENV_TIME_UNIT_MS, "5");
    }

    let runner = ScenarioRunner::load("playlists/delete_playlist").unwrap();
    let config = runner.config();
    assert_eq!(config.timing.unit_ms, 5);
    assert_eq!(config.tiers().duration(WaitTier::VeryLong), Duration::from_millis(30));
    assert_eq!(config.policy().unwrap().absence.total(), Duration::from_millis(40));

    // Default timing spends a full second settling after each action batch.
    let start = Instant::now();
    runner.run().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}
