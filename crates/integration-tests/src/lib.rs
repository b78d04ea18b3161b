//! End-to-end test framework for the music player suite
//!
//! Provides:
//! - The UI-automation contract (`UiAutomation`) and a scoped `UiSession`
//! - The `ActionDriver`, issuing one simulated interaction per `ActionSpec`
//! - `SimulatedMusicApp`, an in-process stand-in for the application
//! - `ScenarioRunner`, running JSON scenarios against a fresh `TestEnvironment`

#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

pub mod action;
pub mod app;
pub mod environment;
pub mod keys;
pub mod scenario;
pub mod session;
pub mod timing;
pub mod types;
pub mod ui;

pub use action::{ActionDriver, ActionSpec};
pub use app::{LaunchScreen, SimulatedMusicApp};
pub use environment::{StorageFile, TestEnvironment};
pub use scenario::ScenarioRunner;
pub use session::UiSession;
pub use timing::{TimingData, TimingLayer};
pub use types::{Scenario, ScenarioSetup, ScenarioStep};
pub use ui::{ButtonRef, UiAutomation};
