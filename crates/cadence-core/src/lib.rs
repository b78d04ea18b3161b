//! Eventual-consistency verification core for the music player UI suite.
//!
//! UI actions mutate a content store that reflects the change on its own
//! schedule. This crate provides the pieces that decide, with bounded
//! patience, whether the expected change has happened:
//! - [`Clock`] - tiered waits (short / long / very long)
//! - [`StoreQueryAdapter`] - scoped reads against a [`ContentStore`]
//! - [`ConvergencePoller`] - staged polling that always terminates
//! - [`CadenceConfig`] - timing and budget configuration

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod predicate;
pub mod record;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use clock::{Clock, WaitInterrupt, WaitTier, WaitTiers};
pub use config::{CadenceConfig, ConvergenceConfig, TimingConfig, UiConfig};
pub use error::{Error, Result};
pub use poller::{
    Convergence, ConvergencePoller, ConvergencePolicy, ConvergenceTimeout, Expectation, PollBudget,
};
pub use predicate::{Clause, Field, FieldValue, Operator, Predicate};
pub use record::{Collection, ObservationResult, Record};
pub use store::{ContentStore, Cursor, StoreQuery, StoreQueryAdapter};
