//! Tracing setup for test binaries.

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt as _, registry, util::SubscriberInitExt as _,
};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "cadence_core=info,cadence_mediastore=info,integration_tests=info";

/// Install a test-writer subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    drop(
        registry()
            .with(fmt::layer().with_test_writer().with_target(false))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
            .try_init(),
    );
}
