//! Shared fixtures for frontdag's integration tests.
//!
//! - [`builders`] assembles validated configs and `package.json` content.
//! - [`fakes`] stands in for downloads, script processes and task actions.

pub mod builders;
pub mod fakes;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing once per test binary.
///
/// Output goes through the test writer, so it only shows for failing tests.
/// The filter comes from `FRONTDAG_LOG`, e.g.
/// `FRONTDAG_LOG=frontdag=debug cargo test`, and defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(frontdag::logging::LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
