//! Test utilities for common-tpl
//!
//! Doubles and fixtures for exercising the template pipeline without a network
//! or a browser:
//! - [`MockTransport`] - scripted responses, a request log and an optional gate
//!   that holds responses in flight
//! - [`FailingStore`] - a storage backend where every call fails
//! - [`TemplateFixture`] - template endpoint payloads with real checksums
//! - [`page_with_csp`] - a page skeleton carrying CSP data
//!
//! # Example
//!
//! ```rust,no_run
//! use common_tpl::test_utils::{MockTransport, TemplateFixture};
//!
//! let transport = MockTransport::new();
//! let fixture = TemplateFixture::new().template("#promo-banner", "<h1>{{ title }}</h1>");
//! transport.push_envelope(fixture.envelope());
//! ```

mod fixtures;
mod store;
mod transport;

pub use fixtures::{TemplateFixture, page_with_csp};
pub use store::FailingStore;
pub use transport::MockTransport;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=common_tpl=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
