//! Test utilities for the markerdb workspace
//!
//! - **Fixtures**: OTU entries and OTU table files
//! - **Environment**: a scratch directory with helpers for database paths
//! - **Fake smafa**: a shell script standing in for the clustering tool so
//!   the real subprocess path can be exercised without smafa installed

pub mod environment;
pub mod fake_smafa;
pub mod fixtures;

pub use environment::TestEnvironment;
pub use fake_smafa::{read_fake_smafa_calls, write_fake_smafa, FakeSmafaMode};
pub use fixtures::{generate_entries, l2_entry, sample_entries, write_otu_table};

/// Route tracing output through the test harness (safe to call repeatedly)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MARKERDB_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .try_init();
}
