// Shared helpers for integration tests.

use std::sync::Once;

/// Install a fmt subscriber once per test binary; `RUST_LOG=axon_cells=trace`
/// shows every propagation wave.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
