use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
///
/// Request failures of simulated users are logged at `DEBUG`, so they show up in the output of a
/// failing test. Per-message logs of the test server stay hidden.
const DEFAULT_DIRECTIVES: &str = "ERROR,loadtest=DEBUG,loadtest_test=INFO";

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner. Set `RUST_LOG` to override the default
/// filter, for instance `RUST_LOG=loadtest_test=TRACE` to see every message the test server
/// stores.
///
/// # Example
///
/// ```
/// loadtest_test::tracing::init();
/// ```
pub fn init() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt::fmt()
        .with_env_filter(test_filter(rust_log.as_deref()))
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

fn test_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}
