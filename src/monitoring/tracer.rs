/*!
 * Structured Tracing
 * Subscriber setup for the runtime's `tracing` and `log` output
 */

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable switching the output to JSON
pub const TRACE_JSON_ENV: &str = "RTGRAPH_TRACE_JSON";

/// Install the process-wide subscriber
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RTGRAPH_TRACE_JSON: Enable JSON output (default: false)
///
/// `log` records from the registry and activities are bridged into the same
/// subscriber. Returns false if a subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_output() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_thread_names(true).compact())
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = json_output(), "Runtime tracing ready");
    }
    installed
}

fn json_output() -> bool {
    std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing();
        assert!(!init_tracing());
    }
}
