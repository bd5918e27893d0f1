//! Logging setup utilities for the Rakugaki binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled by the default filter.
const WORKSPACE_CRATES: [&str; 3] = ["rakugaki_shared", "rakugaki_server", "rakugaki_client"];

/// Initialize the tracing subscriber with the specified default log level.
///
/// The default filter enables the workspace crates and the binary itself.
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "rakugaki-server")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use rakugaki_shared::logger::setup_logger;
///
/// setup_logger("rakugaki-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(binary_name: &str, level: &str) -> String {
    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect();
    directives.push(format!("{}={}", binary_name.replace('-', "_"), level));
    directives.push(format!("tower_http={}", level));
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_contains_workspace_crates_and_binary() {
        // テスト項目: デフォルトフィルタにワークスペースのクレートとバイナリが含まれる
        // given (前提条件):
        let binary_name = "rakugaki-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert!(filter.contains("rakugaki_server=debug"));
        assert!(filter.contains("rakugaki_shared=debug"));
        assert!(filter.contains("tower_http=debug"));
        assert!(!filter.contains("rakugaki-server"));
    }
}
