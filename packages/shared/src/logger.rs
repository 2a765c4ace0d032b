//! Logger bootstrap using `tracing-subscriber`.

use std::fmt;

use tracing_subscriber::{
    EnvFilter,
    fmt::{format::Writer, time::FormatTime},
};

use crate::time::now_jst;

/// Timestamp formatter that renders log times in JST.
#[derive(Debug, Clone, Copy, Default)]
pub struct JstTimer;

impl FormatTime for JstTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", now_jst().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Build the default filter directive for a binary.
///
/// Binary names use `-` while tracing targets use `_`, so `yoriai-client`
/// becomes `yoriai_client=debug`.
pub fn default_directive(name: &str, default_level: &str) -> String {
    let target = name.replace('-', "_");
    if target == "yoriai_client" {
        format!("{target}={default_level}")
    } else {
        format!("{target}={default_level},yoriai_client={default_level}")
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` when set. Logs are
/// written to stderr; stdout carries chat output.
pub fn setup_logger(name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(name, default_level)));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(JstTimer)
        .with_ansi(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = result {
        // A subscriber is already installed (e.g. in tests)
        tracing::debug!("Logger already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_for_client_binary() {
        // テスト項目: クライアントバイナリのディレクティブは重複しない
        // when (操作):
        let directive = default_directive("yoriai-client", "debug");

        // then (期待する結果):
        assert_eq!(directive, "yoriai_client=debug");
    }

    #[test]
    fn test_default_directive_for_other_binary() {
        // テスト項目: 他のバイナリ名の場合はクライアントライブラリのディレクティブも含む
        // when (操作):
        let directive = default_directive("room-probe", "info");

        // then (期待する結果):
        assert_eq!(directive, "room_probe=info,yoriai_client=info");
    }

    #[test]
    fn test_setup_logger_twice_does_not_panic() {
        // テスト項目: setup_logger を2回呼んでもパニックしない
        // when (操作):
        setup_logger("yoriai-client", "debug");
        setup_logger("yoriai-client", "debug");
    }
}
