//! Telemetry and Observability
//!
//! Installs the global `tracing-subscriber` pipeline for the engine. The
//! level comes from the role configuration (or the `--log` flag), with a
//! `RUST_LOG` environment override on top. Output format follows the build
//! profile: pretty terminal output in debug, JSON with span context in
//! release.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives applied when `RUST_LOG` is unset
///
/// The engine target follows the configured level; sqlx is capped at warn
/// so statement chatter never drowns orchestration logs.
fn default_directives(log_level: &str) -> String {
    format!(
        "{level},troupe_engine={level},sqlx=warn",
        level = log_level
    )
}

/// Install the global tracing subscriber at the given level
///
/// Priority: `RUST_LOG` env var > `log_level` parameter. Repeated calls are
/// a no-op rather than an error, so tests may initialize freely.
pub fn init_telemetry(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_engine_and_sqlx() {
        assert_eq!(
            default_directives("debug"),
            "debug,troupe_engine=debug,sqlx=warn"
        );
        assert_eq!(
            default_directives("warn"),
            "warn,troupe_engine=warn,sqlx=warn"
        );
    }

    #[test]
    fn test_repeated_init_is_tolerated() {
        init_telemetry("info");
        init_telemetry("debug");
    }
}
