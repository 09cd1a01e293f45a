//! Tracing subscriber setup

use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Environment;

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Install the global tracing subscriber.
///
/// JSON output in production and staging, human-readable output elsewhere.
/// An absent or unparsable `level` falls back to `info` with a warning.
pub fn init(environment: Environment, level: Option<&str>) {
    let (level, fallback_reason) = resolve_level(level);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy("");

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if environment.structured_logs() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        // Already installed (tests, embedding)
        return;
    }

    if let Some(reason) = fallback_reason {
        tracing::warn!(reason = %reason, "LOG_LEVEL unusable; defaulting to 'info'");
    }
}

/// Parse a `LOG_LEVEL` value into a single level.
///
/// Returns the level to use and, when the default was substituted, why.
pub(crate) fn resolve_level(level: Option<&str>) -> (LevelFilter, Option<String>) {
    match level.map(str::trim) {
        None | Some("") => (DEFAULT_LEVEL, Some("LOG_LEVEL not set".to_string())),
        Some(raw) => match LevelFilter::from_str(raw) {
            Ok(level) => (level, None),
            Err(e) => (DEFAULT_LEVEL, Some(format!("invalid LOG_LEVEL {raw:?}: {e}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_levels_are_kept() {
        assert_eq!(resolve_level(Some("debug")), (LevelFilter::DEBUG, None));
        assert_eq!(resolve_level(Some("WARN")).0, LevelFilter::WARN);
        assert_eq!(resolve_level(Some("off")).0, LevelFilter::OFF);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        for raw in ["verbose", "loud", "infoo", "test_inbox=debug"] {
            let (level, reason) = resolve_level(Some(raw));
            assert_eq!(level, LevelFilter::INFO, "{raw}");
            assert!(reason.unwrap().contains(raw));
        }
    }

    #[test]
    fn test_missing_level_falls_back_with_reason() {
        let (level, reason) = resolve_level(None);
        assert_eq!(level, LevelFilter::INFO);
        assert!(reason.is_some());

        assert_eq!(resolve_level(Some("  ")).0, LevelFilter::INFO);
    }
}
