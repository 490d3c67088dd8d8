//! Log filter selection.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "MODELSCOUT_LOG";

/// Filter used when nothing else is configured.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Filter used with `--verbose`.
const VERBOSE_DIRECTIVE: &str = "modelscout=debug,info";

/// Picks the filter directive: `MODELSCOUT_LOG`, then `RUST_LOG`, then
/// `--verbose`, then the configured level, then `warn`.
#[must_use]
pub fn filter_directive(
    config: &LoggingConfig,
    verbose: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let from_env = lookup(LOG_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .filter(|value| !value.trim().is_empty());
    if let Some(directive) = from_env {
        return directive;
    }
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    config
        .level
        .clone()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Builds the subscriber filter from the process environment.
///
/// An unparseable directive falls back to `warn`.
#[must_use]
pub fn env_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    let directive = filter_directive(config, verbose, |key| std::env::var(key).ok());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
