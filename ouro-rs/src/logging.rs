//! Tracing subscriber setup for the binary.
//!
//! The filter comes from the first of: the `--log` flag, the `OURO_LOG`
//! environment variable, the config `log` setting, and `warn`.  Output goes
//! to stderr so that `print` output on stdout stays clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_VAR: &str = "OURO_LOG";

const DEFAULT_FILTER: &str = "warn";

/// The filter directive to use.
pub fn directive(flag: Option<&str>, env: Option<&str>, config: Option<&str>) -> String {
    [flag, env, config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Install the global subscriber.  An invalid directive falls back to the
/// default filter with a warning.
pub fn init(flag: Option<&str>, config: Option<&str>) {
    let env = std::env::var(ENV_VAR).ok();
    let wanted = directive(flag, env.as_deref(), config);
    let (filter, bad) = match EnvFilter::try_new(&wanted) {
        Ok(f) => (f, None),
        Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(e)),
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
    if let Some(e) = bad {
        tracing::warn!(directive = %wanted, error = %e, "invalid log filter, using '{DEFAULT_FILTER}'");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        assert_eq!(directive(Some("debug"), Some("info"), Some("trace")), "debug");
        assert_eq!(directive(None, Some("info"), Some("trace")), "info");
        assert_eq!(directive(None, None, Some("trace")), "trace");
        assert_eq!(directive(None, Some("  "), None), "warn");
        assert_eq!(directive(None, None, None), "warn");
    }
}
