//! Log subscriber setup.
//!
//! `--verbose` and `--quiet` win over `RECAST_LOG`, which wins over the
//! `info` default. Events go to stderr so stdout stays free for reports.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "RECAST_LOG";

/// Installs the global subscriber. A second call is a no-op.
pub fn init(global: &GlobalArgs) {
    let env = std::env::var(LOG_ENV).ok();
    let filter = EnvFilter::try_new(directive(global.verbose, global.quiet, env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn directive(verbose: bool, quiet: bool, env: Option<&str>) -> String {
    if verbose {
        "debug".to_string()
    } else if quiet {
        "error".to_string()
    } else {
        match env {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_win_over_env() {
        assert_eq!(directive(true, false, Some("warn")), "debug");
        assert_eq!(directive(false, true, Some("trace")), "error");
    }

    #[test]
    fn env_used_without_flags() {
        assert_eq!(directive(false, false, Some("recast_merge=trace")), "recast_merge=trace");
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(directive(false, false, None), "info");
        assert_eq!(directive(false, false, Some("  ")), "info");
    }
}
