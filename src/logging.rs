//! Diagnostic tracing, written to stderr.
//!
//! User-facing output (results, `ERROR:` lines) goes to stdout through
//! [`crate::ui::output`] and is unaffected by the filter set here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `--debug` is given and `RUST_LOG` is unset.
const DEBUG_FILTER: &str = "warn,rispuppet=debug";

/// Filter directive for the given flags. `RUST_LOG` wins when set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        DEBUG_FILTER
    } else {
        "warn"
    }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn`, or crate-level `debug` with
/// `--debug`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=rispuppet::git=debug ris-puppet module deploy -e development
/// ```
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    // A second init (tests driving `cli::run` repeatedly) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_crate_level_only() {
        assert_eq!(default_filter(false), "warn");
        assert_eq!(default_filter(true), "warn,rispuppet=debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
