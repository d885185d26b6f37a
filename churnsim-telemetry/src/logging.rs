//! ## churnsim-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Churn diagnostics are ordinary `tracing` events with typed fields
//! (`node`, `q`, `e`, `availability`, ...), so any subscriber can consume
//! them. This module only installs the default formatter.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Debug)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. `RUST_LOG` takes precedence over
    /// `default_level`. Returns `false` if a subscriber was already set.
    pub fn init(default_level: &str) -> bool {
        fmt()
            .with_env_filter(Self::filter(default_level))
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .is_ok()
    }

    /// Builds the filter `init` uses, falling back to `info` when neither
    /// `RUST_LOG` nor `default_level` parses.
    pub fn filter(default_level: &str) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn structured_fields_reach_the_subscriber() {
        tracing::info!(node = 4, p = 0.04, "churn evaluation");
        assert!(logs_contain("churn evaluation"));
        assert!(logs_contain("node=4"));
    }
}
