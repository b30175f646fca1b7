//! Tracing setup.
//!
//! The subscriber is only installed when `ANNOTYPE_LOG` (or `RUST_LOG`) is
//! set. `ANNOTYPE_LOG_FORMAT=json` switches to newline-delimited JSON.
//!
//! ```bash
//! ANNOTYPE_LOG=debug annotype inspect 'Optional[list[int]]'
//! ANNOTYPE_LOG=annotype::parse=trace ANNOTYPE_LOG_FORMAT=json annotype base -i fields.json
//! ```
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        Self::parse(&std::env::var("ANNOTYPE_LOG_FORMAT").unwrap_or_default())
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("ANNOTYPE_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Install the global subscriber. All output goes to stderr so stdout stays
/// clean for reports.
pub fn init_tracing() {
    if std::env::var("ANNOTYPE_LOG").is_err() && std::env::var("RUST_LOG").is_err() {
        return;
    }
    let filter = build_filter();
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    // `try_init` so a second call (tests, embedding) is a no-op.
    let _ = match LogFormat::from_env() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
