//! Tracing subscriber setup for the binary.

use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::LoggingSection;

pub const LOG_FILE_PREFIX: &str = "casedesk.log";

/// Filter directive: `RUST_LOG` wins, then `-v`, then the configured level.
pub fn filter_directive(config: &LoggingSection, verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => "debug".to_string(),
        None => config.level.to_ascii_lowercase(),
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process so buffered file output is flushed.
pub fn init(config: &LoggingSection, verbose: bool) -> Result<Option<WorkerGuard>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(config, verbose, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directive, e))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if config.json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    let guard = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        let config = LoggingSection {
            level: "WARN".into(),
            ..Default::default()
        };
        assert_eq!(filter_directive(&config, false, None), "warn");
        assert_eq!(filter_directive(&config, true, None), "debug");
        assert_eq!(
            filter_directive(&config, true, Some("casedesk=trace")),
            "casedesk=trace"
        );
        assert_eq!(filter_directive(&config, false, Some("  ")), "warn");
    }
}
