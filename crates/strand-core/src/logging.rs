//! Subscriber bootstrap for binaries and tests embedding strand.

use strand_settings::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Filter directive built from settings: the default level followed by
/// per-module overrides.
pub fn filter_directive(settings: &LoggingSettings) -> String {
    let mut directive = settings.level.to_lowercase();
    for (module, level) in &settings.modules {
        directive.push_str(&format!(",{module}={}", level.to_lowercase()));
    }
    directive
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured levels. Fails if a subscriber is
/// already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(settings)));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(fmt_layer).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_includes_module_overrides() {
        let mut settings = LoggingSettings::default();
        settings.level = "WARN".into();
        let _ = settings.modules.insert("strand_agent".into(), "debug".into());
        let _ = settings.modules.insert("strand_runnable".into(), "TRACE".into());
        assert_eq!(
            filter_directive(&settings),
            "warn,strand_agent=debug,strand_runnable=trace"
        );
    }

    #[test]
    fn second_init_fails_without_panicking() {
        let settings = LoggingSettings::default();
        let _ = init_logging(&settings);
        assert!(init_logging(&settings).is_err());
    }
}
