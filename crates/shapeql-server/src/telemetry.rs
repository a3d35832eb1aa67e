use std::io::IsTerminal;

use tracing::Subscriber;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::{LogConfig, LogStyle};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Installs the global log subscriber. `RUST_LOG` overrides the configured filter.
pub fn init(config: &LogConfig) -> crate::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    tracing_subscriber::registry()
        .with(log_format(config.style))
        .with(env_filter)
        .try_init()?;

    Ok(())
}

fn log_format<S>(style: LogStyle) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
{
    let layer = tracing_subscriber::fmt::layer();

    match style {
        // colors only for interactive terminals
        LogStyle::Text if std::io::stdout().is_terminal() => layer.with_ansi(true).boxed(),
        LogStyle::Text => layer.with_ansi(false).boxed(),
        LogStyle::Json => layer.json().boxed(),
    }
}
