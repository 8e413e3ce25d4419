use tracing::subscriber::set_global_default;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Installs a process-wide `tracing` subscriber for the given log level, and
/// bridges any plain `log` records (emitted by dependencies that predate
/// `tracing`) into the same subscriber.
///
/// No OpenTelemetry/OTLP exporter layer here: this crate has no long-lived
/// service to export spans to, just a one-shot numbering run, so stdout
/// formatting is enough.
pub fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().pretty();
    let subscriber = Registry::default().with(env_filter).with(stdout_layer);

    let _ = set_global_default(subscriber);
    let _ = tracing_log::LogTracer::init();
}
