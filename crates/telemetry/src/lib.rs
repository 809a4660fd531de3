//! Logging and tracing bootstrap for TANDEM.

use tandem_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber per the configured log format.
///
/// `RUST_LOG` narrows the filter; the default is `info`. Calling this twice
/// is harmless, the second install attempt is ignored.
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(format = ?settings.log_format, "tracing subscriber installed");
    }
}
