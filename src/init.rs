use crate::error::Error;
use crate::handler::{Handler, Options};
use crate::layer::CloudLoggingLayer;
use std::io::Write;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Initialize the global `tracing` subscriber so that all events are written
/// to `writer` as Cloud Logging structured JSON.
///
/// **Parameters**
/// - `writer`: destination of the JSON lines, typically stderr or stdout.
/// - `options`: [`Options`] for the underlying [`Handler`].
///
/// **Returns**
/// - `Err(Error::InvalidProjectId)` for an unusable project ID.
/// - `Err(Error::Init)` if a global subscriber was already installed.
pub fn init_tracing_with_config(
    writer: impl Write + Send + 'static,
    options: Options,
) -> Result<(), Error> {
    let handler = Handler::new(writer, options)?;
    let subscriber = Registry::default().with(CloudLoggingLayer::new(handler));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Like [`init_tracing_with_config`], and also print every event to stdout in
/// `tracing_subscriber`'s human-readable format. Meant for local development,
/// where the JSON lines are hard to read.
///
/// The console layer sees events below the handler's level too.
pub fn init_tracing_with_console(
    writer: impl Write + Send + 'static,
    options: Options,
) -> Result<(), Error> {
    let handler = Handler::new(writer, options)?;
    let subscriber = Registry::default()
        .with(CloudLoggingLayer::new(handler))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with stderr and
/// [`Options::from_env`]. This is the recommended entrypoint for services
/// running on App Engine, Cloud Run or Cloud Functions.
pub fn init_tracing() -> Result<(), Error> {
    init_tracing_with_config(std::io::stderr(), Options::from_env()?)
}
