//! Environment variable names used by this crate for configuration.
//!
//! These are purely helpers; [`Handler`](crate::handler::Handler) itself only
//! falls back to [`project_id`] when no project was configured.

use crate::error::Error;
use crate::level::Level;

/// Google Cloud project ID, set by App Engine, Cloud Run and Cloud Functions.
/// See <https://cloud.google.com/appengine/docs/standard/go/runtime#environment_variables>.
pub const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Minimum severity to write, e.g. `debug` or `notice`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Project ID from the environment, if set and non-empty.
pub fn project_id() -> Option<String> {
    std::env::var(GOOGLE_CLOUD_PROJECT_ENV).ok().filter(|p| !p.is_empty())
}

/// Level from [`LOG_LEVEL_ENV`], defaulting to [`Level::INFO`].
pub fn level() -> Result<Level, Error> {
    env_or(LOG_LEVEL_ENV, "info").parse()
}
