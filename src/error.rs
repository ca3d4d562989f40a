/// Error type returned by handlers, sinks and initialization.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to write log record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode log record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid project id {0:?}: must not contain '/' or whitespace")]
    InvalidProjectId(String),

    #[error("unknown log level {0:?}")]
    UnknownLevel(String),

    #[error("failed to install global subscriber: {0}")]
    Init(#[from] tracing::subscriber::SetGlobalDefaultError),
}
