//! Structured logging for Google Cloud.
//!
//! Records are written as one JSON object per line in the layout that
//! [Cloud Logging] parses: levels map to Cloud Logging severities, the
//! message, time and source location move to their dedicated fields, and
//! records logged while serving an HTTP request carry an `httpRequest` group
//! and, when the project is known, the trace and span IDs from
//! `X-Cloud-Trace-Context`.
//!
//! Use [`init::init_tracing`] to route all `tracing` events through a
//! [`handler::Handler`], and wrap HTTP services in
//! [`middleware::RequestContextLayer`] to get request fields.
//!
//! [Cloud Logging]: https://cloud.google.com/logging/docs/structured-logging

pub mod attr;
pub mod env;
pub mod error;
pub mod handler;
pub mod init;
pub mod layer;
pub mod level;
pub mod middleware;
pub mod record;
pub mod request;
pub mod rewrite;
pub mod sink;

pub use attr::{Attr, Source, Value};
pub use error::Error;
pub use handler::{Handler, Options};
pub use layer::CloudLoggingLayer;
pub use level::Level;
pub use record::Record;
pub use request::RequestContext;
