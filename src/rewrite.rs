//! Translation of the built-in record fields into Cloud Logging's
//! [structured logging] vocabulary.
//!
//! [structured logging]: https://cloud.google.com/logging/docs/structured-logging

use crate::attr::{group_value, Attr, Value};
use crate::sink;
use std::sync::Arc;

/// Keys with a special meaning in the output record. See
/// <https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry>.
pub const TIME_KEY: &str = "time";
pub const SEVERITY_KEY: &str = "severity";
pub const MESSAGE_KEY: &str = "message";
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub const HTTP_REQUEST_KEY: &str = "httpRequest";
pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";

/// Hook that rewrites or drops an attribute before it's written.
///
/// The first argument is the path of groups enclosing the attribute,
/// outermost first. Returning `None` drops the attribute. Group attributes
/// aren't passed to the hook; their members are.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Option<Attr> + Send + Sync>;

/// Rename the built-in fields of a record to the keys Cloud Logging expects.
///
/// The handler applies this to the fields the sink writes itself, never to
/// caller attributes. Only top-level attributes are touched; anything inside a
/// group is passed through unchanged.
pub fn replace_attr(groups: &[String], mut attr: Attr) -> Option<Attr> {
    if !groups.is_empty() {
        return Some(attr);
    }
    match attr.key.as_str() {
        sink::TIME_KEY => {
            // The handler has already converted the time to UTC.
            attr.key = TIME_KEY.to_string();
        }
        sink::LEVEL_KEY => {
            attr.key = SEVERITY_KEY.to_string();
            if let Value::Level(level) = attr.value {
                attr.value = Value::String(level.severity().to_string());
            }
        }
        sink::MESSAGE_KEY => {
            attr.key = MESSAGE_KEY.to_string();
        }
        sink::SOURCE_KEY => {
            attr.key = SOURCE_LOCATION_KEY.to_string();
            if let Value::Source(source) = &attr.value {
                // LogEntrySourceLocation wants the line as a string. Leave it
                // out when unknown so an unresolved location stays empty.
                let line = match source.line {
                    0 => String::new(),
                    n => n.to_string(),
                };
                attr.value = group_value([
                    ("file", source.file.as_str()),
                    ("line", line.as_str()),
                    ("function", source.function.as_str()),
                ]);
            }
        }
        _ => {}
    }
    Some(attr)
}
