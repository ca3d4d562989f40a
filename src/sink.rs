use crate::attr::{Attr, Group, Value};
use crate::error::Error;
use crate::level::Level;
use crate::record::Record;
use crate::rewrite::ReplaceAttr;
use chrono::Utc;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Keys of the built-in fields as seen by a [`ReplaceAttr`] hook before any
/// rewriting.
pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MESSAGE_KEY: &str = "msg";
pub const SOURCE_KEY: &str = "source";

/// Options for a [`JsonSink`].
#[derive(Clone, Default)]
pub struct SinkOptions {
    /// Records below this level are not written.
    pub level: Level,
    /// Write the source location of records that carry one.
    pub add_source: bool,
    /// Rewrite for the built-in fields only. Runs before `replace_attr`.
    pub rename_builtin: Option<ReplaceAttr>,
    /// Hook for every attribute that isn't a group, built-in or not.
    pub replace_attr: Option<ReplaceAttr>,
}

/// Synchronous destination that writes each [`Record`] as one JSON object per
/// line.
///
/// Field order is time, level, source, message, then the record's own
/// attributes. The built-in fields go through `rename_builtin`; the record's
/// attributes never do, so a caller key such as `level` is written as is.
/// Every attribute that isn't a group then goes through `replace_attr`. Writes are serialized through a mutex and the
/// writer is flushed after every record.
pub struct JsonSink {
    writer: Mutex<Box<dyn Write + Send>>,
    options: SinkOptions,
}

impl JsonSink {
    pub fn new(writer: impl Write + Send + 'static, options: SinkOptions) -> Self {
        JsonSink { writer: Mutex::new(Box::new(writer)), options }
    }

    /// Whether records at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.options.level
    }

    /// Encode `record` and write it out.
    ///
    /// **Returns**
    /// - `Ok(())` once the line has been written and flushed.
    /// - `Err(..)` if encoding or the underlying writer failed. Nothing is
    ///   retried.
    pub fn handle(&self, record: &Record) -> Result<(), Error> {
        let mut builtins = Vec::with_capacity(4);
        if let Some(time) = record.time {
            builtins.push(Attr::new(TIME_KEY, time.with_timezone(&Utc)));
        }
        builtins.push(Attr::new(LEVEL_KEY, record.level));
        if self.options.add_source {
            if let Some(source) = &record.source {
                builtins.push(Attr::new(SOURCE_KEY, source.clone()));
            }
        }
        builtins.push(Attr::new(MESSAGE_KEY, record.message.as_str()));

        let root: &[String] = &[];
        let mut fields = Vec::with_capacity(builtins.len() + record.attrs.len());
        for attr in builtins {
            let attr = match &self.options.rename_builtin {
                Some(rename) => rename(root, attr),
                None => Some(attr),
            };
            fields.extend(attr.and_then(|attr| self.hook(root, attr)));
        }

        let mut path = Vec::new();
        for attr in record.attrs.iter().cloned() {
            fields.extend(self.replace(&mut path, attr));
        }

        let mut line = serde_json::to_vec(&Group(&fields))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }

    fn replace(&self, path: &mut Vec<String>, attr: Attr) -> Option<Attr> {
        match attr.value {
            Value::Group(members) => {
                let named = !attr.key.is_empty();
                if named {
                    path.push(attr.key.clone());
                }
                let members = members
                    .into_iter()
                    .filter_map(|member| self.replace(path, member))
                    .collect();
                if named {
                    path.pop();
                }
                Some(Attr::group(attr.key, members))
            }
            _ => self.hook(path.as_slice(), attr),
        }
    }

    fn hook(&self, groups: &[String], attr: Attr) -> Option<Attr> {
        match &self.options.replace_attr {
            Some(replace) => replace(groups, attr),
            None => Some(attr),
        }
    }
}
