use crate::attr::{Attr, Source};
use crate::level::Level;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Snapshot of a single log call.
///
/// A record without a time is written without a time field.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: Option<DateTime<FixedOffset>>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    pub attrs: Vec<Attr>,
}

impl Record {
    pub fn new<Tz: TimeZone>(time: DateTime<Tz>, level: Level, message: impl Into<String>) -> Self {
        Record {
            time: Some(time.fixed_offset()),
            level,
            message: message.into(),
            source: None,
            attrs: Vec::new(),
        }
    }

    /// Record stamped with the current time.
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self::new(Utc::now(), level, message)
    }

    pub fn without_time(mut self) -> Self {
        self.time = None;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.add_attrs(attrs);
        self
    }

    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }
}
