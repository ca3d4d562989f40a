use crate::attr::{fold_attrs, Attr};
use crate::env;
use crate::error::Error;
use crate::level::Level;
use crate::record::Record;
use crate::request::RequestContext;
use crate::rewrite::{self, ReplaceAttr};
use crate::sink::{JsonSink, SinkOptions};
use chrono::Utc;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Configuration for a [`Handler`].
#[derive(Clone, Default)]
pub struct Options {
    /// Minimum level to write. Defaults to [`Level::INFO`].
    pub level: Level,
    /// Write `logging.googleapis.com/sourceLocation` for records that carry a
    /// source location.
    pub add_source: bool,
    /// Hook applied to every attribute that isn't a group. Built-in fields
    /// reach it already renamed to their Cloud Logging keys.
    pub replace_attr: Option<ReplaceAttr>,
    /// Alphanumeric Google Cloud project ID. If unset, the handler falls back
    /// to `GOOGLE_CLOUD_PROJECT`; without any project, trace fields are left
    /// out.
    pub project_id: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from `LOG_LEVEL` and `GOOGLE_CLOUD_PROJECT`.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Options { level: env::level()?, project_id: env::project_id(), ..Default::default() })
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn replace_attr<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String], Attr) -> Option<Attr> + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("level", &self.level)
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.is_some())
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Handler that writes records as Cloud Logging structured JSON.
///
/// Handlers are cheap to clone and never change once built: [`with_attrs`]
/// and [`with_group`] return new handlers and leave the receiver alone, so a
/// base handler can be shared freely between requests and threads.
///
/// [`with_attrs`]: Handler::with_attrs
/// [`with_group`]: Handler::with_group
#[derive(Clone)]
pub struct Handler {
    sink: Arc<JsonSink>,
    /// Empty if the project is unknown.
    project_id: Arc<str>,
    /// Attributes added by `with_attrs`.
    attrs: Vec<Attr>,
    /// Open groups, innermost first.
    groups: Vec<String>,
}

impl Handler {
    /// Create a handler writing to `writer` (typically stderr).
    ///
    /// **Returns**
    /// - `Err(Error::InvalidProjectId)` if the configured or detected project
    ///   ID can't be part of a trace resource name.
    pub fn new(writer: impl Write + Send + 'static, options: Options) -> Result<Self, Error> {
        let project_id = options
            .project_id
            .filter(|p| !p.is_empty())
            .or_else(env::project_id)
            .unwrap_or_default();
        validate_project_id(&project_id)?;

        let sink = JsonSink::new(
            writer,
            SinkOptions {
                level: options.level,
                add_source: options.add_source,
                rename_builtin: Some(Arc::new(rewrite::replace_attr)),
                replace_attr: options.replace_attr,
            },
        );
        Ok(Handler {
            sink: Arc::new(sink),
            project_id: project_id.into(),
            attrs: Vec::new(),
            groups: Vec::new(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.sink.enabled(level)
    }

    /// Write `record`, attaching the request attributes of `request` if
    /// given. Errors from the writer are returned as-is.
    pub fn handle(&self, request: Option<&RequestContext>, record: &Record) -> Result<(), Error> {
        let mut out = Record {
            time: record.time.map(|t| t.with_timezone(&Utc).fixed_offset()),
            level: record.level,
            message: record.message.clone(),
            source: record.source.clone(),
            attrs: Vec::new(),
        };
        if let Some(request) = request {
            out.add_attrs(request.attrs(&self.project_id));
        }
        out.add_attrs(fold_attrs(&self.attrs, &record.attrs, &self.groups));
        self.sink.handle(&out)
    }

    /// [`handle`](Handler::handle) with the request context of the current
    /// task, if any.
    pub fn handle_current(&self, record: &Record) -> Result<(), Error> {
        let request = RequestContext::current();
        self.handle(request.as_deref(), record)
    }

    /// New handler that adds `attrs` to every record.
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> Handler {
        let mut child = self.clone();
        child.attrs.extend(attrs);
        child
    }

    /// New handler that nests all further attributes in a group called
    /// `name`. An empty name leaves the handler unchanged.
    pub fn with_group(&self, name: impl Into<String>) -> Handler {
        let name = name.into();
        let mut child = self.clone();
        if !name.is_empty() {
            child.groups.insert(0, name);
        }
        child
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("project_id", &self.project_id)
            .field("attrs", &self.attrs)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

fn validate_project_id(project_id: &str) -> Result<(), Error> {
    if project_id.contains('/') || project_id.chars().any(char::is_whitespace) {
        return Err(Error::InvalidProjectId(project_id.to_string()));
    }
    Ok(())
}
