use crate::attr::{Attr, Source, Value};
use crate::handler::Handler;
use crate::level::Level;
use crate::record::Record;
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanRecord};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into Cloud Logging records
/// and writes them through a [`Handler`].
///
/// Event fields become record attributes and the `message` field becomes the
/// record message. Fields of the enclosing spans are added like
/// [`Handler::with_attrs`], outermost span first; with
/// [`with_span_groups`](CloudLoggingLayer::with_span_groups) each span also
/// opens a group named after it. Events logged inside a
/// [`RequestContextService`](crate::middleware::RequestContextService) pick up
/// the request's context.
pub struct CloudLoggingLayer {
    handler: Handler,
    span_groups: bool,
}

impl CloudLoggingLayer {
    pub fn new(handler: Handler) -> Self {
        Self { handler, span_groups: false }
    }

    pub fn with_span_groups(mut self, span_groups: bool) -> Self {
        self.span_groups = span_groups;
        self
    }
}

/// Span fields recorded so far, stored in the span's extensions.
struct SpanFields(Vec<Attr>);

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = Vec::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &SpanRecord<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut recorded = Vec::new();
        let mut message = None;
        values.record(&mut FieldVisitor { fields: &mut recorded, message: &mut message });

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(SpanFields(fields)) => {
                for attr in recorded {
                    match fields.iter_mut().find(|f| f.key == attr.key) {
                        Some(existing) => *existing = attr,
                        None => fields.push(attr),
                    }
                }
            }
            None => extensions.insert(SpanFields(recorded)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { fields: &mut attrs, message: &mut message });

        let mut handler = self.handler.clone();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if self.span_groups {
                    handler = handler.with_group(span.name());
                }
                if let Some(SpanFields(fields)) = span.extensions().get::<SpanFields>() {
                    if !fields.is_empty() {
                        handler = handler.with_attrs(fields.iter().cloned());
                    }
                }
            }
        }

        let source = Source {
            file: meta.file().unwrap_or_default().to_string(),
            line: meta.line().unwrap_or(0),
            function: meta.module_path().unwrap_or_default().to_string(),
        };
        let record = Record::new(Utc::now(), level, message.unwrap_or_default())
            .with_source(source)
            .with_attrs(attrs);

        if let Err(e) = handler.handle_current(&record) {
            eprintln!("error writing log record: {}", e);
        }
    }
}

/// Collects `tracing` fields as attributes, keeping the `message` field apart.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl FieldVisitor<'_> {
    fn push(&mut self, field: &Field, value: Value) {
        self.fields.push(Attr::new(field.name(), value));
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::Uint(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Options;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(layer: impl FnOnce(Handler) -> CloudLoggingLayer, f: impl FnOnce()) -> Vec<serde_json::Value> {
        let buf = Buffer::default();
        let options = Options::new().project_id("test").replace_attr(|_: &[String], a: Attr| {
            (a.key != crate::rewrite::TIME_KEY).then_some(a)
        });
        let handler = Handler::new(buf.clone(), options).unwrap();
        let subscriber = Registry::default().with(layer(handler));
        tracing::subscriber::with_default(subscriber, f);

        let bytes = buf.0.lock().unwrap().clone();
        serde_json::Deserializer::from_slice(&bytes)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn events_become_records() {
        let got = capture(CloudLoggingLayer::new, || {
            tracing::info!("info");
            tracing::warn!(foo = "bar", "warning");
            tracing::debug!("this message won't appear");
            tracing::error!(attr = 123, ok = true, ratio = 0.5, "error");
        });
        assert_eq!(
            got,
            vec![
                serde_json::json!({"severity": "INFO", "message": "info"}),
                serde_json::json!({"severity": "WARNING", "message": "warning", "foo": "bar"}),
                serde_json::json!({
                    "severity": "ERROR",
                    "message": "error",
                    "attr": 123,
                    "ok": true,
                    "ratio": 0.5,
                }),
            ]
        );
    }

    #[test]
    fn span_fields_are_persistent_attrs() {
        let got = capture(CloudLoggingLayer::new, || {
            let span = tracing::info_span!("request", user = "alice", n = tracing::field::Empty);
            let _guard = span.enter();
            span.record("n", 7);
            tracing::info!(attr = 1, "inside");
        });
        assert_eq!(
            got,
            vec![serde_json::json!({
                "severity": "INFO",
                "message": "inside",
                "user": "alice",
                "n": 7,
                "attr": 1,
            })]
        );
    }

    #[test]
    fn spans_open_groups_when_enabled() {
        let got = capture(
            |h| CloudLoggingLayer::new(h).with_span_groups(true),
            || {
                let outer = tracing::info_span!("outer");
                let _outer = outer.enter();
                let inner = tracing::info_span!("inner", k = "v");
                let _inner = inner.enter();
                tracing::error!(attr = 123, "test error");
            },
        );
        assert_eq!(
            got,
            vec![serde_json::json!({
                "severity": "ERROR",
                "message": "test error",
                "outer": {"inner": {"k": "v", "attr": 123}},
            })]
        );
    }

    #[test]
    fn source_location_is_opt_in() {
        let buf = Buffer::default();
        let handler = Handler::new(buf.clone(), Options::new().add_source(true)).unwrap();
        let subscriber = Registry::default().with(CloudLoggingLayer::new(handler));
        tracing::subscriber::with_default(subscriber, || tracing::info!("here"));

        let bytes = buf.0.lock().unwrap().clone();
        let got: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let location = &got[crate::rewrite::SOURCE_LOCATION_KEY];
        assert_eq!(location["file"], file!());
        assert!(location["line"].as_str().unwrap().parse::<u32>().unwrap() > 0);
        assert_eq!(location["function"], module_path!());
    }

    #[derive(Clone, Default)]
    struct Counter(Arc<Mutex<usize>>);

    impl<S: Subscriber> Layer<S> for Counter {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn threshold_does_not_hide_events_from_other_layers() {
        let buf = Buffer::default();
        let handler = Handler::new(buf.clone(), Options::new().level(Level::WARN)).unwrap();
        let counter = Counter::default();
        let subscriber = Registry::default()
            .with(CloudLoggingLayer::new(handler))
            .with(counter.clone());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("below threshold");
            tracing::warn!("above threshold");
        });

        assert_eq!(*counter.0.lock().unwrap(), 2);
        let bytes = buf.0.lock().unwrap().clone();
        let got: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(got["message"], "above threshold");
    }
}
