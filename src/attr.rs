use crate::level::Level;
use crate::rewrite::MESSAGE_KEY;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Source code location of a log call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Source {
    pub file: String,
    /// Zero if unknown.
    pub line: u32,
    pub function: String,
}

/// Value of an [`Attr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Level(Level),
    Source(Source),
    Group(Vec<Attr>),
}

/// Key/value pair attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr { key: key.into(), value: value.into() }
    }

    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr { key: key.into(), value: Value::Group(attrs) }
    }

    /// Whether the value is a group that would serialize to nothing.
    pub fn is_empty_group(&self) -> bool {
        self.value.is_empty_group()
    }
}

impl Value {
    pub fn is_empty_group(&self) -> bool {
        match self {
            Value::Group(attrs) => attrs.iter().all(Attr::is_empty_group),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<Level> for Value {
    fn from(v: Level) -> Self {
        Value::Level(v)
    }
}

impl From<Source> for Value {
    fn from(v: Source) -> Self {
        Value::Source(v)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(v: Vec<Attr>) -> Self {
        Value::Group(v)
    }
}

/// Build string attributes from `(key, value)` pairs, skipping pairs whose
/// value is empty.
pub fn optional_strings<'a, I>(pairs: I) -> Vec<Attr>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| Attr::new(k, v))
        .collect()
}

/// Group value containing only the non-empty `(key, value)` pairs.
pub fn group_value<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    Value::Group(optional_strings(pairs))
}

/// Fold persistent and record-local attributes into the chain of open groups.
///
/// `groups` is ordered innermost first. Record attributes keyed `message` are
/// dropped since the message is emitted separately. Returns an empty list when
/// there is nothing to emit.
pub fn fold_attrs(persistent: &[Attr], record: &[Attr], groups: &[String]) -> Vec<Attr> {
    if persistent.is_empty() && record.is_empty() {
        return Vec::new();
    }
    let mut attrs = Vec::with_capacity(persistent.len() + record.len());
    attrs.extend_from_slice(persistent);
    attrs.extend(record.iter().filter(|a| a.key != MESSAGE_KEY).cloned());
    for group in groups {
        attrs = vec![Attr::group(group.clone(), attrs)];
    }
    attrs
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(v) => serializer.serialize_str(v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Time(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            Value::Level(l) => l.serialize(serializer),
            Value::Source(s) => s.serialize(serializer),
            Value::Group(attrs) => Group(attrs).serialize(serializer),
        }
    }
}

/// Serializes a list of attributes as one JSON object.
///
/// Empty groups are left out and groups with an empty key are inlined into
/// the enclosing object.
pub(crate) struct Group<'a>(pub(crate) &'a [Attr]);

impl Serialize for Group<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        write_entries(&mut map, self.0)?;
        map.end()
    }
}

fn write_entries<M: SerializeMap>(map: &mut M, attrs: &[Attr]) -> Result<(), M::Error> {
    for attr in attrs {
        if attr.is_empty_group() {
            continue;
        }
        match &attr.value {
            Value::Group(inner) if attr.key.is_empty() => write_entries(map, inner)?,
            value => map.serialize_entry(&attr.key, value)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(attrs: &[Attr]) -> String {
        serde_json::to_string(&Group(attrs)).unwrap()
    }

    #[test]
    fn fold_without_attrs_yields_nothing() {
        assert!(fold_attrs(&[], &[], &[]).is_empty());
        assert!(fold_attrs(&[], &[], &["g".to_string()]).is_empty());
    }

    #[test]
    fn fold_keeps_order_without_groups() {
        let persistent = vec![Attr::new("foo", "bar")];
        let record = vec![Attr::new("attr", 123)];
        let folded = fold_attrs(&persistent, &record, &[]);
        assert_eq!(folded, vec![Attr::new("foo", "bar"), Attr::new("attr", 123)]);
    }

    #[test]
    fn fold_nests_innermost_group_first() {
        let groups = vec!["inner".to_string(), "outer".to_string()];
        let folded = fold_attrs(&[Attr::new("a", 1)], &[Attr::new("b", true)], &groups);
        assert_eq!(
            folded,
            vec![Attr::group(
                "outer",
                vec![Attr::group("inner", vec![Attr::new("a", 1), Attr::new("b", true)])],
            )]
        );
        assert_eq!(to_json(&folded), r#"{"outer":{"inner":{"a":1,"b":true}}}"#);
    }

    #[test]
    fn fold_drops_record_message_attr() {
        let record = vec![Attr::new(MESSAGE_KEY, "dup"), Attr::new("k", "v")];
        assert_eq!(fold_attrs(&[], &record, &[]), vec![Attr::new("k", "v")]);
    }

    #[test]
    fn fold_then_unfold_preserves_attrs() {
        let persistent = vec![Attr::new("p1", 1), Attr::new("p2", "two")];
        let record = vec![Attr::new("r1", 1.5), Attr::group("r2", vec![Attr::new("x", false)])];
        let groups = vec!["c".to_string(), "b".to_string(), "a".to_string()];

        let mut folded = fold_attrs(&persistent, &record, &groups);
        let mut path = Vec::new();
        while let [Attr { key, value: Value::Group(inner) }] = folded.as_slice() {
            if path.len() == groups.len() {
                break;
            }
            path.push(key.clone());
            folded = inner.clone();
        }

        assert_eq!(path, vec!["a", "b", "c"]);
        let expected: Vec<Attr> = persistent.into_iter().chain(record).collect();
        assert_eq!(folded, expected);
    }

    #[test]
    fn optional_strings_skips_empty_values() {
        let attrs = optional_strings([("file", "main.rs"), ("line", ""), ("function", "main")]);
        assert_eq!(attrs, vec![Attr::new("file", "main.rs"), Attr::new("function", "main")]);
        assert_eq!(group_value([("a", ""), ("b", "")]), Value::Group(Vec::new()));
    }

    #[test]
    fn serialization_omits_empty_groups_and_inlines_unnamed_groups() {
        let attrs = vec![
            Attr::group("empty", Vec::new()),
            Attr::group("nested_empty", vec![Attr::group("x", Vec::new())]),
            Attr::group("", vec![Attr::new("inlined", "yes")]),
            Attr::new("n", 7u64),
        ];
        assert_eq!(to_json(&attrs), r#"{"inlined":"yes","n":7}"#);
    }

    #[test]
    fn time_serializes_as_rfc3339_nanos_utc() {
        let t = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.5+02:00")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_string(&Value::Time(t)).unwrap();
        assert_eq!(json, r#""2024-05-01T10:00:00.500000000Z""#);
    }
}
