//! Tag decoders translate per-field tag directives into concrete values.
//!
//! A field carries an ordered set of `(key, text)` tags emitted by the
//! derive macros, for example `("default", "8080")` or
//! `("value", "${server.port:8080}")`. During binding and injection each
//! registered [`TagDecoder`] whose key appears on the field gets a chance
//! to produce a value; the last decoder to produce one wins. A tag is
//! consumed exactly once per field.

use std::sync::Arc;

use crate::{Config, resolver};

/// `key=value` pairs parsed out of a single tag string, for example
/// `name=primary,capacity=10`.
pub struct Tag {
    pairs: Vec<(String, String)>,
}

impl Tag {
    pub fn parse(text: &str) -> Self {
        let mut pairs = Vec::new();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) => pairs.push((key.trim().to_owned(), value.trim().to_owned())),
                None => pairs.push((part.to_owned(), String::new())),
            }
        }
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the pairs as a JSON object, guessing scalar types the same
    /// way the kind table does: integers, floats and booleans parse into
    /// their own representation, everything else stays a string.
    pub fn to_object(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, value) in self.pairs() {
            map.insert(key.to_owned(), guess_scalar(value));
        }
        serde_json::Value::Object(map)
    }
}

fn guess_scalar(text: &str) -> serde_json::Value {
    if let Ok(v) = text.parse::<i64>() {
        return serde_json::Value::from(v);
    }
    if let Ok(v) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(v) {
            return serde_json::Value::Number(n);
        }
    }
    if let Ok(v) = text.parse::<bool>() {
        return serde_json::Value::Bool(v);
    }
    serde_json::Value::String(text.to_owned())
}

/// The declared kind of a bindable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    Int,
    UInt,
    Float,
    Bool,
    StringList,
}

/// Static descriptor of one tagged struct field, emitted by the derive
/// macros as the Rust stand-in for a struct-tag string.
pub struct FieldTag {
    pub name: &'static str,
    pub kind: Kind,
    pub tags: &'static [(&'static str, &'static str)],
}

/// A view of one field while the pipeline runs.
pub struct FieldView<'a> {
    pub name: &'a str,
    pub kind: Kind,
    /// Whether the field currently holds the zero value of its kind.
    pub zero: bool,
}

/// Context handed to decoders: the merged configuration tree for
/// `${...}` reference resolution.
pub struct DecodeCx<'a> {
    pub context: &'a Config,
}

impl DecodeCx<'_> {
    /// Expands `${...}` references in a tag text.
    pub fn expand(&self, text: &str) -> String {
        resolver::resolve_references(text, self.context)
    }
}

pub trait TagDecoder: Send + Sync {
    /// The tag key this decoder consumes, for example `"value"`.
    fn key(&self) -> &'static str;

    /// Whether values produced by this decoder are resolved once per
    /// container rather than once per use site.
    fn is_singleton(&self) -> bool {
        false
    }

    /// Translates the tag text into a value for the field, or `None` to
    /// leave the field untouched.
    fn decode(
        &self,
        cx: &DecodeCx<'_>,
        field: &FieldView<'_>,
        tag: &str,
    ) -> Option<serde_json::Value>;
}

/// Applies the tag text unconditionally after reference expansion.
pub struct ValueDecoder;

impl TagDecoder for ValueDecoder {
    fn key(&self) -> &'static str {
        "value"
    }

    fn decode(
        &self,
        cx: &DecodeCx<'_>,
        field: &FieldView<'_>,
        tag: &str,
    ) -> Option<serde_json::Value> {
        parse_kind(field.kind, field.name, &cx.expand(tag))
    }
}

/// Applies the tag text only when the field still holds its zero value.
pub struct DefaultDecoder;

impl TagDecoder for DefaultDecoder {
    fn key(&self) -> &'static str {
        "default"
    }

    fn decode(
        &self,
        cx: &DecodeCx<'_>,
        field: &FieldView<'_>,
        tag: &str,
    ) -> Option<serde_json::Value> {
        if !field.zero {
            return None;
        }
        parse_kind(field.kind, field.name, &cx.expand(tag))
    }
}

/// The built-in pipeline: `default` first, then `value`, so an applicable
/// `value` tag overrides a default.
pub fn default_decoders() -> Vec<Arc<dyn TagDecoder>> {
    vec![Arc::new(DefaultDecoder), Arc::new(ValueDecoder)]
}

/// Runs every decoder whose key appears among the field's tags, in
/// pipeline order; the last produced value wins.
pub(crate) fn run_pipeline(
    decoders: &[Arc<dyn TagDecoder>],
    cx: &DecodeCx<'_>,
    field: &FieldView<'_>,
    tags: &[(&str, &str)],
) -> Option<serde_json::Value> {
    let mut resolved = None;
    for decoder in decoders {
        if let Some((_, tag)) = tags.iter().find(|(key, _)| *key == decoder.key()) {
            if let Some(value) = decoder.decode(cx, field, tag) {
                resolved = Some(value);
            }
        }
    }
    resolved
}

/// Parses expanded tag text into the field's kind. Parse failures leave
/// the field untouched: this mirrors the permissive behavior embedding
/// applications rely on, so the failure is only traced, never surfaced.
pub(crate) fn parse_kind(kind: Kind, name: &str, text: &str) -> Option<serde_json::Value> {
    let parsed = match kind {
        Kind::String => Some(serde_json::Value::String(text.to_owned())),
        Kind::Int => text.trim().parse::<i64>().ok().map(serde_json::Value::from),
        Kind::UInt => text.trim().parse::<u64>().ok().map(serde_json::Value::from),
        Kind::Float => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number),
        Kind::Bool => text
            .trim()
            .parse::<bool>()
            .ok()
            .map(serde_json::Value::Bool),
        Kind::StringList => Some(serde_json::Value::Array(
            text.split(',')
                .map(|v| serde_json::Value::String(v.trim().to_owned()))
                .collect(),
        )),
    };
    if parsed.is_none() {
        tracing::debug!("Cannot parse tag text {text:?} for field {name}, leaving it untouched");
    }
    parsed
}

/// Whether a JSON value is the zero value of the given kind.
pub(crate) fn is_zero_value(kind: Kind, value: &serde_json::Value) -> bool {
    match (kind, value) {
        (_, serde_json::Value::Null) => true,
        (Kind::String, serde_json::Value::String(v)) => v.is_empty(),
        (Kind::Int, serde_json::Value::Number(v)) => v.as_i64() == Some(0),
        (Kind::UInt, serde_json::Value::Number(v)) => v.as_u64() == Some(0),
        (Kind::Float, serde_json::Value::Number(v)) => v.as_f64() == Some(0.0),
        (Kind::Bool, serde_json::Value::Bool(v)) => !v,
        (Kind::StringList, serde_json::Value::Array(v)) => v.is_empty(),
        _ => false,
    }
}
