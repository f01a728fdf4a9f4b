use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::tags::{DecodeCx, FieldTag, FieldView, Kind, TagDecoder, is_zero_value, run_pipeline};
use crate::{Component, Config, ContainerError};

/// A struct bound from one section of the configuration tree.
///
/// Binding starts from the serialized default value, deep-merges the
/// section found under [`Properties::prefix`] over it, runs the tag
/// pipeline for every described field, and deserializes the result. Bound
/// properties are folded back into the context tree and registered as
/// live instances, so constructors can take them as `Arc<T>` parameters.
pub trait Properties: Default + Serialize + DeserializeOwned + Component {
    /// Dotted path of the section this struct binds from.
    fn prefix() -> &'static str;

    /// Static per-field tag descriptors, emitted by
    /// `#[derive(Properties)]`.
    fn field_tags() -> &'static [FieldTag] {
        &[]
    }
}

pub(crate) fn bind<T: Properties>(
    context: &Config,
    decoders: &[Arc<dyn TagDecoder>],
) -> Result<T, ContainerError> {
    let mut value = serde_json::to_value(T::default()).map_err(|source| ContainerError::Bind {
        section: T::prefix().to_owned(),
        source: source.into(),
    })?;
    if let Some(section) = context.lookup(T::prefix()) {
        config::merge_json_from(&mut value, section.clone());
    }
    let cx = DecodeCx { context };
    if let Some(map) = value.as_object_mut() {
        for field in T::field_tags() {
            let current = map
                .get(field.name)
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let view = FieldView {
                name: field.name,
                kind: field.kind,
                zero: is_zero_value(field.kind, &current),
            };
            if let Some(decoded) = run_pipeline(decoders, &cx, &view, field.tags) {
                map.insert(field.name.to_owned(), decoded);
            }
        }
    }
    serde_json::from_value(value).map_err(|source| ContainerError::Bind {
        section: T::prefix().to_owned(),
        source: source.into(),
    })
}

/// The `app.profiles` subsection: explicitly activated profiles plus
/// profiles pulled in unconditionally.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileProperties {
    pub active: Vec<String>,
    pub include: Vec<String>,
}

/// The `app` section, bound first so the active profile set is known
/// before any profile-suffixed source is merged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppProperties {
    pub name: String,
    pub profiles: ProfileProperties,
}

impl Component for AppProperties {}

impl Properties for AppProperties {
    fn prefix() -> &'static str {
        "app"
    }

    fn field_tags() -> &'static [FieldTag] {
        &[FieldTag {
            name: "name",
            kind: Kind::String,
            tags: &[("default", "app")],
        }]
    }
}

/// The `server` section. The container itself never opens a socket; the
/// section exists so embedding transports share one source of truth.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerProperties {
    pub host: String,
    pub port: u16,
}

impl Component for ServerProperties {}

impl Properties for ServerProperties {
    fn prefix() -> &'static str {
        "server"
    }

    fn field_tags() -> &'static [FieldTag] {
        &[
            FieldTag {
                name: "host",
                kind: Kind::String,
                tags: &[("default", "localhost")],
            },
            FieldTag {
                name: "port",
                kind: Kind::UInt,
                tags: &[("default", "8080")],
            },
        ]
    }
}

/// The `logging` section: a base level plus extra `target=level`
/// directives, handed to the tracing bootstrap during build.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingProperties {
    pub level: String,
    pub directives: Vec<String>,
}

impl Component for LoggingProperties {}

impl Properties for LoggingProperties {
    fn prefix() -> &'static str {
        "logging"
    }

    fn field_tags() -> &'static [FieldTag] {
        &[FieldTag {
            name: "level",
            kind: Kind::String,
            tags: &[("default", "info")],
        }]
    }
}
