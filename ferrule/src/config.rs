use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{ContainerError, StdError};

/// A tree of named configuration sections.
///
/// Each top-level key names one section (for example `"jwt"` or
/// `"logging"`); the value below it is an arbitrary JSON document. Sections
/// can be read and written as typed values, and whole trees can be merged
/// deeply, later documents winning over earlier ones.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) configs: BTreeMap<String, serde_json::Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(
            self.configs
                .get(name.as_ref())
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        )?)
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        self.configs
            .insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Serialize,
    {
        self.configs
            .insert(name.into(), serde_json::to_value(value).unwrap());
        self
    }

    pub fn merge_from(&mut self, other: Self) {
        for (key, value) in other.configs {
            let entry = self.configs.entry(key);
            merge_json_from(entry.or_insert(serde_json::Value::Null), value);
        }
    }

    pub fn parse<T>(text: T) -> Result<Self, StdError>
    where
        T: AsRef<str>,
    {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(text)
    }

    /// Returns the raw value of a top-level section.
    pub fn section(&self, name: impl AsRef<str>) -> Option<&serde_json::Value> {
        self.configs.get(name.as_ref())
    }

    /// Walks a dotted path (`a.b.c`) into the tree. The first segment
    /// selects a section, the remaining segments walk nested objects.
    pub fn lookup(&self, path: &str) -> Option<&serde_json::Value> {
        let mut segments = path.split('.');
        let mut value = self.configs.get(segments.next()?)?;
        for segment in segments {
            value = value.as_object()?.get(segment)?;
        }
        Some(value)
    }

    /// Inserts a value at a dotted path, creating intermediate objects and
    /// replacing anything non-object along the way.
    pub fn set_path(&mut self, path: &str, value: serde_json::Value) {
        let mut segments = path.split('.');
        let first = match segments.next() {
            Some(v) if !v.is_empty() => v,
            _ => return,
        };
        let mut slot = self
            .configs
            .entry(first.to_owned())
            .or_insert(serde_json::Value::Null);
        for segment in segments {
            if !slot.is_object() {
                *slot = serde_json::Value::Object(serde_json::Map::new());
            }
            slot = slot
                .as_object_mut()
                .unwrap()
                .entry(segment.to_owned())
                .or_insert(serde_json::Value::Null);
        }
        *slot = value;
    }

    /// Deep-merges a value into one named section.
    pub fn fold(&mut self, name: impl Into<String>, value: serde_json::Value) {
        let entry = self.configs.entry(name.into());
        merge_json_from(entry.or_insert(serde_json::Value::Null), value);
    }

    /// Check if the config is empty
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Get the number of config entries
    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

pub(crate) fn merge_json_from(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    match lhs {
        serde_json::Value::Object(l) => match rhs {
            serde_json::Value::Object(r) => {
                for (key, value) in r {
                    let entry = l.entry(key);
                    merge_json_from(entry.or_insert(serde_json::Value::Null), value);
                }
            }
            _ => *lhs = rhs,
        },
        serde_json::Value::Array(l) => match rhs {
            serde_json::Value::Array(r) => {
                l.extend(r);
            }
            _ => *lhs = rhs,
        },
        _ => *lhs = rhs,
    }
}

/// Layered configuration documents.
///
/// Documents are merged in declaration order: base documents first, then
/// documents attached to an active profile, then explicit property
/// overrides last. A document attached to an inactive profile is ignored
/// entirely.
#[derive(Default)]
pub struct PropertySources {
    documents: Vec<SourceDocument>,
    overrides: Config,
}

struct SourceDocument {
    profile: Option<String>,
    config: Config,
}

impl PropertySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, config: Config) {
        self.documents.push(SourceDocument {
            profile: None,
            config,
        });
    }

    pub fn add_profile(&mut self, profile: impl Into<String>, config: Config) {
        self.documents.push(SourceDocument {
            profile: Some(profile.into()),
            config,
        });
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        let config = Self::read_file(path)?;
        self.add(config);
        Ok(())
    }

    pub fn add_profile_file(
        &mut self,
        profile: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<(), ContainerError> {
        let config = Self::read_file(path)?;
        self.add_profile(profile, config);
        Ok(())
    }

    pub fn set_override(&mut self, path: &str, value: serde_json::Value) {
        self.overrides.set_path(path, value);
    }

    /// Merges every document that applies under the given active profiles.
    pub fn merged(&self, active: &[String]) -> Config {
        let mut merged = Config::new();
        for document in &self.documents {
            match &document.profile {
                Some(profile) if !active.iter().any(|v| v == profile) => continue,
                _ => merged.merge_from(document.config.clone()),
            }
        }
        merged.merge_from(self.overrides.clone());
        merged
    }

    fn read_file(path: impl AsRef<Path>) -> Result<Config, ContainerError> {
        Config::parse_file(path.as_ref()).map_err(|source| ContainerError::Bind {
            section: path.as_ref().display().to_string(),
            source,
        })
    }
}
