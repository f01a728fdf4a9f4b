use std::any::{TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::registry::{ArcAny, MetaData, Registry, Role, Subject};
use crate::tags::{DecodeCx, FieldView, Tag, TagDecoder};
use crate::{Component, Config, ContainerError, configuration::BeanDefinition, tags};

/// The singleton instance map: every resolved registration keyed by its
/// role bucket and name, plus a type index for by-type lookup. The role
/// in the key keeps a configuration named `bar` apart from a bean named
/// `bar`. Append-only during a build cycle.
#[derive(Default)]
pub(crate) struct InstanceFactory {
    instances: DashMap<(Role, String), ArcAny>,
    by_type: DashMap<TypeId, Vec<(Role, String)>>,
}

impl InstanceFactory {
    pub fn get(&self, role: Role, name: &str) -> Option<ArcAny> {
        self.instances
            .get(&(role, name.to_owned()))
            .map(|v| v.value().clone())
    }

    pub fn get_typed<T: Send + Sync + 'static>(&self, role: Role, name: &str) -> Option<Arc<T>> {
        self.get(role, name).and_then(|v| v.downcast::<T>().ok())
    }

    pub fn insert(&self, role: Role, name: &str, type_id: TypeId, instance: ArcAny) {
        let key = (role, name.to_owned());
        if self.instances.insert(key.clone(), instance).is_none() {
            self.by_type.entry(type_id).or_default().push(key);
        }
    }

    /// First resolved instance of the given type, in resolution order.
    pub fn peek_type<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let keys = self.by_type.get(&TypeId::of::<T>())?;
        keys.value()
            .iter()
            .find_map(|(role, name)| self.get_typed::<T>(*role, name))
    }

    /// Every resolved instance of the given type, in resolution order.
    pub fn all_of_type<T: Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        let keys = match self.by_type.get(&TypeId::of::<T>()) {
            Some(v) => v.value().clone(),
            None => return Vec::new(),
        };
        keys.iter()
            .filter_map(|(role, name)| self.get_typed::<T>(*role, name))
            .collect()
    }
}

pub(crate) type WireFn = Box<dyn FnOnce(&Wiring<'_>) + Send>;

/// Read-only view of the instance map used by the wire pass. Nothing can
/// be constructed through it, which keeps the second pass a pure walk
/// over already-built instances.
pub struct Wiring<'a> {
    pub(crate) factory: &'a InstanceFactory,
}

impl Wiring<'_> {
    pub fn peek<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.factory.peek_type::<T>()
    }

    pub fn peek_named<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.factory.get_typed::<T>(Role::Component, name)
    }
}

/// Depth-first, synchronous resolution state.
///
/// One resolver drives a whole resolution: it memoizes through the
/// instance map, tracks the in-flight chain for cycle detection, runs the
/// tag pipeline for field injection, and collects deferred wire closures
/// plus bean definitions produced by configurations along the way.
pub struct Resolver<'a> {
    registry: &'a Registry,
    factory: &'a InstanceFactory,
    context: Config,
    decoders: Vec<Arc<dyn TagDecoder>>,
    profiles: Vec<String>,
    stack: Vec<String>,
    wires: Vec<WireFn>,
    beans: Vec<(Arc<MetaData>, Vec<BeanDefinition>)>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        factory: &'a InstanceFactory,
        context: Config,
        decoders: Vec<Arc<dyn TagDecoder>>,
        profiles: Vec<String>,
    ) -> Self {
        Self {
            registry,
            factory,
            context,
            decoders,
            profiles,
            stack: Vec::new(),
            wires: Vec::new(),
            beans: Vec::new(),
        }
    }

    /// Name of the component currently under construction.
    fn current(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or("<root>")
    }

    pub(crate) fn profile_active(&self, profile: &Option<String>) -> bool {
        match profile {
            Some(profile) => self.profiles.iter().any(|v| v == profile),
            None => true,
        }
    }

    /// Resolves one registration: memoized lookup, then at-most-once
    /// construction with cycle detection on the in-flight chain.
    pub(crate) fn resolve_entry(&mut self, meta: &Arc<MetaData>) -> Result<ArcAny, ContainerError> {
        if let Some(existing) = self.factory.get(meta.role, &meta.name) {
            return Ok(existing);
        }
        if self.stack.iter().any(|name| name == &meta.name) {
            let mut chain = self.stack.join(" -> ");
            chain.push_str(" -> ");
            chain.push_str(&meta.name);
            return Err(ContainerError::CircularDependency(chain));
        }
        tracing::debug!("Resolving {} ({})", meta.name, meta.token.name);
        self.stack.push(meta.name.clone());
        let constructed = match &meta.subject {
            Subject::Instance(instance) => Ok(instance.clone()),
            Subject::Constructor(entry) => {
                tracing::trace!("Constructor params for {}: {:?}", meta.name, entry.params);
                (entry.invoke)(self)
            }
            Subject::Configuration(slot) => {
                let build = slot.lock().unwrap().take();
                match build {
                    Some(build) => build(self).map(|(instance, beans)| {
                        self.beans.push((meta.clone(), beans));
                        instance
                    }),
                    None => Err(ContainerError::Constructor {
                        name: meta.name.clone(),
                        source: "configuration was already consumed".into(),
                    }),
                }
            }
        };
        self.stack.pop();
        let instance = constructed?;
        self.factory
            .insert(meta.role, &meta.name, meta.token.id, instance.clone());
        Ok(instance)
    }

    /// Resolves a registration by name.
    pub(crate) fn resolve_named(&mut self, name: &str) -> Result<ArcAny, ContainerError> {
        let meta = self
            .registry
            .find_named(name)
            .filter(|meta| self.profile_active(&meta.profile))
            .ok_or_else(|| ContainerError::MissingDependency {
                component: self.current().to_owned(),
                dependency: name.to_owned(),
            })?;
        self.resolve_entry(&meta)
    }

    /// Resolves a dependency by type: the instance map first, then any
    /// component registration producing the type.
    pub fn resolve_arc<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ContainerError> {
        if let Some(existing) = self.factory.peek_type::<T>() {
            return Ok(existing);
        }
        for meta in self.registry.candidates_for(TypeId::of::<T>()) {
            if !self.profile_active(&meta.profile) {
                continue;
            }
            if let Ok(instance) = self.resolve_entry(&meta)?.downcast::<T>() {
                return Ok(instance);
            }
        }
        Err(ContainerError::MissingDependency {
            component: self.current().to_owned(),
            dependency: type_name::<T>().to_owned(),
        })
    }

    /// Resolves an `#[inject]` field: by registration name when one was
    /// declared, otherwise by type. Coordinates with the instance map, so
    /// an injected component is a singleton, never a per-site allocation.
    pub fn inject_component<T: Send + Sync + 'static>(
        &mut self,
        name: Option<&str>,
    ) -> Result<Arc<T>, ContainerError> {
        match name {
            Some(name) => {
                let instance = self.resolve_named(name)?;
                instance.downcast::<T>().map_err(|_| {
                    ContainerError::InvalidObjectType(format!(
                        "instance {name} is not a {}",
                        type_name::<T>()
                    ))
                })
            }
            None => self.resolve_arc::<T>(),
        }
    }

    /// Like [`Resolver::inject_component`], but falls back to a fresh
    /// zero value seeded from `key=value` tag pairs when no registration
    /// exists.
    pub fn inject_or_default<T>(
        &mut self,
        name: Option<&str>,
        tag: &str,
    ) -> Result<Arc<T>, ContainerError>
    where
        T: Component + Default + Serialize + DeserializeOwned,
    {
        match self.inject_component::<T>(name) {
            Ok(instance) => Ok(instance),
            Err(ContainerError::MissingDependency { .. }) => {
                let mut seeded = seed_default::<T>(tag);
                seeded.inject(self)?;
                Ok(Arc::new(seeded))
            }
            Err(err) => Err(err),
        }
    }

    /// Runs the tag pipeline for one field.
    pub fn decode_field(
        &self,
        field: &FieldView<'_>,
        field_tags: &[(&str, &str)],
    ) -> Option<serde_json::Value> {
        let cx = DecodeCx {
            context: &self.context,
        };
        tags::run_pipeline(&self.decoders, &cx, field, field_tags)
    }

    /// Runs the tag pipeline and converts the result into the field's
    /// declared type. A conversion failure leaves the field untouched.
    pub fn apply_field<T: DeserializeOwned>(
        &self,
        field: &FieldView<'_>,
        field_tags: &[(&str, &str)],
    ) -> Option<T> {
        let value = self.decode_field(field, field_tags)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!("Cannot convert decoded value for field {}: {err}", field.name);
                None
            }
        }
    }

    /// Defers a wire closure until the surrounding resolution completes.
    pub fn defer_wire(&mut self, wire: impl FnOnce(&Wiring<'_>) + Send + 'static) {
        self.wires.push(Box::new(wire));
    }

    pub(crate) fn take_wires(&mut self) -> Vec<WireFn> {
        std::mem::take(&mut self.wires)
    }

    pub(crate) fn take_beans(&mut self) -> Vec<(Arc<MetaData>, Vec<BeanDefinition>)> {
        std::mem::take(&mut self.beans)
    }
}

/// Builds a zero value with fields seeded from `key=value` tag pairs,
/// merging the pairs over the serialized default so unknown keys can
/// never corrupt the value.
fn seed_default<T>(tag: &str) -> T
where
    T: Default + Serialize + DeserializeOwned,
{
    if tag.is_empty() {
        return T::default();
    }
    let seeds = Tag::parse(tag).to_object();
    let mut base = match serde_json::to_value(T::default()) {
        Ok(value) => value,
        Err(_) => return T::default(),
    };
    if let (Some(base_map), serde_json::Value::Object(seed_map)) = (base.as_object_mut(), seeds) {
        for (key, value) in seed_map {
            base_map.insert(key, value);
        }
    }
    serde_json::from_value(base).unwrap_or_default()
}
