use std::any::type_name;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::component::derive_name;
use crate::config::PropertySources;
use crate::configuration::{BeanDefinition, ConfigurationSource};
use crate::constructor::{Constructor, TypeToken};
use crate::factory::{InstanceFactory, Resolver, Wiring};
use crate::properties::{self, AppProperties, LoggingProperties, Properties, ServerProperties};
use crate::registry::{ArcAny, ConfigBuildFn, ConstructorEntry, MetaData, Registry, Role, Subject};
use crate::tags::{TagDecoder, default_decoders};
use crate::{Component, Config, ContainerError, logging};

type PropertyBinder = Box<
    dyn Fn(&Config, &[Arc<dyn TagDecoder>], &[String]) -> Result<BoundSection, ContainerError>
        + Send
        + Sync,
>;

struct BoundSection {
    prefix: &'static str,
    value: serde_json::Value,
    meta: MetaData,
}

/// The dependency-injection container.
///
/// A container is an explicit value: registrations go into its metadata
/// registry, `build` turns them into a wired singleton graph, and the
/// accessors hand out shared instances. Independent containers never
/// share state, so tests can run them in parallel.
///
/// Build order: property sources are merged and the system sections
/// bound, the active profile set is computed, then the configuration
/// role buckets run in order (pre, plain, post) with their beans, then
/// the remaining components, then the wire pass.
pub struct Container {
    registry: Registry,
    factory: InstanceFactory,
    sources: PropertySources,
    decoders: Vec<Arc<dyn TagDecoder>>,
    eliminators: Vec<String>,
    binders: Vec<PropertyBinder>,
    profiles: Vec<String>,
    includes: Vec<String>,
    active: Vec<String>,
    context: Config,
    built: bool,
    resolution: Mutex<()>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            registry: Registry::default(),
            factory: InstanceFactory::default(),
            sources: PropertySources::new(),
            decoders: default_decoders(),
            eliminators: vec!["Configuration".to_owned()],
            binders: Vec::new(),
            profiles: Vec::new(),
            includes: Vec::new(),
            active: Vec::new(),
            context: Config::new(),
            built: false,
            resolution: Mutex::new(()),
        }
    }

    /// Adds suffixes stripped from type names during name derivation.
    pub fn with_eliminators<I, S>(mut self, eliminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eliminators
            .extend(eliminators.into_iter().map(Into::into));
        self
    }

    /// Appends a decoder to the tag pipeline. Later decoders win over
    /// earlier ones when both produce a value for the same field.
    pub fn add_decoder(&mut self, decoder: impl TagDecoder + 'static) {
        self.decoders.push(Arc::new(decoder));
    }

    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
    }

    pub fn include_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(profiles.into_iter().map(Into::into));
    }

    pub fn add_property_source(&mut self, config: Config) {
        self.sources.add(config);
    }

    pub fn add_profile_property_source(&mut self, profile: impl Into<String>, config: Config) {
        self.sources.add_profile(profile, config);
    }

    pub fn add_property_source_file(&mut self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        self.sources.add_file(path)
    }

    pub fn add_profile_property_source_file(
        &mut self,
        profile: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<(), ContainerError> {
        self.sources.add_profile_file(profile, path)
    }

    /// Sets one property at a dotted path. Overrides win over every
    /// property source; after build the change also lands in the merged
    /// context so lazy resolution observes it.
    pub fn set_property(
        &mut self,
        path: &str,
        value: impl Serialize,
    ) -> Result<(), ContainerError> {
        let value = serde_json::to_value(value).map_err(|source| ContainerError::Bind {
            section: path.to_owned(),
            source: source.into(),
        })?;
        self.sources.set_override(path, value.clone());
        if self.built {
            self.context.set_path(path, value);
        }
        Ok(())
    }

    /// The merged configuration tree. Empty until `build`.
    pub fn context(&self) -> &Config {
        &self.context
    }

    /// Registers a live instance under its derived name.
    pub fn register<T: Component>(&self, instance: T) -> Result<(), ContainerError> {
        let name = self.component_name::<T>();
        self.register_instance(name, instance)
    }

    /// Registers a live instance under an explicit name.
    pub fn register_named<T: Component>(
        &self,
        name: impl Into<String>,
        instance: T,
    ) -> Result<(), ContainerError> {
        self.register_instance(name.into(), instance)
    }

    /// Registers a constructor under the output type's derived name.
    pub fn provide<Args, C>(&self, constructor: C) -> Result<(), ContainerError>
    where
        C: Constructor<Args>,
    {
        let name = self.component_name::<C::Output>();
        self.provide_entry(name, constructor)
    }

    /// Registers a constructor under an explicit name.
    pub fn provide_named<Args, C>(
        &self,
        name: impl Into<String>,
        constructor: C,
    ) -> Result<(), ContainerError>
    where
        C: Constructor<Args>,
    {
        self.provide_entry(name.into(), constructor)
    }

    /// Registers a properties struct for binding. During build the
    /// struct is bound from its section, folded back into the context
    /// tree, and registered as a live instance under its derived name.
    pub fn register_properties<T: Properties>(&mut self) {
        self.binders.push(Box::new(|context, decoders, eliminators| {
            let bound: T = properties::bind(context, decoders)?;
            let value = serde_json::to_value(&bound).map_err(|source| ContainerError::Bind {
                section: T::prefix().to_owned(),
                source: source.into(),
            })?;
            let name = match T::explicit_name() {
                Some(name) => name.to_owned(),
                None => derive_name(type_name::<T>(), eliminators),
            };
            Ok(BoundSection {
                prefix: T::prefix(),
                value,
                meta: MetaData {
                    name,
                    role: Role::Component,
                    profile: None,
                    token: TypeToken::of::<T>(),
                    subject: Subject::Instance(Arc::new(bound)),
                },
            })
        }));
    }

    /// Registers a configuration source into its role bucket. Sources
    /// claiming the component role are rejected; plain components go
    /// through `register` or `provide`.
    pub fn register_configuration<T>(&self) -> Result<(), ContainerError>
    where
        T: ConfigurationSource + Default,
    {
        let role = T::role();
        if role == Role::Component {
            return Err(ContainerError::InvalidObjectType(format!(
                "{} is not a configuration role subject",
                type_name::<T>()
            )));
        }
        let name = self.component_name::<T>();
        let build: ConfigBuildFn = Box::new(move |cx| {
            let mut value = T::default();
            value.inject(cx)?;
            let instance = Arc::new(value);
            let wired = instance.clone();
            cx.defer_wire(move |w| wired.wire(w));
            let beans = T::beans(&instance);
            Ok((instance as ArcAny, beans))
        });
        self.registry.register(MetaData {
            name,
            role,
            profile: T::profile().map(str::to_owned),
            token: TypeToken::of::<T>(),
            subject: Subject::Configuration(Mutex::new(Some(build))),
        })
    }

    /// Builds the whole graph. One-shot: a second call fails with
    /// `AlreadyBuilt` whatever the first one returned.
    pub fn build(&mut self) -> Result<(), ContainerError> {
        if self.built {
            return Err(ContainerError::AlreadyBuilt);
        }
        self.built = true;

        // First pass over the sources only knows explicitly set
        // profiles; it exists to read the profile sections themselves.
        let base = self.sources.merged(&self.profiles);
        let app: AppProperties = properties::bind(&base, &self.decoders)?;
        let mut active = Vec::new();
        for profile in self
            .profiles
            .iter()
            .chain(app.profiles.active.iter())
            .chain(self.includes.iter())
            .chain(app.profiles.include.iter())
        {
            if !active.contains(profile) {
                active.push(profile.clone());
            }
        }
        self.active = active;

        self.context = self.sources.merged(&self.active);
        let app: AppProperties = properties::bind(&self.context, &self.decoders)?;
        let server: ServerProperties = properties::bind(&self.context, &self.decoders)?;
        let log: LoggingProperties = properties::bind(&self.context, &self.decoders)?;
        logging::init(&log)?;
        self.fold_properties(&app)?;
        self.fold_properties(&server)?;
        self.fold_properties(&log)?;
        self.register(app)?;
        self.register(server)?;
        self.register(log)?;
        let binders = std::mem::take(&mut self.binders);
        for binder in &binders {
            let bound = binder(&self.context, &self.decoders, &self.eliminators)?;
            self.context.set_path(bound.prefix, bound.value);
            self.registry.register(bound.meta)?;
        }

        let mut resolver = Resolver::new(
            &self.registry,
            &self.factory,
            self.context.clone(),
            self.decoders.clone(),
            self.active.clone(),
        );
        let mut skipped = Vec::new();
        for role in [
            Role::PreConfiguration,
            Role::Configuration,
            Role::PostConfiguration,
        ] {
            for meta in self.registry.bucket(role) {
                if !resolver.profile_active(&meta.profile) {
                    tracing::debug!("Skipping {} (inactive profile)", meta.name);
                    continue;
                }
                resolver.resolve_entry(&meta)?;
                self.drain_beans(&mut resolver, &mut skipped)?;
            }
        }
        for meta in self.registry.bucket(Role::Component) {
            if !resolver.profile_active(&meta.profile) {
                continue;
            }
            if skipped.iter().any(|name| name == &meta.name) {
                continue;
            }
            resolver.resolve_entry(&meta)?;
            self.drain_beans(&mut resolver, &mut skipped)?;
        }
        self.run_wires(&mut resolver);
        Ok(())
    }

    /// Shared instance of the given type. Resolves lazily when the type
    /// has a registration that was never profile-pruned.
    pub fn get_instance<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let _guard = self.resolution.lock().unwrap();
        if let Some(existing) = self.factory.peek_type::<T>() {
            return Ok(existing);
        }
        let mut resolver = self.resolver();
        let instance = resolver.resolve_arc::<T>()?;
        self.finish(&mut resolver)?;
        Ok(instance)
    }

    /// Shared instance registered under the given name.
    pub fn get_instance_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError> {
        let _guard = self.resolution.lock().unwrap();
        let mut resolver = self.resolver();
        let instance = resolver.resolve_named(name)?;
        self.finish(&mut resolver)?;
        instance.downcast::<T>().map_err(|_| {
            ContainerError::InvalidObjectType(format!(
                "instance {name} is not a {}",
                type_name::<T>()
            ))
        })
    }

    /// Every resolved instance of the given type, in resolution order.
    pub fn get_instances<T: Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        self.factory.all_of_type::<T>()
    }

    fn component_name<T: Component>(&self) -> String {
        match T::explicit_name() {
            Some(name) => name.to_owned(),
            None => derive_name(type_name::<T>(), &self.eliminators),
        }
    }

    fn register_instance<T: Component>(
        &self,
        name: String,
        instance: T,
    ) -> Result<(), ContainerError> {
        self.registry.register(MetaData {
            name,
            role: Role::Component,
            profile: None,
            token: TypeToken::of::<T>(),
            subject: Subject::Instance(Arc::new(instance)),
        })
    }

    fn provide_entry<Args, C>(&self, name: String, constructor: C) -> Result<(), ContainerError>
    where
        C: Constructor<Args>,
    {
        self.registry.register(MetaData {
            name,
            role: Role::Component,
            profile: None,
            token: TypeToken::of::<C::Output>(),
            subject: Subject::Constructor(ConstructorEntry {
                params: C::param_types(),
                invoke: Box::new(move |cx| {
                    let mut value = constructor.invoke(cx)?;
                    value.inject(cx)?;
                    let instance = Arc::new(value);
                    let wired = instance.clone();
                    cx.defer_wire(move |w| wired.wire(w));
                    Ok(instance as ArcAny)
                }),
            }),
        })
    }

    fn fold_properties<T: Properties>(&mut self, value: &T) -> Result<(), ContainerError> {
        let value = serde_json::to_value(value).map_err(|source| ContainerError::Bind {
            section: T::prefix().to_owned(),
            source: source.into(),
        })?;
        self.context.set_path(T::prefix(), value);
        Ok(())
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.registry,
            &self.factory,
            self.context.clone(),
            self.decoders.clone(),
            self.active.clone(),
        )
    }

    /// Registers and resolves bean definitions collected by the resolver.
    /// A bean whose factory fails is logged and skipped; every other
    /// failure is fatal. Loops because a bean can pull in a configuration
    /// that produces more beans.
    fn drain_beans(
        &self,
        resolver: &mut Resolver<'_>,
        skipped: &mut Vec<String>,
    ) -> Result<(), ContainerError> {
        loop {
            let collected = resolver.take_beans();
            if collected.is_empty() {
                return Ok(());
            }
            for (source, beans) in collected {
                for bean in beans {
                    let BeanDefinition { name, token, build } = bean;
                    let build: ConfigBuildFn =
                        Box::new(move |cx| build(cx).map(|instance| (instance, Vec::new())));
                    self.registry.register(MetaData {
                        name: name.clone(),
                        role: Role::Component,
                        profile: source.profile.clone(),
                        token,
                        subject: Subject::Configuration(Mutex::new(Some(build))),
                    })?;
                    match resolver.resolve_named(&name) {
                        Ok(_) => {}
                        Err(ContainerError::Constructor { name, source }) => {
                            tracing::error!("Cannot build bean {name}: {source}");
                            skipped.push(name);
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }

    fn run_wires(&self, resolver: &mut Resolver<'_>) {
        let wires = resolver.take_wires();
        let wiring = Wiring {
            factory: &self.factory,
        };
        for wire in wires {
            wire(&wiring);
        }
    }

    fn finish(&self, resolver: &mut Resolver<'_>) -> Result<(), ContainerError> {
        let mut skipped = Vec::new();
        self.drain_beans(resolver, &mut skipped)?;
        self.run_wires(resolver);
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
