use std::sync::Arc;

use crate::constructor::TypeToken;
use crate::registry::{ArcAny, Role};
use crate::{Component, ContainerError, Resolver, StdError, component};

/// A component that participates in the configuration phases of a build.
///
/// Implemented by `#[configuration]` impl blocks, which also turn
/// `#[bean]` methods into [`BeanDefinition`]s. The role decides which
/// build phase constructs the value; the profile gates the whole source
/// including its beans.
pub trait ConfigurationSource: Component {
    fn role() -> Role
    where
        Self: Sized,
    {
        Role::Configuration
    }

    fn profile() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Bean definitions produced by this source. Takes the shared
    /// instance so definitions can capture it for their build closures.
    fn beans(_this: &Arc<Self>) -> Vec<BeanDefinition>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

pub(crate) type BeanBuildFn =
    Box<dyn for<'a, 'b> FnOnce(&'a mut Resolver<'b>) -> Result<ArcAny, ContainerError> + Send>;

/// A named component produced by a configuration's factory method.
///
/// The name is the lowerCamel form of the method name and lands in the
/// component bucket, so it collides with regular registrations the same
/// way two registrations collide with each other.
pub struct BeanDefinition {
    pub(crate) name: String,
    pub(crate) token: TypeToken,
    pub(crate) build: BeanBuildFn,
}

impl BeanDefinition {
    pub fn new<T, F>(method: &str, build: F) -> Self
    where
        T: Component,
        F: FnOnce(&mut Resolver<'_>) -> Result<T, ContainerError> + Send + 'static,
    {
        let name = component::lower_camel(method);
        Self {
            name: name.clone(),
            token: TypeToken::of::<T>(),
            build: Box::new(move |cx| {
                let mut value = build(cx)?;
                value.inject(cx)?;
                let instance = Arc::new(value);
                let wired = instance.clone();
                cx.defer_wire(move |w| wired.wire(w));
                Ok(instance as ArcAny)
            }),
        }
    }

    /// Like [`BeanDefinition::new`] for factory methods returning
    /// `Result`; the error surfaces as a constructor failure under the
    /// bean's name.
    pub fn try_new<T, E, F>(method: &str, build: F) -> Self
    where
        T: Component,
        E: Into<StdError>,
        F: FnOnce(&mut Resolver<'_>) -> Result<T, E> + Send + 'static,
    {
        let name = component::lower_camel(method);
        let fail_name = name.clone();
        Self::new(method, move |cx| {
            build(cx).map_err(|source| ContainerError::Constructor {
                name: fail_name,
                source: source.into(),
            })
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
