use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::configuration::BeanDefinition;
use crate::constructor::TypeToken;
use crate::{ContainerError, Resolver};

/// The role a registration plays in the build order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    PreConfiguration,
    Configuration,
    PostConfiguration,
    Component,
}

pub(crate) type ArcAny = Arc<dyn Any + Send + Sync>;

pub(crate) type InvokeFn =
    Box<dyn for<'a, 'b> Fn(&'a mut Resolver<'b>) -> Result<ArcAny, ContainerError> + Send + Sync>;

pub(crate) type ConfigBuildFn = Box<
    dyn for<'a, 'b> FnOnce(
            &'a mut Resolver<'b>,
        ) -> Result<(ArcAny, Vec<BeanDefinition>), ContainerError>
        + Send,
>;

pub(crate) struct ConstructorEntry {
    pub params: Vec<TypeToken>,
    pub invoke: InvokeFn,
}

/// What a registration resolves to.
pub(crate) enum Subject {
    /// A live instance, stored as registered.
    Instance(ArcAny),
    /// A constructor invoked at most once.
    Constructor(ConstructorEntry),
    /// A one-shot configuration build closure producing the configuration
    /// instance and its bean definitions.
    Configuration(Mutex<Option<ConfigBuildFn>>),
}

/// One registration record. Created once, never mutated.
pub(crate) struct MetaData {
    pub name: String,
    pub role: Role,
    pub profile: Option<String>,
    pub token: TypeToken,
    pub subject: Subject,
}

/// The append-only record of every registration, partitioned into role
/// buckets. Registration happens concurrently from independent modules,
/// so the maps are concurrent; the order list preserves registration
/// order within the whole registry.
#[derive(Default)]
pub(crate) struct Registry {
    entries: DashMap<(Role, String), Arc<MetaData>>,
    order: Mutex<Vec<(Role, String)>>,
    by_type: DashMap<TypeId, Vec<(Role, String)>>,
}

impl Registry {
    pub fn register(&self, meta: MetaData) -> Result<(), ContainerError> {
        if meta.name.is_empty() {
            return Err(ContainerError::InvalidObjectType(format!(
                "cannot derive a name for {}",
                meta.token.name
            )));
        }
        let key = (meta.role, meta.name.clone());
        match self.entries.entry(key.clone()) {
            dashmap::Entry::Occupied(_) => Err(ContainerError::NameIsTaken(meta.name)),
            dashmap::Entry::Vacant(slot) => {
                let type_id = meta.token.id;
                slot.insert(Arc::new(meta));
                self.order.lock().unwrap().push(key.clone());
                self.by_type.entry(type_id).or_default().push(key);
                Ok(())
            }
        }
    }

    /// Entries of one role bucket, in registration order.
    pub fn bucket(&self, role: Role) -> Vec<Arc<MetaData>> {
        let order = self.order.lock().unwrap();
        order
            .iter()
            .filter(|(r, _)| *r == role)
            .filter_map(|key| self.entries.get(key).map(|v| v.value().clone()))
            .collect()
    }

    /// Finds a registration by plain name, components first.
    pub fn find_named(&self, name: &str) -> Option<Arc<MetaData>> {
        const ORDER: [Role; 4] = [
            Role::Component,
            Role::Configuration,
            Role::PreConfiguration,
            Role::PostConfiguration,
        ];
        ORDER.iter().find_map(|role| {
            self.entries
                .get(&(*role, name.to_owned()))
                .map(|v| v.value().clone())
        })
    }

    /// Component-bucket registrations producing the given type, in
    /// registration order.
    pub fn candidates_for(&self, type_id: TypeId) -> Vec<Arc<MetaData>> {
        let keys = match self.by_type.get(&type_id) {
            Some(v) => v.value().clone(),
            None => return Vec::new(),
        };
        keys.iter()
            .filter(|(role, _)| *role == Role::Component)
            .filter_map(|key| self.entries.get(key).map(|v| v.value().clone()))
            .collect()
    }
}
