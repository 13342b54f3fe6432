//! Singleton and service instance caches.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::DiResult;
use crate::key::{ClassName, ContainerId};
use crate::object::Instance;
use crate::value::Arguments;

/// Cache key of a singleton instance.
///
/// Identity is argument-sensitive: the same class resolved with different
/// effective constructor arguments yields different instances. Object
/// arguments are part of the key by address, so the key keeps them alive
/// and the address cannot be reused while the entry exists.
#[derive(Debug, Clone, Serialize)]
pub struct SingletonKey {
    pub class: ClassName,
    pub arguments: String,
    pub container: ContainerId,
    #[serde(skip)]
    pinned: Vec<Instance>,
}

impl SingletonKey {
    pub fn new(class: &ClassName, arguments: &Arguments, container: ContainerId) -> DiResult<Self> {
        Ok(Self {
            class: class.clone(),
            arguments: arguments.fingerprint()?,
            container,
            pinned: arguments.objects(),
        })
    }
}

impl PartialEq for SingletonKey {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.arguments == other.arguments && self.container == other.container
    }
}

impl Eq for SingletonKey {}

impl Hash for SingletonKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.arguments.hash(state);
        self.container.hash(state);
    }
}

/// Instance caches owned by one container.
///
/// Reflective resolution and compiled factories both store here, so a
/// class keeps one identity whichever path builds it. Entries live as long
/// as the container; there is no eviction.
#[derive(Debug, Default)]
pub(crate) struct InstanceCache {
    singletons: Mutex<HashMap<SingletonKey, Instance>>,
    services: Mutex<HashMap<ClassName, Instance>>,
}

impl InstanceCache {
    pub(crate) fn singleton(&self, key: &SingletonKey) -> Option<Instance> {
        self.singletons.lock().get(key).cloned()
    }

    /// Store a singleton; an existing entry wins and is returned instead.
    pub(crate) fn store_singleton(&self, key: SingletonKey, instance: Instance) -> Instance {
        self.singletons.lock().entry(key).or_insert(instance).clone()
    }

    pub(crate) fn service(&self, class: &ClassName) -> Option<Instance> {
        self.services.lock().get(class).cloned()
    }

    /// Store a service; the first successful build wins.
    pub(crate) fn store_service(&self, class: &ClassName, instance: Instance) -> Instance {
        self.services
            .lock()
            .entry(class.clone())
            .or_insert(instance)
            .clone()
    }

    pub(crate) fn len(&self) -> (usize, usize) {
        (self.singletons.lock().len(), self.services.lock().len())
    }
}
