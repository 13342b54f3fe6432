//! Registry of compiled factories consulted before reflective resolution.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::key::ClassName;
use crate::object::Instance;
use crate::value::{Arguments, Value};

/// A factory produced by the compiler, either as an executable plan
/// ([`FactoryUnit`](super::FactoryUnit)) or as generated source.
///
/// Implementations must reproduce reflective resolution exactly: enter the
/// resolution stack, honor bound instances, apply the baked binding and
/// scope decisions, then construct.
pub trait CompiledFactory: Send + Sync {
    /// Class this factory builds.
    fn class(&self) -> ClassName;

    /// Instance of the class with argument overrides.
    fn get_instance(&self, ctx: &ResolverContext<'_>, args: &Arguments) -> DiResult<Instance>;

    /// Whether [`call_method`](CompiledFactory::call_method) has a wrapper
    /// for `method`. Other methods go through the reflective path.
    fn has_method(&self, method: &str) -> bool {
        let _ = method;
        false
    }

    /// Call a public instance method through its generated wrapper.
    fn call_method(
        &self,
        ctx: &ResolverContext<'_>,
        instance: &Instance,
        method: &str,
        args: &Arguments,
    ) -> DiResult<Value>;
}

/// Compiled factories keyed by class.
///
/// Shared between containers through an `Arc`; registering a class again
/// replaces its factory.
#[derive(Default)]
pub struct CompiledFactoryRegistry {
    factories: RwLock<HashMap<ClassName, Arc<dyn CompiledFactory>>>,
}

impl CompiledFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, factory: Arc<dyn CompiledFactory>) {
        let class = factory.class();
        debug!(%class, "compiled factory registered");
        self.factories.write().insert(class, factory);
    }

    pub fn register_all<I>(&self, factories: I)
    where
        I: IntoIterator<Item = Arc<dyn CompiledFactory>>,
    {
        let mut map = self.factories.write();
        for factory in factories {
            map.insert(factory.class(), factory);
        }
    }

    pub fn get(&self, class: &ClassName) -> Option<Arc<dyn CompiledFactory>> {
        self.factories.read().get(class).cloned()
    }

    pub fn contains(&self, class: &ClassName) -> bool {
        self.factories.read().contains_key(class)
    }

    pub fn remove(&self, class: &ClassName) -> Option<Arc<dyn CompiledFactory>> {
        self.factories.write().remove(class)
    }

    pub fn classes(&self) -> Vec<ClassName> {
        let mut classes: Vec<_> = self.factories.read().keys().cloned().collect();
        classes.sort();
        classes
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl std::fmt::Debug for CompiledFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFactoryRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}
