//! Resolver context for one call tree.

use std::cell::RefCell;
use std::sync::Arc;

use crate::cache::SingletonKey;
use crate::compiler::CompiledFactory;
use crate::config::Overrides;
use crate::descriptors::ClassDescriptor;
use crate::error::DiResult;
use crate::internal::{ResolutionStack, StackGuard};
use crate::key::{ClassName, ContainerId};
use crate::metadata::MetadataProvider;
use crate::object::Instance;

use super::ContainerInner;

/// Context of one resolution call tree.
///
/// Handed to compiled factories so they can enter the resolution stack,
/// check bound instances and resolve their dependencies through the same
/// container. Created by [`Container::with_context`](crate::Container::with_context).
pub struct ResolverContext<'a> {
    pub(crate) inner: &'a Arc<ContainerInner>,
    stack: &'a RefCell<ResolutionStack>,
}

/// Keeps a class on the resolution stack until dropped.
pub struct ResolutionGuard<'a> {
    _guard: StackGuard<'a>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(inner: &'a Arc<ContainerInner>, stack: &'a RefCell<ResolutionStack>) -> Self {
        Self { inner, stack }
    }

    /// Push `class` on the resolution stack.
    ///
    /// Fails with `InjectionLoop` if it is already being resolved in this
    /// call tree, or `DepthExceeded` past the configured depth.
    pub fn enter(&self, class: &ClassName) -> DiResult<ResolutionGuard<'a>> {
        Ok(ResolutionGuard {
            _guard: StackGuard::enter(self.stack, class)?,
        })
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().depth()
    }

    pub fn container_id(&self) -> ContainerId {
        self.inner.id
    }

    /// Instance bound to `class` in the binding configuration.
    pub fn bound_instance(&self, class: &ClassName) -> Option<Instance> {
        self.inner
            .bindings
            .read()
            .get(class)
            .and_then(|o| o.instance.clone())
    }

    /// Copy of the override record; the lock is released before returning.
    pub fn overrides_for(&self, class: &ClassName) -> Overrides {
        self.inner.bindings.read().overrides_for(class)
    }

    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.inner.metadata.as_ref()
    }

    pub fn describe(&self, class: &ClassName) -> DiResult<Arc<ClassDescriptor>> {
        self.inner.metadata.describe(class)
    }

    /// Singleton cached by this container under `key`.
    pub fn cached_singleton(&self, key: &SingletonKey) -> Option<Instance> {
        self.inner.cache.singleton(key)
    }

    /// Cache a singleton; an entry stored first wins and is returned.
    pub fn store_singleton(&self, key: SingletonKey, instance: Instance) -> Instance {
        self.inner.cache.store_singleton(key, instance)
    }

    pub fn cached_service(&self, class: &ClassName) -> Option<Instance> {
        self.inner.cache.service(class)
    }

    /// Cache a service; the first successful build wins.
    pub fn store_service(&self, class: &ClassName, instance: Instance) -> Instance {
        self.inner.cache.store_service(class, instance)
    }

    pub(crate) fn compiled_factory(&self, class: &ClassName) -> Option<Arc<dyn CompiledFactory>> {
        self.inner.compiled.get(class)
    }
}
