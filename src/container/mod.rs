//! The container: reflective resolution with a compiled fast path.
//!
//! A [`Container`] owns a metadata provider, a binding configuration, the
//! instance caches and a registry of compiled factories. Every top-level
//! call takes the container's reentrant lock and creates a
//! [`ResolverContext`] holding the resolution stack for that call tree.

mod context;
mod invoke;
mod lazy;
mod resolve;

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::debug;

use crate::cache::InstanceCache;
use crate::compiler::CompiledFactoryRegistry;
use crate::config::{BindingConfiguration, ContainerOptions, Overrides};
use crate::error::DiResult;
use crate::internal::ResolutionStack;
use crate::key::{ClassName, ContainerId};
use crate::metadata::MetadataProvider;
use crate::object::{downcast, Instance, Object};
use crate::observer::{DiObserver, Observers};
use crate::value::{Arguments, Value};

pub use context::{ResolutionGuard, ResolverContext};
pub use invoke::{is_magic_method, positional};
pub(crate) use resolve::{scope_of, CONSTRUCTOR, PROPERTY};
pub use lazy::LazyProxy;

/// Dependency injection container.
///
/// Cheap to clone; clones share configuration, caches and compiled
/// factories. `Send + Sync`: top-level resolutions on one container are
/// serialized so a singleton is never built twice.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_wire::{Arguments, ClassDescriptor, ClassName, ClassRegistry, Construct, Container, DiResult, Object, Value};
///
/// struct Gear;
/// impl Object for Gear {
///     fn class_name(&self) -> ClassName { ClassName::from("app::Gear") }
/// }
/// impl Construct for Gear {
///     fn construct(_: Vec<Value>) -> DiResult<Self> { Ok(Gear) }
/// }
///
/// let mut registry = ClassRegistry::new();
/// registry.register::<Gear>(ClassDescriptor::concrete("app::Gear").singleton());
///
/// let container = Container::new(registry);
/// let a = container.get_instance_of_class("app::Gear", Arguments::new()).unwrap();
/// let b = container.get_instance_of_class("app::Gear", Arguments::new()).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) id: ContainerId,
    pub(crate) metadata: Arc<dyn MetadataProvider>,
    pub(crate) bindings: RwLock<BindingConfiguration>,
    pub(crate) cache: InstanceCache,
    pub(crate) compiled: Arc<CompiledFactoryRegistry>,
    pub(crate) state: ReentrantMutex<RefCell<ResolutionStack>>,
    pub(crate) observers: Observers,
    pub(crate) options: ContainerOptions,
}

impl Container {
    /// Container with empty bindings and no compiled factories.
    pub fn new(metadata: impl MetadataProvider + 'static) -> Self {
        Self::builder(metadata).build()
    }

    pub fn builder(metadata: impl MetadataProvider + 'static) -> ContainerBuilder {
        ContainerBuilder::new(Arc::new(metadata))
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataProvider> {
        &self.inner.metadata
    }

    /// Compiled factories consulted before reflective resolution.
    pub fn compiled(&self) -> &Arc<CompiledFactoryRegistry> {
        &self.inner.compiled
    }

    pub fn options(&self) -> ContainerOptions {
        self.inner.options
    }

    /// Run `f` inside a fresh (or the current thread's ongoing) call tree.
    pub fn with_context<T>(&self, f: impl FnOnce(&ResolverContext<'_>) -> DiResult<T>) -> DiResult<T> {
        let state = self.inner.state.lock();
        let ctx = ResolverContext::new(&self.inner, &state);
        f(&ctx)
    }

    /// Resolve `class` with optional constructor argument overrides.
    pub fn get_instance_of_class(&self, class: impl Into<ClassName>, args: Arguments) -> DiResult<Instance> {
        let class = class.into();
        self.with_context(|ctx| ctx.resolve(&class, &args))
    }

    /// Resolve a qualified binding of `class`.
    pub fn get_named(
        &self,
        class: impl Into<ClassName>,
        qualifier: Option<&str>,
        args: Arguments,
    ) -> DiResult<Instance> {
        let class = class.into();
        self.with_context(|ctx| ctx.resolve_named(&class, qualifier, &args))
    }

    /// Resolve and downcast to the concrete type.
    pub fn get<T: Object>(&self, class: impl Into<ClassName>) -> DiResult<Arc<T>> {
        self.get_with::<T>(class, Arguments::new())
    }

    pub fn get_with<T: Object>(&self, class: impl Into<ClassName>, args: Arguments) -> DiResult<Arc<T>> {
        let instance = self.get_instance_of_class(class, args)?;
        downcast::<T>(&instance)
    }

    /// Call a public instance method, injecting parameters and running
    /// its aspects.
    pub fn call_method_on_object(&self, instance: &Instance, method: &str, args: Arguments) -> DiResult<Value> {
        self.with_context(|ctx| ctx.call_method(instance, method, &args))
    }

    /// Copy of the override record for `class`.
    pub fn overrides_for(&self, class: impl Into<ClassName>) -> Overrides {
        self.inner.bindings.read().overrides_for(&class.into())
    }

    /// Replace the override record for `class`; affects later resolutions only.
    pub fn set_overrides_for(&self, class: impl Into<ClassName>, overrides: Overrides) {
        let class = class.into();
        debug!(%class, "binding overrides replaced");
        self.inner.bindings.write().set_overrides_for(class, overrides);
    }

    /// Edit the override record for `class` in place.
    pub fn update_overrides(&self, class: impl Into<ClassName>, f: impl FnOnce(&mut Overrides)) {
        self.inner.bindings.write().update(class, f);
    }

    /// Bind a pre-built instance to `class`.
    pub fn bind_instance(&self, class: impl Into<ClassName>, instance: Instance) {
        self.update_overrides(class, |o| o.instance = Some(instance));
    }

    /// Snapshot of the whole binding configuration.
    pub fn bindings(&self) -> BindingConfiguration {
        self.inner.bindings.read().clone()
    }

    /// Number of cached (singleton, service) instances.
    pub fn cached_instances(&self) -> (usize, usize) {
        self.inner.cache.len()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("bindings", &self.inner.bindings.read().len())
            .field("compiled", &self.inner.compiled.len())
            .finish()
    }
}

/// Builder for [`Container`].
pub struct ContainerBuilder {
    metadata: Arc<dyn MetadataProvider>,
    bindings: BindingConfiguration,
    compiled: Option<Arc<CompiledFactoryRegistry>>,
    observers: Observers,
    options: ContainerOptions,
}

impl ContainerBuilder {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            metadata,
            bindings: BindingConfiguration::new(),
            compiled: None,
            observers: Observers::new(),
            options: ContainerOptions::default(),
        }
    }

    pub fn bindings(mut self, bindings: BindingConfiguration) -> Self {
        self.bindings.merge(bindings);
        self
    }

    pub fn bind(mut self, class: impl Into<ClassName>, overrides: Overrides) -> Self {
        self.bindings.set_overrides_for(class, overrides);
        self
    }

    /// Share a registry of compiled factories with this container.
    pub fn compiled(mut self, registry: Arc<CompiledFactoryRegistry>) -> Self {
        self.compiled = Some(registry);
        self
    }

    pub fn add_observer(mut self, observer: Arc<dyn DiObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Container {
        let inner = ContainerInner {
            id: ContainerId::next(),
            metadata: self.metadata,
            bindings: RwLock::new(self.bindings),
            cache: InstanceCache::default(),
            compiled: self.compiled.unwrap_or_default(),
            state: ReentrantMutex::new(RefCell::new(ResolutionStack::new(self.options.max_depth))),
            observers: self.observers,
            options: self.options,
        };
        debug!(container = %inner.id, "container built");
        Container {
            inner: Arc::new(inner),
        }
    }
}
