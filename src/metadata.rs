//! Metadata provider seam and the in-memory class registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::descriptors::ClassDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::object::{Construct, Instance};
use crate::value::Value;

/// Reflective constructor handle: positional arguments in, instance out.
pub type ConstructorFn = Arc<dyn Fn(Vec<Value>) -> DiResult<Instance> + Send + Sync>;

/// Static method handle, used for self-managed singleton accessors.
pub type StaticMethodFn = Arc<dyn Fn(Vec<Value>) -> DiResult<Instance> + Send + Sync>;

/// Source of class metadata and construction handles.
///
/// Must be deterministic for a given class for as long as a container or a
/// compilation run uses it. How descriptors are produced (attributes, build
/// scripts, hand-written tables) is up to the implementor.
pub trait MetadataProvider: Send + Sync {
    /// Descriptor for a class; [`DiError::UnknownClass`] if there is none.
    fn describe(&self, class: &ClassName) -> DiResult<Arc<ClassDescriptor>>;

    /// Handle that constructs the class from positional arguments.
    fn constructor(&self, class: &ClassName) -> DiResult<ConstructorFn>;

    /// Handle for a public static method of the class.
    fn static_method(&self, class: &ClassName, name: &str) -> DiResult<StaticMethodFn>;

    fn knows(&self, class: &ClassName) -> bool {
        self.describe(class).is_ok()
    }
}

struct ClassEntry {
    descriptor: Arc<ClassDescriptor>,
    constructor: Option<ConstructorFn>,
    static_methods: HashMap<String, StaticMethodFn>,
}

/// In-memory [`MetadataProvider`].
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{ClassDescriptor, ClassName, ClassRegistry, Construct, DiResult, MetadataProvider, Object, Value};
///
/// struct Gear;
///
/// impl Object for Gear {
///     fn class_name(&self) -> ClassName { ClassName::from("app::Gear") }
/// }
///
/// impl Construct for Gear {
///     fn construct(_args: Vec<Value>) -> DiResult<Self> { Ok(Gear) }
/// }
///
/// let mut registry = ClassRegistry::new();
/// registry.register::<Gear>(ClassDescriptor::concrete("app::Gear"));
///
/// let gear = ClassName::from("app::Gear");
/// assert!(registry.knows(&gear));
/// let instance = (registry.constructor(&gear).unwrap())(vec![]).unwrap();
/// assert_eq!(instance.class_name(), gear);
/// ```
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<ClassName, ClassEntry>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete type constructed through [`Construct`].
    pub fn register<T: Construct>(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        self.register_with(descriptor, |args| {
            let instance: Instance = Arc::new(T::construct(args)?);
            Ok(instance)
        })
    }

    /// Register a class with an explicit constructor handle.
    pub fn register_with<F>(&mut self, descriptor: ClassDescriptor, ctor: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.insert(descriptor, Some(Arc::new(ctor)))
    }

    /// Register a descriptor without a constructor: interfaces, abstract
    /// classes and self-managed singletons.
    pub fn describe_only(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        self.insert(descriptor, None)
    }

    /// Attach a static method to an already registered class.
    pub fn add_static_method<F>(&mut self, class: impl Into<ClassName>, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        let class = class.into();
        let entry = self.classes.entry(class.clone()).or_insert_with(|| ClassEntry {
            descriptor: Arc::new(ClassDescriptor::concrete(class)),
            constructor: None,
            static_methods: HashMap::new(),
        });
        entry.static_methods.insert(name.into(), Arc::new(f));
        self
    }

    fn insert(&mut self, descriptor: ClassDescriptor, constructor: Option<ConstructorFn>) -> &mut Self {
        let name = descriptor.name.clone();
        let static_methods = self
            .classes
            .remove(&name)
            .map(|old| old.static_methods)
            .unwrap_or_default();
        self.classes.insert(
            name,
            ClassEntry {
                descriptor: Arc::new(descriptor),
                constructor,
                static_methods,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &ClassName> {
        self.classes.keys()
    }

    fn entry(&self, class: &ClassName) -> DiResult<&ClassEntry> {
        self.classes
            .get(class)
            .ok_or_else(|| DiError::UnknownClass(class.clone()))
    }
}

impl MetadataProvider for ClassRegistry {
    fn describe(&self, class: &ClassName) -> DiResult<Arc<ClassDescriptor>> {
        Ok(self.entry(class)?.descriptor.clone())
    }

    fn constructor(&self, class: &ClassName) -> DiResult<ConstructorFn> {
        self.entry(class)?
            .constructor
            .clone()
            .ok_or_else(|| DiError::MissingMetadata {
                class: class.clone(),
                detail: "no constructor registered".to_string(),
            })
    }

    fn static_method(&self, class: &ClassName, name: &str) -> DiResult<StaticMethodFn> {
        self.entry(class)?
            .static_methods
            .get(name)
            .cloned()
            .ok_or_else(|| DiError::MissingMetadata {
                class: class.clone(),
                detail: format!("no static method `{name}`"),
            })
    }

    fn knows(&self, class: &ClassName) -> bool {
        self.classes.contains_key(class)
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    fn describe(&self, class: &ClassName) -> DiResult<Arc<ClassDescriptor>> {
        (**self).describe(class)
    }

    fn constructor(&self, class: &ClassName) -> DiResult<ConstructorFn> {
        (**self).constructor(class)
    }

    fn static_method(&self, class: &ClassName, name: &str) -> DiResult<StaticMethodFn> {
        (**self).static_method(class, name)
    }

    fn knows(&self, class: &ClassName) -> bool {
        (**self).knows(class)
    }
}

/// Caches descriptors of an expensive provider for the provider's lifetime.
///
/// Only successful lookups are cached; unknown classes are asked again.
pub struct CachingMetadataProvider<P> {
    inner: P,
    descriptors: RwLock<HashMap<ClassName, Arc<ClassDescriptor>>>,
}

impl<P: MetadataProvider> CachingMetadataProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.descriptors.read().len()
    }
}

impl<P: MetadataProvider> MetadataProvider for CachingMetadataProvider<P> {
    fn describe(&self, class: &ClassName) -> DiResult<Arc<ClassDescriptor>> {
        if let Some(hit) = self.descriptors.read().get(class) {
            return Ok(hit.clone());
        }
        let descriptor = self.inner.describe(class)?;
        self.descriptors
            .write()
            .entry(class.clone())
            .or_insert_with(|| descriptor.clone());
        Ok(descriptor)
    }

    fn constructor(&self, class: &ClassName) -> DiResult<ConstructorFn> {
        self.inner.constructor(class)
    }

    fn static_method(&self, class: &ClassName, name: &str) -> DiResult<StaticMethodFn> {
        self.inner.static_method(class, name)
    }
}
