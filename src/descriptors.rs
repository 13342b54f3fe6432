//! Class descriptors: the uniform metadata shape the container consumes.
//!
//! A descriptor is everything the resolver and the compiler know about a
//! class: its kind, constructor parameters, injectable properties, lifecycle
//! markers, default bindings and per-method aspect declarations. Descriptors
//! are immutable once handed out by a [`MetadataProvider`](crate::MetadataProvider).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::key::ClassName;
use crate::lifetime::LifecycleMarkers;
use crate::value::{Arguments, Value};

/// Whether a class can be instantiated directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassKind {
    Concrete,
    Abstract,
    Interface,
}

impl ClassKind {
    pub fn is_instantiable(self) -> bool {
        matches!(self, ClassKind::Concrete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassKind::Concrete => "class",
            ClassKind::Abstract => "abstract class",
            ClassKind::Interface => "interface",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// A constructor or method parameter.
///
/// `ty` is `None` for scalar or untyped parameters, which can only be filled
/// from an override or the default.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: Option<ClassName>,
    pub default: Option<Value>,
    pub qualifier: Option<String>,
    /// Literal overrides merged into the dependency's own resolution
    pub inline: Arguments,
}

impl ParameterDescriptor {
    /// Parameter typed with an injectable class.
    pub fn dependency(name: impl Into<String>, ty: impl Into<ClassName>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            default: None,
            qualifier: None,
            inline: Arguments::new(),
        }
    }

    /// Scalar or untyped parameter.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
            qualifier: None,
            inline: Arguments::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn named(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_inline(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inline.insert(name, value);
        self
    }
}

/// A property that may receive a dependency after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: Option<ClassName>,
    pub qualifier: Option<String>,
    pub inline: Arguments,
    pub injectable: bool,
    /// Writable from outside the class
    pub writable: bool,
}

impl PropertyDescriptor {
    /// Injectable, publicly writable property.
    pub fn inject(name: impl Into<String>, ty: impl Into<ClassName>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            qualifier: None,
            inline: Arguments::new(),
            injectable: true,
            writable: true,
        }
    }

    pub fn named(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_inline(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inline.insert(name, value);
        self
    }

    pub fn private(mut self) -> Self {
        self.writable = false;
        self
    }
}

/// Constructor shape, or the static accessor of a self-managed singleton.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDescriptor {
    pub visibility: Visibility,
    /// Typed parameters are resolved from the container only when set
    pub injectable: bool,
    pub params: Vec<ParameterDescriptor>,
    /// Public static method returning the instance
    pub accessor: Option<String>,
}

impl Default for ConstructorDescriptor {
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            injectable: true,
            params: Vec::new(),
            accessor: None,
        }
    }
}

impl ConstructorDescriptor {
    pub fn is_self_managed(&self) -> bool {
        self.visibility != Visibility::Public && self.accessor.is_some()
    }
}

/// A default binding plus qualifier-specific ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub default: Option<ClassName>,
    pub named: BTreeMap<String, ClassName>,
}

impl Binding {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.named.is_empty()
    }

    pub fn lookup(&self, qualifier: Option<&str>) -> Option<&ClassName> {
        match qualifier {
            Some(q) => self.named.get(q),
            None => self.default.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AspectKind {
    Before,
    Intercept,
    After,
}

impl AspectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectKind::Before => "before",
            AspectKind::Intercept => "intercept",
            AspectKind::After => "after",
        }
    }
}

/// One interceptor declaration on a method.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectDeclaration {
    pub kind: AspectKind,
    pub aspect: ClassName,
    pub args: Arguments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub injectable: bool,
    pub params: Vec<ParameterDescriptor>,
    /// Declaration order is execution order within each kind
    pub aspects: Vec<AspectDeclaration>,
}

impl MethodDescriptor {
    /// Public, non-static, non-injectable method.
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            injectable: false,
            params: Vec::new(),
            aspects: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn injectable(mut self) -> Self {
        self.injectable = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn before(self, aspect: impl Into<ClassName>, args: Arguments) -> Self {
        self.aspect(AspectKind::Before, aspect, args)
    }

    pub fn intercept(self, aspect: impl Into<ClassName>, args: Arguments) -> Self {
        self.aspect(AspectKind::Intercept, aspect, args)
    }

    pub fn after(self, aspect: impl Into<ClassName>, args: Arguments) -> Self {
        self.aspect(AspectKind::After, aspect, args)
    }

    fn aspect(mut self, kind: AspectKind, aspect: impl Into<ClassName>, args: Arguments) -> Self {
        self.aspects.push(AspectDeclaration {
            kind,
            aspect: aspect.into(),
            args,
        });
        self
    }

    /// Callable through the container.
    pub fn is_public_instance(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }

    pub fn aspects_of(&self, kind: AspectKind) -> impl Iterator<Item = &AspectDeclaration> {
        self.aspects.iter().filter(move |a| a.kind == kind)
    }
}

/// Everything the container knows about one class.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{ClassDescriptor, ParameterDescriptor, Lifetime};
///
/// let widget = ClassDescriptor::concrete("app::Widget")
///     .param(ParameterDescriptor::dependency("gear", "app::Gear"))
///     .param(ParameterDescriptor::scalar("label").with_default("w"))
///     .singleton();
///
/// assert_eq!(widget.constructor.params.len(), 2);
/// assert_eq!(widget.lifetime(), Lifetime::Singleton);
/// assert!(widget.kind.is_instantiable());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub name: ClassName,
    pub kind: ClassKind,
    pub constructor: ConstructorDescriptor,
    pub properties: Vec<PropertyDescriptor>,
    pub markers: LifecycleMarkers,
    pub implemented_by: Binding,
    pub provided_by: Binding,
    pub methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    fn with_kind(name: impl Into<ClassName>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            constructor: ConstructorDescriptor::default(),
            properties: Vec::new(),
            markers: LifecycleMarkers::default(),
            implemented_by: Binding::default(),
            provided_by: Binding::default(),
            methods: Vec::new(),
        }
    }

    pub fn concrete(name: impl Into<ClassName>) -> Self {
        Self::with_kind(name, ClassKind::Concrete)
    }

    pub fn abstract_class(name: impl Into<ClassName>) -> Self {
        Self::with_kind(name, ClassKind::Abstract)
    }

    pub fn interface(name: impl Into<ClassName>) -> Self {
        Self::with_kind(name, ClassKind::Interface)
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.constructor.params.push(param);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn singleton(mut self) -> Self {
        self.markers.singleton = true;
        self
    }

    pub fn service(mut self) -> Self {
        self.markers.service = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.markers.lazy = true;
        self
    }

    /// Constructor parameters are only filled from overrides and defaults.
    pub fn manual_constructor(mut self) -> Self {
        self.constructor.injectable = false;
        self
    }

    /// Private constructor; instances come from a public static accessor.
    pub fn self_managed(mut self, accessor: impl Into<String>) -> Self {
        self.constructor.visibility = Visibility::Private;
        self.constructor.accessor = Some(accessor.into());
        self
    }

    pub fn implemented_by(mut self, class: impl Into<ClassName>) -> Self {
        self.implemented_by.default = Some(class.into());
        self
    }

    pub fn implemented_by_named(mut self, qualifier: impl Into<String>, class: impl Into<ClassName>) -> Self {
        self.implemented_by.named.insert(qualifier.into(), class.into());
        self
    }

    pub fn provided_by(mut self, provider: impl Into<ClassName>) -> Self {
        self.provided_by.default = Some(provider.into());
        self
    }

    pub fn provided_by_named(mut self, qualifier: impl Into<String>, provider: impl Into<ClassName>) -> Self {
        self.provided_by.named.insert(qualifier.into(), provider.into());
        self
    }

    pub fn lifetime(&self) -> crate::Lifetime {
        crate::Lifetime::from_flags(self.markers.singleton, self.markers.service)
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn injectable_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.injectable)
    }

    pub fn has_injectable_properties(&self) -> bool {
        self.properties.iter().any(|p| p.injectable)
    }

    /// Public instance methods, in declaration order.
    pub fn public_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().filter(|m| m.is_public_instance())
    }
}
