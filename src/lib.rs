//! # ferrous-wire
//!
//! Descriptor-driven dependency injection with a reflective resolver and an
//! ahead-of-time factory compiler.
//!
//! ## Features
//!
//! - **Binding resolution**: bound instances, providers, implementing-class
//!   overrides, `implementedBy` metadata, qualified (named) bindings
//! - **Lifecycles**: transient, argument-sensitive singletons, per-container
//!   services, lazy proxies
//! - **Cycle detection**: injection loops reported with the full path
//! - **Aspects**: before, intercept and after hooks around method calls
//! - **Factory compiler**: the same decisions baked into executable plans,
//!   renderable to Rust source
//!
//! Classes are described to the container through a [`MetadataProvider`];
//! [`ClassRegistry`] is the in-memory one.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_wire::{
//!     arg, downcast, Arguments, ClassDescriptor, ClassName, ClassRegistry, Construct, Container, DiResult,
//!     Instance, Object, Overrides, ParameterDescriptor, Value,
//! };
//!
//! struct SteelGear;
//! impl Object for SteelGear {
//!     fn class_name(&self) -> ClassName { ClassName::from("app::SteelGear") }
//! }
//! impl Construct for SteelGear {
//!     fn construct(_: Vec<Value>) -> DiResult<Self> { Ok(SteelGear) }
//! }
//!
//! struct Widget { gear: Instance, label: String }
//! impl Object for Widget {
//!     fn class_name(&self) -> ClassName { ClassName::from("app::Widget") }
//! }
//! impl Construct for Widget {
//!     fn construct(args: Vec<Value>) -> DiResult<Self> {
//!         Ok(Widget {
//!             gear: arg(&args, 0).into_instance()?,
//!             label: arg(&args, 1).as_str().unwrap_or_default().to_string(),
//!         })
//!     }
//! }
//!
//! let mut metadata = ClassRegistry::new();
//! metadata.describe_only(ClassDescriptor::interface("app::Gear"));
//! metadata.register::<SteelGear>(ClassDescriptor::concrete("app::SteelGear").singleton());
//! metadata.register::<Widget>(
//!     ClassDescriptor::concrete("app::Widget")
//!         .param(ParameterDescriptor::dependency("gear", "app::Gear"))
//!         .param(ParameterDescriptor::scalar("label").with_default("plain")),
//! );
//!
//! let container = Container::builder(metadata)
//!     .bind("app::Gear", Overrides::new().with_class("app::SteelGear"))
//!     .build();
//!
//! let widget: Arc<Widget> = container.get("app::Widget").unwrap();
//! assert_eq!(widget.label, "plain");
//! assert_eq!(widget.gear.class_name(), "app::SteelGear");
//!
//! let gear = container.get_instance_of_class("app::Gear", Arguments::new()).unwrap();
//! assert!(Arc::ptr_eq(&gear, &widget.gear));
//! # let _ = downcast::<SteelGear>(&gear).unwrap();
//! ```
//!
//! ## Lifetimes
//!
//! - **Transient**: a new instance per resolution
//! - **Singleton**: one instance per (class, effective arguments, container)
//! - **Service**: one instance per (class, container); the first build wins
//!
//! ## Compiled factories
//!
//! [`FactoryCompiler`] walks the same graph once and produces
//! [`FactoryUnit`]s. Registered in a [`CompiledFactoryRegistry`], they are
//! consulted before reflective resolution and behave identically.
//! [`compiler::emit`] renders them to Rust source.

// Module declarations
pub mod aop;
pub mod compiler;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod graph_export;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod value;

// Internal modules
mod binding;
mod cache;
mod internal;
mod object;

// Re-export core types
pub use aop::{with_aspect, Aspect, AspectContext, AspectRunner, Interception, TracingAspect};
pub use cache::SingletonKey;
pub use compiler::{
    resolve_qualified, BuildPlan, CompilationOutput, CompiledFactory, CompiledFactoryRegistry, DependencyPlan, Edge,
    EdgeKind, FactoryCompiler, FactoryUnit, Instantiation, MethodPlan, ParamPlan, ParamSource, PropertyPlan,
    PropertySource, ProxyPlan, Route, Target, UnitBody,
};
pub use config::{BindingConfiguration, ContainerOptions, Overrides, DEFAULT_MAX_DEPTH};
pub use container::{
    is_magic_method, positional, Container, ContainerBuilder, LazyProxy, ResolutionGuard, ResolverContext,
};
pub use descriptors::{
    AspectDeclaration, AspectKind, Binding, ClassDescriptor, ClassKind, ConstructorDescriptor, MethodDescriptor,
    ParameterDescriptor, PropertyDescriptor, Visibility,
};
pub use error::{DiError, DiResult};
pub use graph_export::{
    exports, DefaultGraphExporter, DependencyGraph, ExportFormat, ExportOptions, GraphBuilder, GraphEdge,
    GraphExporter, GraphMetadata, GraphNode,
};
pub use key::{ClassName, ContainerId};
pub use lifetime::{LifecycleMarkers, Lifetime};
pub use metadata::{CachingMetadataProvider, ClassRegistry, ConstructorFn, MetadataProvider, StaticMethodFn};
pub use object::{arg, downcast, downcast_ref, resolve_lazy, AsAny, Construct, Instance, Object, Provider};
pub use observer::{DiObserver, LoggingObserver};
pub use value::{Arguments, Value};
