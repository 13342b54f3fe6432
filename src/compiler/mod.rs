//! Ahead-of-time factory compilation.
//!
//! [`FactoryCompiler`] walks the same graph the resolver walks, using a
//! snapshot of the binding configuration, and produces one
//! [`FactoryUnit`] per class it reaches. Units run directly from their
//! plans once registered in a [`CompiledFactoryRegistry`], and can be
//! rendered to Rust source with [`emit`].
//!
//! Decisions baked into a unit: binding selection, lifetime, configured
//! params, literal defaults and the route of every dependency. Bound
//! instances are checked at run time.
//!
//! A dependency that cannot be compiled (unknown class, unresolvable
//! qualifier, abstract type without binding) is downgraded to its default,
//! or to a parameter the caller must supply. Injection loops are never
//! downgraded.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_wire::{Arguments, ClassDescriptor, ClassName, ClassRegistry, CompiledFactoryRegistry, Construct, Container, DiResult, FactoryCompiler, Object, Value};
//!
//! struct Gear;
//! impl Object for Gear {
//!     fn class_name(&self) -> ClassName { ClassName::from("app::Gear") }
//! }
//! impl Construct for Gear {
//!     fn construct(_: Vec<Value>) -> DiResult<Self> { Ok(Gear) }
//! }
//!
//! let mut metadata = ClassRegistry::new();
//! metadata.register::<Gear>(ClassDescriptor::concrete("app::Gear").singleton());
//! let metadata = Arc::new(metadata);
//!
//! let mut compiler = FactoryCompiler::new(metadata.clone(), Default::default());
//! let units = compiler.compile(&ClassName::from("app::Gear")).unwrap();
//! assert_eq!(units.len(), 1);
//!
//! let registry = Arc::new(CompiledFactoryRegistry::new());
//! compiler.finish().register(&registry);
//!
//! let container = Container::builder(metadata).compiled(registry).build();
//! let a = container.get_instance_of_class("app::Gear", Arguments::new()).unwrap();
//! let b = container.get_instance_of_class("app::Gear", Arguments::new()).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

pub mod emit;
mod plan;
mod registry;
mod runtime;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::binding::{self, DependencyRoute, Selection};
use crate::config::{BindingConfiguration, Overrides, DEFAULT_MAX_DEPTH};
use crate::container::{is_magic_method, scope_of, Container, CONSTRUCTOR, PROPERTY};
use crate::descriptors::{ClassDescriptor, MethodDescriptor, ParameterDescriptor, PropertyDescriptor};
use crate::error::{DiError, DiResult};
use crate::internal::loop_path;
use crate::key::ClassName;
use crate::metadata::MetadataProvider;
use crate::observer::{DiObserver, Observers};
use crate::value::Arguments;

pub use plan::{
    BuildPlan, DependencyPlan, Edge, EdgeKind, Instantiation, MethodPlan, ParamPlan, ParamSource, PropertyPlan,
    PropertySource, ProxyPlan, Route, Target, UnitBody,
};
pub use registry::{CompiledFactory, CompiledFactoryRegistry};
pub use runtime::{resolve_qualified, FactoryUnit};

/// When a dependency's own unit gets compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timing {
    /// Before the current unit completes: constructor params and properties
    Now,
    /// After the current unit: lazy targets, method params, aspects
    Later,
}

/// Compiles classes into [`FactoryUnit`]s.
pub struct FactoryCompiler {
    metadata: Arc<dyn MetadataProvider>,
    bindings: BindingConfiguration,
    units: HashMap<ClassName, Arc<FactoryUnit>>,
    order: Vec<ClassName>,
    in_progress: Vec<ClassName>,
    deferred: VecDeque<ClassName>,
    observers: Observers,
    max_depth: usize,
}

impl FactoryCompiler {
    pub fn new(metadata: Arc<dyn MetadataProvider>, bindings: BindingConfiguration) -> Self {
        Self {
            metadata,
            bindings,
            units: HashMap::new(),
            order: Vec::new(),
            in_progress: Vec::new(),
            deferred: VecDeque::new(),
            observers: Observers::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Compiler over a container's metadata and a snapshot of its bindings.
    pub fn for_container(container: &Container) -> Self {
        let mut compiler = Self::new(container.metadata().clone(), container.bindings());
        compiler.max_depth = container.options().max_depth;
        compiler
    }

    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compile `class` and everything it reaches.
    ///
    /// Returns the units produced by this call in compilation order,
    /// dependencies before their dependents; empty when everything was
    /// already compiled.
    pub fn compile(&mut self, class: &ClassName) -> DiResult<Vec<Arc<FactoryUnit>>> {
        let before = self.order.len();
        self.compile_class(class)?;
        self.drain_deferred();
        Ok(self.order[before..]
            .iter()
            .filter_map(|c| self.units.get(c).cloned())
            .collect())
    }

    pub fn unit(&self, class: &ClassName) -> Option<Arc<FactoryUnit>> {
        self.units.get(class).cloned()
    }

    /// All units in compilation order.
    pub fn units(&self) -> Vec<Arc<FactoryUnit>> {
        self.order.iter().filter_map(|c| self.units.get(c).cloned()).collect()
    }

    pub fn finish(self) -> CompilationOutput {
        let units = self.units();
        CompilationOutput { units }
    }

    fn compile_class(&mut self, class: &ClassName) -> DiResult<Arc<FactoryUnit>> {
        if let Some(unit) = self.units.get(class) {
            return Ok(unit.clone());
        }
        if self.in_progress.contains(class) {
            let mut path = self.in_progress.clone();
            path.push(class.clone());
            return Err(DiError::InjectionLoop(loop_path(path)));
        }
        if self.in_progress.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(self.max_depth));
        }

        debug!(%class, depth = self.in_progress.len(), "compiling");
        self.in_progress.push(class.clone());
        let planned = self.plan_unit(class);
        self.in_progress.pop();

        let unit = match planned {
            Ok(unit) => unit,
            Err(e) if !e.is_cycle() && self.has_bound_instance(class) => {
                warn!(%class, error = %e, "unit left to reflective resolution");
                self.reflective_unit(class)
            }
            Err(e) => return Err(e),
        };

        let unit = Arc::new(unit);
        self.observers.compiled(class, unit.body.kind());
        self.units.insert(class.clone(), unit.clone());
        self.order.push(class.clone());
        Ok(unit)
    }

    fn drain_deferred(&mut self) {
        while let Some(class) = self.deferred.pop_front() {
            if self.units.contains_key(&class) {
                continue;
            }
            // Resolved on first use at run time, so failures surface there
            if let Err(e) = self.compile_class(&class) {
                warn!(%class, error = %e, "deferred class not compiled");
            }
        }
    }

    fn has_bound_instance(&self, class: &ClassName) -> bool {
        self.bindings.get(class).is_some_and(|o| o.instance.is_some())
    }

    /// Configuration record with the bound instance stripped.
    fn overrides(&self, class: &ClassName) -> Overrides {
        let mut overrides = self.bindings.overrides_for(class);
        overrides.instance = None;
        overrides
    }

    fn reflective_unit(&self, class: &ClassName) -> FactoryUnit {
        FactoryUnit {
            class: class.clone(),
            body: UnitBody::Reflective,
            methods: Default::default(),
            proxy: None,
            lazy_proxy: false,
        }
    }

    fn plan_unit(&mut self, class: &ClassName) -> DiResult<FactoryUnit> {
        let overrides = self.overrides(class);
        let selection = binding::select(self.metadata.as_ref(), class, None, &overrides)?;

        let body = match selection {
            Selection::Instance(_) => UnitBody::Reflective,
            Selection::Provider(provider) => {
                self.deferred.push_back(provider.clone());
                UnitBody::Provider { provider }
            }
            Selection::Class(real) if &real == class => {
                let descriptor = self.metadata.describe(class)?;
                let plan = self.plan_build(class, &descriptor, &overrides)?;
                let proxy = self.plan_proxy(class, &descriptor)?;
                let methods = self.plan_methods(class, &descriptor);
                return Ok(FactoryUnit {
                    class: class.clone(),
                    body: UnitBody::Build(plan),
                    methods,
                    proxy,
                    lazy_proxy: descriptor.markers.lazy,
                        });
            }
            Selection::Class(real) => {
                self.compile_class(&real)?;
                UnitBody::Alias {
                    target: real,
                    params: overrides.params.clone(),
                }
            }
        };

        let lazy_proxy = self
            .metadata
            .describe(class)
            .map(|d| d.markers.lazy)
            .unwrap_or(false);
        Ok(FactoryUnit {
            class: class.clone(),
            body,
            methods: Default::default(),
            proxy: None,
            lazy_proxy,
        })
    }

    fn plan_build(&mut self, class: &ClassName, descriptor: &ClassDescriptor, overrides: &Overrides) -> DiResult<BuildPlan> {
        if !descriptor.kind.is_instantiable() {
            return Err(DiError::NotInstantiable {
                class: class.clone(),
                kind: descriptor.kind.as_str(),
            });
        }

        let ctor = &descriptor.constructor;
        let (method, instantiation) = match ctor.accessor.as_deref() {
            Some(accessor) if ctor.is_self_managed() => (
                accessor.to_string(),
                Instantiation::Accessor {
                    name: accessor.to_string(),
                    handle: self.metadata.static_method(class, accessor)?,
                },
            ),
            _ => (CONSTRUCTOR.to_string(), Instantiation::Constructor(self.metadata.constructor(class)?)),
        };

        let mut constructor = Vec::with_capacity(ctor.params.len());
        for param in &ctor.params {
            let source = if overrides.params.contains(&param.name) {
                ParamSource::Required
            } else {
                self.param_source(class, param, ctor.injectable, Timing::Now)?
            };
            constructor.push(ParamPlan {
                name: param.name.clone(),
                source,
            });
        }

        Ok(BuildPlan {
            lifetime: scope_of(overrides, descriptor),
            params: overrides.params.clone(),
            method,
            constructor,
            instantiation,
        })
    }

    fn param_source(
        &mut self,
        class: &ClassName,
        param: &ParameterDescriptor,
        injectable: bool,
        timing: Timing,
    ) -> DiResult<ParamSource> {
        let fallback = || match &param.default {
            Some(value) => ParamSource::Literal(value.clone()),
            None => ParamSource::Required,
        };
        let Some(ty) = param.ty.as_ref().filter(|_| injectable) else {
            return Ok(fallback());
        };
        match self.plan_dependency(ty, param.qualifier.as_deref(), &param.inline, timing) {
            Ok(Some(plan)) => Ok(ParamSource::Dependency(plan)),
            Ok(None) => Ok(fallback()),
            Err(e) if e.is_cycle() => Err(e),
            Err(e) => {
                warn!(%class, parameter = %param.name, error = %e, "dependency left to run-time resolution");
                self.observers.degraded(class, &param.name, &e);
                Ok(ParamSource::Deferred {
                    requested: ty.clone(),
                    qualifier: param.qualifier.clone(),
                    inline: param.inline.clone(),
                    default: param.default.clone(),
                })
            }
        }
    }

    /// Route of a dependency of type `ty`; `None` when the type cannot be
    /// instantiated at all.
    fn plan_dependency(
        &mut self,
        ty: &ClassName,
        qualifier: Option<&str>,
        inline: &Arguments,
        timing: Timing,
    ) -> DiResult<Option<DependencyPlan>> {
        let overrides = self.overrides(ty);
        let plan = |route| DependencyPlan {
            requested: ty.clone(),
            inline: inline.clone(),
            route,
        };

        if self.has_bound_instance(ty) {
            // The bound instance wins at run time whatever else is bound
            self.deferred.push_back(ty.clone());
            return Ok(Some(plan(Route::Unit)));
        }

        match binding::dependency_route(self.metadata.as_ref(), ty, qualifier, &overrides)? {
            DependencyRoute::Unresolvable => Ok(None),
            DependencyRoute::Lazy(real) => {
                self.deferred.push_back(ty.clone());
                self.deferred.push_back(real);
                Ok(Some(plan(Route::Lazy {
                    qualifier: qualifier.map(str::to_string),
                })))
            }
            DependencyRoute::Resolve => {
                let route = match qualifier {
                    None => Route::Unit,
                    Some(q) => match binding::select(self.metadata.as_ref(), ty, Some(q), &overrides)? {
                        Selection::Class(real) if &real == ty => Route::Unit,
                        Selection::Class(real) => Route::Named {
                            qualifier: q.to_string(),
                            target: Target::Class(real),
                            params: overrides.params.clone(),
                        },
                        Selection::Provider(provider) => Route::Named {
                            qualifier: q.to_string(),
                            target: Target::Provider(provider),
                            params: overrides.params.clone(),
                        },
                        Selection::Instance(_) => Route::Unit,
                    },
                };
                let compiled = match &route {
                    Route::Named { target, .. } => target.class().clone(),
                    _ => ty.clone(),
                };
                match timing {
                    Timing::Now => {
                        self.compile_class(&compiled)?;
                    }
                    Timing::Later => self.deferred.push_back(compiled),
                }
                Ok(Some(plan(route)))
            }
        }
    }

    fn plan_proxy(&mut self, class: &ClassName, descriptor: &ClassDescriptor) -> DiResult<Option<ProxyPlan>> {
        if !descriptor.has_injectable_properties() {
            return Ok(None);
        }
        let mut properties = Vec::new();
        for property in descriptor.injectable_properties() {
            let source = self.property_source(class, property)?;
            properties.push(PropertyPlan {
                name: property.name.clone(),
                source,
            });
        }
        Ok(Some(ProxyPlan { properties }))
    }

    fn property_source(&mut self, class: &ClassName, property: &PropertyDescriptor) -> DiResult<PropertySource> {
        if !property.writable {
            return Ok(PropertySource::Private);
        }
        let Some(ty) = &property.ty else {
            return Ok(PropertySource::Deferred);
        };
        match self.plan_dependency(ty, property.qualifier.as_deref(), &property.inline, Timing::Now) {
            Ok(Some(plan)) => Ok(PropertySource::Dependency(plan)),
            Ok(None) => Ok(PropertySource::Deferred),
            Err(e) if e.is_cycle() => Err(e),
            Err(e) => {
                warn!(%class, property = %property.name, error = %e, "property left to run-time injection");
                self.observers.degraded(class, &format!("{PROPERTY} {}", property.name), &e);
                Ok(PropertySource::Deferred)
            }
        }
    }

    fn plan_methods(&mut self, class: &ClassName, descriptor: &ClassDescriptor) -> plan::MethodPlans {
        let mut methods = plan::MethodPlans::new();
        for method in descriptor.public_methods() {
            if is_magic_method(&method.name) || methods.contains_key(&method.name) {
                continue;
            }
            let planned = self.plan_method(class, method);
            methods.insert(method.name.clone(), planned);
        }
        methods
    }

    fn plan_method(&mut self, class: &ClassName, method: &MethodDescriptor) -> MethodPlan {
        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            // Later timing never compiles inline, so no cycle can surface here
            let source = self
                .param_source(class, param, method.injectable, Timing::Later)
                .unwrap_or(ParamSource::Required);
            params.push(ParamPlan {
                name: param.name.clone(),
                source,
            });
        }
        for aspect in &method.aspects {
            self.deferred.push_back(aspect.aspect.clone());
        }
        MethodPlan {
            name: method.name.clone(),
            params,
            aspects: method.aspects.clone(),
        }
    }
}

/// Units produced by a compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompilationOutput {
    pub units: Vec<Arc<FactoryUnit>>,
}

impl CompilationOutput {
    /// Register every unit as an executable factory.
    pub fn register(&self, registry: &CompiledFactoryRegistry) {
        registry.register_all(self.units.iter().map(|u| u.clone() as Arc<dyn CompiledFactory>));
    }

    /// Rust source for every unit, plus a `register` function.
    pub fn render(&self) -> DiResult<String> {
        emit::render_module(&self.units)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
