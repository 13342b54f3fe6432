//! Execution of compiled plans.

use tracing::trace;

use crate::cache::SingletonKey;
use crate::container::ResolverContext;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::lifetime::Lifetime;
use crate::object::{resolve_lazy, Instance};
use crate::value::{Arguments, Value};

use super::plan::{
    dependency_edges, param_edges, BuildPlan, DependencyPlan, Edge, EdgeKind, Instantiation, MethodPlan,
    MethodPlans, ParamPlan, ParamSource, PropertySource, ProxyPlan, Route, Target, UnitBody,
};
use super::registry::CompiledFactory;

/// Compiled factory of one class, executed from its plan.
///
/// Produced by [`FactoryCompiler`](super::FactoryCompiler). Singletons and
/// services go to the cache of the container the unit runs in, shared with
/// reflective resolution, so one unit may serve several containers.
#[derive(Debug)]
pub struct FactoryUnit {
    pub(crate) class: ClassName,
    pub(crate) body: UnitBody,
    pub(crate) methods: MethodPlans,
    pub(crate) proxy: Option<ProxyPlan>,
    pub(crate) lazy_proxy: bool,
}

impl FactoryUnit {
    pub fn class(&self) -> &ClassName {
        &self.class
    }

    pub fn body(&self) -> &UnitBody {
        &self.body
    }

    pub fn lifetime(&self) -> Option<Lifetime> {
        match &self.body {
            UnitBody::Build(plan) => Some(plan.lifetime),
            _ => None,
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodPlan> {
        self.methods.values()
    }

    /// Property injector, present when the class has injectable properties.
    pub fn proxy(&self) -> Option<&ProxyPlan> {
        self.proxy.as_ref()
    }

    pub fn has_lazy_proxy(&self) -> bool {
        self.lazy_proxy
    }

    /// Lazy proxy for this class, if the class is marked lazy.
    pub fn lazy_proxy(&self, ctx: &ResolverContext<'_>, qualifier: Option<&str>, inline: &Arguments) -> Option<Instance> {
        self.lazy_proxy.then(|| ctx.lazy(&self.class, qualifier, inline))
    }

    /// Outgoing relations, for diagnostics.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        match &self.body {
            UnitBody::Alias { target, .. } => edges.push(Edge {
                to: target.clone(),
                kind: EdgeKind::Binding,
                label: String::new(),
            }),
            UnitBody::Provider { provider } => edges.push(Edge {
                to: provider.clone(),
                kind: EdgeKind::Provider,
                label: String::new(),
            }),
            UnitBody::Build(plan) => param_edges(&plan.constructor, "", &mut edges),
            UnitBody::Reflective => {}
        }
        if let Some(proxy) = &self.proxy {
            for property in &proxy.properties {
                if let PropertySource::Dependency(plan) = &property.source {
                    dependency_edges(plan, &format!("${}", property.name), &mut edges);
                }
            }
        }
        for method in self.methods.values() {
            param_edges(&method.params, &format!("{}.", method.name), &mut edges);
            for aspect in &method.aspects {
                edges.push(Edge {
                    to: aspect.aspect.clone(),
                    kind: EdgeKind::Aspect,
                    label: method.name.clone(),
                });
            }
        }
        edges
    }

    fn build(&self, ctx: &ResolverContext<'_>, plan: &BuildPlan, args: &Arguments) -> DiResult<Instance> {
        let effective = plan.params.merged(args);

        let singleton_key = match plan.lifetime {
            Lifetime::Singleton => {
                let key = SingletonKey::new(&self.class, &effective, ctx.container_id())?;
                if let Some(hit) = ctx.cached_singleton(&key) {
                    trace!(class = %self.class, "compiled singleton hit");
                    return Ok(hit);
                }
                Some(key)
            }
            Lifetime::Service => {
                if let Some(hit) = ctx.cached_service(&self.class) {
                    trace!(class = %self.class, "compiled service hit");
                    return Ok(hit);
                }
                None
            }
            Lifetime::Transient => None,
        };

        let values = plan
            .constructor
            .iter()
            .map(|p| p.value(ctx, &self.class, &plan.method, &effective))
            .collect::<DiResult<Vec<_>>>()?;
        let instance = match &plan.instantiation {
            Instantiation::Constructor(construct) => construct(values)?,
            Instantiation::Accessor { handle, .. } => handle(values)?,
        };

        if let Some(proxy) = &self.proxy {
            proxy.inject(ctx, &self.class, &instance)?;
        }

        Ok(match (plan.lifetime, singleton_key) {
            (Lifetime::Singleton, Some(key)) => ctx.store_singleton(key, instance),
            (Lifetime::Service, _) => ctx.store_service(&self.class, instance),
            _ => instance,
        })
    }
}

impl CompiledFactory for FactoryUnit {
    fn class(&self) -> ClassName {
        self.class.clone()
    }

    fn get_instance(&self, ctx: &ResolverContext<'_>, args: &Arguments) -> DiResult<Instance> {
        let _guard = ctx.enter(&self.class)?;
        if let Some(instance) = ctx.bound_instance(&self.class) {
            return Ok(instance);
        }
        match &self.body {
            UnitBody::Alias { target, params } => ctx.build_bound(target, &params.merged(args)),
            UnitBody::Provider { provider } => ctx.provide(&self.class, provider),
            UnitBody::Build(plan) => self.build(ctx, plan, args),
            UnitBody::Reflective => ctx.resolve_uncompiled(&self.class, args),
        }
    }

    fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    fn call_method(
        &self,
        ctx: &ResolverContext<'_>,
        instance: &Instance,
        method: &str,
        args: &Arguments,
    ) -> DiResult<Value> {
        let plan = self.methods.get(method).ok_or_else(|| DiError::UnknownMethod {
            class: self.class.clone(),
            method: method.to_string(),
        })?;
        let instance = resolve_lazy(instance)?;

        let mut named = Arguments::new();
        for param in &plan.params {
            named.insert(param.name.clone(), param.value(ctx, &self.class, &plan.name, args)?);
        }
        ctx.run_aspects(&self.class, &plan.name, &plan.aspects, named, |params| {
            instance.invoke(&plan.name, plan.positional(&params))
        })
    }
}

impl ParamPlan {
    /// Value of this parameter: effective argument first, then the planned source.
    pub fn value(&self, ctx: &ResolverContext<'_>, class: &ClassName, method: &str, effective: &Arguments) -> DiResult<Value> {
        if let Some(value) = effective.get(&self.name) {
            return Ok(value.clone());
        }
        let not_injectable = || DiError::NotInjectable {
            class: class.clone(),
            method: method.to_string(),
            parameter: self.name.clone(),
        };
        match &self.source {
            ParamSource::Dependency(plan) => plan.instance(ctx).map(Value::Object),
            ParamSource::Deferred {
                requested,
                qualifier,
                inline,
                default,
            } => match ctx.dependency(requested, qualifier.as_deref(), inline)? {
                Some(instance) => Ok(Value::Object(instance)),
                None => default.clone().ok_or_else(not_injectable),
            },
            ParamSource::Literal(value) => Ok(value.clone()),
            ParamSource::Required => Err(not_injectable()),
        }
    }
}

impl DependencyPlan {
    pub fn instance(&self, ctx: &ResolverContext<'_>) -> DiResult<Instance> {
        match &self.route {
            Route::Unit => ctx.resolve(&self.requested, &self.inline),
            Route::Lazy { qualifier } => Ok(ctx.lazy(&self.requested, qualifier.as_deref(), &self.inline)),
            Route::Named { target, params, .. } => resolve_qualified(ctx, &self.requested, target, params, &self.inline),
        }
    }
}

impl ProxyPlan {
    /// Assign every planned property on a freshly built instance.
    pub fn inject(&self, ctx: &ResolverContext<'_>, class: &ClassName, instance: &Instance) -> DiResult<()> {
        for property in &self.properties {
            match &property.source {
                PropertySource::Dependency(plan) => {
                    let value = plan.instance(ctx)?;
                    instance.inject_property(&property.name, Value::Object(value))?;
                }
                PropertySource::Deferred => ctx.inject_property_deferred(class, instance, &property.name)?,
                PropertySource::Private => {
                    return Err(DiError::PrivateProperty {
                        class: class.clone(),
                        property: property.name.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Resolve a qualified binding selected at compile time.
///
/// Mirrors the resolver: `requested` enters the stack, a bound instance
/// still wins, then the provider or the bound class is used. Generated code
/// calls this for qualified dependencies.
pub fn resolve_qualified(
    ctx: &ResolverContext<'_>,
    requested: &ClassName,
    target: &Target,
    params: &Arguments,
    inline: &Arguments,
) -> DiResult<Instance> {
    let _guard = ctx.enter(requested)?;
    if let Some(instance) = ctx.bound_instance(requested) {
        return Ok(instance);
    }
    match target {
        Target::Provider(provider) => ctx.provide(requested, provider),
        Target::Class(real) => ctx.build_bound(real, &params.merged(inline)),
    }
}
