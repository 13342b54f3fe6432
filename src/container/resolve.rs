//! Reflective resolution.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::binding::{self, DependencyRoute, Selection};
use crate::cache::SingletonKey;
use crate::config::Overrides;
use crate::descriptors::{ClassDescriptor, ParameterDescriptor, PropertyDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::lifetime::Lifetime;
use crate::object::{resolve_lazy, Instance};
use crate::value::{Arguments, Value};

use super::context::ResolverContext;
use super::lazy::LazyProxy;

/// Method name reported for constructor parameters.
pub(crate) const CONSTRUCTOR: &str = "constructor";

/// Method name reported for injectable properties.
pub(crate) const PROPERTY: &str = "property";

/// Lifetime of `real`: override flags when set, else descriptor markers.
pub(crate) fn scope_of(overrides: &Overrides, descriptor: &ClassDescriptor) -> Lifetime {
    Lifetime::from_flags(
        overrides.singleton.unwrap_or(descriptor.markers.singleton),
        overrides.service.unwrap_or(descriptor.markers.service),
    )
}

impl<'a> ResolverContext<'a> {
    /// Resolve `class`, consulting compiled factories first.
    pub fn resolve(&self, class: &ClassName, args: &Arguments) -> DiResult<Instance> {
        self.resolve_named(class, None, args)
    }

    /// Resolve a possibly qualified binding of `class`.
    ///
    /// Qualified requests always take the reflective path for the binding
    /// step; the selected class may still be built by a compiled factory.
    pub fn resolve_named(&self, class: &ClassName, qualifier: Option<&str>, args: &Arguments) -> DiResult<Instance> {
        let observers = &self.inner.observers;
        let started = observers.has_observers().then(|| {
            observers.resolving(class);
            Instant::now()
        });

        let result = match (qualifier, self.compiled_factory(class)) {
            (None, Some(factory)) => {
                trace!(%class, "compiled factory");
                factory.get_instance(self, args)
            }
            _ => self.resolve_reflective(class, qualifier, args),
        };

        if let Some(started) = started {
            match &result {
                Ok(_) => observers.resolved(class, started.elapsed()),
                Err(e) => observers.failed(class, e),
            }
        }
        result
    }

    fn resolve_reflective(&self, requested: &ClassName, qualifier: Option<&str>, args: &Arguments) -> DiResult<Instance> {
        let guard = self.enter(requested)?;
        debug!(class = %requested, qualifier, depth = self.depth(), "resolving");
        let overrides = self.overrides_for(requested);
        match binding::select(self.metadata(), requested, qualifier, &overrides)? {
            Selection::Class(real) if &real == requested => match self.compiled_factory(requested) {
                Some(factory) => {
                    // Qualified request that fell back to a compiled class
                    drop(guard);
                    factory.get_instance(self, args)
                }
                None => self.build(requested, &overrides, args),
            },
            selection => self.apply(requested, selection, &overrides, args),
        }
    }

    /// Reflective resolution of a class its caller already pushed on the
    /// stack. Compiled factories fall back to this when a class could not be
    /// planned ahead of time.
    pub fn resolve_uncompiled(&self, class: &ClassName, args: &Arguments) -> DiResult<Instance> {
        let overrides = self.overrides_for(class);
        let selection = binding::select(self.metadata(), class, None, &overrides)?;
        self.apply(class, selection, &overrides, args)
    }

    fn apply(&self, requested: &ClassName, selection: Selection, overrides: &Overrides, args: &Arguments) -> DiResult<Instance> {
        match selection {
            Selection::Instance(instance) => Ok(instance),
            Selection::Provider(provider) => self.provide(requested, &provider),
            Selection::Class(real) if &real == requested => self.build(requested, overrides, args),
            Selection::Class(real) => self.build_bound(&real, &overrides.params.merged(args)),
        }
    }

    /// Resolve `real` on behalf of a binding; `incoming` already carries the
    /// requested class's configured params and the caller's arguments.
    ///
    /// `real` goes through its own binding, so chained bindings are
    /// followed. Its compiled factory is used when one is registered.
    pub fn build_bound(&self, real: &ClassName, incoming: &Arguments) -> DiResult<Instance> {
        match self.compiled_factory(real) {
            Some(factory) => factory.get_instance(self, incoming),
            None => self.resolve_reflective(real, None, incoming),
        }
    }

    /// Instantiate `real` itself: scope lookup, constructor parameters,
    /// construction, property injection, caching.
    fn build(&self, real: &ClassName, overrides: &Overrides, incoming: &Arguments) -> DiResult<Instance> {
        let descriptor = self.describe(real)?;
        if !descriptor.kind.is_instantiable() {
            return Err(DiError::NotInstantiable {
                class: real.clone(),
                kind: descriptor.kind.as_str(),
            });
        }

        let lifetime = scope_of(overrides, &descriptor);
        let effective = overrides.params.merged(incoming);

        let singleton_key = match lifetime {
            Lifetime::Singleton => {
                let key = SingletonKey::new(real, &effective, self.container_id())?;
                if let Some(hit) = self.cached_singleton(&key) {
                    trace!(class = %real, "singleton cache hit");
                    return Ok(hit);
                }
                Some(key)
            }
            Lifetime::Service => {
                if let Some(hit) = self.cached_service(real) {
                    trace!(class = %real, "service cache hit");
                    return Ok(hit);
                }
                None
            }
            Lifetime::Transient => None,
        };

        let ctor = &descriptor.constructor;
        let instance = if ctor.is_self_managed() {
            let accessor = ctor.accessor.as_deref().unwrap_or_default();
            let values = self.resolve_parameters(real, accessor, &ctor.params, ctor.injectable, &effective)?;
            let method = self.metadata().static_method(real, accessor)?;
            method(values)?
        } else {
            let values = self.resolve_parameters(real, CONSTRUCTOR, &ctor.params, ctor.injectable, &effective)?;
            let construct = self.metadata().constructor(real)?;
            construct(values)?
        };

        // Properties first so a failed injection never leaves a cached instance behind
        self.inject_properties(&descriptor, &instance)?;

        Ok(match (lifetime, singleton_key) {
            (Lifetime::Singleton, Some(key)) => self.store_singleton(key, instance),
            (Lifetime::Service, _) => self.store_service(real, instance),
            _ => instance,
        })
    }

    /// Resolve the provider bound to `requested` and ask it for an instance.
    pub fn provide(&self, requested: &ClassName, provider: &ClassName) -> DiResult<Instance> {
        let instance = self.resolve(provider, &Arguments::new())?;
        let instance = resolve_lazy(&instance)?;
        let capability = instance.as_provider().ok_or_else(|| DiError::NotAProvider {
            class: requested.clone(),
            provider: provider.clone(),
        })?;
        debug!(class = %requested, %provider, "provided");
        capability.get()
    }

    pub(crate) fn resolve_parameters(
        &self,
        class: &ClassName,
        method: &str,
        params: &[ParameterDescriptor],
        injectable: bool,
        args: &Arguments,
    ) -> DiResult<Vec<Value>> {
        params
            .iter()
            .map(|p| self.resolve_parameter(class, method, p, injectable, args))
            .collect()
    }

    /// One parameter: override (even `Null`), then dependency, then default.
    pub fn resolve_parameter(
        &self,
        class: &ClassName,
        method: &str,
        param: &ParameterDescriptor,
        injectable: bool,
        args: &Arguments,
    ) -> DiResult<Value> {
        if let Some(value) = args.get(&param.name) {
            return Ok(value.clone());
        }
        if injectable {
            if let Some(ty) = &param.ty {
                if let Some(instance) = self.dependency(ty, param.qualifier.as_deref(), &param.inline)? {
                    return Ok(Value::Object(instance));
                }
            }
        }
        if let Some(default) = &param.default {
            return Ok(default.clone());
        }
        Err(DiError::NotInjectable {
            class: class.clone(),
            method: method.to_string(),
            parameter: param.name.clone(),
        })
    }

    /// Instance for a dependency of type `ty`; `None` when the type cannot be
    /// instantiated and the caller should fall back to a default.
    pub fn dependency(&self, ty: &ClassName, qualifier: Option<&str>, inline: &Arguments) -> DiResult<Option<Instance>> {
        let overrides = self.overrides_for(ty);
        match binding::dependency_route(self.metadata(), ty, qualifier, &overrides)? {
            DependencyRoute::Unresolvable => Ok(None),
            DependencyRoute::Lazy(real) => {
                trace!(class = %ty, %real, "lazy dependency");
                Ok(Some(self.lazy(ty, qualifier, inline)))
            }
            DependencyRoute::Resolve => self.resolve_named(ty, qualifier, inline).map(Some),
        }
    }

    /// Lazy proxy standing in for `requested` until first use.
    pub fn lazy(&self, requested: &ClassName, qualifier: Option<&str>, inline: &Arguments) -> Instance {
        Arc::new(LazyProxy::new(
            Arc::downgrade(self.inner),
            requested.clone(),
            qualifier.map(str::to_string),
            inline.clone(),
        ))
    }

    fn inject_properties(&self, descriptor: &ClassDescriptor, instance: &Instance) -> DiResult<()> {
        for property in descriptor.injectable_properties() {
            self.inject_property(&descriptor.name, property, instance)?;
        }
        Ok(())
    }

    fn inject_property(&self, class: &ClassName, property: &PropertyDescriptor, instance: &Instance) -> DiResult<()> {
        if !property.writable {
            return Err(DiError::PrivateProperty {
                class: class.clone(),
                property: property.name.clone(),
            });
        }
        let not_injectable = || DiError::NotInjectable {
            class: class.clone(),
            method: PROPERTY.to_string(),
            parameter: property.name.clone(),
        };
        let ty = property.ty.as_ref().ok_or_else(not_injectable)?;
        let value = self
            .dependency(ty, property.qualifier.as_deref(), &property.inline)?
            .ok_or_else(not_injectable)?;
        trace!(%class, property = %property.name, "property injected");
        instance.inject_property(&property.name, Value::Object(value))
    }

    /// Inject one property by name; used by compiled factories that could
    /// not resolve it ahead of time.
    pub fn inject_property_deferred(&self, class: &ClassName, instance: &Instance, property: &str) -> DiResult<()> {
        let descriptor = self.describe(class)?;
        let descriptor_property = descriptor
            .properties
            .iter()
            .find(|p| p.name == property)
            .ok_or_else(|| DiError::MissingMetadata {
                class: class.clone(),
                detail: format!("no property `{property}`"),
            })?;
        self.inject_property(class, descriptor_property, instance)
    }
}
