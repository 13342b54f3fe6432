//! Method calls through the container.

use tracing::debug;

use crate::aop::AspectRunner;
use crate::descriptors::{AspectDeclaration, MethodDescriptor, ParameterDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::object::{resolve_lazy, Instance};
use crate::value::{Arguments, Value};

use super::context::ResolverContext;

/// Names that may never be called through the container: `__`-prefixed
/// hooks and constructor/destructor-like methods.
pub fn is_magic_method(method: &str) -> bool {
    method.starts_with("__") || matches!(method, "new" | "drop")
}

/// Positional arguments in parameter order; missing names become `Null`.
pub fn positional(params: &[ParameterDescriptor], named: &Arguments) -> Vec<Value> {
    params
        .iter()
        .map(|p| named.get(&p.name).cloned().unwrap_or_default())
        .collect()
}

impl<'a> ResolverContext<'a> {
    /// Call `method` on `instance` with injected parameters and aspects.
    pub fn call_method(&self, instance: &Instance, method: &str, args: &Arguments) -> DiResult<Value> {
        let instance = resolve_lazy(instance)?;
        let class = instance.class_name();
        if is_magic_method(method) {
            return Err(DiError::MagicMethod {
                class,
                method: method.to_string(),
            });
        }

        if let Some(factory) = self.compiled_factory(&class) {
            if factory.has_method(method) {
                return factory.call_method(self, &instance, method, args);
            }
        }

        let descriptor = self.describe(&class)?;
        let declared = descriptor.find_method(method).ok_or_else(|| DiError::UnknownMethod {
            class: class.clone(),
            method: method.to_string(),
        })?;
        if !declared.is_public_instance() {
            return Err(DiError::MethodNotAccessible {
                class: class.clone(),
                method: method.to_string(),
            });
        }

        let params = self.method_parameters(&class, declared, args)?;
        debug!(%class, method, aspects = declared.aspects.len(), "calling method");
        self.run_aspects(&class, &declared.name, &declared.aspects, params, |params| {
            instance.invoke(method, positional(&declared.params, &params))
        })
    }

    /// Resolve the parameters of a method into a named map.
    pub fn method_parameters(&self, class: &ClassName, method: &MethodDescriptor, args: &Arguments) -> DiResult<Arguments> {
        let mut named = Arguments::new();
        for param in &method.params {
            let value = self.resolve_parameter(class, &method.name, param, method.injectable, args)?;
            named.insert(param.name.clone(), value);
        }
        Ok(named)
    }

    /// Run declared aspects around `call`; aspect classes are resolved
    /// through this context.
    pub fn run_aspects<F>(
        &self,
        class: &ClassName,
        method: &str,
        aspects: &[AspectDeclaration],
        params: Arguments,
        call: F,
    ) -> DiResult<Value>
    where
        F: FnOnce(Arguments) -> DiResult<Value>,
    {
        AspectRunner::new(class, method, aspects, |aspect| self.aspect(aspect)).run(params, call)
    }

    /// Resolve an aspect instance.
    pub fn aspect(&self, aspect: &ClassName) -> DiResult<Instance> {
        let instance = self.resolve(aspect, &Arguments::new())?;
        resolve_lazy(&instance)
    }
}
