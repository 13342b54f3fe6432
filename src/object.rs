//! The capability seam implemented by every injectable type.
//!
//! Rust has no runtime reflection, so the container talks to instances
//! through [`Object`]: method invocation by name, property injection by name
//! and capability queries for providers and aspects. Construction goes
//! through [`Construct`] (or a handle registered with the metadata
//! provider).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::aop::Aspect;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::value::Value;

/// Shared handle to a resolved instance.
pub type Instance = Arc<dyn Object>;

/// Upcasting helper so trait objects can be downcast to their concrete type.
///
/// Blanket-implemented for every `Send + Sync + 'static` type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An injectable instance.
///
/// Implementors dispatch methods and properties by name. Everything except
/// [`class_name`](Object::class_name) has a default, so a plain value type
/// only needs one line.
///
/// Property injection happens after construction through a shared
/// reference; use interior mutability (e.g. `once_cell::sync::OnceCell`)
/// for injectable fields.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{ClassName, DiResult, Object, Value};
///
/// struct Counter {
///     start: i64,
/// }
///
/// impl Object for Counter {
///     fn class_name(&self) -> ClassName {
///         ClassName::from("app::Counter")
///     }
///
///     fn invoke(&self, method: &str, args: Vec<Value>) -> DiResult<Value> {
///         match method {
///             "next" => Ok(Value::from(self.start + args.len() as i64)),
///             _ => Err(ferrous_wire::DiError::UnknownMethod {
///                 class: self.class_name(),
///                 method: method.to_string(),
///             }),
///         }
///     }
/// }
///
/// let c = Counter { start: 1 };
/// assert_eq!(c.invoke("next", vec![Value::Null]).unwrap(), Value::from(2));
/// ```
pub trait Object: AsAny {
    /// Name of the concrete class, matching its descriptor.
    fn class_name(&self) -> ClassName;

    /// Invoke an instance method with positional arguments.
    fn invoke(&self, method: &str, args: Vec<Value>) -> DiResult<Value> {
        let _ = args;
        Err(DiError::UnknownMethod {
            class: self.class_name(),
            method: method.to_string(),
        })
    }

    /// Assign an injectable property after construction.
    fn inject_property(&self, name: &str, value: Value) -> DiResult<()> {
        let _ = value;
        Err(DiError::MissingMetadata {
            class: self.class_name(),
            detail: format!("no setter for property `{name}`"),
        })
    }

    /// Provider capability; `None` unless the type implements [`Provider`].
    fn as_provider(&self) -> Option<&dyn Provider> {
        None
    }

    /// Aspect capability; `None` unless the type implements [`Aspect`].
    fn as_aspect(&self) -> Option<&dyn Aspect> {
        None
    }

    /// The real instance behind a lazy proxy, resolving it on first use.
    ///
    /// Ordinary objects return `Ok(None)`.
    #[doc(hidden)]
    fn lazy_target(&self) -> DiResult<Option<Instance>> {
        Ok(None)
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.class_name())
    }
}

/// Provider capability: an object that hands out instances of another class.
pub trait Provider: Send + Sync {
    fn get(&self) -> DiResult<Instance>;
}

/// Direct construction from positional constructor arguments.
///
/// Generated factories call `<T as Construct>::construct` so that emitted
/// code never needs the metadata provider. Registering a type through
/// [`ClassRegistry::register`](crate::ClassRegistry::register) uses the same
/// function for reflective construction.
pub trait Construct: Object + Sized {
    fn construct(args: Vec<Value>) -> DiResult<Self>;
}

/// Follow a lazy proxy to its target; ordinary instances are returned as is.
pub fn resolve_lazy(instance: &Instance) -> DiResult<Instance> {
    match instance.lazy_target()? {
        Some(target) => Ok(target),
        None => Ok(instance.clone()),
    }
}

/// Downcast an instance to its concrete type, looking through lazy proxies.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_wire::{downcast, ClassName, Instance, Object};
///
/// struct Gear;
/// impl Object for Gear {
///     fn class_name(&self) -> ClassName { ClassName::from("app::Gear") }
/// }
///
/// let instance: Instance = Arc::new(Gear);
/// let gear: Arc<Gear> = downcast(&instance).unwrap();
/// assert!(Arc::ptr_eq(&(gear as Instance), &instance));
/// ```
pub fn downcast<T: Object>(instance: &Instance) -> DiResult<Arc<T>> {
    let target = resolve_lazy(instance)?;
    let found = target.class_name().to_string();
    target.into_any().downcast::<T>().map_err(|_| DiError::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        found,
    })
}

/// Borrow an instance as its concrete type without cloning the handle.
///
/// Does not look through lazy proxies.
pub fn downcast_ref<T: Object>(instance: &Instance) -> Option<&T> {
    // Deref first: `Arc<dyn Object>` is itself `AsAny`
    (**instance).as_any().downcast_ref::<T>()
}

/// Read a positional argument, treating a missing slot as `Null`.
///
/// Convenience for `Construct` and `Object::invoke` implementations.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain;

    impl Object for Plain {
        fn class_name(&self) -> ClassName {
            ClassName::from("test::Plain")
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Object for Other {
        fn class_name(&self) -> ClassName {
            ClassName::from("test::Other")
        }
    }

    #[test]
    fn downcast_mismatch_reports_found_class() {
        let instance: Instance = Arc::new(Plain);
        let err = downcast::<Other>(&instance).unwrap_err();
        match err {
            DiError::TypeMismatch { found, .. } => assert_eq!(found, "test::Plain"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn default_capabilities_are_absent() {
        let plain = Plain;
        assert!(plain.as_provider().is_none());
        assert!(plain.as_aspect().is_none());
        assert!(plain.lazy_target().unwrap().is_none());
        assert!(matches!(
            plain.invoke("run", vec![]),
            Err(DiError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn arg_defaults_to_null() {
        let args = vec![Value::from(1)];
        assert_eq!(arg(&args, 0), Value::Int(1));
        assert_eq!(arg(&args, 3), Value::Null);
    }
}
