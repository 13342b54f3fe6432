//! Binding selection shared by the resolver and the factory compiler.
//!
//! Precedence, first match wins:
//!
//! 1. bound instance of the requested class
//! 2. provider (configuration, then `providedBy` metadata)
//! 3. implementing-class override from configuration
//! 4. `implementedBy` metadata
//! 5. the requested class itself
//!
//! A qualified request tries the named entries of 2-4 first. If none
//! matches, the unqualified entries apply, and ending up at an abstract
//! class or interface is then an [`UnresolvedQualifier`](DiError::UnresolvedQualifier).

use crate::config::Overrides;
use crate::descriptors::ClassDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::metadata::MetadataProvider;
use crate::object::Instance;

/// Outcome of binding selection for one request.
#[derive(Debug, Clone)]
pub(crate) enum Selection {
    Instance(Instance),
    Provider(ClassName),
    Class(ClassName),
}

/// How a dependency parameter will be satisfied.
#[derive(Debug, Clone)]
pub(crate) enum DependencyRoute {
    /// Resolve normally
    Resolve,
    /// Inject a lazy proxy; the selected class carries the lazy marker
    Lazy(ClassName),
    /// The declared type cannot be instantiated; fall back to the default
    Unresolvable,
}

/// Select the binding for `requested`.
///
/// `overrides` is the configuration record of `requested`. The descriptor
/// may be missing when only configuration knows the class.
pub(crate) fn select(
    metadata: &dyn MetadataProvider,
    requested: &ClassName,
    qualifier: Option<&str>,
    overrides: &Overrides,
) -> DiResult<Selection> {
    if let Some(instance) = &overrides.instance {
        return Ok(Selection::Instance(instance.clone()));
    }

    let descriptor = match metadata.describe(requested) {
        Ok(d) => Some(d),
        Err(DiError::UnknownClass(_)) if has_config_binding(overrides) => None,
        Err(e) => return Err(e),
    };
    let descriptor = descriptor.as_deref();

    if let Some(q) = qualifier {
        if let Some(provider) = named_provider(overrides, descriptor, q) {
            return Ok(Selection::Provider(provider.clone()));
        }
        if let Some(class) = overrides.named.get(q) {
            return Ok(Selection::Class(class.clone()));
        }
        if let Some(class) = descriptor.and_then(|d| d.implemented_by.named.get(q)) {
            return Ok(Selection::Class(class.clone()));
        }
    }

    let fallback = unqualified(requested, overrides, descriptor);
    if let (Some(q), Selection::Class(class)) = (qualifier, &fallback) {
        let target = metadata.describe(class)?;
        if !target.kind.is_instantiable() {
            return Err(DiError::UnresolvedQualifier {
                class: requested.clone(),
                qualifier: q.to_string(),
            });
        }
    }
    Ok(fallback)
}

/// Classify a dependency parameter of type `ty` before resolving it.
pub(crate) fn dependency_route(
    metadata: &dyn MetadataProvider,
    ty: &ClassName,
    qualifier: Option<&str>,
    overrides: &Overrides,
) -> DiResult<DependencyRoute> {
    let selection = match select(metadata, ty, qualifier, overrides) {
        Ok(s) => s,
        Err(DiError::UnknownClass(c)) if &c == ty => return Ok(DependencyRoute::Unresolvable),
        Err(e) => return Err(e),
    };
    match selection {
        Selection::Instance(_) | Selection::Provider(_) => Ok(DependencyRoute::Resolve),
        Selection::Class(real) => {
            let descriptor = metadata.describe(&real)?;
            if !descriptor.kind.is_instantiable() {
                // Only the declared type itself is a soft failure
                if &real == ty {
                    Ok(DependencyRoute::Unresolvable)
                } else {
                    Ok(DependencyRoute::Resolve)
                }
            } else if descriptor.markers.lazy {
                Ok(DependencyRoute::Lazy(real))
            } else {
                Ok(DependencyRoute::Resolve)
            }
        }
    }
}

fn has_config_binding(overrides: &Overrides) -> bool {
    overrides.class.is_some()
        || overrides.provider.is_some()
        || !overrides.named.is_empty()
        || !overrides.named_providers.is_empty()
}

fn named_provider<'a>(
    overrides: &'a Overrides,
    descriptor: Option<&'a ClassDescriptor>,
    qualifier: &str,
) -> Option<&'a ClassName> {
    overrides
        .named_providers
        .get(qualifier)
        .or_else(|| descriptor.and_then(|d| d.provided_by.named.get(qualifier)))
}

fn unqualified(requested: &ClassName, overrides: &Overrides, descriptor: Option<&ClassDescriptor>) -> Selection {
    if let Some(provider) = overrides
        .provider
        .as_ref()
        .or_else(|| descriptor.and_then(|d| d.provided_by.default.as_ref()))
    {
        return Selection::Provider(provider.clone());
    }
    let class = overrides
        .class
        .as_ref()
        .or_else(|| descriptor.and_then(|d| d.implemented_by.default.as_ref()))
        .unwrap_or(requested);
    Selection::Class(class.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ClassDescriptor;
    use crate::metadata::ClassRegistry;

    fn registry() -> ClassRegistry {
        let mut r = ClassRegistry::new();
        r.describe_only(
            ClassDescriptor::interface("app::Store")
                .implemented_by("app::MemoryStore")
                .implemented_by_named("disk", "app::DiskStore"),
        );
        r.describe_only(ClassDescriptor::concrete("app::MemoryStore"));
        r.describe_only(ClassDescriptor::concrete("app::DiskStore"));
        r.describe_only(ClassDescriptor::concrete("app::CloudStore"));
        r.describe_only(ClassDescriptor::interface("app::Clock"));
        r.describe_only(ClassDescriptor::concrete("app::LazyThing").lazy());
        r
    }

    fn class_of(s: Selection) -> ClassName {
        match s {
            Selection::Class(c) => c,
            other => panic!("expected class selection, got {other:?}"),
        }
    }

    #[test]
    fn metadata_default_and_named() {
        let r = registry();
        let store = ClassName::from("app::Store");
        let none = Overrides::new();
        assert_eq!(class_of(select(&r, &store, None, &none).unwrap()), "app::MemoryStore");
        assert_eq!(class_of(select(&r, &store, Some("disk"), &none).unwrap()), "app::DiskStore");
        // Unknown qualifier falls back to the default binding
        assert_eq!(class_of(select(&r, &store, Some("tape"), &none).unwrap()), "app::MemoryStore");
    }

    #[test]
    fn config_beats_metadata() {
        let r = registry();
        let store = ClassName::from("app::Store");
        let o = Overrides::new().with_class("app::CloudStore").named("disk", "app::CloudStore");
        assert_eq!(class_of(select(&r, &store, None, &o).unwrap()), "app::CloudStore");
        assert_eq!(class_of(select(&r, &store, Some("disk"), &o).unwrap()), "app::CloudStore");
    }

    #[test]
    fn named_provider_beats_named_class() {
        let r = registry();
        let store = ClassName::from("app::Store");
        let o = Overrides::new().named_provider("disk", "app::DiskProvider");
        match select(&r, &store, Some("disk"), &o).unwrap() {
            Selection::Provider(p) => assert_eq!(p, "app::DiskProvider"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn qualifier_ending_at_interface_is_unresolved() {
        let r = registry();
        let clock = ClassName::from("app::Clock");
        let err = select(&r, &clock, Some("utc"), &Overrides::new()).unwrap_err();
        assert_eq!(
            err,
            DiError::UnresolvedQualifier {
                class: clock,
                qualifier: "utc".into()
            }
        );
    }

    #[test]
    fn routes() {
        let r = registry();
        let none = Overrides::new();
        assert!(matches!(
            dependency_route(&r, &ClassName::from("app::Clock"), None, &none).unwrap(),
            DependencyRoute::Unresolvable
        ));
        assert!(matches!(
            dependency_route(&r, &ClassName::from("app::Missing"), None, &none).unwrap(),
            DependencyRoute::Unresolvable
        ));
        assert!(matches!(
            dependency_route(&r, &ClassName::from("app::LazyThing"), None, &none).unwrap(),
            DependencyRoute::Lazy(_)
        ));
        assert!(matches!(
            dependency_route(&r, &ClassName::from("app::Store"), None, &none).unwrap(),
            DependencyRoute::Resolve
        ));
    }

    #[test]
    fn unknown_class_with_config_binding() {
        let r = registry();
        let o = Overrides::new().with_class("app::MemoryStore");
        let sel = select(&r, &ClassName::from("app::Unlisted"), None, &o).unwrap();
        assert_eq!(class_of(sel), "app::MemoryStore");
    }
}
