//! Lifecycle scopes controlling instance caching.

use serde::Serialize;

/// Caching behavior of a resolved class
///
/// Derived from the class's lifecycle markers and its binding overrides.
///
/// - **Transient**: a fresh instance on every resolution
/// - **Singleton**: one instance per distinct argument set; identity is
///   argument-sensitive
/// - **Service**: one instance per container; the first successful build
///   wins and later arguments are ignored
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::Lifetime;
///
/// assert_eq!(Lifetime::from_flags(false, false), Lifetime::Transient);
/// assert_eq!(Lifetime::from_flags(true, false), Lifetime::Singleton);
/// // A class marked both singleton and service behaves as a service
/// assert_eq!(Lifetime::from_flags(true, true), Lifetime::Service);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Lifetime {
    /// New instance per resolution, never cached
    Transient,
    /// Cached per (class, serialized arguments, container)
    Singleton,
    /// Cached per (class, container) regardless of arguments
    Service,
}

impl Lifetime {
    pub fn from_flags(singleton: bool, service: bool) -> Self {
        if service {
            Lifetime::Service
        } else if singleton {
            Lifetime::Singleton
        } else {
            Lifetime::Transient
        }
    }

    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lifetime::Transient => "Transient",
            Lifetime::Singleton => "Singleton",
            Lifetime::Service => "Service",
        }
    }
}

/// Lifecycle markers declared on a class descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleMarkers {
    pub singleton: bool,
    pub service: bool,
    /// Dependents receive a lazy proxy instead of a built instance
    pub lazy: bool,
}
