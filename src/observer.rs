//! Diagnostic observers for resolution and compilation events.
//!
//! Observers are registered on the [`ContainerBuilder`](crate::ContainerBuilder)
//! or the [`FactoryCompiler`](crate::compiler::FactoryCompiler) and are called
//! synchronously, so implementations should stay cheap.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::DiError;
use crate::key::ClassName;

/// Observer trait for resolution and compilation events.
///
/// Every hook except [`resolving`](DiObserver::resolving) has a no-op
/// default.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use ferrous_wire::{ClassName, DiObserver};
///
/// #[derive(Default)]
/// struct Counting {
///     started: AtomicUsize,
/// }
///
/// impl DiObserver for Counting {
///     fn resolving(&self, _class: &ClassName) {
///         self.started.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let observer = Arc::new(Counting::default());
/// observer.resolving(&ClassName::from("app::Gear"));
/// assert_eq!(observer.started.load(Ordering::Relaxed), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Resolution of `class` is starting.
    fn resolving(&self, class: &ClassName);

    /// `class` was resolved successfully.
    fn resolved(&self, class: &ClassName, duration: Duration) {
        let _ = (class, duration);
    }

    /// Resolution of `class` failed.
    fn failed(&self, class: &ClassName, error: &DiError) {
        let _ = (class, error);
    }

    /// The compiler produced a unit for `class`.
    fn compiled(&self, class: &ClassName, unit: &str) {
        let _ = (class, unit);
    }

    /// The compiler degraded an unresolvable dependency.
    fn degraded(&self, class: &ClassName, parameter: &str, reason: &DiError) {
        let _ = (class, parameter, reason);
    }
}

/// Registered observers.
///
/// Minimal overhead when empty.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, class: &ClassName) {
        for observer in &self.observers {
            observer.resolving(class);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, class: &ClassName, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(class, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, class: &ClassName, error: &DiError) {
        for observer in &self.observers {
            observer.failed(class, error);
        }
    }

    pub(crate) fn compiled(&self, class: &ClassName, unit: &str) {
        for observer in &self.observers {
            observer.compiled(class, unit);
        }
    }

    pub(crate) fn degraded(&self, class: &ClassName, parameter: &str, reason: &DiError) {
        for observer in &self.observers {
            observer.degraded(class, parameter, reason);
        }
    }
}

/// Observer forwarding every event to `tracing`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ferrous_wire::{ClassRegistry, Container, LoggingObserver};
///
/// let container = Container::builder(ClassRegistry::new())
///     .add_observer(Arc::new(LoggingObserver::with_prefix("app")))
///     .build();
/// # let _ = container;
/// ```
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-wire".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, class: &ClassName) {
        debug!(prefix = %self.prefix, %class, "resolving");
    }

    fn resolved(&self, class: &ClassName, duration: Duration) {
        debug!(prefix = %self.prefix, %class, ?duration, "resolved");
    }

    fn failed(&self, class: &ClassName, error: &DiError) {
        warn!(prefix = %self.prefix, %class, %error, "resolution failed");
    }

    fn compiled(&self, class: &ClassName, unit: &str) {
        debug!(prefix = %self.prefix, %class, unit, "compiled");
    }

    fn degraded(&self, class: &ClassName, parameter: &str, reason: &DiError) {
        warn!(prefix = %self.prefix, %class, parameter, %reason, "dependency deferred to run time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl DiObserver for Recorder {
        fn resolving(&self, class: &ClassName) {
            self.events.lock().push(format!("resolving {class}"));
        }

        fn failed(&self, class: &ClassName, error: &DiError) {
            self.events.lock().push(format!("failed {class}: {error}"));
        }
    }

    #[test]
    fn observers_fan_out() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(a.clone());
        observers.add(b.clone());

        let gear = ClassName::from("app::Gear");
        observers.resolving(&gear);
        observers.resolved(&gear, Duration::from_millis(1));
        observers.failed(&gear, &DiError::UnknownClass(gear.clone()));

        for r in [&a, &b] {
            let events = r.events.lock();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0], "resolving app::Gear");
            assert_eq!(events[1], "failed app::Gear: Unknown class: app::Gear");
        }
    }

    #[tracing_test::traced_test]
    #[test]
    fn logging_observer_emits_events() {
        let observer = LoggingObserver::with_prefix("unit");
        let gear = ClassName::from("app::Gear");
        observer.resolving(&gear);
        observer.failed(&gear, &DiError::DepthExceeded(3));
        assert!(logs_contain("resolving"));
        assert!(logs_contain("resolution failed"));
    }
}
