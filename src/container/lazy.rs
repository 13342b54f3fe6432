//! Lazy dependency proxies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::aop::Aspect;
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::object::{Instance, Object, Provider};
use crate::value::{Arguments, Value};

use super::{Container, ContainerInner};

/// Stand-in injected for a dependency whose class is marked lazy.
///
/// The real instance is resolved through the owning container on first
/// use: any method call, property injection, capability query or
/// [`resolve_lazy`](crate::resolve_lazy). It is never partially built; a
/// proxy used while its own target is still being constructed reports an
/// injection loop.
pub struct LazyProxy {
    container: Weak<ContainerInner>,
    requested: ClassName,
    qualifier: Option<String>,
    inline: Arguments,
    target: OnceCell<Instance>,
    resolving: AtomicBool,
}

impl LazyProxy {
    pub(crate) fn new(
        container: Weak<ContainerInner>,
        requested: ClassName,
        qualifier: Option<String>,
        inline: Arguments,
    ) -> Self {
        Self {
            container,
            requested,
            qualifier,
            inline,
            target: OnceCell::new(),
            resolving: AtomicBool::new(false),
        }
    }

    pub fn requested(&self) -> &ClassName {
        &self.requested
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    /// The real instance, resolving it on first call.
    pub fn target(&self) -> DiResult<Instance> {
        if let Some(target) = self.target.get() {
            return Ok(target.clone());
        }
        let inner = self.container.upgrade().ok_or_else(|| {
            DiError::construction(self.requested.clone(), "container dropped before lazy dependency was used")
        })?;
        let container = Container::from_inner(inner);

        // The container lock serializes first use across threads
        container.with_context(|ctx| {
            if let Some(target) = self.target.get() {
                return Ok(target.clone());
            }
            if self.resolving.swap(true, Ordering::SeqCst) {
                return Err(DiError::InjectionLoop(vec![self.requested.clone(), self.requested.clone()]));
            }
            debug!(class = %self.requested, "resolving lazy dependency");
            let resolved = ctx.resolve_named(&self.requested, self.qualifier.as_deref(), &self.inline);
            self.resolving.store(false, Ordering::SeqCst);
            let resolved = resolved?;
            Ok(self.target.get_or_init(|| resolved).clone())
        })
    }
}

impl Object for LazyProxy {
    fn class_name(&self) -> ClassName {
        match self.target.get() {
            Some(target) => target.class_name(),
            None => self.requested.clone(),
        }
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> DiResult<Value> {
        self.target()?.invoke(method, args)
    }

    fn inject_property(&self, name: &str, value: Value) -> DiResult<()> {
        self.target()?.inject_property(name, value)
    }

    fn as_provider(&self) -> Option<&dyn Provider> {
        self.target().ok()?;
        self.target.get()?.as_provider()
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        self.target().ok()?;
        self.target.get()?.as_aspect()
    }

    fn lazy_target(&self) -> DiResult<Option<Instance>> {
        self.target().map(Some)
    }
}

impl std::fmt::Debug for LazyProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProxy")
            .field("requested", &self.requested)
            .field("qualifier", &self.qualifier)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
