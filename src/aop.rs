//! Method interception: before, intercept and after aspects.
//!
//! Aspects are ordinary injectable classes that expose the [`Aspect`]
//! capability. Methods declare them in their descriptor; the container
//! resolves each declared aspect and runs it around the method call.
//!
//! Order of a call with aspects:
//!
//! 1. intercept aspects, in declaration order; the first one returning
//!    [`Interception::Return`] ends the call with that value
//! 2. before aspects, in declaration order, each receiving the parameters
//!    produced by the previous one
//! 3. the method body
//! 4. after aspects, in declaration order, each receiving the previous result

use std::time::Instant;

use tracing::{debug, trace};

use crate::descriptors::{AspectDeclaration, AspectKind, MethodDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::object::Instance;
use crate::value::{Arguments, Value};

/// Join point handed to every aspect call.
#[derive(Debug, Clone)]
pub struct AspectContext<'a> {
    /// Literal arguments from the aspect declaration
    pub args: &'a Arguments,
    /// Class of the intercepted instance
    pub class: &'a ClassName,
    /// Intercepted method
    pub method: &'a str,
}

/// Decision of an intercept aspect.
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Continue with the next intercept, the befores and the method body
    Proceed,
    /// Skip everything else and return this value
    Return(Value),
}

/// Aspect capability.
///
/// All hooks default to pass-through, so an aspect implements only the
/// kinds it is declared for.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Arguments, Aspect, AspectContext, DiResult, Value};
///
/// struct Doubler;
///
/// impl Aspect for Doubler {
///     fn after(&self, _ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
///         Ok(Value::from(result.as_int().unwrap_or(0) * 2))
///     }
/// }
///
/// let args = Arguments::new();
/// let class = "app::Calc".into();
/// let ctx = AspectContext { args: &args, class: &class, method: "sum" };
/// assert_eq!(Doubler.after(&ctx, Value::from(21)).unwrap(), Value::from(42));
/// ```
pub trait Aspect: Send + Sync {
    /// Rewrite the parameters before the call.
    fn before(&self, ctx: &AspectContext<'_>, params: Arguments) -> DiResult<Arguments> {
        let _ = ctx;
        Ok(params)
    }

    /// Decide whether the call proceeds. `prior` is `Null` unless an
    /// earlier hook produced a result.
    fn intercept(&self, ctx: &AspectContext<'_>, params: &Arguments, prior: &Value) -> DiResult<Interception> {
        let _ = (ctx, params, prior);
        Ok(Interception::Proceed)
    }

    /// Rewrite the result after the call.
    fn after(&self, ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
        let _ = ctx;
        Ok(result)
    }
}

/// Runs the aspects declared on one method around a call.
///
/// Aspect instances are obtained through `resolve`, which the container
/// backs with its normal resolution (compiled factories first).
pub struct AspectRunner<'a, R> {
    class: &'a ClassName,
    method: &'a str,
    aspects: &'a [AspectDeclaration],
    resolve: R,
}

impl<'a, R> AspectRunner<'a, R>
where
    R: FnMut(&ClassName) -> DiResult<Instance>,
{
    pub fn new(class: &'a ClassName, method: &'a str, aspects: &'a [AspectDeclaration], resolve: R) -> Self {
        Self {
            class,
            method,
            aspects,
            resolve,
        }
    }

    pub fn for_method(class: &'a ClassName, method: &'a MethodDescriptor, resolve: R) -> Self {
        Self::new(class, &method.name, &method.aspects, resolve)
    }

    /// Run the full chain around `call`.
    pub fn run<F>(mut self, params: Arguments, call: F) -> DiResult<Value>
    where
        F: FnOnce(Arguments) -> DiResult<Value>,
    {
        if self.aspects.is_empty() {
            return call(params);
        }

        if let Some(value) = self.intercept(&params, &Value::Null)? {
            debug!(class = %self.class, method = self.method, "call short-circuited by intercept aspect");
            return Ok(value);
        }
        let params = self.before(params)?;
        let result = call(params)?;
        self.after(result)
    }

    /// Intercept step on its own; `Some` means short-circuit.
    pub fn intercept(&mut self, params: &Arguments, prior: &Value) -> DiResult<Option<Value>> {
        for declaration in self.declared(AspectKind::Intercept) {
            let aspect = (self.resolve)(&declaration.aspect)?;
            let ctx = self.context(declaration);
            match with_aspect(&aspect, &declaration.aspect, |a| a.intercept(&ctx, params, prior))? {
                Interception::Proceed => continue,
                Interception::Return(value) => return Ok(Some(value)),
            }
        }
        Ok(None)
    }

    /// Before step on its own.
    pub fn before(&mut self, mut params: Arguments) -> DiResult<Arguments> {
        for declaration in self.declared(AspectKind::Before) {
            let aspect = (self.resolve)(&declaration.aspect)?;
            let ctx = self.context(declaration);
            let started = Instant::now();
            params = with_aspect(&aspect, &declaration.aspect, |a| a.before(&ctx, params))?;
            trace!(aspect = %declaration.aspect, elapsed = ?started.elapsed(), "before aspect ran");
        }
        Ok(params)
    }

    /// After step on its own.
    pub fn after(&mut self, mut result: Value) -> DiResult<Value> {
        for declaration in self.declared(AspectKind::After) {
            let aspect = (self.resolve)(&declaration.aspect)?;
            let ctx = self.context(declaration);
            result = with_aspect(&aspect, &declaration.aspect, |a| a.after(&ctx, result))?;
        }
        Ok(result)
    }

    fn declared(&self, kind: AspectKind) -> impl Iterator<Item = &'a AspectDeclaration> {
        self.aspects.iter().filter(move |d| d.kind == kind)
    }

    fn context(&self, declaration: &'a AspectDeclaration) -> AspectContext<'a> {
        AspectContext {
            args: &declaration.args,
            class: self.class,
            method: self.method,
        }
    }
}

/// Call `f` with the aspect capability of `instance`.
pub fn with_aspect<T>(
    instance: &Instance,
    class: &ClassName,
    f: impl FnOnce(&dyn Aspect) -> DiResult<T>,
) -> DiResult<T> {
    let aspect = instance
        .as_aspect()
        .ok_or_else(|| DiError::NotAnAspect(class.clone()))?;
    f(aspect)
}

/// Logs every intercepted call through `tracing`.
///
/// Declare it as a `before` and/or `after` aspect. The optional `label`
/// aspect argument is included in each event.
#[derive(Debug, Default)]
pub struct TracingAspect;

impl TracingAspect {
    pub const CLASS: &'static str = "ferrous_wire::TracingAspect";

    /// Descriptor for registering the aspect with a class registry.
    pub fn descriptor() -> crate::ClassDescriptor {
        crate::ClassDescriptor::concrete(Self::CLASS)
    }
}

impl crate::object::Object for TracingAspect {
    fn class_name(&self) -> ClassName {
        ClassName::from(Self::CLASS)
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        Some(self)
    }
}

impl crate::object::Construct for TracingAspect {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(TracingAspect)
    }
}

impl Aspect for TracingAspect {
    fn before(&self, ctx: &AspectContext<'_>, params: Arguments) -> DiResult<Arguments> {
        let label = ctx.args.get("label").and_then(Value::as_str).unwrap_or("");
        debug!(class = %ctx.class, method = ctx.method, label, params = params.len(), "calling");
        Ok(params)
    }

    fn after(&self, ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
        let label = ctx.args.get("label").and_then(Value::as_str).unwrap_or("");
        debug!(class = %ctx.class, method = ctx.method, label, result = result.kind(), "returned");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Appends its `tag` argument to the `trail` parameter.
    struct Tagger {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Object for Tagger {
        fn class_name(&self) -> ClassName {
            ClassName::from("test::Tagger")
        }

        fn as_aspect(&self) -> Option<&dyn Aspect> {
            Some(self)
        }
    }

    impl Aspect for Tagger {
        fn before(&self, ctx: &AspectContext<'_>, mut params: Arguments) -> DiResult<Arguments> {
            let tag = ctx.args.get("tag").and_then(Value::as_str).unwrap_or("?").to_string();
            let trail = params.get("trail").and_then(Value::as_str).unwrap_or("").to_string();
            params.insert("trail", format!("{trail}{tag}"));
            self.log.lock().push(format!("before:{tag}"));
            Ok(params)
        }

        fn intercept(&self, ctx: &AspectContext<'_>, _params: &Arguments, _prior: &Value) -> DiResult<Interception> {
            let tag = ctx.args.get("tag").and_then(Value::as_str).unwrap_or("?").to_string();
            self.log.lock().push(format!("intercept:{tag}"));
            if ctx.args.get("skip").and_then(Value::as_bool).unwrap_or(false) {
                Ok(Interception::Return(Value::from("cached")))
            } else {
                Ok(Interception::Proceed)
            }
        }

        fn after(&self, ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
            let tag = ctx.args.get("tag").and_then(Value::as_str).unwrap_or("?").to_string();
            self.log.lock().push(format!("after:{tag}"));
            Ok(Value::from(format!("{}+{tag}", result.as_str().unwrap_or(""))))
        }
    }

    struct NotAspect;

    impl Object for NotAspect {
        fn class_name(&self) -> ClassName {
            ClassName::from("test::NotAspect")
        }
    }

    fn tag(t: &str) -> Arguments {
        Arguments::new().with("tag", t)
    }

    #[test]
    fn befores_chain_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tagger: Instance = Arc::new(Tagger { log: log.clone() });
        let method = MethodDescriptor::public("run")
            .before("test::Tagger", tag("X"))
            .before("test::Tagger", tag("Y"))
            .after("test::Tagger", tag("Z"));
        let class = ClassName::from("test::Svc");

        let result = AspectRunner::for_method(&class, &method, |_| Ok(tagger.clone()))
            .run(Arguments::new(), |params| Ok(params.get("trail").cloned().unwrap_or_default()))
            .unwrap();

        assert_eq!(result, Value::from("XY+Z"));
        assert_eq!(*log.lock(), vec!["before:X", "before:Y", "after:Z"]);
    }

    #[test]
    fn intercept_short_circuits_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tagger: Instance = Arc::new(Tagger { log: log.clone() });
        let method = MethodDescriptor::public("run")
            .before("test::Tagger", tag("B"))
            .intercept("test::Tagger", tag("I1").with("skip", true))
            .intercept("test::Tagger", tag("I2"))
            .after("test::Tagger", tag("A"));
        let class = ClassName::from("test::Svc");
        let mut body_ran = false;

        let result = AspectRunner::for_method(&class, &method, |_| Ok(tagger.clone()))
            .run(Arguments::new(), |_| {
                body_ran = true;
                Ok(Value::Null)
            })
            .unwrap();

        assert_eq!(result, Value::from("cached"));
        assert!(!body_ran);
        assert_eq!(*log.lock(), vec!["intercept:I1"]);
    }

    #[test]
    fn non_aspect_is_rejected() {
        let method = MethodDescriptor::public("run").after("test::NotAspect", Arguments::new());
        let class = ClassName::from("test::Svc");
        let err = AspectRunner::for_method(&class, &method, |_| Ok(Arc::new(NotAspect) as Instance))
            .run(Arguments::new(), |_| Ok(Value::Null))
            .unwrap_err();
        assert_eq!(err, DiError::NotAnAspect(ClassName::from("test::NotAspect")));
    }
}
