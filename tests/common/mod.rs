//! Shared fixtures for the integration tests.
//!
//! A small machine shop: gears behind an interface, a widget that needs a
//! gear, a provider, a dashboard with an injectable property, a calculator
//! with aspect-decorated methods and a lazily built engine.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use ferrous_wire::{
    arg, Arguments, Aspect, AspectContext, ClassDescriptor, ClassName, ClassRegistry, Construct, DiError, DiResult,
    Instance, Interception, MethodDescriptor, Object, ParameterDescriptor, PropertyDescriptor, Provider, Value,
    Visibility,
};

pub const GEAR: &str = "app::Gear";
pub const STEEL_GEAR: &str = "app::SteelGear";
pub const BRASS_GEAR: &str = "app::BrassGear";
pub const WIDGET: &str = "app::Widget";
pub const GEAR_PROVIDER: &str = "app::GearProvider";
pub const DASHBOARD: &str = "app::Dashboard";
pub const CALCULATOR: &str = "app::Calculator";
pub const DOUBLER: &str = "app::Doubler";
pub const BUMPER: &str = "app::Bumper";
pub const GUARD: &str = "app::Guard";
pub const RECORDER: &str = "app::Recorder";
pub const ENGINE: &str = "app::Engine";
pub const CAR: &str = "app::Car";
pub const PING: &str = "app::Ping";
pub const PONG: &str = "app::Pong";

fn unknown_method(class: ClassName, method: &str) -> DiError {
    DiError::UnknownMethod {
        class,
        method: method.to_string(),
    }
}

#[derive(Debug)]
pub struct SteelGear {
    pub teeth: i64,
}

impl Object for SteelGear {
    fn class_name(&self) -> ClassName {
        ClassName::from(STEEL_GEAR)
    }

    fn invoke(&self, method: &str, _args: Vec<Value>) -> DiResult<Value> {
        match method {
            "teeth" => Ok(Value::from(self.teeth)),
            _ => Err(unknown_method(self.class_name(), method)),
        }
    }
}

impl Construct for SteelGear {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(SteelGear {
            teeth: arg(&args, 0).as_int().unwrap_or(12),
        })
    }
}

#[derive(Debug)]
pub struct BrassGear;

impl Object for BrassGear {
    fn class_name(&self) -> ClassName {
        ClassName::from(BRASS_GEAR)
    }
}

impl Construct for BrassGear {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(BrassGear)
    }
}

pub struct Widget {
    pub gear: Instance,
    pub label: String,
}

impl Object for Widget {
    fn class_name(&self) -> ClassName {
        ClassName::from(WIDGET)
    }
}

impl Construct for Widget {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(Widget {
            gear: arg(&args, 0).into_instance()?,
            label: arg(&args, 1).as_str().unwrap_or_default().to_string(),
        })
    }
}

/// Hands out steel gears with a configurable tooth count.
pub struct GearProvider {
    teeth: i64,
}

impl Object for GearProvider {
    fn class_name(&self) -> ClassName {
        ClassName::from(GEAR_PROVIDER)
    }

    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}

impl Construct for GearProvider {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(GearProvider {
            teeth: arg(&args, 0).as_int().unwrap_or(99),
        })
    }
}

impl Provider for GearProvider {
    fn get(&self) -> DiResult<Instance> {
        Ok(Arc::new(SteelGear { teeth: self.teeth }))
    }
}

/// Receives its gear through property injection.
#[derive(Default)]
pub struct Dashboard {
    pub gear: OnceCell<Instance>,
}

impl Object for Dashboard {
    fn class_name(&self) -> ClassName {
        ClassName::from(DASHBOARD)
    }

    fn inject_property(&self, name: &str, value: Value) -> DiResult<()> {
        match name {
            "gear" => {
                let _ = self.gear.set(value.into_instance()?);
                Ok(())
            }
            _ => Err(DiError::construction(DASHBOARD, format!("no property `{name}`"))),
        }
    }
}

impl Construct for Dashboard {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Dashboard::default())
    }
}

/// Every arithmetic method adds `a` and `b`; aspects make them differ.
pub struct Calculator;

impl Object for Calculator {
    fn class_name(&self) -> ClassName {
        ClassName::from(CALCULATOR)
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> DiResult<Value> {
        match method {
            "add" | "doubled" | "bumped" | "guarded" | "recorded" | "secret" | "__call" => {
                let a = arg(&args, 0).as_int().unwrap_or(0);
                let b = arg(&args, 1).as_int().unwrap_or(0);
                Ok(Value::from(a + b))
            }
            "gear_teeth" => {
                let gear = arg(&args, 0).into_instance()?;
                gear.invoke("teeth", Vec::new())
            }
            _ => Err(unknown_method(self.class_name(), method)),
        }
    }
}

impl Construct for Calculator {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Calculator)
    }
}

/// Doubles integer results.
pub struct Doubler;

impl Object for Doubler {
    fn class_name(&self) -> ClassName {
        ClassName::from(DOUBLER)
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        Some(self)
    }
}

impl Construct for Doubler {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Doubler)
    }
}

impl Aspect for Doubler {
    fn after(&self, _ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
        Ok(Value::from(result.as_int().unwrap_or(0) * 2))
    }
}

/// Adds the declared `by` argument to parameter `a`.
pub struct Bumper;

impl Object for Bumper {
    fn class_name(&self) -> ClassName {
        ClassName::from(BUMPER)
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        Some(self)
    }
}

impl Construct for Bumper {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Bumper)
    }
}

impl Aspect for Bumper {
    fn before(&self, ctx: &AspectContext<'_>, mut params: Arguments) -> DiResult<Arguments> {
        let by = ctx.args.get("by").and_then(Value::as_int).unwrap_or(1);
        let a = params.get("a").and_then(Value::as_int).unwrap_or(0);
        params.insert("a", a + by);
        Ok(params)
    }
}

/// Refuses calls with `a == 0`.
pub struct Guard;

impl Object for Guard {
    fn class_name(&self) -> ClassName {
        ClassName::from(GUARD)
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        Some(self)
    }
}

impl Construct for Guard {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Guard)
    }
}

impl Aspect for Guard {
    fn intercept(&self, _ctx: &AspectContext<'_>, params: &Arguments, _prior: &Value) -> DiResult<Interception> {
        match params.get("a").and_then(Value::as_int) {
            Some(0) => Ok(Interception::Return(Value::from(-1))),
            _ => Ok(Interception::Proceed),
        }
    }
}

pub type Log = Arc<Mutex<Vec<String>>>;

/// Appends `<kind>:<label>` to a shared log for every hook.
pub struct Recorder {
    log: Log,
}

impl Object for Recorder {
    fn class_name(&self) -> ClassName {
        ClassName::from(RECORDER)
    }

    fn as_aspect(&self) -> Option<&dyn Aspect> {
        Some(self)
    }
}

impl Recorder {
    fn record(&self, kind: &str, ctx: &AspectContext<'_>) {
        let label = ctx.args.get("label").and_then(Value::as_str).unwrap_or("?");
        self.log.lock().push(format!("{kind}:{label}"));
    }
}

impl Aspect for Recorder {
    fn before(&self, ctx: &AspectContext<'_>, params: Arguments) -> DiResult<Arguments> {
        self.record("before", ctx);
        Ok(params)
    }

    fn intercept(&self, ctx: &AspectContext<'_>, _params: &Arguments, _prior: &Value) -> DiResult<Interception> {
        self.record("intercept", ctx);
        Ok(Interception::Proceed)
    }

    fn after(&self, ctx: &AspectContext<'_>, result: Value) -> DiResult<Value> {
        self.record("after", ctx);
        Ok(result)
    }
}

pub struct Engine {
    pub serial: usize,
}

impl Object for Engine {
    fn class_name(&self) -> ClassName {
        ClassName::from(ENGINE)
    }

    fn invoke(&self, method: &str, _args: Vec<Value>) -> DiResult<Value> {
        match method {
            "serial" => Ok(Value::from(self.serial as i64)),
            _ => Err(unknown_method(self.class_name(), method)),
        }
    }
}

pub struct Car {
    pub engine: Instance,
}

impl Object for Car {
    fn class_name(&self) -> ClassName {
        ClassName::from(CAR)
    }
}

impl Construct for Car {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(Car {
            engine: arg(&args, 0).into_instance()?,
        })
    }
}

/// Never constructed: resolution fails on the cycle first.
pub struct Unreachable(pub &'static str);

impl Object for Unreachable {
    fn class_name(&self) -> ClassName {
        ClassName::from(self.0)
    }
}

fn label(value: &str) -> Arguments {
    Arguments::new().with("label", value)
}

/// Registry with every fixture class except the engine pair.
pub fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .describe_only(
            ClassDescriptor::interface(GEAR)
                .implemented_by(STEEL_GEAR)
                .implemented_by_named("brass", BRASS_GEAR),
        )
        .register::<SteelGear>(
            ClassDescriptor::concrete(STEEL_GEAR).param(ParameterDescriptor::scalar("teeth").with_default(12)),
        )
        .register::<BrassGear>(ClassDescriptor::concrete(BRASS_GEAR))
        .register::<Widget>(
            ClassDescriptor::concrete(WIDGET)
                .param(ParameterDescriptor::dependency("gear", GEAR))
                .param(ParameterDescriptor::scalar("label").with_default("plain")),
        )
        .register::<GearProvider>(
            ClassDescriptor::concrete(GEAR_PROVIDER).param(ParameterDescriptor::scalar("teeth").with_default(99)),
        )
        .register::<Dashboard>(ClassDescriptor::concrete(DASHBOARD).property(PropertyDescriptor::inject("gear", GEAR)))
        .register::<Calculator>(
            ClassDescriptor::concrete(CALCULATOR)
                .method(arithmetic("add"))
                .method(arithmetic("doubled").after(DOUBLER, Arguments::new()))
                .method(arithmetic("bumped").before(BUMPER, Arguments::new().with("by", 10)))
                .method(
                    arithmetic("guarded")
                        .intercept(GUARD, Arguments::new())
                        .after(DOUBLER, Arguments::new()),
                )
                .method(arithmetic("secret").visibility(Visibility::Private))
                .method(arithmetic("__call"))
                .method(
                    MethodDescriptor::public("gear_teeth")
                        .injectable()
                        .param(ParameterDescriptor::dependency("gear", GEAR)),
                ),
        )
        .register::<Doubler>(ClassDescriptor::concrete(DOUBLER))
        .register::<Bumper>(ClassDescriptor::concrete(BUMPER))
        .register::<Guard>(ClassDescriptor::concrete(GUARD))
        .register_with(
            ClassDescriptor::concrete(PING).param(ParameterDescriptor::dependency("pong", PONG)),
            |_| Ok(Arc::new(Unreachable(PING)) as Instance),
        )
        .register_with(
            ClassDescriptor::concrete(PONG).param(ParameterDescriptor::dependency("ping", PING)),
            |_| Ok(Arc::new(Unreachable(PONG)) as Instance),
        );
    registry
}

/// [`registry`] plus a recorder aspect writing to `log` and a calculator
/// method decorated with every aspect kind.
pub fn recording_registry(log: Log) -> ClassRegistry {
    let mut registry = registry();
    let calculator = ClassDescriptor::concrete(CALCULATOR).method(
        arithmetic("recorded")
            .after(RECORDER, label("a1"))
            .before(RECORDER, label("b1"))
            .intercept(RECORDER, label("i1"))
            .before(RECORDER, label("b2"))
            .after(RECORDER, label("a2")),
    );
    registry
        .register::<Calculator>(calculator)
        .register_with(ClassDescriptor::concrete(RECORDER), move |_| {
            Ok(Arc::new(Recorder { log: log.clone() }) as Instance)
        });
    registry
}

/// Car depending on a lazily built engine; `built` counts engine
/// constructions.
pub fn engine_registry(built: Arc<AtomicUsize>) -> ClassRegistry {
    let mut registry = registry();
    registry
        .register_with(ClassDescriptor::concrete(ENGINE).lazy(), move |_| {
            let serial = built.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Arc::new(Engine { serial }) as Instance)
        })
        .register::<Car>(ClassDescriptor::concrete(CAR).param(ParameterDescriptor::dependency("engine", ENGINE)));
    registry
}

fn arithmetic(name: &str) -> MethodDescriptor {
    MethodDescriptor::public(name)
        .param(ParameterDescriptor::scalar("a"))
        .param(ParameterDescriptor::scalar("b").with_default(0))
}

/// Teeth of a gear instance, looking through lazy proxies.
pub fn teeth(gear: &Instance) -> i64 {
    gear.invoke("teeth", Vec::new())
        .ok()
        .and_then(|v| v.as_int())
        .unwrap_or(-1)
}
