//! Types behind the shop's class names.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use ferrous_wire::{
    arg, Arguments, Aspect, AspectContext, ClassName, Construct, DiError, DiResult, Instance, Interception, Object,
    Provider, Value,
};

use crate::catalog;

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
        ClassName::from(catalog::STEEL_GEAR)
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

pub struct Widget {
    pub gear: Instance,
    pub label: String,
}

impl Object for Widget {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::WIDGET)
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

/// Hands out steel gears with its own tooth count.
pub struct GearProvider {
    teeth: i64,
}

impl Object for GearProvider {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::GEAR_PROVIDER)
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

#[derive(Default)]
pub struct Dashboard {
    pub gear: OnceCell<Instance>,
}

impl Object for Dashboard {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::DASHBOARD)
    }

    fn inject_property(&self, name: &str, value: Value) -> DiResult<()> {
        match name {
            "gear" => {
                let _ = self.gear.set(value.into_instance()?);
                Ok(())
            }
            _ => Err(DiError::construction(catalog::DASHBOARD, format!("no property `{name}`"))),
        }
    }
}

impl Construct for Dashboard {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Dashboard::default())
    }
}

/// Adds `a` and `b`, or reads the teeth of an injected gear.
pub struct Calculator;

impl Object for Calculator {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::CALCULATOR)
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> DiResult<Value> {
        match method {
            "add" | "doubled" | "bumped" | "guarded" => {
                let a = arg(&args, 0).as_int().unwrap_or(0);
                let b = arg(&args, 1).as_int().unwrap_or(0);
                Ok(Value::from(a + b))
            }
            "gear_teeth" => arg(&args, 0).into_instance()?.invoke("teeth", Vec::new()),
            _ => Err(unknown_method(self.class_name(), method)),
        }
    }
}

impl Construct for Calculator {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Calculator)
    }
}

pub struct Doubler;

impl Object for Doubler {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::DOUBLER)
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

/// Adds the declared `by` to parameter `a`.
pub struct Bumper;

impl Object for Bumper {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::BUMPER)
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

/// Answers `-1` without calling through when `a == 0`.
pub struct Guard;

impl Object for Guard {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::GUARD)
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

pub struct Engine;

impl Object for Engine {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::ENGINE)
    }
}

impl Construct for Engine {
    fn construct(_args: Vec<Value>) -> DiResult<Self> {
        Ok(Engine)
    }
}

pub struct Car {
    pub engine: Instance,
}

impl Object for Car {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::CAR)
    }
}

impl Construct for Car {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(Car {
            engine: arg(&args, 0).into_instance()?,
        })
    }
}

/// Tells the time from whatever clock it was given.
pub struct Sundial {
    pub clock: Value,
}

impl Object for Sundial {
    fn class_name(&self) -> ClassName {
        ClassName::from(catalog::SUNDIAL)
    }
}

impl Construct for Sundial {
    fn construct(args: Vec<Value>) -> DiResult<Self> {
        Ok(Sundial { clock: arg(&args, 0) })
    }
}
