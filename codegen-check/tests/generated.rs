//! Generated factories behave like reflective and plan-based resolution.

use std::sync::Arc;

use ferrous_wire::{
    downcast_ref, resolve_lazy, Arguments, ClassName, Container, DiError, FactoryCompiler, Instance, LazyProxy, Value,
};
use ferrous_wire_codegen_check::catalog::*;
use ferrous_wire_codegen_check::shop::{Car, Dashboard, Sundial, Widget};
use ferrous_wire_codegen_check::{generated, registry};

/// The same shop resolved reflectively, through plans compiled at run time
/// and through the generated module.
fn containers() -> Vec<(&'static str, Container)> {
    let reflective = Container::new(registry());

    let planned = Container::new(registry());
    let mut compiler = FactoryCompiler::for_container(&planned);
    for root in ROOTS {
        compiler.compile(&ClassName::from(*root)).unwrap();
    }
    compiler.finish().register(planned.compiled());

    let generated = Container::new(registry());
    generated::register(generated.compiled());

    vec![("reflective", reflective), ("planned", planned), ("generated", generated)]
}

fn generated_only() -> Container {
    let container = Container::new(registry());
    generated::register(container.compiled());
    container
}

fn teeth(gear: &Instance) -> i64 {
    gear.invoke("teeth", Vec::new()).unwrap().as_int().unwrap()
}

#[test]
fn module_registers_the_planned_units() {
    let all = containers();
    let planned = all[1].1.compiled().classes();
    let generated = all[2].1.compiled().classes();
    assert_eq!(planned, generated);
    for class in [WIDGET, GEAR, STEEL_GEAR, COG, GEAR_PROVIDER, DOUBLER, BUMPER, GUARD, ENGINE, SUNDIAL] {
        assert!(generated.contains(&ClassName::from(class)), "{class} not registered");
    }
    assert!(!generated.contains(&ClassName::from(CLOCK)));
}

#[test]
fn widget_and_gear() {
    for (name, container) in containers() {
        let first = container.get::<Widget>(WIDGET).unwrap();
        let second = container.get::<Widget>(WIDGET).unwrap();
        assert_eq!(first.label, "plain", "{name}");
        assert_eq!(first.gear.class_name(), STEEL_GEAR, "{name}");
        assert_eq!(teeth(&first.gear), 12, "{name}");
        assert!(Arc::ptr_eq(&first.gear, &second.gear), "{name}");

        let labelled = container
            .get_instance_of_class(WIDGET, Arguments::new().with("label", "custom"))
            .unwrap();
        let labelled = downcast_ref::<Widget>(&labelled).unwrap();
        assert_eq!(labelled.label, "custom", "{name}");

        let other = container
            .get_instance_of_class(STEEL_GEAR, Arguments::new().with("teeth", 30))
            .unwrap();
        assert!(!Arc::ptr_eq(&other, &first.gear), "{name}");
        assert_eq!(teeth(&other), 30, "{name}");
        assert_eq!(container.cached_instances(), (2, 0), "{name}");
    }
}

#[test]
fn reflective_singleton_survives_registration() {
    let container = Container::new(registry());
    let before = container.get_instance_of_class(GEAR, Arguments::new()).unwrap();
    generated::register(container.compiled());

    let widget = container.get::<Widget>(WIDGET).unwrap();
    assert!(Arc::ptr_eq(&before, &widget.gear));
}

#[test]
fn provider() {
    for (name, container) in containers() {
        let cog = container.get_instance_of_class(COG, Arguments::new()).unwrap();
        assert_eq!(cog.class_name(), STEEL_GEAR, "{name}");
        assert_eq!(teeth(&cog), 99, "{name}");
    }
}

#[test]
fn property_injection() {
    for (name, container) in containers() {
        let dashboard = container.get::<Dashboard>(DASHBOARD).unwrap();
        let gear = dashboard.gear.get().unwrap();
        let shared = container.get_instance_of_class(STEEL_GEAR, Arguments::new()).unwrap();
        assert!(Arc::ptr_eq(gear, &shared), "{name}");
    }
}

#[test]
fn aspects() {
    let ab = |a: i64, b: i64| Arguments::new().with("a", a).with("b", b);
    for (name, container) in containers() {
        let calc = container.get_instance_of_class(CALCULATOR, Arguments::new()).unwrap();
        let call = |method: &str, args: Arguments| container.call_method_on_object(&calc, method, args);

        assert_eq!(call("add", ab(2, 3)).unwrap(), Value::from(5), "{name}");
        assert_eq!(call("doubled", ab(2, 3)).unwrap(), Value::from(10), "{name}");
        assert_eq!(call("bumped", ab(1, 2)).unwrap(), Value::from(13), "{name}");
        assert_eq!(call("guarded", ab(0, 3)).unwrap(), Value::from(-1), "{name}");
        assert_eq!(call("guarded", ab(2, 3)).unwrap(), Value::from(10), "{name}");
        assert_eq!(call("gear_teeth", Arguments::new()).unwrap(), Value::from(12), "{name}");

        let missing = call("add", Arguments::new().with("b", 1)).unwrap_err();
        assert!(matches!(missing, DiError::NotInjectable { .. }), "{name}: {missing}");
        let unknown = call("subtract", ab(1, 1)).unwrap_err();
        assert!(matches!(unknown, DiError::UnknownMethod { .. }), "{name}: {unknown}");
    }
}

#[test]
fn generated_wrappers_are_used() {
    let container = generated_only();
    let factory = container.compiled().get(&ClassName::from(CALCULATOR)).unwrap();
    for method in ["add", "doubled", "bumped", "guarded", "gear_teeth"] {
        assert!(factory.has_method(method), "no wrapper for {method}");
    }
    assert!(!factory.has_method("subtract"));
}

#[test]
fn lazy_engine() {
    for (name, container) in containers() {
        let car = container.get::<Car>(CAR).unwrap();
        assert!(downcast_ref::<LazyProxy>(&car.engine).is_some(), "{name}");
        let engine = resolve_lazy(&car.engine).unwrap();
        assert_eq!(engine.class_name(), ENGINE, "{name}");
    }
}

#[test]
fn unresolved_qualifier_is_not_swallowed() {
    for (name, container) in containers() {
        let err = container.get_instance_of_class(SUNDIAL, Arguments::new()).unwrap_err();
        assert!(matches!(err, DiError::UnresolvedQualifier { .. }), "{name}: {err}");

        let sundial = container
            .get_instance_of_class(SUNDIAL, Arguments::new().with("clock", "dusk"))
            .unwrap();
        let sundial = downcast_ref::<Sundial>(&sundial).unwrap();
        assert_eq!(sundial.clock, Value::from("dusk"), "{name}");
    }
}
