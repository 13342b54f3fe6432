//! Method calls through the container and their aspects.

mod common;

use std::sync::Arc;

use common::*;
use ferrous_wire::{
    Arguments, ClassDescriptor, ClassName, Container, DiError, Instance, MethodDescriptor, ParameterDescriptor,
    TracingAspect, Value,
};

fn calculator(container: &Container) -> Instance {
    container.get_instance_of_class(CALCULATOR, Arguments::new()).unwrap()
}

fn call(container: &Container, method: &str, args: Arguments) -> Result<Value, DiError> {
    container.call_method_on_object(&calculator(container), method, args)
}

fn ab(a: i64, b: i64) -> Arguments {
    Arguments::new().with("a", a).with("b", b)
}

#[test]
fn plain_method() {
    let container = Container::new(registry());
    assert_eq!(call(&container, "add", ab(2, 3)).unwrap(), Value::from(5));
}

#[test]
fn defaults_fill_missing_parameters() {
    let container = Container::new(registry());
    let result = call(&container, "add", Arguments::new().with("a", 4)).unwrap();
    assert_eq!(result, Value::from(4));
}

#[test]
fn missing_parameter_is_not_injectable() {
    let container = Container::new(registry());
    let err = call(&container, "add", Arguments::new()).unwrap_err();
    assert_eq!(
        err,
        DiError::NotInjectable {
            class: ClassName::from(CALCULATOR),
            method: "add".into(),
            parameter: "a".into(),
        }
    );
}

#[test]
fn after_aspect_rewrites_the_result() {
    let container = Container::new(registry());
    assert_eq!(call(&container, "doubled", ab(2, 3)).unwrap(), Value::from(10));
}

#[test]
fn before_aspect_rewrites_parameters() {
    let container = Container::new(registry());
    // by = 10 from the declaration
    assert_eq!(call(&container, "bumped", ab(1, 2)).unwrap(), Value::from(13));
}

#[test]
fn intercept_short_circuits() {
    let container = Container::new(registry());
    // Neither the body nor the after aspect runs
    assert_eq!(call(&container, "guarded", ab(0, 5)).unwrap(), Value::from(-1));
    assert_eq!(call(&container, "guarded", ab(2, 1)).unwrap(), Value::from(6));
}

#[test]
fn aspect_order() {
    let log = Log::default();
    let container = Container::new(recording_registry(log.clone()));

    let result = call(&container, "recorded", ab(1, 1)).unwrap();
    assert_eq!(result, Value::from(2));
    assert_eq!(
        *log.lock(),
        vec!["intercept:i1", "before:b1", "before:b2", "after:a1", "after:a2"]
    );
}

#[test]
fn method_dependencies_are_injected() {
    let container = Container::new(registry());
    let teeth = call(&container, "gear_teeth", Arguments::new()).unwrap();
    assert_eq!(teeth, Value::from(12));

    let pinned: Instance = Arc::new(SteelGear { teeth: 5 });
    let teeth = call(&container, "gear_teeth", Arguments::new().with("gear", pinned)).unwrap();
    assert_eq!(teeth, Value::from(5));
}

#[test]
fn non_injectable_method_does_not_resolve_types() {
    let mut metadata = registry();
    metadata.register::<Calculator>(
        ClassDescriptor::concrete(CALCULATOR).method(
            MethodDescriptor::public("gear_teeth").param(ParameterDescriptor::dependency("gear", GEAR)),
        ),
    );
    let container = Container::new(metadata);
    let err = call(&container, "gear_teeth", Arguments::new()).unwrap_err();
    assert!(matches!(err, DiError::NotInjectable { ref parameter, .. } if parameter == "gear"));
}

#[test]
fn magic_methods_are_refused() {
    let container = Container::new(registry());
    for method in ["__call", "new", "drop"] {
        let err = call(&container, method, ab(1, 1)).unwrap_err();
        assert_eq!(
            err,
            DiError::MagicMethod {
                class: ClassName::from(CALCULATOR),
                method: method.into(),
            }
        );
    }
}

#[test]
fn private_methods_are_refused() {
    let container = Container::new(registry());
    let err = call(&container, "secret", ab(1, 1)).unwrap_err();
    assert_eq!(
        err,
        DiError::MethodNotAccessible {
            class: ClassName::from(CALCULATOR),
            method: "secret".into(),
        }
    );
}

#[test]
fn static_methods_are_refused() {
    let mut metadata = registry();
    metadata.register::<Calculator>(
        ClassDescriptor::concrete(CALCULATOR).method(MethodDescriptor::public("add").static_method()),
    );
    let container = Container::new(metadata);
    let err = call(&container, "add", ab(1, 1)).unwrap_err();
    assert!(matches!(err, DiError::MethodNotAccessible { .. }));
}

#[test]
fn unknown_method() {
    let container = Container::new(registry());
    let err = call(&container, "subtract", ab(1, 1)).unwrap_err();
    assert_eq!(
        err,
        DiError::UnknownMethod {
            class: ClassName::from(CALCULATOR),
            method: "subtract".into(),
        }
    );
}

#[test]
fn aspect_without_capability() {
    let mut metadata = registry();
    metadata.register::<Calculator>(
        ClassDescriptor::concrete(CALCULATOR).method(
            MethodDescriptor::public("add")
                .param(ParameterDescriptor::scalar("a"))
                .after(BRASS_GEAR, Arguments::new()),
        ),
    );
    let container = Container::new(metadata);
    let err = call(&container, "add", Arguments::new().with("a", 1)).unwrap_err();
    assert_eq!(err, DiError::NotAnAspect(ClassName::from(BRASS_GEAR)));
}

#[test]
fn singleton_aspects_are_shared() {
    let mut metadata = registry();
    metadata.register::<TracingAspect>(TracingAspect::descriptor().singleton());
    metadata.register::<Calculator>(
        ClassDescriptor::concrete(CALCULATOR).method(
            MethodDescriptor::public("add")
                .param(ParameterDescriptor::scalar("a"))
                .param(ParameterDescriptor::scalar("b"))
                .before(TracingAspect::CLASS, Arguments::new().with("label", "sum"))
                .after(TracingAspect::CLASS, Arguments::new()),
        ),
    );
    let container = Container::new(metadata);

    assert_eq!(call(&container, "add", ab(20, 22)).unwrap(), Value::from(42));
    assert_eq!(call(&container, "add", ab(1, 2)).unwrap(), Value::from(3));
    // Calculator transient, tracing aspect cached once
    assert_eq!(container.cached_instances(), (1, 0));
}

#[test]
fn calls_go_through_lazy_proxies() {
    let mut metadata = registry();
    metadata.register::<Calculator>(
        ClassDescriptor::concrete(CALCULATOR)
            .lazy()
            .method(MethodDescriptor::public("add").param(ParameterDescriptor::scalar("a"))),
    );
    metadata.register_with(
        ClassDescriptor::concrete("app::Desk").param(ParameterDescriptor::dependency("calc", CALCULATOR)),
        |args| Ok(ferrous_wire::arg(&args, 0).into_instance()?),
    );
    let container = Container::new(metadata);

    // The desk hands back its (lazy) calculator
    let proxy = container.get_instance_of_class("app::Desk", Arguments::new()).unwrap();
    assert!(ferrous_wire::downcast_ref::<ferrous_wire::LazyProxy>(&proxy).is_some());

    let result = container
        .call_method_on_object(&proxy, "add", Arguments::new().with("a", 9))
        .unwrap();
    assert_eq!(result, Value::from(9));
}
