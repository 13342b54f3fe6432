//! Lazy dependencies.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use ferrous_wire::{
    downcast, downcast_ref, resolve_lazy, Arguments, ClassDescriptor, Container, DiError, Instance, LazyProxy,
    Overrides,
};

fn setup() -> (Container, Arc<AtomicUsize>) {
    let built = Arc::new(AtomicUsize::new(0));
    (Container::new(engine_registry(built.clone())), built)
}

fn serial(engine: &Instance) -> i64 {
    engine.invoke("serial", Vec::new()).unwrap().as_int().unwrap()
}

#[test]
fn dependent_receives_a_proxy() {
    let (container, built) = setup();
    let car = container.get::<Car>(CAR).unwrap();

    let proxy = downcast_ref::<LazyProxy>(&car.engine).expect("lazy proxy");
    assert!(!proxy.is_resolved());
    assert_eq!(proxy.requested(), ENGINE);
    assert_eq!(car.engine.class_name(), ENGINE);
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn first_use_builds_once() {
    let (container, built) = setup();
    let car = container.get::<Car>(CAR).unwrap();

    assert_eq!(serial(&car.engine), 1);
    assert_eq!(serial(&car.engine), 1);
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let proxy = downcast_ref::<LazyProxy>(&car.engine).unwrap();
    assert!(proxy.is_resolved());
}

#[test]
fn downcast_looks_through_the_proxy() {
    let (container, _) = setup();
    let car = container.get::<Car>(CAR).unwrap();
    let engine = downcast::<Engine>(&car.engine).unwrap();
    assert_eq!(engine.serial, 1);

    let target = resolve_lazy(&car.engine).unwrap();
    assert!(Arc::ptr_eq(&target, &(engine as Instance)));
}

#[test]
fn transient_targets_are_per_proxy() {
    let (container, built) = setup();
    let first = container.get::<Car>(CAR).unwrap();
    let second = container.get::<Car>(CAR).unwrap();

    assert_eq!(serial(&first.engine), 1);
    assert_eq!(serial(&second.engine), 2);
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn singleton_targets_are_shared() {
    let (container, built) = setup();
    container.set_overrides_for(ENGINE, Overrides::new().singleton(true));

    let first = container.get::<Car>(CAR).unwrap();
    let second = container.get::<Car>(CAR).unwrap();
    let a = resolve_lazy(&first.engine).unwrap();
    let b = resolve_lazy(&second.engine).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn direct_resolution_is_not_lazy() {
    let (container, built) = setup();
    let engine = container.get_instance_of_class(ENGINE, Arguments::new()).unwrap();
    assert!(downcast_ref::<Engine>(&engine).is_some());
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn lazy_marker_on_the_bound_class() {
    let built = Arc::new(AtomicUsize::new(0));
    let mut metadata = engine_registry(built.clone());
    metadata.describe_only(ClassDescriptor::interface("app::Motor").implemented_by(ENGINE));
    metadata.register::<Car>(
        ClassDescriptor::concrete(CAR).param(ferrous_wire::ParameterDescriptor::dependency("engine", "app::Motor")),
    );
    let container = Container::new(metadata);

    let car = container.get::<Car>(CAR).unwrap();
    let proxy = downcast_ref::<LazyProxy>(&car.engine).expect("lazy proxy");
    // The proxy stands in for the requested type
    assert_eq!(proxy.requested(), "app::Motor");
    assert_eq!(serial(&car.engine), 1);
}

#[test]
fn proxy_outliving_its_container() {
    let (container, built) = setup();
    let car = container.get::<Car>(CAR).unwrap();
    drop(container);

    let err = car.engine.invoke("serial", Vec::new()).unwrap_err();
    assert!(matches!(err, DiError::Construction { ref class, .. } if class == ENGINE));
    assert_eq!(built.load(Ordering::SeqCst), 0);
}
