//! Rendering compiled units to Rust source.

mod common;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use common::*;
use ferrous_wire::compiler::emit::{render_unit, GENERATED_HEADER};
use ferrous_wire::{ClassDescriptor, ClassName, Container, DiError, FactoryCompiler, Overrides};

fn rendered(container: &Container, roots: &[&str]) -> String {
    let mut compiler = FactoryCompiler::for_container(container);
    for root in roots {
        compiler.compile(&ClassName::from(*root)).unwrap();
    }
    compiler.finish().render().unwrap()
}

#[test]
fn module_layout() {
    let container = Container::new(registry());
    let source = rendered(&container, &[WIDGET]);

    assert!(source.starts_with(GENERATED_HEADER));
    for item in [
        "pub struct WidgetFactory;",
        "pub struct GearFactory;",
        "pub struct SteelGearFactory;",
        "pub fn register(registry: &::ferrous_wire::CompiledFactoryRegistry)",
        "registry.register(::std::sync::Arc::new(WidgetFactory));",
    ] {
        assert!(source.contains(item), "missing `{item}`");
    }
    // Nothing cached
    assert!(!source.contains("store_singleton"));
}

#[test]
fn alias_and_provider_bodies() {
    let container = Container::builder(registry())
        .bind(BRASS_GEAR, Overrides::new().with_provider(GEAR_PROVIDER))
        .build();
    let source = rendered(&container, &[GEAR, BRASS_GEAR]);

    assert!(source.contains("ctx.build_bound"));
    assert!(source.contains("ctx.provide"));
    assert!(source.contains("pub struct GearProviderFactory;"));
}

#[test]
fn singleton_uses_the_container_cache() {
    let container = Container::builder(registry())
        .bind(STEEL_GEAR, Overrides::new().singleton(true))
        .build();
    let source = rendered(&container, &[STEEL_GEAR]);
    assert!(source.contains("ctx.store_singleton"));
    // Generated modules hold no state of their own
    assert!(!source.contains("static "));
}

#[test]
fn properties_render_a_proxy() {
    let container = Container::new(registry());
    let source = rendered(&container, &[DASHBOARD]);
    assert!(source.contains("pub struct DashboardProxy;"));
    assert!(source.contains("pub fn inject("));
}

#[test]
fn lazy_targets_render_a_lazy_proxy() {
    let container = Container::new(engine_registry(Arc::new(AtomicUsize::new(0))));
    let source = rendered(&container, &[CAR]);
    assert!(source.contains("pub struct EngineLazyProxy;"));
    assert!(source.contains("EngineLazyProxy::create"));
}

#[test]
fn methods_render_wrappers() {
    let container = Container::new(registry());
    let source = rendered(&container, &[CALCULATOR]);
    for wrapper in ["call_add", "call_doubled", "call_bumped", "call_guarded", "call_gear_teeth"] {
        assert!(source.contains(wrapper), "missing `{wrapper}`");
    }
    // Private and magic methods are not reachable through the container
    assert!(!source.contains("call_secret"));
    assert!(!source.contains("call___call"));
}

#[test]
fn single_unit() {
    let container = Container::new(registry());
    let mut compiler = FactoryCompiler::for_container(&container);
    let units = compiler.compile(&ClassName::from(STEEL_GEAR)).unwrap();
    let source = render_unit(&units[0]).unwrap();
    assert!(source.contains("pub struct SteelGearFactory;"));
    assert!(!source.contains("pub fn register"));
}

#[test]
fn clashing_short_names() {
    let mut metadata = registry();
    metadata.register::<SteelGear>(ClassDescriptor::concrete("other::Widget"));
    let container = Container::new(metadata);

    let mut compiler = FactoryCompiler::for_container(&container);
    compiler.compile(&ClassName::from(WIDGET)).unwrap();
    compiler.compile(&ClassName::from("other::Widget")).unwrap();
    let err = compiler.finish().render().unwrap_err();
    assert!(matches!(err, DiError::Emit { .. }));
    assert!(err.to_string().contains("WidgetFactory"));
}
