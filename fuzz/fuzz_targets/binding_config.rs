#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_wire::{Arguments, BindingConfiguration, ClassDescriptor, ClassName, ClassRegistry, Container, Instance, Object, ParameterDescriptor};
use std::sync::Arc;

struct Node(&'static str);

impl Object for Node {
    fn class_name(&self) -> ClassName {
        ClassName::from(self.0)
    }
}

fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.describe_only(ClassDescriptor::interface("fz::Port"));
    registry.register_with(ClassDescriptor::concrete("fz::A"), |_| Ok(Arc::new(Node("fz::A")) as Instance));
    registry.register_with(
        ClassDescriptor::concrete("fz::B").param(ParameterDescriptor::dependency("port", "fz::Port")),
        |_| Ok(Arc::new(Node("fz::B")) as Instance),
    );
    registry
}

// Arbitrary configuration must resolve or fail cleanly, never panic or hang.
fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(bindings) = BindingConfiguration::from_json(json) else {
        return;
    };

    let container = Container::builder(registry()).bindings(bindings).max_depth(16).build();
    for class in ["fz::Port", "fz::A", "fz::B"] {
        let _ = container.get_instance_of_class(class, Arguments::new());
        let _ = container.get_named(class, Some("x"), Arguments::new());
    }
});
