#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_wire::{Arguments, ClassName, ClassRegistry, Container, SingletonKey};

// Fingerprints must not depend on insertion order.
fuzz_target!(|data: &[u8]| {
    let container = Container::new(ClassRegistry::new());
    let class = ClassName::from("fz::Cached");

    let mut forward = Arguments::new();
    let mut backward = Arguments::new();
    for (i, chunk) in data.chunks(2).enumerate() {
        let value = i64::from(chunk[0]) * 256 + i64::from(*chunk.get(1).unwrap_or(&0));
        forward.insert(format!("p{i}"), value);
    }
    for (name, value) in forward.iter().collect::<Vec<_>>().into_iter().rev() {
        backward.insert(name.clone(), value.clone());
    }

    let a = SingletonKey::new(&class, &forward, container.id()).unwrap();
    let b = SingletonKey::new(&class, &backward, container.id()).unwrap();
    assert_eq!(a, b);
});
