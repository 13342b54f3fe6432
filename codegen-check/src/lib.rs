//! Builds the factories that `ferrous-wire` renders for a small machine shop.
//!
//! The build script compiles [`catalog::ROOTS`] and writes the rendered
//! module to `OUT_DIR`; [`generated`] includes it, so the generated source is
//! type-checked with every build and its `register` function can be used
//! like any hand-written factory set.

pub mod catalog;
pub mod shop;

/// Factories rendered by the build script.
pub mod generated {
    use crate::shop;

    include!(concat!(env!("OUT_DIR"), "/shop_factories.rs"));
}

use ferrous_wire::ClassRegistry;

use shop::*;

/// The shop's descriptors with their constructors.
pub fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    for descriptor in catalog::descriptors() {
        let class = descriptor.name.clone();
        match class.as_str() {
            catalog::STEEL_GEAR => registry.register::<SteelGear>(descriptor),
            catalog::WIDGET => registry.register::<Widget>(descriptor),
            catalog::GEAR_PROVIDER => registry.register::<GearProvider>(descriptor),
            catalog::DASHBOARD => registry.register::<Dashboard>(descriptor),
            catalog::CALCULATOR => registry.register::<Calculator>(descriptor),
            catalog::DOUBLER => registry.register::<Doubler>(descriptor),
            catalog::BUMPER => registry.register::<Bumper>(descriptor),
            catalog::GUARD => registry.register::<Guard>(descriptor),
            catalog::ENGINE => registry.register::<Engine>(descriptor),
            catalog::CAR => registry.register::<Car>(descriptor),
            catalog::SUNDIAL => registry.register::<Sundial>(descriptor),
            _ => registry.describe_only(descriptor),
        };
    }
    registry
}
