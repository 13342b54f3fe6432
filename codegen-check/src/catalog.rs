//! Descriptors of the machine shop.
//!
//! Shared by the build script, which renders factories from them, and by the
//! library, which registers the real constructors. Class names are paths
//! relative to the generated module, which imports `shop`.

use ferrous_wire::{Arguments, ClassDescriptor, MethodDescriptor, ParameterDescriptor, PropertyDescriptor};

pub const GEAR: &str = "shop::Gear";
pub const STEEL_GEAR: &str = "shop::SteelGear";
pub const WIDGET: &str = "shop::Widget";
pub const COG: &str = "shop::Cog";
pub const GEAR_PROVIDER: &str = "shop::GearProvider";
pub const DASHBOARD: &str = "shop::Dashboard";
pub const CALCULATOR: &str = "shop::Calculator";
pub const DOUBLER: &str = "shop::Doubler";
pub const BUMPER: &str = "shop::Bumper";
pub const GUARD: &str = "shop::Guard";
pub const ENGINE: &str = "shop::Engine";
pub const CAR: &str = "shop::Car";
pub const CLOCK: &str = "shop::Clock";
pub const SUNDIAL: &str = "shop::Sundial";

/// Classes the build script compiles; everything else is reached from them.
pub const ROOTS: &[&str] = &[WIDGET, COG, DASHBOARD, CALCULATOR, CAR, SUNDIAL];

fn arithmetic(name: &str) -> MethodDescriptor {
    MethodDescriptor::public(name)
        .param(ParameterDescriptor::scalar("a"))
        .param(ParameterDescriptor::scalar("b").with_default(0))
}

pub fn descriptors() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::interface(GEAR).implemented_by(STEEL_GEAR),
        ClassDescriptor::concrete(STEEL_GEAR)
            .singleton()
            .param(ParameterDescriptor::scalar("teeth").with_default(12)),
        ClassDescriptor::concrete(WIDGET)
            .param(ParameterDescriptor::dependency("gear", GEAR))
            .param(ParameterDescriptor::scalar("label").with_default("plain")),
        ClassDescriptor::interface(COG).provided_by(GEAR_PROVIDER),
        ClassDescriptor::concrete(GEAR_PROVIDER).param(ParameterDescriptor::scalar("teeth").with_default(99)),
        ClassDescriptor::concrete(DASHBOARD).property(PropertyDescriptor::inject("gear", GEAR)),
        ClassDescriptor::concrete(CALCULATOR)
            .method(arithmetic("add"))
            .method(arithmetic("doubled").after(DOUBLER, Arguments::new()))
            .method(arithmetic("bumped").before(BUMPER, Arguments::new().with("by", 10)))
            .method(
                arithmetic("guarded")
                    .intercept(GUARD, Arguments::new())
                    .after(DOUBLER, Arguments::new()),
            )
            .method(
                MethodDescriptor::public("gear_teeth")
                    .injectable()
                    .param(ParameterDescriptor::dependency("gear", GEAR)),
            ),
        ClassDescriptor::concrete(DOUBLER),
        ClassDescriptor::concrete(BUMPER),
        ClassDescriptor::concrete(GUARD),
        ClassDescriptor::concrete(ENGINE).lazy(),
        ClassDescriptor::concrete(CAR).param(ParameterDescriptor::dependency("engine", ENGINE)),
        ClassDescriptor::interface(CLOCK),
        ClassDescriptor::concrete(SUNDIAL).param(
            ParameterDescriptor::dependency("clock", CLOCK)
                .named("utc")
                .with_default("noon"),
        ),
    ]
}
