//! Renders the shop's compiled factories into `$OUT_DIR/shop_factories.rs`.

use std::sync::Arc;
use std::{env, fs, path::Path};

use ferrous_wire::{BindingConfiguration, ClassName, ClassRegistry, DiError, FactoryCompiler};

#[allow(dead_code)]
#[path = "src/catalog.rs"]
mod catalog;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/catalog.rs");

    // Plans only need descriptors; nothing is constructed here
    let mut metadata = ClassRegistry::new();
    for descriptor in catalog::descriptors() {
        if descriptor.kind.is_instantiable() {
            let class = descriptor.name.clone();
            metadata.register_with(descriptor, move |_| {
                Err(DiError::construction(class.clone(), "not constructed by the build script"))
            });
        } else {
            metadata.describe_only(descriptor);
        }
    }

    let mut compiler = FactoryCompiler::new(Arc::new(metadata), BindingConfiguration::default());
    for root in catalog::ROOTS {
        if let Err(e) = compiler.compile(&ClassName::from(*root)) {
            panic!("cannot compile {root}: {e}");
        }
    }
    let source = match compiler.finish().render() {
        Ok(source) => source,
        Err(e) => panic!("cannot render the shop module: {e}"),
    };

    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| panic!("OUT_DIR is not set"));
    let dest = Path::new(&out_dir).join("shop_factories.rs");
    if let Err(e) = fs::write(&dest, source) {
        panic!("cannot write {}: {e}", dest.display());
    }
}
