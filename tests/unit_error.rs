/// Display text and classification of DiError
use std::error::Error;

use ferrous_wire::{ClassName, DiError, DiResult};

fn class(name: &str) -> ClassName {
    ClassName::from(name)
}

#[test]
fn test_error_display_unknown_class() {
    let error = DiError::UnknownClass(class("app::Missing"));
    assert_eq!(error.to_string(), "Unknown class: app::Missing");
}

#[test]
fn test_error_display_injection_loop() {
    let error = DiError::InjectionLoop(vec![class("app::A"), class("app::B"), class("app::A")]);
    assert_eq!(error.to_string(), "Injection loop detected: app::A -> app::B -> app::A");
    assert!(error.is_cycle());
}

#[test]
fn test_error_display_depth() {
    let error = DiError::DepthExceeded(64);
    assert_eq!(error.to_string(), "Max depth 64 exceeded");
    assert!(error.is_cycle());
}

#[test]
fn test_error_display_not_instantiable() {
    let error = DiError::NotInstantiable {
        class: class("app::Store"),
        kind: "interface",
    };
    assert_eq!(error.to_string(), "Cannot instantiate interface app::Store");
    assert!(!error.is_cycle());
}

#[test]
fn test_error_display_not_injectable() {
    let error = DiError::NotInjectable {
        class: class("app::Widget"),
        method: "constructor".into(),
        parameter: "label".into(),
    };
    assert_eq!(
        error.to_string(),
        "Parameter `label` of app::Widget::constructor is not injectable"
    );
}

#[test]
fn test_error_display_methods() {
    let magic = DiError::MagicMethod {
        class: class("app::Calc"),
        method: "__call".into(),
    };
    assert_eq!(magic.to_string(), "Refusing to call magic method app::Calc::__call");

    let hidden = DiError::MethodNotAccessible {
        class: class("app::Calc"),
        method: "secret".into(),
    };
    assert!(hidden.to_string().contains("not a public instance method"));
}

#[test]
fn test_error_display_provider_and_aspect() {
    let provider = DiError::NotAProvider {
        class: class("app::Gear"),
        provider: class("app::Brass"),
    };
    assert_eq!(
        provider.to_string(),
        "app::Brass is bound as provider for app::Gear but does not implement Provider"
    );

    let aspect = DiError::NotAnAspect(class("app::Brass"));
    assert_eq!(
        aspect.to_string(),
        "app::Brass is declared as an aspect but does not implement Aspect"
    );
}

#[test]
fn test_error_display_qualifier() {
    let error = DiError::UnresolvedQualifier {
        class: class("app::Gear"),
        qualifier: "gold".into(),
    };
    assert_eq!(error.to_string(), "No binding named `gold` for app::Gear");
}

#[test]
fn test_construction_helper() {
    let error = DiError::construction("app::Engine", "no fuel");
    assert_eq!(error.to_string(), "app::Engine: no fuel");
    assert_eq!(
        error,
        DiError::Construction {
            class: class("app::Engine"),
            message: "no fuel".into(),
        }
    );
}

#[test]
fn test_serde_errors_convert() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
    let error: DiError = parse.unwrap_err().into();
    assert!(matches!(error, DiError::Serialization(_)));
    assert!(error.to_string().starts_with("Failed to serialize arguments"));
}

#[test]
fn test_error_trait() {
    let error = DiError::Configuration("bad".into());
    assert!(error.source().is_none());

    let boxed: Box<dyn Error> = Box::new(error.clone());
    assert_eq!(boxed.to_string(), "Invalid binding configuration: bad");
}

#[test]
fn test_result_alias() {
    fn fails() -> DiResult<u8> {
        Err(DiError::DepthExceeded(1))
    }
    fn succeeds() -> DiResult<u8> {
        Ok(7)
    }
    assert_eq!(succeeds().unwrap(), 7);
    assert!(fails().is_err());
}
