//! Error types for the resolver and the factory compiler.

use thiserror::Error;

use crate::key::ClassName;

/// Dependency injection errors
///
/// Every failure aborts the current top-level resolution (or compilation)
/// call. The only condition that is ever downgraded is a dependency the
/// compiler cannot resolve ahead of time; see
/// [`FactoryCompiler`](crate::compiler::FactoryCompiler).
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{ClassName, DiError};
///
/// let path = vec![ClassName::from("app::A"), ClassName::from("app::B"), ClassName::from("app::A")];
/// let err = DiError::InjectionLoop(path);
/// assert_eq!(err.to_string(), "Injection loop detected: app::A -> app::B -> app::A");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiError {
    /// The metadata provider knows nothing about the class
    #[error("Unknown class: {0}")]
    UnknownClass(ClassName),

    /// A type appeared twice on the active resolution stack
    #[error("Injection loop detected: {}", join_path(.0))]
    InjectionLoop(Vec<ClassName>),

    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// The final resolved type is abstract or an interface
    #[error("Cannot instantiate {kind} {class}")]
    NotInstantiable { class: ClassName, kind: &'static str },

    /// Parameter with no override, no resolvable type and no default
    #[error("Parameter `{parameter}` of {class}::{method} is not injectable")]
    NotInjectable {
        class: ClassName,
        method: String,
        parameter: String,
    },

    /// Method does not exist on the class
    #[error("Method {class}::{method} does not exist")]
    UnknownMethod { class: ClassName, method: String },

    /// Magic or constructor-like method names cannot be called through the container
    #[error("Refusing to call magic method {class}::{method}")]
    MagicMethod { class: ClassName, method: String },

    /// Method exists but is static or not public
    #[error("Method {class}::{method} is not a public instance method")]
    MethodNotAccessible { class: ClassName, method: String },

    /// Injectable property that cannot be written from outside the class
    #[error("Property {class}::{property} is marked injectable but is not publicly writable")]
    PrivateProperty { class: ClassName, property: String },

    /// Provider binding whose instance lacks the provider capability
    #[error("{provider} is bound as provider for {class} but does not implement Provider")]
    NotAProvider { class: ClassName, provider: ClassName },

    /// Aspect declaration whose instance lacks the aspect capability
    #[error("{0} is declared as an aspect but does not implement Aspect")]
    NotAnAspect(ClassName),

    /// Qualified request with no named binding and no usable fallback
    #[error("No binding named `{qualifier}` for {class}")]
    UnresolvedQualifier { class: ClassName, qualifier: String },

    /// Descriptor refers to something the provider cannot supply
    #[error("Missing metadata for {class}: {detail}")]
    MissingMetadata { class: ClassName, detail: String },

    /// Constructor, accessor, provider or method body reported a failure
    #[error("{class}: {message}")]
    Construction { class: ClassName, message: String },

    /// Downcast to a concrete type failed
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Binding configuration could not be parsed
    #[error("Invalid binding configuration: {0}")]
    Configuration(String),

    /// Argument map could not be serialized into a cache key
    #[error("Failed to serialize arguments: {0}")]
    Serialization(String),

    /// Source emission failed for a compiled unit
    #[error("Cannot emit factory for {class}: {detail}")]
    Emit { class: ClassName, detail: String },
}

impl DiError {
    /// Convenience constructor for failures raised inside user objects.
    pub fn construction(class: impl Into<ClassName>, message: impl Into<String>) -> Self {
        DiError::Construction {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Whether this is a cycle error; the compiler never downgrades these.
    pub fn is_cycle(&self) -> bool {
        matches!(self, DiError::InjectionLoop(_) | DiError::DepthExceeded(_))
    }
}

impl From<serde_json::Error> for DiError {
    fn from(err: serde_json::Error) -> Self {
        DiError::Serialization(err.to_string())
    }
}

fn join_path(path: &[ClassName]) -> String {
    path.iter().map(ClassName::as_str).collect::<Vec<_>>().join(" -> ")
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
