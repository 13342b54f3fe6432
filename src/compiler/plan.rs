//! Executable factory plans.
//!
//! A plan is the compiled form of one class: every binding, scope and
//! parameter decision the resolver would make at run time, taken once
//! against a metadata snapshot and a binding configuration snapshot.
//! Bound instances are the exception; they are checked when the factory
//! runs so late `bind_instance` calls keep working.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::descriptors::AspectDeclaration;
use crate::key::ClassName;
use crate::lifetime::Lifetime;
use crate::metadata::{ConstructorFn, StaticMethodFn};
use crate::value::{Arguments, Value};

/// What a unit does once the bound-instance check has passed.
#[derive(Debug, Clone)]
pub enum UnitBody {
    /// The class is bound to another class, which is resolved with the
    /// requested class's configured params merged under the caller's
    Alias { target: ClassName, params: Arguments },
    /// The class is produced by a provider
    Provider { provider: ClassName },
    /// The class builds itself
    Build(BuildPlan),
    /// The class could not be planned; resolution happens reflectively
    Reflective,
}

impl UnitBody {
    pub fn kind(&self) -> &'static str {
        match self {
            UnitBody::Alias { .. } => "alias",
            UnitBody::Provider { .. } => "provider",
            UnitBody::Build(_) => "build",
            UnitBody::Reflective => "reflective",
        }
    }
}

/// Construction of a class that builds itself.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub lifetime: Lifetime,
    /// Configured params of the class, merged under incoming arguments
    pub params: Arguments,
    /// Method reported in `NotInjectable`: `constructor` or the accessor
    pub method: String,
    pub constructor: Vec<ParamPlan>,
    pub instantiation: Instantiation,
}

/// How the instance itself is obtained.
#[derive(Clone)]
pub enum Instantiation {
    Constructor(ConstructorFn),
    /// Self-managed class created through a public static accessor
    Accessor { name: String, handle: StaticMethodFn },
}

impl fmt::Debug for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instantiation::Constructor(_) => f.write_str("Constructor"),
            Instantiation::Accessor { name, .. } => f.debug_struct("Accessor").field("name", name).finish(),
        }
    }
}

/// One parameter, used only when the effective arguments lack its name.
#[derive(Debug, Clone)]
pub struct ParamPlan {
    pub name: String,
    pub source: ParamSource,
}

#[derive(Debug, Clone)]
pub enum ParamSource {
    Dependency(DependencyPlan),
    /// Resolved through the container when the factory runs, with the
    /// resolver's own fallback to `default`. Used when the dependency could
    /// not be planned ahead of time, so the same error surfaces at run time.
    Deferred {
        requested: ClassName,
        qualifier: Option<String>,
        inline: Arguments,
        default: Option<Value>,
    },
    Literal(Value),
    /// No default and nothing to inject: the caller must supply it.
    /// Configured params also land here since they are always present.
    Required,
}

/// A dependency with its binding already selected.
#[derive(Debug, Clone)]
pub struct DependencyPlan {
    /// Declared type of the parameter or property
    pub requested: ClassName,
    pub inline: Arguments,
    pub route: Route,
}

#[derive(Debug, Clone)]
pub enum Route {
    /// Plain resolution of `requested` through its own unit
    Unit,
    /// Inject a lazy proxy for `requested`
    Lazy { qualifier: Option<String> },
    /// A qualified binding picked at compile time
    Named {
        qualifier: String,
        target: Target,
        /// Configured params of `requested`
        params: Arguments,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Provider(ClassName),
    Class(ClassName),
}

impl Target {
    pub fn class(&self) -> &ClassName {
        match self {
            Target::Provider(c) | Target::Class(c) => c,
        }
    }
}

/// Post-construction property injection.
#[derive(Debug, Clone, Default)]
pub struct ProxyPlan {
    pub properties: Vec<PropertyPlan>,
}

#[derive(Debug, Clone)]
pub struct PropertyPlan {
    pub name: String,
    pub source: PropertySource,
}

#[derive(Debug, Clone)]
pub enum PropertySource {
    Dependency(DependencyPlan),
    /// Resolved through the container when the proxy runs
    Deferred,
    /// Fails with `PrivateProperty` when the proxy runs
    Private,
}

/// Wrapper of one public instance method.
#[derive(Debug, Clone)]
pub struct MethodPlan {
    pub name: String,
    pub params: Vec<ParamPlan>,
    pub aspects: Vec<AspectDeclaration>,
}

impl MethodPlan {
    /// Positional arguments in declaration order; missing names become `Null`.
    pub fn positional(&self, named: &Arguments) -> Vec<Value> {
        self.params
            .iter()
            .map(|p| named.get(&p.name).cloned().unwrap_or_default())
            .collect()
    }
}

/// Relation between two compiled classes, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Binding,
    Provider,
    Dependency,
    Lazy,
    Aspect,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Binding => "binding",
            EdgeKind::Provider => "provider",
            EdgeKind::Dependency => "dependency",
            EdgeKind::Lazy => "lazy",
            EdgeKind::Aspect => "aspect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub to: ClassName,
    pub kind: EdgeKind,
    /// Parameter, property or method the edge comes from
    pub label: String,
}

pub(crate) fn dependency_edges(plan: &DependencyPlan, label: &str, out: &mut Vec<Edge>) {
    let edge = |to: &ClassName, kind| Edge {
        to: to.clone(),
        kind,
        label: label.to_string(),
    };
    match &plan.route {
        Route::Unit => out.push(edge(&plan.requested, EdgeKind::Dependency)),
        Route::Lazy { .. } => out.push(edge(&plan.requested, EdgeKind::Lazy)),
        Route::Named { target, .. } => {
            let kind = match target {
                Target::Provider(_) => EdgeKind::Provider,
                Target::Class(_) => EdgeKind::Dependency,
            };
            out.push(edge(target.class(), kind));
        }
    }
}

pub(crate) fn param_edges(params: &[ParamPlan], label_prefix: &str, out: &mut Vec<Edge>) {
    for param in params {
        let label = format!("{label_prefix}{}", param.name);
        match &param.source {
            ParamSource::Dependency(plan) => dependency_edges(plan, &label, out),
            ParamSource::Deferred { requested, .. } => out.push(Edge {
                to: requested.clone(),
                kind: EdgeKind::Dependency,
                label,
            }),
            ParamSource::Literal(_) | ParamSource::Required => {}
        }
    }
}

/// Methods keyed by name; `BTreeMap` keeps emission order stable.
pub type MethodPlans = BTreeMap<String, MethodPlan>;
