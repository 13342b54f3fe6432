//! Binding configuration and container options.
//!
//! The binding configuration is the caller-owned override table consulted
//! before any descriptor-driven default. Records can be written in code
//! (including bound instances) or loaded from JSON.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::object::Instance;
use crate::value::{Arguments, Value};

/// Default upper bound on nested resolutions in one call tree.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Per-class override record.
///
/// Every field is optional; an empty record means "no overrides". The
/// lifecycle flags are tri-state: `None` defers to the class's markers.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::Overrides;
///
/// let record = Overrides::new()
///     .with_class("app::SteelGear")
///     .with_param("teeth", 12)
///     .singleton(true)
///     .named("fast", "app::TurboGear");
///
/// assert_eq!(record.class.as_ref().unwrap(), "app::SteelGear");
/// assert_eq!(record.singleton, Some(true));
/// assert_eq!(record.service, None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Pre-built instance returned as is
    pub instance: Option<Instance>,
    /// Implementing class
    pub class: Option<ClassName>,
    /// Constructor parameter overrides
    pub params: Arguments,
    pub singleton: Option<bool>,
    pub service: Option<bool>,
    /// Qualifier-specific implementing classes
    pub named: BTreeMap<String, ClassName>,
    /// Provider class whose `get()` supplies the instance
    pub provider: Option<ClassName>,
    /// Qualifier-specific providers
    pub named_providers: BTreeMap<String, ClassName>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn with_class(mut self, class: impl Into<ClassName>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn with_params(mut self, params: Arguments) -> Self {
        self.params.extend(&params);
        self
    }

    pub fn singleton(mut self, on: bool) -> Self {
        self.singleton = Some(on);
        self
    }

    pub fn service(mut self, on: bool) -> Self {
        self.service = Some(on);
        self
    }

    pub fn named(mut self, qualifier: impl Into<String>, class: impl Into<ClassName>) -> Self {
        self.named.insert(qualifier.into(), class.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<ClassName>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn named_provider(mut self, qualifier: impl Into<String>, provider: impl Into<ClassName>) -> Self {
        self.named_providers.insert(qualifier.into(), provider.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.instance.is_none()
            && self.class.is_none()
            && self.params.is_empty()
            && self.singleton.is_none()
            && self.service.is_none()
            && self.named.is_empty()
            && self.provider.is_none()
            && self.named_providers.is_empty()
    }

    pub fn provider_for(&self, qualifier: Option<&str>) -> Option<&ClassName> {
        match qualifier {
            Some(q) => self.named_providers.get(q),
            None => self.provider.as_ref(),
        }
    }

    pub fn class_for(&self, qualifier: Option<&str>) -> Option<&ClassName> {
        match qualifier {
            Some(q) => self.named.get(q),
            None => self.class.as_ref(),
        }
    }
}

/// Serializable part of an [`Overrides`] record.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OverridesSpec {
    class: Option<ClassName>,
    params: Arguments,
    singleton: Option<bool>,
    service: Option<bool>,
    named: BTreeMap<String, ClassName>,
    provider: Option<ClassName>,
    named_providers: BTreeMap<String, ClassName>,
}

impl From<OverridesSpec> for Overrides {
    fn from(spec: OverridesSpec) -> Self {
        Overrides {
            instance: None,
            class: spec.class,
            params: spec.params,
            singleton: spec.singleton,
            service: spec.service,
            named: spec.named,
            provider: spec.provider,
            named_providers: spec.named_providers,
        }
    }
}

/// Class → override table.
///
/// Writes are not validated; a bad record surfaces as an error on the next
/// resolution that reads it.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{BindingConfiguration, ClassName};
///
/// let config = BindingConfiguration::from_json(r#"{
///     "app::Gear": { "class": "app::SteelGear", "singleton": true },
///     "app::SteelGear": { "params": { "teeth": 12 } }
/// }"#).unwrap();
///
/// let gear = config.overrides_for(&ClassName::from("app::Gear"));
/// assert_eq!(gear.class.unwrap(), "app::SteelGear");
/// assert_eq!(gear.singleton, Some(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BindingConfiguration {
    records: HashMap<ClassName, Overrides>,
}

impl BindingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object mapping class names to override records.
    pub fn from_json(json: &str) -> DiResult<Self> {
        let specs: HashMap<ClassName, OverridesSpec> =
            serde_json::from_str(json).map_err(|e| DiError::Configuration(e.to_string()))?;
        Ok(Self {
            records: specs.into_iter().map(|(k, v)| (k, v.into())).collect(),
        })
    }

    /// Copy of the record for `class`; empty if none was set.
    pub fn overrides_for(&self, class: &ClassName) -> Overrides {
        self.records.get(class).cloned().unwrap_or_default()
    }

    pub fn get(&self, class: &ClassName) -> Option<&Overrides> {
        self.records.get(class)
    }

    /// Replace the record for `class`.
    pub fn set_overrides_for(&mut self, class: impl Into<ClassName>, overrides: Overrides) {
        self.records.insert(class.into(), overrides);
    }

    /// Edit the record for `class` in place, creating it if needed.
    pub fn update(&mut self, class: impl Into<ClassName>, f: impl FnOnce(&mut Overrides)) {
        f(self.records.entry(class.into()).or_default());
    }

    pub fn remove(&mut self, class: &ClassName) -> Option<Overrides> {
        self.records.remove(class)
    }

    /// Layer another configuration on top; records of `other` replace ours.
    pub fn merge(&mut self, other: BindingConfiguration) {
        self.records.extend(other.records);
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassName> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Container-wide tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Nested resolutions allowed in one call tree before `DepthExceeded`
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
