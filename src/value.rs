//! Dynamic values flowing through constructor, method and aspect calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DiError, DiResult};
use crate::object::{downcast, Instance, Object};

/// A literal or an injected instance.
///
/// Constructor parameters, method arguments, aspect arguments and method
/// results are all passed as `Value`s. Literal variants can be read from
/// binding configuration files; `Object` carries a resolved instance.
///
/// Objects compare by identity, never structurally.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::Value;
///
/// let v = Value::from(42);
/// assert_eq!(v.as_int(), Some(42));
/// assert!(Value::Null.is_null());
/// assert_eq!(Value::from("abc").as_str(), Some("abc"));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Instance),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Take the instance out of an `Object` value.
    ///
    /// Fails with [`DiError::TypeMismatch`] for any other variant.
    pub fn into_instance(self) -> DiResult<Instance> {
        match self {
            Value::Object(instance) => Ok(instance),
            other => Err(DiError::TypeMismatch {
                expected: "object".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    /// Downcast an `Object` value to its concrete type.
    ///
    /// Lazy proxies are resolved first, so a lazily injected dependency can
    /// be downcast like any other.
    pub fn downcast<T: Object>(&self) -> DiResult<Arc<T>> {
        match self {
            Value::Object(instance) => downcast::<T>(instance),
            other => Err(DiError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    /// Short variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Object(instance) => write!(f, "Object({})", instance.class_name()),
        }
    }
}

/// Address of an instance; stable for as long as the instance is alive.
pub(crate) fn instance_id(instance: &Instance) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            // Objects take part in cache keys by identity
            Value::Object(instance) => {
                let mut out = serializer.serialize_map(Some(2))?;
                out.serialize_entry("$object", instance.class_name().as_str())?;
                out.serialize_entry("$id", &instance_id(instance))?;
                out.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Named argument overrides.
///
/// Used for constructor parameter overrides, inline overrides on a
/// dependency, aspect arguments and method-call arguments. Later layers win
/// when maps are merged.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Arguments, Value};
///
/// let base = Arguments::new().with("host", "localhost").with("port", 80);
/// let merged = base.merged(&Arguments::new().with("port", 8080));
///
/// assert_eq!(merged.get("host"), Some(&Value::from("localhost")));
/// assert_eq!(merged.get("port"), Some(&Value::from(8080)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Arguments(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Presence check; a `Null` entry counts as present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy of `self` with every entry of `other` layered on top.
    pub fn merged(&self, other: &Arguments) -> Arguments {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    pub fn extend(&mut self, other: &Arguments) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Stable serialization used in singleton cache keys.
    ///
    /// Names are sorted and every value carries its variant, so `Null`, a
    /// NaN float, a literal map and an object argument never collide.
    /// Objects are identified by address; see [`Arguments::objects`].
    pub fn fingerprint(&self) -> DiResult<String> {
        let tagged: BTreeMap<&str, Tagged<'_>> = self.0.iter().map(|(k, v)| (k.as_str(), Tagged(v))).collect();
        Ok(serde_json::to_string(&tagged)?)
    }

    /// Every object argument, nested ones included.
    pub fn objects(&self) -> Vec<Instance> {
        let mut out = Vec::new();
        for value in self.0.values() {
            collect_objects(value, &mut out);
        }
        out
    }
}

fn collect_objects(value: &Value, out: &mut Vec<Instance>) {
    match value {
        Value::Object(instance) => out.push(instance.clone()),
        Value::List(items) => items.iter().for_each(|v| collect_objects(v, out)),
        Value::Map(map) => map.values().for_each(|v| collect_objects(v, out)),
        _ => {}
    }
}

/// Variant-tagged form of a value for fingerprints.
struct Tagged<'a>(&'a Value);

impl Serialize for Tagged<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const NAME: &str = "Value";
        match self.0 {
            Value::Null => serializer.serialize_unit_variant(NAME, 0, "null"),
            Value::Bool(b) => serializer.serialize_newtype_variant(NAME, 1, "bool", b),
            Value::Int(i) => serializer.serialize_newtype_variant(NAME, 2, "int", i),
            // Bit pattern: NaN has no JSON number
            Value::Float(x) => serializer.serialize_newtype_variant(NAME, 3, "float", &x.to_bits()),
            Value::String(s) => serializer.serialize_newtype_variant(NAME, 4, "string", s),
            Value::List(items) => {
                let items: Vec<Tagged<'_>> = items.iter().map(Tagged).collect();
                serializer.serialize_newtype_variant(NAME, 5, "list", &items)
            }
            Value::Map(map) => {
                let map: BTreeMap<&str, Tagged<'_>> = map.iter().map(|(k, v)| (k.as_str(), Tagged(v))).collect();
                serializer.serialize_newtype_variant(NAME, 6, "map", &map)
            }
            Value::Object(instance) => {
                let identity = (instance.class_name().as_str().to_string(), instance_id(instance));
                serializer.serialize_newtype_variant(NAME, 7, "object", &identity)
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Arguments(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Arguments {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Arguments> for Value {
    fn from(args: Arguments) -> Self {
        Value::Map(args.0)
    }
}
