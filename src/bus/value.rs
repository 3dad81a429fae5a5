//! Typed property values and the property codec.
//!
//! # Responsibilities
//! - Represent one bus property value as a tagged union
//! - Decode a property bag against a list of field specs
//! - Encode decoded fields back into a bag
//!
//! # Design Decisions
//! - Backend data is best-effort input: unknown keys are dropped,
//!   missing keys read as zero values, wrong-typed keys are logged and skipped
//! - Kind checks go through one exhaustive match on the value

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property name → value.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// Interface name → property bag for one object.
pub type InterfaceMap = BTreeMap<String, PropertyBag>;

/// Object path → interfaces, as returned by `GetManagedObjects`.
pub type ManagedObjects = BTreeMap<String, InterfaceMap>;

/// One typed value carried over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
    Byte(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Double(f64),
    StrList(Vec<String>),
}

/// Discriminant of [`PropertyValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Str,
    Bool,
    Byte,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Double,
    StrList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Str => "s",
            ValueKind::Bool => "b",
            ValueKind::Byte => "y",
            ValueKind::I16 => "n",
            ValueKind::U16 => "q",
            ValueKind::I32 => "i",
            ValueKind::U32 => "u",
            ValueKind::I64 => "x",
            ValueKind::U64 => "t",
            ValueKind::Double => "d",
            ValueKind::StrList => "as",
        };
        f.write_str(name)
    }
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Str(_) => ValueKind::Str,
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Byte(_) => ValueKind::Byte,
            PropertyValue::I16(_) => ValueKind::I16,
            PropertyValue::U16(_) => ValueKind::U16,
            PropertyValue::I32(_) => ValueKind::I32,
            PropertyValue::U32(_) => ValueKind::U32,
            PropertyValue::I64(_) => ValueKind::I64,
            PropertyValue::U64(_) => ValueKind::U64,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::StrList(_) => ValueKind::StrList,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric kind widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Byte(v) => Some(f64::from(*v)),
            PropertyValue::I16(v) => Some(f64::from(*v)),
            PropertyValue::U16(v) => Some(f64::from(*v)),
            PropertyValue::I32(v) => Some(f64::from(*v)),
            PropertyValue::U32(v) => Some(f64::from(*v)),
            PropertyValue::I64(v) => Some(*v as f64),
            PropertyValue::U64(v) => Some(*v as f64),
            PropertyValue::Double(v) => Some(*v),
            PropertyValue::Str(_) | PropertyValue::Bool(_) | PropertyValue::StrList(_) => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        PropertyValue::Byte(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::U32(v)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        PropertyValue::U64(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::I64(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::StrList(v)
    }
}

/// Names one property to pull out of a bag and the kind it must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ValueKind,
}

/// Shorthand for building field spec tables.
pub const fn field(name: &'static str, kind: ValueKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Result of [`decode`]: only fields that were present with the declared kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedProperties {
    values: BTreeMap<&'static str, PropertyValue>,
}

impl DecodedProperties {
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn string(&self, name: &str) -> String {
        self.get(name)
            .and_then(PropertyValue::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name).and_then(PropertyValue::as_bool).unwrap_or(false)
    }

    pub fn byte(&self, name: &str) -> u8 {
        match self.get(name) {
            Some(PropertyValue::Byte(v)) => *v,
            _ => 0,
        }
    }

    pub fn u32(&self, name: &str) -> u32 {
        self.get(name).and_then(PropertyValue::as_u32).unwrap_or(0)
    }

    pub fn u64(&self, name: &str) -> u64 {
        match self.get(name) {
            Some(PropertyValue::U64(v)) => *v,
            _ => 0,
        }
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(PropertyValue::StrList(v)) => v.clone(),
            _ => Vec::new(),
        }
    }
}

/// Decode `bag` against `specs`.
pub fn decode(bag: &PropertyBag, specs: &[FieldSpec]) -> DecodedProperties {
    let mut decoded = DecodedProperties::default();
    for spec in specs {
        let Some(value) = bag.get(spec.name) else {
            continue;
        };
        if value.kind() == spec.kind {
            decoded.values.insert(spec.name, value.clone());
        } else {
            tracing::warn!(
                property = spec.name,
                expected = %spec.kind,
                actual = %value.kind(),
                "Ignoring property with unexpected type"
            );
        }
    }
    decoded
}

/// Encode decoded fields back into a property bag.
pub fn encode(decoded: &DecodedProperties) -> PropertyBag {
    decoded
        .values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}
