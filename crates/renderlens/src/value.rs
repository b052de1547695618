//! Runtime values as the host exposes them.
//!
//! Reference values (functions, symbols, objects) carry identity through
//! their `Arc`; two structurally identical objects built separately are
//! different references.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(Arc<str>),
    Symbol(Arc<Symbol>),
    Function(Arc<Function>),
    Object(Arc<Object>),
}

#[derive(Debug)]
pub struct Symbol {
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct Function {
    pub name: Option<String>,
    /// Source text as the host would stringify it.
    pub source: String,
}

/// A heap object. Contents sit behind a lock so cyclic graphs can be tied
/// after allocation and so a read racing a host-side mutation fails softly.
pub struct Object {
    data: RwLock<ObjectData>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub fn constructor_name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::BigInt64 => "BigInt64Array",
            Self::BigUint64 => "BigUint64Array",
        }
    }
}

/// A framework element (`<Foo bar={1} />`).
#[derive(Clone)]
pub struct Element {
    pub type_name: Option<String>,
    pub key: Option<String>,
    pub props: Vec<(String, Value)>,
}

#[derive(Clone)]
pub enum ObjectData {
    /// Object whose prototype is the base object prototype.
    Plain(Vec<(String, Value)>),
    Array(Vec<Value>),
    Element(Element),
    /// Epoch milliseconds; NaN for an invalid date.
    Date(f64),
    RegExp {
        source: String,
        flags: String,
    },
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    ArrayBuffer(Vec<u8>),
    DataView(Vec<u8>),
    TypedArray {
        kind: TypedArrayKind,
        bytes: Vec<u8>,
    },
    /// Instance of a user class.
    Instance {
        constructor: Option<String>,
        fields: Vec<(String, Value)>,
    },
    /// Anything the engine cannot look inside (promises, weak maps, ...).
    Opaque {
        tag: String,
    },
}

impl Object {
    pub fn read(&self) -> Option<RwLockReadGuard<'_, ObjectData>> {
        self.data.try_read_recursive()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ObjectData> {
        self.data.write()
    }
}

impl Value {
    pub fn string(value: impl AsRef<str>) -> Self {
        Self::String(Arc::from(value.as_ref()))
    }

    pub fn symbol(description: Option<&str>) -> Self {
        Self::Symbol(Arc::new(Symbol {
            description: description.map(str::to_owned),
        }))
    }

    pub fn function(name: Option<&str>, source: impl Into<String>) -> Self {
        Self::Function(Arc::new(Function {
            name: name.map(str::to_owned),
            source: source.into(),
        }))
    }

    pub fn object(data: ObjectData) -> Self {
        Self::Object(Arc::new(Object {
            data: RwLock::new(data),
        }))
    }

    pub fn plain<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::object(ObjectData::Plain(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::object(ObjectData::Array(items.into_iter().collect()))
    }

    pub fn element<K: Into<String>>(
        type_name: Option<&str>,
        props: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Self::object(ObjectData::Element(Element {
            type_name: type_name.map(str::to_owned),
            key: None,
            props: props.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }))
    }

    /// True for functions and non-null objects: the values that can be
    /// recreated with a fresh identity on every render.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Object(_))
    }

    pub fn is_element(&self) -> bool {
        match self {
            Self::Object(object) => object
                .read()
                .is_some_and(|data| matches!(&*data, ObjectData::Element(_))),
            _ => false,
        }
    }

    /// Strict identity: primitives by value (`NaN` unequal to itself),
    /// references by pointer.
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Property lookup on plain objects, instances and element props.
    pub fn get(&self, key: &str) -> Option<Value> {
        let Self::Object(object) = self else {
            return None;
        };
        let data = object.read()?;
        let entries = match &*data {
            ObjectData::Plain(entries) => entries,
            ObjectData::Instance { fields, .. } => fields,
            ObjectData::Element(element) => &element.props,
            _ => return None,
        };
        entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Function(_) => "function",
            Self::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::fingerprint::format_value(self, 0))
    }
}

/// JavaScript `String(number)` formatting.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_format_like_the_host() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn numbers_outside_the_plain_range_use_exponents() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e30), "-2.5e+30");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn separately_built_objects_are_distinct_references() {
        let a = Value::plain([("a", Value::from(1))]);
        let b = Value::plain([("a", Value::from(1))]);
        assert!(!a.same_ref(&b));
        assert!(a.same_ref(&a.clone()));
    }

    #[test]
    fn element_detection_reads_through_the_object() {
        assert!(Value::element(Some("Foo"), [("x", Value::from(1))]).is_element());
        assert!(!Value::plain::<&str>([]).is_element());
        assert!(!Value::Null.is_element());
    }

    #[test]
    fn get_reads_plain_properties() {
        let value = Value::plain([("value", Value::from("dark"))]);
        assert!(matches!(value.get("value"), Some(Value::String(s)) if &*s == "dark"));
        assert!(value.get("missing").is_none());
    }
}
