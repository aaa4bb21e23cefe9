//! Value Module - dynamically typed property values
//!
//! - `PropertyValue`: scalar JSON value or shared list
//! - `ObservableList`: identity-carrying list with its own change channel

mod list;

pub use list::{ListChange, ObservableList};

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Current value of a property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Any non-list value, including `null`
    Scalar(Value),
    /// Shared list instance (list-kind properties)
    List(ObservableList),
    /// NaN or infinite float; has no JSON form and is never stored
    NonFinite(f64),
}

impl PropertyValue {
    pub fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) | Self::NonFinite(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Self::List(list) => Some(list),
            Self::Scalar(_) | Self::NonFinite(_) => None,
        }
    }

    /// JSON view of the value (lists become arrays)
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(list) => list.to_json(),
            Self::NonFinite(_) => Value::Null,
        }
    }

    /// Human-readable JSON type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::NonFinite(_) => "non-finite float",
            Self::Scalar(value) => json_type_name(value),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Default for PropertyValue {
    fn default() -> Self {
        Self::null()
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(value) => value.serialize(serializer),
            Self::List(list) => list.serialize(serializer),
            Self::NonFinite(f) => serializer.serialize_f64(*f),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<ObservableList> for PropertyValue {
    fn from(list: ObservableList) -> Self {
        Self::List(list)
    }
}

impl From<&ObservableList> for PropertyValue {
    fn from(list: &ObservableList) -> Self {
        Self::List(list.clone())
    }
}

impl From<Vec<Value>> for PropertyValue {
    fn from(items: Vec<Value>) -> Self {
        Self::Scalar(Value::Array(items))
    }
}

macro_rules! scalar_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_from!(bool, i32, i64, u32, u64, &str, String);

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Self::Scalar(Value::from(value))
        } else {
            Self::NonFinite(value)
        }
    }
}
