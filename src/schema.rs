//! Schema - declared property set of a model type
//!
//! Replaces runtime type discovery: a model type states its properties and
//! their kinds once, and the kind decides the default value read before the
//! first set.
//!
//! ```
//! use bindery::{PropertyKind, Schema};
//!
//! let schema = Schema::builder()
//!     .float("Price")
//!     .integer("Qty")
//!     .float("Total")
//!     .list("Items")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.kind_of("Qty"), Some(PropertyKind::Integer));
//! assert_eq!(schema.kind_of("Missing"), None);
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{check_name, BinderyError, Result};
use crate::value::{json_type_name, PropertyValue};

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Bool,
    Integer,
    Float,
    /// Reference-like: defaults to `null`
    Text,
    /// Identity-preserving list
    List,
    /// Any JSON value, defaults to `null`
    Any,
}

impl PropertyKind {
    /// Value read before the first set (lists are materialized by the store)
    pub fn default_scalar(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Integer => Value::from(0),
            Self::Float => Value::from(0.0),
            Self::Text | Self::List | Self::Any => Value::Null,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::List => "list",
            Self::Any => "any",
        }
    }

    /// Check `value` against this kind and normalize it
    ///
    /// `null` fits every kind. Integers are widened for `Float` so that
    /// `10` and `10.0` compare equal. List handles given to non-list kinds
    /// are stored by value. NaN and infinities fit no kind.
    pub(crate) fn coerce(self, property: &str, value: PropertyValue) -> Result<PropertyValue> {
        let mismatch = |actual: &str| BinderyError::TypeMismatch {
            property: property.to_string(),
            expected: self.name().to_string(),
            actual: actual.to_string(),
        };

        match (self, value) {
            (Self::List, PropertyValue::List(list)) => Ok(PropertyValue::List(list)),
            (Self::List, PropertyValue::Scalar(v @ (Value::Array(_) | Value::Null))) => {
                Ok(PropertyValue::Scalar(v))
            }
            (Self::List, PropertyValue::Scalar(other)) => Err(mismatch(json_type_name(&other))),

            (kind, PropertyValue::List(list)) => {
                kind.coerce(property, PropertyValue::Scalar(list.to_json()))
            }

            (_, PropertyValue::NonFinite(_)) => Err(mismatch("non-finite float")),
            (_, PropertyValue::Scalar(Value::Null)) => Ok(PropertyValue::null()),
            (Self::Any, scalar) => Ok(scalar),
            (Self::Bool, PropertyValue::Scalar(v @ Value::Bool(_))) => Ok(PropertyValue::Scalar(v)),
            (Self::Text, PropertyValue::Scalar(v @ Value::String(_))) => {
                Ok(PropertyValue::Scalar(v))
            }
            (Self::Integer, PropertyValue::Scalar(Value::Number(n)))
                if n.is_i64() || n.is_u64() =>
            {
                Ok(PropertyValue::Scalar(Value::Number(n)))
            }
            (Self::Float, PropertyValue::Scalar(Value::Number(n))) => n
                .as_f64()
                .map(|f| PropertyValue::Scalar(Value::from(f)))
                .ok_or_else(|| mismatch("number")),
            (_, PropertyValue::Scalar(other)) => Err(mismatch(json_type_name(&other))),
        }
    }
}

/// Property name → kind table, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    kinds: FxHashMap<Arc<str>, PropertyKind>,
    order: Vec<Arc<str>>,
}

impl Schema {
    /// Schema with no declared properties (every name reads as `null`)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.kinds.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Shared name for `name`: the declared `Arc<str>` when present
    pub(crate) fn intern(&self, name: &str) -> Arc<str> {
        self.kinds
            .get_key_value(name)
            .map(|(key, _)| Arc::clone(key))
            .unwrap_or_else(|| Arc::from(name))
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<(String, PropertyKind)>,
}

impl SchemaBuilder {
    pub fn property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.entries.push((name.into(), kind));
        self
    }

    pub fn bool(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Bool)
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Integer)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Float)
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Text)
    }

    pub fn list(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::List)
    }

    pub fn any(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyKind::Any)
    }

    /// Validate names and freeze the schema
    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema::default();

        for (name, kind) in self.entries {
            check_name(&name)?;
            if schema.kinds.contains_key(name.as_str()) {
                return Err(BinderyError::InvalidPropertyName {
                    name,
                    reason: "declared more than once".to_string(),
                });
            }
            let name: Arc<str> = Arc::from(name);
            schema.order.push(Arc::clone(&name));
            schema.kinds.insert(name, kind);
        }

        Ok(schema)
    }
}
