//! Semantic argument types.
//!
//! An [`ArgType`] describes the *shape* of a command parameter. It is resolved
//! to a parser once, when the schema is built, so parsing never has to inspect
//! types at run time.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The declared type of a command argument.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArgType {
    /// Boolean flag.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// Text.
    String,
    /// A domain type parsed by a parser registered under this name.
    Custom(Arc<str>),
    /// A closed set of named variants.
    Enum(EnumType),
    /// A value that may be omitted (binds to nil).
    Optional(Box<ArgType>),
    /// Ordered collection written as `[a,b,c]`.
    List(Box<ArgType>),
    /// Dictionary written as `{k:v,k2:v2}`.
    Map(Box<ArgType>, Box<ArgType>),
}

/// Description of an enum argument type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumType {
    /// Type name, used in messages.
    pub name: Arc<str>,
    /// Variant names in ordinal order.
    pub variants: Arc<[Arc<str>]>,
}

impl EnumType {
    /// Creates an enum type from a name and its variants.
    #[must_use]
    pub fn new<I, S>(name: impl Into<Arc<str>>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Finds a variant by case-insensitive name, returning its ordinal.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
    }
}

impl ArgType {
    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list(element: ArgType) -> Self {
        Self::List(Box::new(element))
    }

    /// Creates a map type with the given key and value types.
    #[must_use]
    pub fn map(key: ArgType, value: ArgType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Creates an optional type.
    #[must_use]
    pub fn optional(inner: ArgType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Creates a custom domain type.
    #[must_use]
    pub fn custom(name: impl Into<Arc<str>>) -> Self {
        Self::Custom(name.into())
    }

    /// Creates an enum type.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<Arc<str>>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::Enum(EnumType::new(name, variants))
    }

    /// Returns true if this type can be omitted (binds to nil).
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// The key a parser for this exact type is registered under.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Checks whether a value has the shape this type describes.
    ///
    /// Used to check declared defaults. `Custom` accepts anything, since the
    /// value a custom parser produces is up to its author. `Float` accepts
    /// integers.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Optional(_), Value::Nil) | (Self::Custom(_), _) => true,
            (Self::Optional(inner), other) => inner.accepts(other),
            (Self::Bool, Value::Bool(_))
            | (Self::Int | Self::Float, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Enum(ty), Value::Enum(v)) => v.type_name == ty.name,
            (Self::List(elem), Value::List(items)) => items.iter().all(|v| elem.accepts(v)),
            (Self::Map(k, v), Value::Map(map)) => {
                map.iter().all(|(key, val)| k.accepts(key) && v.accepts(val))
            }
            _ => false,
        }
    }

    /// Converts integers to floats wherever this type expects a float, so an
    /// accepted default has the same shape a parsed value would.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Float, Value::Int(n)) => Value::Float(n as f64),
            (Self::Optional(inner), value) if !value.is_nil() => inner.coerce(value),
            (Self::List(elem), Value::List(items)) => {
                Value::List(items.into_iter().map(|item| elem.coerce(item)).collect())
            }
            (Self::Map(k, v), Value::Map(map)) => Value::map_from(
                map.iter()
                    .map(|(key, val)| (k.coerce(key.clone()), v.coerce(val.clone()))),
            ),
            (_, value) => value,
        }
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Custom(name) => write!(f, "{name}"),
            Self::Enum(e) => write!(f, "{}", e.name),
            Self::Optional(t) => write!(f, "option<{t:?}>"),
            Self::List(t) => write!(f, "list<{t:?}>"),
            Self::Map(k, v) => write!(f, "map<{k:?}, {v:?}>"),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
