//! Scalar column values and lookup field sets.
//!
//! Every value read from or bound to the database travels as a [`Value`].
//! The set of equality constraints a caller authenticates with is a
//! [`LookupFields`] map; being a `BTreeMap`, it always iterates in sorted key
//! order, which is what keeps generated SQL text deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from column name to the value it must equal.
pub type LookupFields = BTreeMap<String, Value>;

/// A single scalar column value.
///
/// Serialized adjacently tagged (`{"type": "integer", "value": 7}`) so that
/// persisted forms stay self-describing across format changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean column.
    Bool(bool),
    /// Any integral column.
    Integer(i64),
    /// Floating point column.
    Real(f64),
    /// Character data.
    Text(String),
}

impl Value {
    /// Returns true for `NULL` and for the empty string.
    ///
    /// A key column holding an empty value does not identify anyone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns true if this is SQL `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Infers a value from operator-supplied text.
    ///
    /// `null` becomes `Null`, `true`/`false` become `Bool`, and text that a
    /// number prints back to exactly becomes that number. Everything else
    /// stays text, so `007` and `1e3` are never reinterpreted.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if let Ok(b) = raw.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>()
            && i.to_string() == raw
        {
            return Self::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>()
            && f.is_finite()
            && f.to_string() == raw
        {
            return Self::Real(f);
        }
        Self::Text(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
