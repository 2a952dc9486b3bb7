//! Decoding result rows into case-normalized column maps.

use std::collections::BTreeMap;

use quire_core::Value;
use serde::{Deserialize, Serialize};

use crate::database::RawRow;

/// A decoded user row keyed by lower-cased column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    /// Decodes a driver row, lower-casing every column name.
    ///
    /// If two columns collide after lower-casing, the later one wins.
    #[must_use]
    pub fn decode(raw: RawRow) -> Self {
        Self(
            raw.into_iter()
                .map(|(column, value)| (column.to_lowercase(), value))
                .collect(),
        )
    }

    /// Returns the value of `column`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(&column.to_lowercase())
    }

    /// Returns the value of `column` if it is present and not empty.
    #[must_use]
    pub fn non_empty(&self, column: &str) -> Option<&Value> {
        self.get(column).filter(|v| !v.is_empty())
    }

    /// Iterates columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
