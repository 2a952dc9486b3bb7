//! Error types for the store crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError::Configuration`: bad table/column bindings, surfaced at construction
//! - `StoreError::QueryFailed`: any prepare/execute/fetch failure
//! - `StoreError::EmptyLookup` / `StoreError::DisallowedField`: caller misuse
//!
//! "No matching user" is not an error. It is `Ok(None)`, deliberately
//! indistinguishable from wrong credentials.

use std::fmt;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A configuration binding is missing or malformed.
    Configuration { reason: String },
    /// The database connection pool could not be created.
    ConnectionFailed { details: String },
    /// A statement failed to prepare, execute or fetch.
    QueryFailed { sql: String, details: String },
    /// A lookup was attempted with no constraining fields.
    EmptyLookup,
    /// A lookup field name is not an allowed column.
    DisallowedField { field: String },
    /// A session token could not be produced.
    Serialization { details: String },
}

impl StoreError {
    /// Builds a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Builds a query error for the given statement text.
    pub fn query(sql: &str, err: impl fmt::Display) -> Self {
        Self::QueryFailed {
            sql: sql.to_string(),
            details: err.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "invalid store configuration: {reason}")
            }
            Self::ConnectionFailed { details } => {
                write!(f, "failed to connect to database: {details}")
            }
            Self::QueryFailed { sql, details } => {
                write!(f, "query failed: {details} (sql: {sql})")
            }
            Self::EmptyLookup => {
                write!(f, "lookup requires at least one field")
            }
            Self::DisallowedField { field } => {
                write!(f, "field '{field}' is not an allowed lookup column")
            }
            Self::Serialization { details } => {
                write!(f, "failed to encode session token: {details}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
