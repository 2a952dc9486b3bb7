//! Core value types and utilities for quire.
//!
//! This crate provides the scalar value model shared by every quire crate
//! and the `Result` alias used for error propagation.

pub mod error;
pub mod value;

pub use error::{Report, Result};
pub use value::{LookupFields, Value};
