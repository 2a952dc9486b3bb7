//! Database-backed user store for a pluggable authentication layer.
//!
//! This crate provides:
//! - User lookup by arbitrary credential fields (`Store::find_by_fields`)
//! - Role lookup through a user-role link table (`User::roles`)
//! - Session freeze/thaw of resolved users (`session`)
//! - A sqlx-backed database handle (`SqlxDatabase`)
//!
//! # Failure model
//!
//! Lookups fail silently: no matching row, or a row without a usable key
//! value, is `Ok(None)`. Database failures and caller misuse are errors.
//!
//! # Example
//!
//! ```no_run
//! use quire_core::{LookupFields, Value};
//! use quire_store::{AuthStore, DatabaseConfig, SqlxDatabase, Store, StoreConfig};
//!
//! # async fn example() -> quire_store::StoreResult<()> {
//! let db = SqlxDatabase::connect(&DatabaseConfig::new("sqlite://auth.db")).await?;
//! let store = Store::new(StoreConfig::builder().user_table("login").build())?;
//!
//! let fields = LookupFields::from([
//!     ("name".to_string(), Value::from("alice")),
//!     ("password_hash".to_string(), Value::from("abc123")),
//! ]);
//! if let Some(user) = store.find_user(&fields, &db).await? {
//!     let is_admin = user.has_role(&db, "admin").await?;
//!     let token = store.for_session(&db, &user)?;
//!     println!("admin: {is_admin}, token: {}", token.to_base64());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod roles;
pub mod row;
pub mod session;
pub mod sql;
pub mod store;
pub mod user;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use config::{StoreConfig, StoreConfigBuilder, UserKey};
pub use database::{Database, Dialect, RawRow, Statement, StoreContext};
pub use error::StoreError;
pub use row::Row;
pub use session::{SessionPayload, SessionToken};
pub use sql::{DatabaseConfig, DatabasePool, SqlxDatabase};
pub use store::{AuthStore, Capabilities, Store};
pub use user::{DefaultUserFactory, FnUserFactory, User, UserFactory, UserIdentity, factory_fn};

/// Result type for store operations.
pub type StoreResult<T> = quire_core::Result<T, StoreError>;
