//! The database handle the store consumes.
//!
//! The store never owns a connection. The host hands it something that can
//! quote identifiers, prepare and run parameter-bound statements, and walk
//! the result rows. [`Database`] is that capability set; `SqlxDatabase`
//! implements it over a sqlx pool, and tests implement it in memory.

use std::sync::Arc;

use async_trait::async_trait;
use quire_core::Value;

use crate::StoreResult;

/// SQL dialect of a database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL or MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Detects the dialect from a connection URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    /// Quotes an identifier for this dialect.
    ///
    /// Embedded quote characters are doubled. Dotted names are quoted one
    /// segment at a time so `auth.users` becomes `"auth"."users"`.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        let quote = match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        };
        name.split('.')
            .map(|segment| {
                let escaped = segment.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the bind placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }
}

/// A statement ready to be prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    persistent: bool,
}

impl Statement {
    /// Creates a statement whose prepared form the driver may cache by SQL text.
    #[must_use]
    pub fn cached(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            persistent: true,
        }
    }

    /// Creates a statement that is prepared afresh on every execution.
    #[must_use]
    pub fn uncached(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            persistent: false,
        }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns whether the prepared statement may be cached.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// One result row as the driver reports it: column names in result-set order.
pub type RawRow = Vec<(String, Value)>;

/// Capabilities the store needs from a database connection.
///
/// Implementations must be thread-safe (`Send + Sync`); one handle may serve
/// many concurrent requests.
#[async_trait]
pub trait Database: Send + Sync {
    /// Returns the dialect used for quoting and placeholders.
    fn dialect(&self) -> Dialect;

    /// Quotes a table or column name.
    fn quote_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Returns the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    /// Executes `statement` with `binds` and returns the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueryFailed` if the statement cannot be prepared,
    /// executed or fetched.
    async fn fetch_optional(
        &self,
        statement: &Statement,
        binds: &[Value],
    ) -> StoreResult<Option<RawRow>>;

    /// Executes `statement` with `binds` and returns every row in cursor order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueryFailed` if the statement cannot be prepared,
    /// executed or fetched.
    async fn fetch_all(&self, statement: &Statement, binds: &[Value]) -> StoreResult<Vec<RawRow>>;
}

#[async_trait]
impl<D: Database + ?Sized> Database for Arc<D> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn quote_identifier(&self, name: &str) -> String {
        (**self).quote_identifier(name)
    }

    fn placeholder(&self, index: usize) -> String {
        (**self).placeholder(index)
    }

    async fn fetch_optional(
        &self,
        statement: &Statement,
        binds: &[Value],
    ) -> StoreResult<Option<RawRow>> {
        (**self).fetch_optional(statement, binds).await
    }

    async fn fetch_all(&self, statement: &Statement, binds: &[Value]) -> StoreResult<Vec<RawRow>> {
        (**self).fetch_all(statement, binds).await
    }
}

/// The host's per-request context.
///
/// The store only ever asks it for the database handle.
pub trait StoreContext: Send + Sync {
    /// Returns the database handle for this request.
    fn database(&self) -> &dyn Database;
}

impl<D: Database> StoreContext for D {
    fn database(&self) -> &dyn Database {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_detection() {
        assert_eq!(
            Dialect::from_url("postgres://localhost/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("postgresql://localhost/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(Dialect::from_url("mysql://localhost/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("mariadb://localhost/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("invalid://localhost"), None);
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(Dialect::Postgres.quote_identifier("user"), "\"user\"");
        assert_eq!(Dialect::Sqlite.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::MySql.quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn quoting_splits_schema_qualified_names() {
        assert_eq!(
            Dialect::Postgres.quote_identifier("auth.users"),
            "\"auth\".\"users\""
        );
    }

    #[test]
    fn placeholders_per_dialect() {
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
        assert_eq!(Dialect::MySql.placeholder(2), "?");
        assert_eq!(Dialect::Sqlite.placeholder(1), "?");
    }

    #[test]
    fn statement_cache_flag() {
        assert!(Statement::cached("SELECT 1").is_persistent());
        assert!(!Statement::uncached("SELECT 1").is_persistent());
    }
}
