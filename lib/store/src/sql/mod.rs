//! sqlx-backed [`Database`] implementation.
//!
//! Each dialect runs on its own native driver so that `SELECT *` can return
//! whatever column types the user table happens to have. Columns are
//! decoded by trying the scalar types first, then dates, UUIDs and JSON as
//! text; a type no driver mapping understands reads as `NULL` rather than
//! failing the lookup.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use quire_core::Value;
use serde::Deserialize;
use sqlx::mysql::MySqlPool;
use sqlx::pool::PoolOptions;
use sqlx::postgres::PgPool;
use sqlx::query::Query;
use sqlx::database::HasStatementCache;
use sqlx::sqlite::SqlitePool;
use sqlx::{
    Column, ColumnIndex, Decode, Encode, MySql, Postgres, Row, Sqlite, Type, TypeInfo, ValueRef,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::StoreResult;
use crate::database::{Database, Dialect, RawRow, Statement};
use crate::error::StoreError;

#[cfg(test)]
mod tests;

/// Connection settings for [`SqlxDatabase`].
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `postgres://...` or `sqlite::memory:`.
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    /// Creates a config for `url` with default pool settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }

    fn pool_options<DB: sqlx::Database>(&self) -> PoolOptions<DB> {
        PoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }
}

// The URL may carry a password.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dialect", &Dialect::from_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish_non_exhaustive()
    }
}

/// A connection pool for one of the supported drivers.
#[derive(Debug, Clone)]
pub enum DatabasePool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Returns the dialect the pool speaks.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Postgres(_) => Dialect::Postgres,
            Self::MySql(_) => Dialect::MySql,
            Self::Sqlite(_) => Dialect::Sqlite,
        }
    }

    fn size(&self) -> u32 {
        match self {
            Self::Postgres(pool) => pool.size(),
            Self::MySql(pool) => pool.size(),
            Self::Sqlite(pool) => pool.size(),
        }
    }
}

impl From<PgPool> for DatabasePool {
    fn from(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }
}

impl From<MySqlPool> for DatabasePool {
    fn from(pool: MySqlPool) -> Self {
        Self::MySql(pool)
    }
}

impl From<SqlitePool> for DatabasePool {
    fn from(pool: SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

/// A pooled database handle.
#[derive(Clone)]
pub struct SqlxDatabase {
    pool: DatabasePool,
}

impl SqlxDatabase {
    /// Opens a connection pool for the driver named by the URL scheme.
    ///
    /// # Errors
    ///
    /// - `StoreError::Configuration` if the URL scheme is not supported
    /// - `StoreError::ConnectionFailed` if the pool cannot connect
    #[instrument(skip_all, fields(dialect = tracing::field::Empty))]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let dialect = Dialect::from_url(&config.url).ok_or_else(|| {
            StoreError::configuration("database url has an unsupported scheme")
        })?;
        tracing::Span::current().record("dialect", tracing::field::debug(dialect));

        let pool = match dialect {
            Dialect::Postgres => config
                .pool_options::<Postgres>()
                .connect(&config.url)
                .await
                .map(DatabasePool::from),
            Dialect::MySql => config
                .pool_options::<MySql>()
                .connect(&config.url)
                .await
                .map(DatabasePool::from),
            Dialect::Sqlite => config
                .pool_options::<Sqlite>()
                .connect(&config.url)
                .await
                .map(DatabasePool::from),
        }
        .map_err(|e| StoreError::ConnectionFailed {
            details: e.to_string(),
        })?;

        info!(max_connections = config.max_connections, "connected to database");
        Ok(Self { pool })
    }

    /// Wraps a pool the host already owns.
    pub fn from_pool(pool: impl Into<DatabasePool>) -> Self {
        Self { pool: pool.into() }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

impl fmt::Debug for SqlxDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxDatabase")
            .field("dialect", &self.pool.dialect())
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[async_trait]
impl Database for SqlxDatabase {
    fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    async fn fetch_optional(
        &self,
        statement: &Statement,
        binds: &[Value],
    ) -> StoreResult<Option<RawRow>> {
        let row: Result<Option<RawRow>, sqlx::Error> = match &self.pool {
            DatabasePool::Postgres(pool) => prepare::<Postgres>(statement, binds)
                .fetch_optional(pool)
                .await
                .map(|row| row.map(|r| decode_row::<Postgres>(&r, false))),
            DatabasePool::MySql(pool) => prepare::<MySql>(statement, binds)
                .fetch_optional(pool)
                .await
                .map(|row| row.map(|r| decode_row::<MySql>(&r, false))),
            DatabasePool::Sqlite(pool) => prepare::<Sqlite>(statement, binds)
                .fetch_optional(pool)
                .await
                .map(|row| row.map(|r| decode_row::<Sqlite>(&r, true))),
        };
        row.map_err(|e| StoreError::query(statement.sql(), e).into())
    }

    async fn fetch_all(&self, statement: &Statement, binds: &[Value]) -> StoreResult<Vec<RawRow>> {
        let rows: Result<Vec<RawRow>, sqlx::Error> = match &self.pool {
            DatabasePool::Postgres(pool) => prepare::<Postgres>(statement, binds)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(|r| decode_row::<Postgres>(r, false)).collect()),
            DatabasePool::MySql(pool) => prepare::<MySql>(statement, binds)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(|r| decode_row::<MySql>(r, false)).collect()),
            DatabasePool::Sqlite(pool) => prepare::<Sqlite>(statement, binds)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(|r| decode_row::<Sqlite>(r, true)).collect()),
        };
        rows.map_err(|e| StoreError::query(statement.sql(), e).into())
    }
}

/// Builds the query for `statement` with every value bound in order.
fn prepare<'q, DB>(statement: &'q Statement, binds: &[Value]) -> Query<'q, DB, DB::Arguments<'q>>
where
    DB: sqlx::Database + HasStatementCache,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    binds.iter().fold(
        sqlx::query::<DB>(statement.sql()).persistent(statement.is_persistent()),
        |query, value| match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Real(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
        },
    )
}

/// Returns true for declared types that hold booleans.
///
/// SQLite and MySQL store these as integers, which would otherwise decode
/// as numbers.
fn is_boolean_type(name: &str) -> bool {
    matches!(name.to_ascii_uppercase().as_str(), "BOOL" | "BOOLEAN")
}

/// Decodes every column of `row`.
///
/// `lenient_text` allows a last attempt to read any value as text, which is
/// only meaningful for SQLite's dynamically typed storage.
fn decode_row<DB>(row: &DB::Row, lenient_text: bool) -> RawRow
where
    DB: sqlx::Database,
    usize: ColumnIndex<DB::Row>,
    for<'r> bool: Decode<'r, DB> + Type<DB>,
    for<'r> i16: Decode<'r, DB> + Type<DB>,
    for<'r> i32: Decode<'r, DB> + Type<DB>,
    for<'r> i64: Decode<'r, DB> + Type<DB>,
    for<'r> f32: Decode<'r, DB> + Type<DB>,
    for<'r> f64: Decode<'r, DB> + Type<DB>,
    for<'r> String: Decode<'r, DB> + Type<DB>,
    for<'r> Vec<u8>: Decode<'r, DB> + Type<DB>,
    for<'r> DateTime<Utc>: Decode<'r, DB> + Type<DB>,
    for<'r> NaiveDateTime: Decode<'r, DB> + Type<DB>,
    for<'r> NaiveDate: Decode<'r, DB> + Type<DB>,
    for<'r> NaiveTime: Decode<'r, DB> + Type<DB>,
    for<'r> Uuid: Decode<'r, DB> + Type<DB>,
    for<'r> serde_json::Value: Decode<'r, DB> + Type<DB>,
{
    let decode = |index: usize, column: &str, type_name: &str| -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Ok(_) => {}
            Err(e) => {
                debug!(column, error = %e, "unreadable column, reading as NULL");
                return Value::Null;
            }
        }

        macro_rules! attempt {
            ($ty:ty, $into:expr) => {
                if let Ok(v) = row.try_get::<$ty, _>(index) {
                    return $into(v);
                }
            };
        }

        if is_boolean_type(type_name) {
            attempt!(bool, Value::Bool);
        }
        attempt!(i64, Value::Integer);
        attempt!(i32, |v: i32| Value::Integer(v.into()));
        attempt!(i16, |v: i16| Value::Integer(v.into()));
        attempt!(f64, Value::Real);
        attempt!(f32, |v: f32| Value::Real(v.into()));
        attempt!(bool, Value::Bool);
        attempt!(String, Value::Text);
        attempt!(DateTime<Utc>, |v: DateTime<Utc>| Value::Text(v.to_rfc3339()));
        attempt!(NaiveDateTime, |v: NaiveDateTime| Value::Text(v.to_string()));
        attempt!(NaiveDate, |v: NaiveDate| Value::Text(v.to_string()));
        attempt!(NaiveTime, |v: NaiveTime| Value::Text(v.to_string()));
        attempt!(Uuid, |v: Uuid| Value::Text(v.to_string()));
        attempt!(serde_json::Value, |v: serde_json::Value| Value::Text(v.to_string()));
        attempt!(Vec<u8>, |v: Vec<u8>| Value::Text(
            String::from_utf8_lossy(&v).into_owned()
        ));
        if lenient_text && let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Value::Text(s);
        }

        debug!(column, type_name, "unsupported column type, reading as NULL");
        Value::Null
    };

    row.columns()
        .iter()
        .map(|column| {
            let value = decode(column.ordinal(), column.name(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}
