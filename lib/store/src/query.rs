//! Parameterized SELECT construction.
//!
//! Identifiers (table and column names) are always passed through the
//! handle's quoting; values are always bound, never interpolated. Field
//! names still originate from the caller, so they are additionally checked
//! against [`is_identifier`] and the configured allow-list before reaching
//! this module.

use std::collections::BTreeSet;

use crate::config::StoreConfig;
use crate::database::{Database, Statement};

/// Returns true if `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if `name` is an identifier optionally qualified by a schema.
#[must_use]
pub fn is_table_name(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

/// A field lookup statement and the field names in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldQuery {
    statement: Statement,
    bind_names: Vec<String>,
}

impl FieldQuery {
    /// Returns the statement.
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Returns field names in the order their values must be bound.
    #[must_use]
    pub fn bind_names(&self) -> &[String] {
        &self.bind_names
    }
}

/// Builds `SELECT * FROM <table> WHERE <f1> = ? AND <f2> = ? ...`.
///
/// Fields are de-duplicated and sorted so the SQL text, and therefore any
/// prepared-statement cache entry, is a function of the field-name set alone.
/// With `cacheable` false the statement is prepared per execution, which
/// keeps caller-chosen field sets from filling the driver's cache.
pub fn field_lookup<'a, I>(
    db: &dyn Database,
    table: &str,
    fields: I,
    cacheable: bool,
) -> FieldQuery
where
    I: IntoIterator<Item = &'a str>,
{
    let bind_names: Vec<String> = fields
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let predicates = bind_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = {}", db.quote_identifier(name), db.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(" AND ");

    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        db.quote_identifier(table),
        predicates
    );

    let statement = if cacheable {
        Statement::cached(sql)
    } else {
        Statement::uncached(sql)
    };

    FieldQuery {
        statement,
        bind_names,
    }
}

/// Builds a single-column equality lookup on the key column.
pub fn primary_key_lookup(db: &dyn Database, table: &str, key_column: &str) -> Statement {
    field_lookup(db, table, [key_column], true).statement
}

/// Builds the role join for one user key value.
///
/// The text depends only on configuration, so it is marked cacheable.
pub fn role_join(
    db: &dyn Database,
    role_table: &str,
    role_name: &str,
    user_role_table: &str,
    user_role_role_key: &str,
    role_key: &str,
    user_role_user_key: &str,
) -> Statement {
    let role_table = db.quote_identifier(role_table);
    let user_role_table = db.quote_identifier(user_role_table);
    let sql = format!(
        "SELECT {role_table}.{} FROM {role_table} INNER JOIN {user_role_table} \
         ON {user_role_table}.{} = {role_table}.{} WHERE {user_role_table}.{} = {}",
        db.quote_identifier(role_name),
        db.quote_identifier(user_role_role_key),
        db.quote_identifier(role_key),
        db.quote_identifier(user_role_user_key),
        db.placeholder(1),
    );
    Statement::cached(sql)
}

/// Builds the role join from a store configuration.
pub fn role_join_for(db: &dyn Database, config: &StoreConfig) -> Statement {
    role_join(
        db,
        config.role_table(),
        config.role_name(),
        config.user_role_table(),
        config.user_role_role_key(),
        config.role_key(),
        config.user_role_user_key(),
    )
}
