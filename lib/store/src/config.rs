//! Table and column bindings for the store.
//!
//! The store never introspects the schema. Instead, [`StoreConfig`] names the
//! user table, its key column(s), the role table and the user-role link table
//! that joins them. Every field has a default so a config source only needs
//! to mention what differs.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::query::{is_identifier, is_table_name};

/// The column or columns identifying a user row.
///
/// Deserializes from either a string (`"id"`) or a list
/// (`["tenant", "login"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    /// One authoritative key column.
    Single(String),
    /// Several columns that only together identify a user.
    Composite(Vec<String>),
}

impl UserKey {
    /// Returns the key column when exactly one is configured.
    ///
    /// A one-element composite list counts as single.
    #[must_use]
    pub fn single(&self) -> Option<&str> {
        match self {
            Self::Single(column) => Some(column),
            Self::Composite(columns) if columns.len() == 1 => Some(&columns[0]),
            Self::Composite(_) => None,
        }
    }

    /// Returns every key column in configured order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Single(column) => vec![column.as_str()],
            Self::Composite(columns) => columns.iter().map(String::as_str).collect(),
        }
    }

    /// Returns the column the role join is keyed on.
    ///
    /// For composite keys this is the first configured column.
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            Self::Single(column) => column,
            Self::Composite(columns) => columns.first().map_or("", String::as_str),
        }
    }
}

impl Default for UserKey {
    fn default() -> Self {
        Self::Single(default_user_key())
    }
}

/// Configuration for the user and role tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Table holding one row per user.
    #[serde(default = "default_user_table")]
    user_table: String,
    /// Key column(s) of the user table.
    #[serde(default)]
    user_key: UserKey,
    /// Column holding the login name.
    #[serde(default = "default_user_name")]
    user_name: String,
    /// Table holding one row per role.
    #[serde(default = "default_role_table")]
    role_table: String,
    /// Key column of the role table.
    #[serde(default = "default_role_key")]
    role_key: String,
    /// Column holding the role name.
    #[serde(default = "default_role_name")]
    role_name: String,
    /// Link table between users and roles.
    #[serde(default = "default_user_role_table")]
    user_role_table: String,
    /// Link table column referencing the user key.
    #[serde(default = "default_user_role_user_key")]
    user_role_user_key: String,
    /// Link table column referencing the role key.
    #[serde(default = "default_user_role_role_key")]
    user_role_role_key: String,
    /// Optional allow-list of lookup field names.
    ///
    /// Key columns and the name column are always allowed when a list is set.
    #[serde(default)]
    allowed_fields: Option<Vec<String>>,
}

fn default_user_table() -> String {
    "user".to_string()
}

fn default_user_key() -> String {
    "id".to_string()
}

fn default_user_name() -> String {
    "name".to_string()
}

fn default_role_table() -> String {
    "role".to_string()
}

fn default_role_key() -> String {
    "id".to_string()
}

fn default_role_name() -> String {
    "name".to_string()
}

fn default_user_role_table() -> String {
    "user_role".to_string()
}

fn default_user_role_user_key() -> String {
    "user".to_string()
}

fn default_user_role_role_key() -> String {
    "role".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            user_table: default_user_table(),
            user_key: UserKey::default(),
            user_name: default_user_name(),
            role_table: default_role_table(),
            role_key: default_role_key(),
            role_name: default_role_name(),
            user_role_table: default_user_role_table(),
            user_role_user_key: default_user_role_user_key(),
            user_role_role_key: default_user_role_role_key(),
            allowed_fields: None,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration builder starting from the defaults.
    #[must_use]
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Returns the user table name.
    #[must_use]
    pub fn user_table(&self) -> &str {
        &self.user_table
    }

    /// Returns the user key binding.
    #[must_use]
    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    /// Returns the login name column.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Returns the role table name.
    #[must_use]
    pub fn role_table(&self) -> &str {
        &self.role_table
    }

    /// Returns the role table key column.
    #[must_use]
    pub fn role_key(&self) -> &str {
        &self.role_key
    }

    /// Returns the role name column.
    #[must_use]
    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    /// Returns the user-role link table name.
    #[must_use]
    pub fn user_role_table(&self) -> &str {
        &self.user_role_table
    }

    /// Returns the link table column referencing users.
    #[must_use]
    pub fn user_role_user_key(&self) -> &str {
        &self.user_role_user_key
    }

    /// Returns the link table column referencing roles.
    #[must_use]
    pub fn user_role_role_key(&self) -> &str {
        &self.user_role_role_key
    }

    /// Returns the lookup field allow-list, if one is configured.
    #[must_use]
    pub fn allowed_fields(&self) -> Option<&[String]> {
        self.allowed_fields.as_deref()
    }

    /// Checks whether `field` may be used as a lookup constraint.
    ///
    /// The name must be a plain identifier. With an allow-list configured it
    /// must also appear in the list (case-insensitively) or be one of the key
    /// or name columns.
    #[must_use]
    pub fn permits_field(&self, field: &str) -> bool {
        if !is_identifier(field) {
            return false;
        }
        let Some(allowed) = &self.allowed_fields else {
            return true;
        };
        allowed
            .iter()
            .map(String::as_str)
            .chain(self.user_key.columns())
            .chain(std::iter::once(self.user_name.as_str()))
            .any(|candidate| candidate.eq_ignore_ascii_case(field))
    }

    /// Validates every binding.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` naming the first bad binding.
    pub fn validate(&self) -> Result<(), StoreError> {
        let tables = [
            ("user_table", self.user_table.as_str()),
            ("role_table", self.role_table.as_str()),
            ("user_role_table", self.user_role_table.as_str()),
        ];
        for (option, value) in tables {
            if !is_table_name(value) {
                return Err(StoreError::configuration(format!(
                    "{option} '{value}' is not a valid table name"
                )));
            }
        }

        let key_columns = self.user_key.columns();
        if key_columns.is_empty() {
            return Err(StoreError::configuration("user_key names no columns"));
        }
        let columns = key_columns
            .into_iter()
            .map(|c| ("user_key", c))
            .chain([
                ("user_name", self.user_name.as_str()),
                ("role_key", self.role_key.as_str()),
                ("role_name", self.role_name.as_str()),
                ("user_role_user_key", self.user_role_user_key.as_str()),
                ("user_role_role_key", self.user_role_role_key.as_str()),
            ]);
        for (option, value) in columns {
            if !is_identifier(value) {
                return Err(StoreError::configuration(format!(
                    "{option} '{value}' is not a valid column name"
                )));
            }
        }

        if let Some(allowed) = &self.allowed_fields
            && let Some(bad) = allowed.iter().find(|f| !is_identifier(f))
        {
            return Err(StoreError::configuration(format!(
                "allowed_fields entry '{bad}' is not a valid column name"
            )));
        }

        Ok(())
    }
}

/// Builder for `StoreConfig`.
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Sets the user table.
    #[must_use]
    pub fn user_table(mut self, table: impl Into<String>) -> Self {
        self.config.user_table = table.into();
        self
    }

    /// Sets a single user key column.
    #[must_use]
    pub fn user_key(mut self, column: impl Into<String>) -> Self {
        self.config.user_key = UserKey::Single(column.into());
        self
    }

    /// Sets a composite user key.
    #[must_use]
    pub fn composite_user_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.user_key = UserKey::Composite(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the login name column.
    #[must_use]
    pub fn user_name(mut self, column: impl Into<String>) -> Self {
        self.config.user_name = column.into();
        self
    }

    /// Sets the role table.
    #[must_use]
    pub fn role_table(mut self, table: impl Into<String>) -> Self {
        self.config.role_table = table.into();
        self
    }

    /// Sets the role key column.
    #[must_use]
    pub fn role_key(mut self, column: impl Into<String>) -> Self {
        self.config.role_key = column.into();
        self
    }

    /// Sets the role name column.
    #[must_use]
    pub fn role_name(mut self, column: impl Into<String>) -> Self {
        self.config.role_name = column.into();
        self
    }

    /// Sets the user-role link table.
    #[must_use]
    pub fn user_role_table(mut self, table: impl Into<String>) -> Self {
        self.config.user_role_table = table.into();
        self
    }

    /// Sets the link table column referencing users.
    #[must_use]
    pub fn user_role_user_key(mut self, column: impl Into<String>) -> Self {
        self.config.user_role_user_key = column.into();
        self
    }

    /// Sets the link table column referencing roles.
    #[must_use]
    pub fn user_role_role_key(mut self, column: impl Into<String>) -> Self {
        self.config.user_role_role_key = column.into();
        self
    }

    /// Restricts lookups to the given field names.
    #[must_use]
    pub fn allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the configuration without validating it.
    #[must_use]
    pub fn build(self) -> StoreConfig {
        self.config
    }
}
