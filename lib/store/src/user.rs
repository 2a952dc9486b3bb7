//! The user entity produced by a successful lookup.
//!
//! A [`User`] wraps the decoded row, the lookup fields that found it and a
//! shared reference to the store configuration. Its role list is computed on
//! first request and then kept for the life of the instance.

use std::fmt;
use std::sync::Arc;

use quire_core::{LookupFields, Value};
use tokio::sync::OnceCell;

use crate::config::StoreConfig;
use crate::row::Row;

/// An authenticated identity resolved from the user table.
#[derive(Clone)]
pub struct User {
    /// The matched row with lower-cased column names.
    row: Row,
    /// The fields the caller looked the user up by.
    fields: LookupFields,
    /// Configuration of the store that produced this user.
    config: Arc<StoreConfig>,
    /// Role names, filled at most once.
    roles: OnceCell<Vec<String>>,
}

impl User {
    pub(crate) fn new(row: Row, fields: LookupFields, config: Arc<StoreConfig>) -> Self {
        Self {
            row,
            fields,
            config,
            roles: OnceCell::new(),
        }
    }

    /// Returns the decoded row.
    #[must_use]
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Returns the value of a column, matched case-insensitively.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    /// Returns the lookup fields that resolved this user.
    #[must_use]
    pub fn lookup_fields(&self) -> &LookupFields {
        &self.fields
    }

    /// Returns the configuration of the originating store.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the primary key value.
    ///
    /// For composite keys this is the first key column, the one the role
    /// join is keyed on.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.row.non_empty(self.config.user_key().primary())
    }

    /// Returns the login name column value.
    #[must_use]
    pub fn name(&self) -> Option<&Value> {
        self.row.get(self.config.user_name())
    }

    /// Returns the roles if they have already been loaded.
    #[must_use]
    pub fn cached_roles(&self) -> Option<&[String]> {
        self.roles.get().map(Vec::as_slice)
    }

    pub(crate) fn role_cell(&self) -> &OnceCell<Vec<String>> {
        &self.roles
    }
}

// Row and lookup fields may hold credential material.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id())
            .field("lookup_fields", &self.fields.keys().collect::<Vec<_>>())
            .field("roles", &self.roles.get())
            .finish_non_exhaustive()
    }
}

/// Access to the underlying [`User`] of a host-defined identity type.
pub trait UserIdentity: Send + Sync {
    /// Returns the wrapped user.
    fn user(&self) -> &User;
}

impl UserIdentity for User {
    fn user(&self) -> &User {
        self
    }
}

/// Produces the identity values the store hands back to the host.
///
/// Supplied once at store construction; the default returns the [`User`]
/// itself.
pub trait UserFactory: Send + Sync {
    /// The identity type produced.
    type Identity: UserIdentity;

    /// Wraps a freshly resolved user.
    fn build(&self, user: User) -> Self::Identity;
}

/// Factory returning plain [`User`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUserFactory;

impl UserFactory for DefaultUserFactory {
    type Identity = User;

    fn build(&self, user: User) -> User {
        user
    }
}

/// Factory backed by a closure.
#[derive(Clone)]
pub struct FnUserFactory<F>(F);

impl<F, U> UserFactory for FnUserFactory<F>
where
    F: Fn(User) -> U + Send + Sync,
    U: UserIdentity,
{
    type Identity = U;

    fn build(&self, user: User) -> U {
        (self.0)(user)
    }
}

/// Wraps a closure as a [`UserFactory`].
pub fn factory_fn<F, U>(f: F) -> FnUserFactory<F>
where
    F: Fn(User) -> U + Send + Sync,
    U: UserIdentity,
{
    FnUserFactory(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::row;

    fn user_with(config: StoreConfig, pairs: &[(&str, Value)]) -> User {
        User::new(Row::decode(row(pairs)), LookupFields::new(), Arc::new(config))
    }

    #[test]
    fn id_reads_configured_key() {
        let config = StoreConfig::builder().user_key("login_id").build();
        let user = user_with(config, &[("LOGIN_ID", Value::Integer(7))]);
        assert_eq!(user.id(), Some(&Value::Integer(7)));
    }

    #[test]
    fn id_ignores_empty_value() {
        let user = user_with(StoreConfig::default(), &[("id", Value::from(""))]);
        assert!(user.id().is_none());
    }

    #[test]
    fn composite_id_is_first_key_column() {
        let config = StoreConfig::builder()
            .composite_user_key(["tenant", "login"])
            .build();
        let user = user_with(
            config,
            &[("tenant", Value::from("acme")), ("login", Value::from("bob"))],
        );
        assert_eq!(user.id(), Some(&Value::from("acme")));
        assert_eq!(user.get("login"), Some(&Value::from("bob")));
    }

    #[test]
    fn name_reads_user_name_column() {
        let user = user_with(StoreConfig::default(), &[("name", Value::from("alice"))]);
        assert_eq!(user.name(), Some(&Value::from("alice")));
    }

    #[test]
    fn debug_hides_row_values() {
        let user = user_with(
            StoreConfig::default(),
            &[("id", Value::Integer(1)), ("password_hash", Value::from("s3cret"))],
        );
        let debug = format!("{user:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("User"));
    }

    #[test]
    fn closure_factory_wraps_user() {
        struct Admin(User);
        impl UserIdentity for Admin {
            fn user(&self) -> &User {
                &self.0
            }
        }

        let factory = factory_fn(Admin);
        let admin = factory.build(user_with(StoreConfig::default(), &[("id", Value::Integer(3))]));
        assert_eq!(admin.user().id(), Some(&Value::Integer(3)));
    }
}
