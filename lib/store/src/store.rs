//! User resolution: the store the host authentication layer talks to.
//!
//! [`Store`] turns lookup fields or a primary key value into a user, applying
//! the fail-silently rule: a fetched row that lacks a usable key value is
//! reported as "no user", exactly like a row that was never found. Every
//! call is one fresh round-trip; nothing is cached across calls.

use std::sync::Arc;

use async_trait::async_trait;
use quire_core::{LookupFields, Value};
use tracing::{debug, instrument, warn};

use crate::StoreResult;
use crate::config::StoreConfig;
use crate::database::{Database, Statement, StoreContext};
use crate::error::StoreError;
use crate::query;
use crate::roles::roles_for_key;
use crate::row::Row;
use crate::session::{self, SessionPayload, SessionToken};
use crate::user::{DefaultUserFactory, User, UserFactory, UserIdentity};

/// Optional identity features a store provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Users can be frozen into and thawed from session tokens.
    pub session: bool,
    /// Users expose role names.
    pub roles: bool,
}

/// Operations the host authentication subsystem consumes.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Identity type handed back to the host.
    type Identity: UserIdentity;

    /// Resolves a user from credential fields.
    async fn find_user(
        &self,
        fields: &LookupFields,
        context: &dyn StoreContext,
    ) -> StoreResult<Option<Self::Identity>>;

    /// Resolves role names from the same field shape `find_user` takes.
    async fn find_user_roles(
        &self,
        fields: &LookupFields,
        context: &dyn StoreContext,
    ) -> StoreResult<Vec<String>>;

    /// Serializes a user for the session store.
    fn for_session(
        &self,
        context: &dyn StoreContext,
        user: &Self::Identity,
    ) -> StoreResult<SessionToken>;

    /// Restores a user from session bytes.
    ///
    /// Undecodable tokens resolve to `None`.
    async fn from_session(
        &self,
        context: &dyn StoreContext,
        token: &[u8],
    ) -> StoreResult<Option<Self::Identity>>;

    /// Declares the optional features this store supports.
    fn user_supports(&self) -> Capabilities;
}

/// Database-backed user store.
///
/// Holds only configuration and the identity factory; the database handle
/// is borrowed per call.
pub struct Store<F: UserFactory = DefaultUserFactory> {
    config: Arc<StoreConfig>,
    factory: F,
}

impl Store {
    /// Creates a store producing plain [`User`] values.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the configuration is invalid.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        Self::with_factory(config, DefaultUserFactory)
    }
}

impl<F: UserFactory> Store<F> {
    /// Creates a store whose users are wrapped by `factory`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the configuration is invalid.
    pub fn with_factory(config: StoreConfig, factory: F) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            factory,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Finds the user matching every field in `fields`.
    ///
    /// Only the first matching row is consulted. Returns `Ok(None)` when no
    /// row matches or when the row's key is missing or empty.
    ///
    /// # Errors
    ///
    /// - `StoreError::EmptyLookup` if `fields` is empty
    /// - `StoreError::DisallowedField` if a field name is not permitted
    /// - `StoreError::QueryFailed` if the lookup cannot be executed
    #[instrument(
        skip_all,
        fields(table = %self.config.user_table(), lookup = ?fields.keys().collect::<Vec<_>>())
    )]
    pub async fn find_by_fields(
        &self,
        db: &dyn Database,
        fields: &LookupFields,
    ) -> StoreResult<Option<F::Identity>> {
        self.check_fields(fields)?;

        // Only an allow-list bounds the set of distinct lookup statements.
        let query = query::field_lookup(
            db,
            self.config.user_table(),
            fields.keys().map(String::as_str),
            self.config.allowed_fields().is_some(),
        );
        let binds: Vec<Value> = query
            .bind_names()
            .iter()
            .filter_map(|name| fields.get(name).cloned())
            .collect();

        let user = self.resolve(db, query.statement(), &binds, fields.clone()).await?;
        Ok(user.map(|u| self.factory.build(u)))
    }

    /// Finds the user whose single key column equals `key`.
    ///
    /// An empty key value resolves to `Ok(None)` without a query.
    ///
    /// # Errors
    ///
    /// - `StoreError::Configuration` if the store has a composite key
    /// - `StoreError::QueryFailed` if the lookup cannot be executed
    #[instrument(skip_all, fields(table = %self.config.user_table()))]
    pub async fn find_by_key(
        &self,
        db: &dyn Database,
        key: &Value,
    ) -> StoreResult<Option<F::Identity>> {
        let Some(column) = self.config.user_key().single() else {
            return Err(StoreError::configuration(
                "lookup by key requires a single user_key column",
            )
            .into());
        };
        if key.is_empty() {
            debug!("empty key value, no user");
            return Ok(None);
        }

        let statement = query::primary_key_lookup(db, self.config.user_table(), column);
        let fields = LookupFields::from([(column.to_string(), key.clone())]);
        let user = self
            .resolve(db, &statement, std::slice::from_ref(key), fields)
            .await?;
        Ok(user.map(|u| self.factory.build(u)))
    }

    fn check_fields(&self, fields: &LookupFields) -> StoreResult<()> {
        if fields.is_empty() {
            return Err(StoreError::EmptyLookup.into());
        }
        if let Some(field) = fields.keys().find(|f| !self.config.permits_field(f)) {
            return Err(StoreError::DisallowedField {
                field: field.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Runs a lookup and applies the fail-silently rule to its first row.
    async fn resolve(
        &self,
        db: &dyn Database,
        statement: &Statement,
        binds: &[Value],
        fields: LookupFields,
    ) -> StoreResult<Option<User>> {
        let Some(raw) = db.fetch_optional(statement, binds).await? else {
            debug!("no matching row");
            return Ok(None);
        };

        let row = Row::decode(raw);
        let missing_key = self
            .config
            .user_key()
            .columns()
            .into_iter()
            .find(|column| row.non_empty(column).is_none());
        if let Some(column) = missing_key {
            debug!(column, "matched row has no usable key value, treating as no user");
            return Ok(None);
        }

        Ok(Some(User::new(row, fields, Arc::clone(&self.config))))
    }

    /// Returns true if the token payload only names permitted, non-empty fields.
    fn payload_is_usable(&self, payload: &SessionPayload) -> bool {
        match payload {
            SessionPayload::Key { column, .. } => self.config.permits_field(column),
            SessionPayload::Fields { fields } => {
                !fields.is_empty() && fields.keys().all(|f| self.config.permits_field(f))
            }
        }
    }
}

#[async_trait]
impl<F: UserFactory> AuthStore for Store<F> {
    type Identity = F::Identity;

    async fn find_user(
        &self,
        fields: &LookupFields,
        context: &dyn StoreContext,
    ) -> StoreResult<Option<F::Identity>> {
        self.find_by_fields(context.database(), fields).await
    }

    async fn find_user_roles(
        &self,
        fields: &LookupFields,
        context: &dyn StoreContext,
    ) -> StoreResult<Vec<String>> {
        let db = context.database();

        // A lookup by the key alone can go straight to the join.
        if let Some(column) = self.config.user_key().single()
            && fields.len() == 1
            && let Some((field, value)) = fields.iter().next()
            && field.eq_ignore_ascii_case(column)
        {
            if value.is_empty() {
                return Ok(Vec::new());
            }
            return roles_for_key(db, &self.config, value).await;
        }

        match self.find_by_fields(db, fields).await? {
            Some(identity) => Ok(identity.user().roles(db).await?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    fn for_session(
        &self,
        _context: &dyn StoreContext,
        user: &F::Identity,
    ) -> StoreResult<SessionToken> {
        session::freeze(user.user())
    }

    async fn from_session(
        &self,
        context: &dyn StoreContext,
        token: &[u8],
    ) -> StoreResult<Option<F::Identity>> {
        let Some(payload) = session::thaw(token) else {
            return Ok(None);
        };
        if !self.payload_is_usable(&payload) {
            warn!("session token names fields this store does not permit, ignoring it");
            return Ok(None);
        }

        let db = context.database();
        match payload {
            SessionPayload::Key { column, value }
                if self
                    .config
                    .user_key()
                    .single()
                    .is_some_and(|key| key.eq_ignore_ascii_case(&column)) =>
            {
                self.find_by_key(db, &value).await
            }
            SessionPayload::Key { column, value } => {
                let fields = LookupFields::from([(column, value)]);
                self.find_by_fields(db, &fields).await
            }
            SessionPayload::Fields { fields } => self.find_by_fields(db, &fields).await,
        }
    }

    fn user_supports(&self) -> Capabilities {
        Capabilities {
            session: true,
            roles: true,
        }
    }
}

impl<F: UserFactory> std::fmt::Debug for Store<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
