//! Role lookup through the user-role link table.

use quire_core::Value;
use tracing::{debug, instrument};

use crate::StoreResult;
use crate::config::StoreConfig;
use crate::database::Database;
use crate::error::StoreError;
use crate::query;
use crate::user::User;

/// Runs the role join for `key` and collects role names in cursor order.
///
/// Duplicates are preserved and rows whose role name is `NULL` are skipped.
///
/// # Errors
///
/// Returns `StoreError::QueryFailed` if the join cannot be executed.
pub async fn roles_for_key(
    db: &dyn Database,
    config: &StoreConfig,
    key: &Value,
) -> StoreResult<Vec<String>> {
    let statement = query::role_join_for(db, config);
    let rows = db.fetch_all(&statement, std::slice::from_ref(key)).await?;

    let role_name = config.role_name().to_lowercase();
    Ok(rows
        .into_iter()
        .filter_map(|raw| {
            raw.into_iter()
                .find(|(column, _)| column.to_lowercase() == role_name)
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_null())
        .map(|value| value.to_string())
        .collect())
}

impl User {
    /// Returns the user's role names.
    ///
    /// The first call runs the role join keyed on [`User::id`]; later calls
    /// on the same instance return the stored list without touching the
    /// database. A user without a key value has no roles.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueryFailed` if the join fails. A failed load is
    /// not stored, so a later call retries.
    #[instrument(skip_all, fields(cached = self.cached_roles().is_some()))]
    pub async fn roles(&self, db: &dyn Database) -> StoreResult<&[String]> {
        let roles = self
            .role_cell()
            .get_or_try_init(|| async {
                let Some(key) = self.id() else {
                    debug!("user has no key value, no roles");
                    return Ok(Vec::new());
                };
                let roles = roles_for_key(db, self.config(), key).await?;
                debug!(count = roles.len(), "loaded roles");
                Ok::<_, rootcause::Report<StoreError>>(roles)
            })
            .await?;
        Ok(roles.as_slice())
    }

    /// Returns true if the user holds `role`.
    ///
    /// # Errors
    ///
    /// Propagates any failure from [`User::roles`].
    pub async fn has_role(&self, db: &dyn Database, role: &str) -> StoreResult<bool> {
        Ok(self.roles(db).await?.iter().any(|r| r == role))
    }
}
