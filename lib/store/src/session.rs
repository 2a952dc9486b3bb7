//! Session token encoding.
//!
//! A token carries just enough to find the user again: the key column and
//! its value when the store has a single key, or the full original lookup
//! fields when it does not. Tokens are versioned JSON so a format change is
//! recognized rather than misread.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use quire_core::{LookupFields, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreResult;
use crate::error::StoreError;
use crate::user::User;

/// Version written into every token produced by this build.
pub const TOKEN_VERSION: u32 = 1;

/// Opaque serialized identity handed to the host's session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(Vec<u8>);

impl SessionToken {
    /// Returns the raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the token as URL-safe base64 without padding.
    #[must_use]
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Decodes a token from its base64 text form.
    ///
    /// Returns `None` if the text is not valid base64.
    #[must_use]
    pub fn from_base64(text: &str) -> Option<Self> {
        URL_SAFE_NO_PAD.decode(text.trim()).ok().map(Self)
    }
}

impl From<Vec<u8>> for SessionToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SessionToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// What a session token identifies the user by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionPayload {
    /// The single key column and its value.
    Key { column: String, value: Value },
    /// The lookup fields originally used to authenticate.
    Fields { fields: LookupFields },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    payload: SessionPayload,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Chooses the payload that identifies `user`.
///
/// Single-key stores with a non-empty key value use the key; anything else
/// falls back to the original lookup fields.
#[must_use]
pub fn payload_for(user: &User) -> SessionPayload {
    if let Some(column) = user.config().user_key().single()
        && let Some(value) = user.row().non_empty(column)
    {
        return SessionPayload::Key {
            column: column.to_string(),
            value: value.clone(),
        };
    }
    SessionPayload::Fields {
        fields: user.lookup_fields().clone(),
    }
}

/// Serializes `user`'s identity into a token.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if encoding fails.
pub fn freeze(user: &User) -> StoreResult<SessionToken> {
    let envelope = Envelope {
        version: TOKEN_VERSION,
        payload: payload_for(user),
    };
    let bytes = serde_json::to_vec(&envelope).map_err(|e| StoreError::Serialization {
        details: e.to_string(),
    })?;
    Ok(SessionToken(bytes))
}

/// Decodes a token back into its payload.
///
/// Undecodable tokens and tokens written by another format version yield
/// `None`; the caller treats that as "not authenticated".
#[must_use]
pub fn thaw(bytes: &[u8]) -> Option<SessionPayload> {
    let probe: VersionProbe = match serde_json::from_slice(bytes) {
        Ok(probe) => probe,
        Err(e) => {
            debug!(error = %e, "discarding undecodable session token");
            return None;
        }
    };
    if probe.version != TOKEN_VERSION {
        debug!(
            version = probe.version,
            expected = TOKEN_VERSION,
            "discarding session token with unsupported version"
        );
        return None;
    }
    match serde_json::from_slice::<Envelope>(bytes) {
        Ok(envelope) => Some(envelope.payload),
        Err(e) => {
            debug!(error = %e, "discarding malformed session token");
            None
        }
    }
}
