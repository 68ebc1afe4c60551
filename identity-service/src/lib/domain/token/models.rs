use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use secrecy::SecretString;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::errors::IdError;
use crate::domain::identity::models::IdentityId;
use crate::domain::performer::Performer;

/// Unit of revocation shared by one access token and one refresh token lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|e| IdError::InvalidFormat(e.to_string()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Short-lived bearer token.
///
/// `roles` is a snapshot taken at issuance. Later role changes on the account
/// only show up in tokens minted afterwards.
///
/// `raw` is only set on the value returned by the issuing call; the store
/// keeps the hash alone.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub id: Uuid,
    pub hash: String,
    pub identity_id: IdentityId,
    pub account_id: AccountId,
    pub session_id: SessionId,
    pub roles: BTreeSet<String>,
    pub data: serde_json::Value,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub raw: Option<SecretString>,
}

impl AccessToken {
    /// A future `revoked_at` is a scheduled revocation and does not count yet.
    pub fn is_revoked(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_some_and(|revoked_at| revoked_at <= now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// # Errors
    /// * `TokenIsRevoked` - Revocation time has passed
    /// * `TokenIsExpired` - Expiry time has passed
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if self.is_revoked(now) {
            return Err(AuthError::TokenIsRevoked);
        }
        if self.is_expired(now) {
            return Err(AuthError::TokenIsExpired);
        }
        Ok(())
    }

    /// Performer as recorded on the token, roles included.
    pub fn performer(&self) -> Performer {
        Performer {
            id: self.account_id,
            session_id: self.session_id,
            roles: self.roles.clone(),
            identity_id: self.identity_id,
        }
    }
}

/// Long-lived token used to mint new access tokens for a session.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Uuid,
    pub hash: String,
    pub identity_id: IdentityId,
    pub account_id: AccountId,
    pub session_id: SessionId,
    pub revoked_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub raw: Option<SecretString>,
}

impl RefreshToken {
    pub fn is_revoked(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_some_and(|revoked_at| revoked_at <= now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Usability for minting access tokens. Being used does not matter here.
    ///
    /// # Errors
    /// * `TokenIsRevoked` - Revocation time has passed
    /// * `TokenIsExpired` - Expiry time has passed
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if self.is_revoked(now) {
            return Err(AuthError::TokenIsRevoked);
        }
        if self.is_expired(now) {
            return Err(AuthError::TokenIsExpired);
        }
        Ok(())
    }
}
