use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use email_address::EmailAddress;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::account::models::Status;
use crate::domain::errors::AuthError;
use crate::domain::errors::IdError;

/// One way a human proves they are a given account.
///
/// `roles` are the effective roles: the owning account's roles merged with
/// any identity-level roles, as resolved by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: IdentityId,
    pub account_id: AccountId,
    pub identity: String,
    pub kind: IdentityKind,
    pub status: Status,
    pub roles: BTreeSet<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// New active identity for an account.
    ///
    /// # Errors
    /// * `InvalidEmail` - Email identity string is not a valid address
    pub fn new(
        account_id: AccountId,
        identity: impl Into<String>,
        kind: IdentityKind,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let identity = identity.into();
        if kind == IdentityKind::Email && !EmailAddress::is_valid(&identity) {
            return Err(AuthError::InvalidEmail(identity));
        }

        Ok(Self {
            id: IdentityId::new(),
            account_id,
            identity,
            kind,
            status: Status::Active,
            roles: BTreeSet::new(),
            metadata,
            created_at: now,
        })
    }

    pub fn is_blocked(&self) -> bool {
        self.status == Status::Blocked
    }
}

/// Identity unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Generate a new random identity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identity ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(IdentityId)
            .map_err(|e| IdError::InvalidFormat(e.to_string()))
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Type tag of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Email,
    Google,
    Other(String),
}

impl IdentityKind {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityKind::Email => "email",
            IdentityKind::Google => "google",
            IdentityKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for IdentityKind {
    fn from(s: &str) -> Self {
        match s {
            "email" => IdentityKind::Email,
            "google" => IdentityKind::Google,
            other => IdentityKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
