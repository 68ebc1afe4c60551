use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::IdError;

/// Account aggregate entity.
///
/// The authorization subject. Roles and status live here; identities and
/// credentials hang off it.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub roles: BTreeSet<String>,
    pub status: Status,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// New active account without roles.
    pub fn new(metadata: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            roles: BTreeSet::new(),
            status: Status::Active,
            metadata,
            created_at: now,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == Status::Blocked
    }
}

/// Account unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a new random account ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an account ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(AccountId)
            .map_err(|e| IdError::InvalidFormat(e.to_string()))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status shared by accounts and identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Active,
    Blocked,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Blocked => "blocked",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "blocked" => Ok(Status::Blocked),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_active_without_roles() {
        let account = Account::new(serde_json::json!({}), Utc::now());
        assert_eq!(account.status, Status::Active);
        assert!(account.roles.is_empty());
        assert!(!account.is_blocked());
    }

    #[test]
    fn test_account_id_parsing() {
        let id = AccountId::new();
        assert_eq!(AccountId::from_string(&id.to_string()), Ok(id));
        assert!(AccountId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("blocked".parse::<Status>(), Ok(Status::Blocked));
        assert_eq!(Status::Active.to_string(), "active");
        assert!("frozen".parse::<Status>().is_err());
    }
}
