use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::time::saturating_add;

/// A password-reset request for one account.
///
/// The token is stored raw and used directly as the lookup key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetPasswordRequest {
    pub id: Uuid,
    pub account_id: AccountId,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPasswordStatus {
    Active,
    Used,
    Expired,
}

/// Lifetime and resend cooldown of reset requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPasswordPolicy {
    pub life: Duration,
    pub cooldown: Duration,
}

impl Default for ResetPasswordPolicy {
    fn default() -> Self {
        Self {
            life: Duration::hours(1),
            cooldown: Duration::minutes(5),
        }
    }
}

impl ResetPasswordRequest {
    /// New unsent request.
    pub fn new(account_id: AccountId, token: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            token,
            created_at: now,
            last_sent_at: None,
            used_at: None,
            expired_at: None,
        }
    }

    pub fn alive_till(&self, policy: &ResetPasswordPolicy) -> DateTime<Utc> {
        saturating_add(self.created_at, policy.life)
    }

    /// `None` when the email was never sent; a resend is then due immediately.
    pub fn cool_down_till(&self, policy: &ResetPasswordPolicy) -> Option<DateTime<Utc>> {
        self.last_sent_at
            .map(|sent| saturating_add(sent, policy.cooldown))
    }

    pub fn is_alive(&self, now: DateTime<Utc>, policy: &ResetPasswordPolicy) -> bool {
        self.expired_at.is_none() && self.alive_till(policy) > now
    }

    pub fn can_be_resent(&self, now: DateTime<Utc>, policy: &ResetPasswordPolicy) -> bool {
        self.cool_down_till(policy)
            .map_or(true, |cool_down_till| cool_down_till <= now)
    }

    pub fn status(&self, now: DateTime<Utc>, policy: &ResetPasswordPolicy) -> ResetPasswordStatus {
        if self.used_at.is_some() {
            ResetPasswordStatus::Used
        } else if self.is_alive(now, policy) {
            ResetPasswordStatus::Active
        } else {
            ResetPasswordStatus::Expired
        }
    }
}
