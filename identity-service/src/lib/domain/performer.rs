use std::collections::BTreeSet;

use crate::domain::account::models::AccountId;
use crate::domain::identity::models::IdentityId;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;

/// Who is making the current call.
///
/// Produced by either authenticator and carried by value for the duration
/// of one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Performer {
    pub id: AccountId,
    pub session_id: SessionId,
    pub roles: BTreeSet<String>,
    pub identity_id: IdentityId,
}

impl Performer {
    /// Zero-value performer returned when a request is unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        *self == Self::anonymous()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Side effects the transport layer applies when it writes the response.
///
/// A rotated refresh token is parked here by the handler and emitted (for
/// example as a cookie) only once the response is about to be sent.
#[derive(Debug, Default)]
pub struct PendingEffects {
    refresh_token: Option<RefreshToken>,
}

impl PendingEffects {
    /// Replaces any refresh token parked earlier in the same request.
    pub fn set_refresh_token(&mut self, token: RefreshToken) {
        self.refresh_token = Some(token);
    }

    pub fn take_refresh_token(&mut self) -> Option<RefreshToken> {
        self.refresh_token.take()
    }

    pub fn is_empty(&self) -> bool {
        self.refresh_token.is_none()
    }
}

/// Request-scoped state, passed explicitly down the call chain.
#[derive(Debug, Default)]
pub struct RequestContext {
    performer: Option<Performer>,
    effects: PendingEffects,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_performer(performer: Performer) -> Self {
        Self {
            performer: Some(performer),
            effects: PendingEffects::default(),
        }
    }

    /// Authenticated performer, or [`Performer::anonymous`] when absent.
    pub fn performer(&self) -> Performer {
        self.performer.clone().unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.performer.is_some()
    }

    pub fn set_performer(&mut self, performer: Performer) {
        self.performer = Some(performer);
    }

    pub fn effects_mut(&mut self) -> &mut PendingEffects {
        &mut self.effects
    }

    /// Hand the pending effects to the response writer.
    pub fn into_effects(self) -> PendingEffects {
        self.effects
    }
}
