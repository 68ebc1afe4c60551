use std::sync::Arc;

use identity_service::config::Config;
use identity_service::domain::account::ports::AccountRepository;
use identity_service::domain::account::service::AccountService;
use identity_service::domain::credential::ports::CredentialRepository;
use identity_service::domain::credential::service::CredentialAuthenticator;
use identity_service::domain::identity::ports::IdentityRepository;
use identity_service::domain::identity::ports::VerifiedEmailChecker;
use identity_service::domain::reset_password::ports::MailSender;
use identity_service::domain::reset_password::ports::ResetPasswordRequestRepository;
use identity_service::domain::reset_password::service::ResetPasswordCollaborators;
use identity_service::domain::reset_password::service::ResetPasswordService;
use identity_service::domain::time::Clock;
use identity_service::domain::token::ports::TokenRepository;
use identity_service::domain::token::service::OpaqueTokenAuthenticator;

pub struct Collaborators {
    pub mail_sender: Arc<dyn MailSender>,
    pub verified_emails: Arc<dyn VerifiedEmailChecker>,
    pub clock: Arc<dyn Clock>,
}

/// Every service, wired over one set of repositories.
pub struct Services<AR, IR, CR, TR, RR>
where
    AR: AccountRepository,
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
    RR: ResetPasswordRequestRepository,
{
    pub accounts: AccountService<AR, TR>,
    pub credentials: CredentialAuthenticator<AR, IR, CR, TR>,
    pub tokens: OpaqueTokenAuthenticator<IR, TR>,
    pub reset_password: ResetPasswordService<IR, CR, TR, RR>,
}

impl<AR, IR, CR, TR, RR> Services<AR, IR, CR, TR, RR>
where
    AR: AccountRepository,
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
    RR: ResetPasswordRequestRepository,
{
    pub fn new(
        accounts: Arc<AR>,
        identities: Arc<IR>,
        credentials: Arc<CR>,
        tokens: Arc<TR>,
        reset_requests: Arc<RR>,
        collaborators: Collaborators,
        config: &Config,
    ) -> Result<Self, anyhow::Error> {
        let password_hasher = config.password.hasher()?;
        let token_hasher = config.tokens.hasher()?;
        let clock = collaborators.clock;

        Ok(Self {
            accounts: AccountService::new(
                Arc::clone(&accounts),
                Arc::clone(&tokens),
                Arc::clone(&clock),
            ),
            credentials: CredentialAuthenticator::new(
                accounts,
                Arc::clone(&identities),
                Arc::clone(&credentials),
                Arc::clone(&tokens),
                password_hasher.clone(),
                Arc::clone(&clock),
            ),
            tokens: OpaqueTokenAuthenticator::new(
                Arc::clone(&identities),
                Arc::clone(&tokens),
                token_hasher,
                Arc::clone(&clock),
                config.tokens.lifetimes()?,
            ),
            reset_password: ResetPasswordService::new(
                identities,
                credentials,
                tokens,
                reset_requests,
                ResetPasswordCollaborators {
                    mail_sender: collaborators.mail_sender,
                    verified_emails: collaborators.verified_emails,
                    password_hasher,
                    clock,
                },
                config.reset_password.policy()?,
                config.reset_password.link_template.clone(),
            ),
        })
    }
}
