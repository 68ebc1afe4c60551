use std::sync::Arc;

use anyhow::ensure;
use chrono::Duration;
use chrono::Utc;
use identity_service::config::Config;
use identity_service::config::DatabaseConfig;
use identity_service::config::PasswordConfig;
use identity_service::config::ResetPasswordConfig;
use identity_service::config::TokensConfig;
use identity_service::domain::account::ports::AccountServicePort;
use identity_service::domain::credential::ports::CredentialServicePort;
use identity_service::domain::credential::ports::RegisterCommand;
use identity_service::domain::errors::AuthError;
use identity_service::domain::identity::models::IdentityKind;
use identity_service::domain::reset_password::ports::ResetPasswordServicePort;
use identity_service::domain::time::ManualClock;
use identity_service::domain::token::ports::TokenServicePort;
use identity_service::outbound::mail::LoggingMailSender;
use identity_service::outbound::repositories::InMemoryStore;
use identity_service::outbound::verified_email::NoVerifiedEmails;
use secrecy::ExposeSecret;
use secrecy::SecretString;

use crate::services::Collaborators;
use crate::services::Services;

const EMAIL: &str = "alice@example.com";

fn demo_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
        },
        tokens: TokensConfig {
            hash_salt: "demo-pepper".to_string(),
            ..TokensConfig::default()
        },
        password: PasswordConfig::default(),
        reset_password: ResetPasswordConfig::default(),
    }
}

fn raw(secret: &Option<SecretString>) -> anyhow::Result<String> {
    secret
        .as_ref()
        .map(|s| s.expose_secret().to_string())
        .ok_or_else(|| anyhow::anyhow!("issued token carries no raw secret"))
}

/// Walk through the main flows on a throwaway store, moving a manual clock.
pub async fn run() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let services = Services::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Collaborators {
            mail_sender: Arc::new(LoggingMailSender),
            verified_emails: Arc::new(NoVerifiedEmails),
            clock: clock.clone(),
        },
        &demo_config(),
    )?;

    let account = services
        .credentials
        .register(RegisterCommand {
            identity: EMAIL.to_string(),
            password: "Secret123".to_string(),
            kind: IdentityKind::Email,
            roles: vec!["user".to_string()],
            metadata: serde_json::json!({}),
        })
        .await?;
    println!("registered account {}", account.id);

    let performer = services.credentials.authenticate(EMAIL, "Secret123").await?;
    let (access, refresh) = services
        .tokens
        .issue_tokens(&performer.identity_id, serde_json::json!({}))
        .await?;
    let first_access = raw(&access.raw)?;
    let refresh_raw = raw(&refresh.raw)?;
    println!("logged in, session {}", access.session_id);

    services
        .accounts
        .add_roles(&account.id, &["admin".to_string()])
        .await?;
    let seen = services.tokens.authenticate(&first_access).await?;
    ensure!(!seen.has_role("admin"), "access token roles must be a snapshot");
    println!("granted admin; existing token still carries {:?}", seen.roles);

    let second = services
        .tokens
        .refresh_access_token(&refresh_raw, serde_json::json!({}), Duration::seconds(30))
        .await?;
    let second_access = raw(&second.raw)?;
    ensure!(services.tokens.authenticate(&first_access).await.is_ok());
    clock.advance(Duration::seconds(31));
    ensure!(
        services.tokens.authenticate(&first_access).await == Err(AuthError::TokenIsRevoked),
        "old access token must be revoked once the grace period is over"
    );
    let refreshed = services.tokens.authenticate(&second_access).await?;
    println!("refreshed; new token carries {:?}", refreshed.roles);

    let request = services.reset_password.request(EMAIL).await?;
    clock.advance(Duration::minutes(1));
    let again = services.reset_password.request(EMAIL).await?;
    ensure!(again.token == request.token && again.last_sent_at == request.last_sent_at);
    println!("reset requested; repeat inside the cooldown sent nothing");

    services
        .reset_password
        .confirm(&request.token, "NewSecret456")
        .await?;
    ensure!(
        services.credentials.authenticate(EMAIL, "Secret123").await
            == Err(AuthError::InvalidPassword)
    );
    ensure!(services.tokens.authenticate(&second_access).await.is_err());
    services.credentials.authenticate(EMAIL, "NewSecret456").await?;
    println!("password reset; old password and every session are gone");

    Ok(())
}
