// Operator CLI for the identity service.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use identity_service::config::Config;
use identity_service::domain::account::models::AccountId;
use identity_service::domain::account::ports::AccountServicePort;
use identity_service::domain::credential::ports::CredentialServicePort;
use identity_service::domain::credential::ports::RegisterCommand;
use identity_service::domain::identity::models::IdentityKind;
use identity_service::domain::reset_password::ports::ResetPasswordServicePort;
use identity_service::domain::time::SystemClock;
use identity_service::domain::token::models::AccessToken;
use identity_service::domain::token::models::RefreshToken;
use identity_service::domain::token::ports::TokenServicePort;
use identity_service::outbound::mail::LoggingMailSender;
use identity_service::outbound::repositories::PostgresAccountRepository;
use identity_service::outbound::repositories::PostgresCredentialRepository;
use identity_service::outbound::repositories::PostgresIdentityRepository;
use identity_service::outbound::repositories::PostgresResetPasswordRequestRepository;
use identity_service::outbound::repositories::PostgresTokenRepository;
use identity_service::outbound::verified_email::PostgresVerifiedEmailChecker;
use identity_service::telemetry;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

mod demo;
mod services;

use services::Services;

#[derive(Parser)]
#[command(name = "identity-service")]
#[command(about = "Accounts, credentials and opaque session tokens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account with an email identity and a password
    Register {
        #[arg(short, long)]
        identity: String,

        #[arg(short, long, env = "IDENTITY_PASSWORD")]
        password: String,

        /// Role to grant; repeatable
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Check a password and start a session
    Login {
        #[arg(short, long)]
        identity: String,

        #[arg(short, long, env = "IDENTITY_PASSWORD")]
        password: String,
    },

    /// Show who an access token belongs to
    Whoami {
        #[arg(short, long, env = "ACCESS_TOKEN")]
        token: String,
    },

    /// Mint a new access token from a refresh token
    Refresh {
        #[arg(short, long, env = "REFRESH_TOKEN")]
        refresh_token: String,

        /// Seconds the previous access tokens stay valid; zero or less revokes them now
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        grace_secs: i64,
    },

    /// Swap a refresh token for a new token pair
    Rotate {
        #[arg(short, long, env = "REFRESH_TOKEN")]
        refresh_token: String,
    },

    /// Revoke the session an access token belongs to
    Logout {
        #[arg(short, long, env = "ACCESS_TOKEN")]
        token: String,
    },

    /// Change the password of the token's account and revoke all its sessions
    ChangePassword {
        #[arg(short, long, env = "ACCESS_TOKEN")]
        token: String,

        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,
    },

    /// Send a password reset link
    RequestReset {
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password with a reset token
    ConfirmReset {
        #[arg(short, long)]
        token: String,

        #[arg(short, long, env = "IDENTITY_PASSWORD")]
        password: String,
    },

    /// Block an account, its identities and its tokens
    Block {
        #[arg(short, long)]
        account_id: String,
    },

    /// Lift a block
    Unblock {
        #[arg(short, long)]
        account_id: String,
    },

    /// Run the register, login, refresh and reset flow against an in-memory store
    Demo,
}

fn print_access_token(token: &AccessToken) {
    if let Some(raw) = &token.raw {
        println!("access_token={}", raw.expose_secret());
    }
    println!("access_token_expires_at={}", token.expires_at.to_rfc3339());
    println!("session_id={}", token.session_id);
}

fn print_refresh_token(token: &RefreshToken) {
    if let Some(raw) = &token.raw {
        println!("refresh_token={}", raw.expose_secret());
    }
    println!("refresh_token_expires_at={}", token.expires_at.to_rfc3339());
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init();

    match Cli::parse().command {
        Commands::Demo => demo::run().await,
        command => run(command).await,
    }
}

async fn run(command: Commands) -> Result<(), anyhow::Error> {
    let config = Config::load().context("loading configuration")?;

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("connecting to the database")?;
    tracing::debug!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;

    let services = Services::new(
        Arc::new(PostgresAccountRepository::new(pg_pool.clone())),
        Arc::new(PostgresIdentityRepository::new(pg_pool.clone())),
        Arc::new(PostgresCredentialRepository::new(pg_pool.clone())),
        Arc::new(PostgresTokenRepository::new(pg_pool.clone())),
        Arc::new(PostgresResetPasswordRequestRepository::new(pg_pool.clone())),
        services::Collaborators {
            mail_sender: Arc::new(LoggingMailSender),
            verified_emails: Arc::new(PostgresVerifiedEmailChecker::new(pg_pool)),
            clock: Arc::new(SystemClock),
        },
        &config,
    )?;

    match command {
        Commands::Register {
            identity,
            password,
            roles,
        } => {
            let account = services
                .credentials
                .register(RegisterCommand {
                    identity,
                    password,
                    kind: IdentityKind::Email,
                    roles,
                    metadata: serde_json::json!({}),
                })
                .await?;
            println!("account_id={}", account.id);
        }
        Commands::Login { identity, password } => {
            let performer = services
                .credentials
                .authenticate(&identity, &password)
                .await?;
            let (access_token, refresh_token) = services
                .tokens
                .issue_tokens(&performer.identity_id, serde_json::json!({"client": "cli"}))
                .await?;
            print_access_token(&access_token);
            print_refresh_token(&refresh_token);
        }
        Commands::Whoami { token } => {
            let performer = services.tokens.authenticate(&token).await?;
            println!("account_id={}", performer.id);
            println!("identity_id={}", performer.identity_id);
            println!("session_id={}", performer.session_id);
            let roles: Vec<&str> = performer.roles.iter().map(String::as_str).collect();
            println!("roles={}", roles.join(","));
        }
        Commands::Refresh {
            refresh_token,
            grace_secs,
        } => {
            let access_token = services
                .tokens
                .refresh_access_token(
                    &refresh_token,
                    serde_json::json!({"client": "cli"}),
                    chrono::Duration::seconds(grace_secs),
                )
                .await?;
            print_access_token(&access_token);
        }
        Commands::Rotate { refresh_token } => {
            let (access_token, refresh_token) = services
                .tokens
                .rotate_tokens(&refresh_token, serde_json::json!({"client": "cli"}))
                .await?;
            print_access_token(&access_token);
            print_refresh_token(&refresh_token);
        }
        Commands::Logout { token } => {
            let performer = services.tokens.authenticate(&token).await?;
            services
                .tokens
                .revoke_session_tokens(&performer.session_id)
                .await?;
            println!("session_id={} revoked", performer.session_id);
        }
        Commands::ChangePassword {
            token,
            current,
            new,
        } => {
            let performer = services.tokens.authenticate(&token).await?;
            services
                .credentials
                .change_password(&performer.id, &current, &new)
                .await?;
            println!("password changed, all sessions revoked");
        }
        Commands::RequestReset { email } => {
            let request = services.reset_password.request(&email).await?;
            println!("reset_request_id={}", request.id);
        }
        Commands::ConfirmReset { token, password } => {
            services.reset_password.confirm(&token, &password).await?;
            println!("password reset");
        }
        Commands::Block { account_id } => {
            let account_id = AccountId::from_string(&account_id)?;
            services.accounts.block_account(&account_id).await?;
            println!("account_id={} blocked", account_id);
        }
        Commands::Unblock { account_id } => {
            let account_id = AccountId::from_string(&account_id)?;
            services.accounts.unblock_account(&account_id).await?;
            println!("account_id={} unblocked", account_id);
        }
        Commands::Demo => demo::run().await?,
    }

    Ok(())
}
