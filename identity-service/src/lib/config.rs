use std::env;
use std::sync::Arc;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::reset_password::models::ResetPasswordPolicy;
use crate::domain::token::service::TokenLifetimes;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub reset_password: ResetPasswordConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TokensConfig {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// `plain` or `sha256`.
    pub hash_strategy: String,
    pub hash_salt: String,
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_cost_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResetPasswordConfig {
    pub life_secs: i64,
    pub cooldown_secs: i64,
    /// Link sent by email; `{token}` is replaced with the reset token.
    pub link_template: String,
}

fn default_max_connections() -> u32 {
    5
}

/// Seconds from config as a duration no shorter than `min_secs`.
fn seconds(key: &str, secs: i64, min_secs: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_seconds(secs)
        .filter(|_| secs >= min_secs)
        .ok_or_else(|| {
            ConfigError::Message(format!(
                "{} must be between {} and {} seconds, got {}",
                key,
                min_secs,
                chrono::Duration::MAX.num_seconds(),
                secs
            ))
        })
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 720 * 3600,
            hash_strategy: "sha256".to_string(),
            hash_salt: String::new(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for ResetPasswordConfig {
    fn default() -> Self {
        Self {
            life_secs: 3600,
            cooldown_secs: 300,
            link_template: "http://localhost:8080/reset-password?token={token}".to_string(),
        }
    }
}

impl TokensConfig {
    /// # Errors
    /// * `Message` - A TTL is not positive or does not fit a duration
    pub fn lifetimes(&self) -> Result<TokenLifetimes, ConfigError> {
        Ok(TokenLifetimes {
            access: seconds("tokens.access_token_ttl_secs", self.access_token_ttl_secs, 1)?,
            refresh: seconds("tokens.refresh_token_ttl_secs", self.refresh_token_ttl_secs, 1)?,
        })
    }

    /// # Errors
    /// * `UnknownStrategy` - Unsupported `hash_strategy`
    /// * `EmptySalt` - `sha256` without `hash_salt`
    pub fn hasher(&self) -> Result<Arc<dyn auth::TokenHasher>, auth::TokenError> {
        auth::from_strategy(&self.hash_strategy, &self.hash_salt).map(Arc::from)
    }
}

impl PasswordConfig {
    /// # Errors
    /// * `InvalidParameters` - Costs rejected by Argon2
    pub fn hasher(&self) -> Result<auth::PasswordHasher, auth::PasswordError> {
        auth::PasswordHasher::with_params(self.memory_cost_kib, self.iterations, self.parallelism)
    }
}

impl ResetPasswordConfig {
    /// # Errors
    /// * `Message` - Life is not positive, cooldown is negative, or either
    ///   does not fit a duration
    pub fn policy(&self) -> Result<ResetPasswordPolicy, ConfigError> {
        Ok(ResetPasswordPolicy {
            life: seconds("reset_password.life_secs", self.life_secs, 1)?,
            cooldown: seconds("reset_password.cooldown_secs", self.cooldown_secs, 0)?,
        })
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, TOKENS__HASH_SALT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}
