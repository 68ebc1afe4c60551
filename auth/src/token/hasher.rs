use sha2::Digest;
use sha2::Sha256;

use super::errors::TokenError;

/// One-way, deterministic transform from a raw bearer secret to its storable form.
///
/// Only used to derive lookup keys for opaque tokens. Passwords go through
/// [`crate::PasswordHasher`] instead.
pub trait TokenHasher: Send + Sync + 'static {
    /// Hash a raw secret. Equal inputs always produce equal outputs.
    fn hash(&self, raw: &str) -> String;

    /// Strategy name, as used in configuration.
    fn name(&self) -> &'static str;
}

/// Identity transform. Stores the raw secret as is; meant for tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTokenHasher;

impl TokenHasher for PlainTokenHasher {
    fn hash(&self, raw: &str) -> String {
        raw.to_string()
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}

/// Salted SHA-256 digest, hex encoded.
///
/// The salt is a deployment-wide pepper: changing it invalidates every
/// stored token.
#[derive(Debug, Clone)]
pub struct Sha256TokenHasher {
    salt: Vec<u8>,
}

impl Sha256TokenHasher {
    /// # Errors
    /// * `EmptySalt` - Salt is empty
    pub fn new(salt: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let salt = salt.into();
        if salt.is_empty() {
            return Err(TokenError::EmptySalt);
        }
        Ok(Self { salt })
    }
}

impl TokenHasher for Sha256TokenHasher {
    fn hash(&self, raw: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.salt);
        hasher.update(raw.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}

/// Build a hasher from its configured strategy name.
///
/// # Errors
/// * `UnknownStrategy` - Name is neither `plain` nor `sha256`
/// * `EmptySalt` - `sha256` selected without a salt
pub fn from_strategy(name: &str, salt: &str) -> Result<Box<dyn TokenHasher>, TokenError> {
    match name {
        "plain" => Ok(Box::new(PlainTokenHasher)),
        "sha256" => Ok(Box::new(Sha256TokenHasher::new(salt.as_bytes())?)),
        other => Err(TokenError::UnknownStrategy(other.to_string())),
    }
}
