use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;

/// Number of random bytes behind every bearer secret.
pub const SECRET_BYTES: usize = 32;

/// Length of an encoded secret (URL-safe base64, no padding).
pub const SECRET_LENGTH: usize = 43;

/// Generate a cryptographically random, URL-safe bearer secret.
pub fn generate_secret() -> SecretString {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SecretString::from(URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that a presented secret has the shape produced by [`generate_secret`].
pub fn is_well_formed(raw: &str) -> bool {
    raw.len() == SECRET_LENGTH
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
