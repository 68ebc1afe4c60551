//! Authentication primitives library
//!
//! Provides the secret-handling building blocks used by the identity service:
//! - Password hashing (Argon2id)
//! - Bearer secret generation (32 random bytes, URL-safe base64)
//! - Token hash strategies (identity for tests, salted SHA-256)
//!
//! Services define their own persistence and flows on top of these.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Opaque Tokens
//! ```
//! use auth::{generate_secret, Sha256TokenHasher, TokenHasher};
//! use secrecy::ExposeSecret;
//!
//! let hasher = Sha256TokenHasher::new("deployment-pepper").unwrap();
//! let raw = generate_secret();
//! let lookup_key = hasher.hash(raw.expose_secret());
//! assert_eq!(lookup_key, hasher.hash(raw.expose_secret()));
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::generate_secret;
pub use token::hasher::from_strategy;
pub use token::is_well_formed;
pub use token::PlainTokenHasher;
pub use token::Sha256TokenHasher;
pub use token::TokenError;
pub use token::TokenHasher;
