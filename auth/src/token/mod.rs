pub mod errors;
pub mod hasher;
pub mod secret;

pub use errors::TokenError;
pub use hasher::PlainTokenHasher;
pub use hasher::Sha256TokenHasher;
pub use hasher::TokenHasher;
pub use secret::generate_secret;
pub use secret::is_well_formed;
