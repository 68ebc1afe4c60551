pub mod mail;
pub mod repositories;
pub mod verified_email;
