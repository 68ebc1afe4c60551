pub mod account;
pub mod credential;
pub mod errors;
pub mod identity;
pub mod performer;
pub mod reset_password;
pub mod time;
pub mod token;

#[cfg(test)]
pub mod testing;
