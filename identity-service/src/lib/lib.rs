pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

pub use domain::errors::AuthError;
pub use domain::performer::Performer;
pub use domain::performer::RequestContext;
