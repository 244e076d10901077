//! Password hashing, access tokens and the request extractors that enforce
//! authentication and roles.

pub mod extract;
pub mod jwt;
pub mod password;

pub use extract::{AuthUser, RequireAdmin};
