//! Password hashing, JWT issuance and the authenticated-user extractor.

pub mod extractor;
pub mod password;
pub mod token;

use thiserror::Error;

pub use extractor::{bearer_token, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Account is no longer active")]
    InactiveAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}
