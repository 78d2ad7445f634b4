//! Account registration, login, and bearer-token verification.

mod password;
mod service;
mod tokens;

pub use password::{hash_password, verify_password};
pub use service::{AuthError, AuthService, AuthSession, LoginCommand, RegisterCommand};
pub use tokens::{AccessClaims, TokenError, TokenIssuer};
