use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::{AuthorSummary, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::users::{normalize_email, validate_email, validate_name, validate_password};

use super::password::{hash_password, verify_password};
use super::tokens::{TokenError, TokenIssuer};

const SOURCE: &str = "articles::application::auth";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("token subject no longer exists")]
    UnknownSubject,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthorSummary,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, command: RegisterCommand) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&command.email);
        validate_email(&email)?;
        validate_password(&command.password)?;
        validate_name("firstName", &command.first_name)?;
        validate_name("lastName", &command.last_name)?;

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password = command.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| AuthError::Hashing(err.to_string()))?
            .map_err(|err| AuthError::Hashing(err.to_string()))?;

        let user = match self
            .users
            .create_user(CreateUserParams {
                email,
                password_hash,
                first_name: command.first_name.trim().to_string(),
                last_name: command.last_name.trim().to_string(),
            })
            .await
        {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => return Err(AuthError::EmailTaken),
            Err(err) => return Err(err.into()),
        };

        info!(target: SOURCE, user_id = %user.id, "User registered");
        self.session(&user)
    }

    pub async fn login(&self, command: LoginCommand) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&command.email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            debug!(target: SOURCE, "Login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let password = command.password;
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|err| AuthError::Hashing(err.to_string()))?
            .map_err(|err| AuthError::Hashing(err.to_string()))?;

        if !matches {
            debug!(target: SOURCE, user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.session(&user)
    }

    /// Resolve a bearer token to the account it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = self.tokens.verify(token)?;
        self.users
            .find_user(claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)
    }

    fn session(&self, user: &UserRecord) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            access_token: self.tokens.issue(user)?,
            user: user.summary(),
        })
    }
}
