use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::domain::entities::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed or carries invalid claims: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Signs and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
            ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.jwt_secret.as_bytes(),
            settings.issuer.clone(),
            settings.token_ttl,
        )
    }

    pub fn issue(&self, user: &UserRecord) -> Result<String, TokenError> {
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-with-enough-bytes";

    fn user() -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "articles-api", Duration::from_secs(3600))
    }

    #[test]
    fn issued_tokens_verify() {
        let user = user();
        let token = issuer().issue(&user).expect("issue");
        let claims = issuer().verify(&token).expect("verify");

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issuer().issue(&user()).expect("issue");
        let other = TokenIssuer::new(b"another-secret-entirely", "articles-api", Duration::from_secs(60));

        assert!(matches!(
            other.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let foreign = TokenIssuer::new(SECRET, "someone-else", Duration::from_secs(60));
        let token = foreign.issue(&user()).expect("issue");

        assert!(matches!(issuer().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            email: "old@example.com".to_string(),
            iss: "articles-api".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .expect("encode");

        assert!(matches!(issuer().verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            issuer().verify("not.a.token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
