//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the caller's id, email and role. They are
//! stateless: nothing is persisted and there is no revocation list, so a
//! token stays valid until its `exp` passes.

pub mod password;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{validate_secret, ConfigError};
use crate::middleware::AuthUser;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(#[from] jsonwebtoken::errors::Error),

    #[error("token lifetime overflows the clock")]
    ExpiryOverflow,
}

/// Why an untrusted token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token could not be parsed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => VerificationError::InvalidSignature,
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            _ => VerificationError::Malformed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl TokenService {
    /// Fails when the secret is empty or one of the well-known sample values
    pub fn new(secret: &str, expiry: std::time::Duration) -> Result<Self, ConfigError> {
        validate_secret(secret)?;

        let expiry = Duration::from_std(expiry).map_err(|e| ConfigError::InvalidValue {
            key: "JWT_EXPIRE",
            value: format!("{:?}", expiry),
            reason: e.to_string(),
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry,
        })
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn issue(&self, identity: &AuthUser) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    pub(crate) fn issue_at(&self, identity: &AuthUser, issued_at: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.expiry)
            .ok_or(TokenError::ExpiryOverflow)?;

        let claims = Claims {
            sub: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Never panics on untrusted input; every failure is a typed error
    pub fn verify(&self, token: &str) -> Result<AuthUser, VerificationError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(AuthUser::from(data.claims))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &"HS256")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-signing-key-0123456789";

    fn service() -> TokenService {
        TokenService::new(SECRET, std::time::Duration::from_secs(7 * 24 * 3600)).unwrap()
    }

    fn identity(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "site.manager@asm.local".to_string(),
            role,
        }
    }

    #[test]
    fn verify_returns_the_issued_identity() {
        let tokens = service();
        for role in Role::ALL {
            let who = identity(role);
            let issued = tokens.issue(&who).unwrap();
            let verified = tokens.verify(&issued.token).unwrap();
            assert_eq!(verified.id, who.id);
            assert_eq!(verified.email, who.email);
            assert_eq!(verified.role, who.role);
        }
    }

    #[test]
    fn expiry_defaults_to_configured_lifetime() {
        let tokens = service();
        let issued_at = Utc::now();
        let issued = tokens.issue_at(&identity(Role::Worker), issued_at).unwrap();
        assert_eq!(issued.expires_at - issued_at, Duration::days(7));
    }

    #[test]
    fn expired_tokens_are_rejected_as_expired() {
        let tokens = service();
        let eight_days_ago = Utc::now() - Duration::days(8);
        let issued = tokens.issue_at(&identity(Role::Admin), eight_days_ago).unwrap();
        assert_eq!(tokens.verify(&issued.token).unwrap_err(), VerificationError::Expired);
    }

    #[test]
    fn swapped_signature_is_rejected() {
        let tokens = service();
        let first = tokens.issue(&identity(Role::Worker)).unwrap().token;
        let second = tokens.issue(&identity(Role::Admin)).unwrap().token;

        let (first_body, _) = first.rsplit_once('.').unwrap();
        let (_, second_sig) = second.rsplit_once('.').unwrap();
        let forged = format!("{}.{}", first_body, second_sig);

        assert_eq!(tokens.verify(&forged).unwrap_err(), VerificationError::InvalidSignature);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = TokenService::new("a-completely-different-key", std::time::Duration::from_secs(60)).unwrap();
        let token = other.issue(&identity(Role::Admin)).unwrap().token;
        assert_eq!(service().verify(&token).unwrap_err(), VerificationError::InvalidSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = service();
        for input in ["", "not-a-token", "a.b.c", "....."] {
            assert_eq!(tokens.verify(input).unwrap_err(), VerificationError::Malformed, "input {:?}", input);
        }
    }

    #[test]
    fn refuses_insecure_secrets() {
        let lifetime = std::time::Duration::from_secs(60);
        assert!(matches!(TokenService::new("", lifetime), Err(ConfigError::MissingVar("JWT_SECRET"))));
        assert!(matches!(TokenService::new("secret", lifetime), Err(ConfigError::InsecureSecret)));
    }
}
