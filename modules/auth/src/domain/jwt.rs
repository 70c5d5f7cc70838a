//! HS256 token issuing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::warn;

use crate::config::AuthConfig;
use crate::contract::client::TokenVerifier;
use crate::contract::error::TokenError;
use crate::contract::model::{Claims, IssuedToken, Principal, User};
use crate::domain::error::DomainError;

/// Signing and verification keys plus the claim policy they enforce.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &AuthConfig) -> Self {
        let secret = match cfg.jwt_secret.as_deref() {
            Some(s) if !s.is_empty() => s.to_owned(),
            _ => {
                warn!("auth.jwt_secret is not configured; using a random per-process secret");
                nanoid::nanoid!(64)
            }
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(i64::from(cfg.token_ttl_minutes)),
        }
    }

    /// Sign an access token for `user`, valid for the configured TTL.
    pub fn issue(&self, user: User) -> Result<IssuedToken, DomainError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::token(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_at,
            user,
        })
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

impl TokenVerifier for JwtKeys {
    fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.decode(token).map(Principal::from)
    }
}
