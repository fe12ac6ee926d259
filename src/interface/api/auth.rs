//! Bearer token extractor
//!
//! Tokens are issued by the account service. Only the `sub` claim is read.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;

/// Verification settings shared by all handlers
#[derive(Clone)]
pub struct AuthKeys {
    decoding_key: Arc<DecodingKey>,
}

impl AuthKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let data = decode::<BearerClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| ApiError::rejected("Invalid token"))?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::rejected("Invalid token"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BearerClaims {
    pub sub: String,
    pub exp: i64,
}

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::rejected("Missing token"))?;

        let keys = AuthKeys::from_ref(state);
        let user_id = keys.verify(token.trim())?;
        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str) -> String {
        let claims = BearerClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_reads_subject() {
        let keys = AuthKeys::from_secret("secret");
        let user_id = Uuid::new_v4();
        assert_eq!(keys.verify(&token("secret", &user_id.to_string())).unwrap(), user_id);
    }

    #[test]
    fn test_verify_rejects_bad_tokens() {
        let keys = AuthKeys::from_secret("secret");
        assert!(keys.verify(&token("other", &Uuid::new_v4().to_string())).is_err());
        assert!(keys.verify(&token("secret", "not-a-uuid")).is_err());
        assert!(keys.verify("garbage").is_err());
    }
}
