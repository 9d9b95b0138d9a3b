/// Authentication extractors and utilities
use crate::{context::AppContext, error::TubelyError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer expected on access tokens
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = TubelyError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| TubelyError::Authentication("Missing authorization header".to_string()))?;

        let user_id = verify_access_token(&token, &state.config.authentication.jwt_secret)?;

        Ok(AuthContext { user_id })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Verify an access token and return the caller's user id
///
/// Checks the HS256 signature, expiry and issuer.
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<Uuid, TubelyError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                TubelyError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                TubelyError::Authentication("Invalid token signature".to_string())
            }
            _ => TubelyError::Authentication("Invalid token".to_string()),
        }
    })?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| TubelyError::Authentication("Invalid token subject".to_string()))
}

/// Sign an access token for `user_id`; tokens are issued elsewhere in production
#[cfg(test)]
pub(crate) fn issue_test_token(user_id: Uuid, jwt_secret: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .unwrap()
}
