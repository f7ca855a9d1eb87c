use aerodesk_core::models::{Requester, Role};
use aerodesk_shared::Masked;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    state::{AppState, AuthConfig},
};

/// Ten years.
const MAX_TOKEN_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(sub: String, email: Option<String>, role: Role, auth: &AuthConfig) -> Self {
        let ttl = Duration::seconds(auth.expiration.min(MAX_TOKEN_TTL_SECONDS) as i64);
        Self { sub, email, role, exp: (Utc::now() + ttl).timestamp().max(0) as usize }
    }
}

impl From<Claims> for Requester {
    fn from(claims: Claims) -> Self {
        Requester { subject: claims.sub, email: claims.email.map(Masked), role: claims.role }
    }
}

pub fn issue_token(claims: &Claims, auth: &AuthConfig) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

pub fn verify_token(token: &str, auth: &AuthConfig) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(auth.secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::AuthenticationError("Invalid or expired token".into()))
}

// ============================================================================
// Extractors
// ============================================================================

/// Any authenticated caller, customer or admin.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Requester);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::AuthenticationError(
                        "Missing or malformed Authorization header. Expected: Bearer <token>".into(),
                    )
                })?;

        let claims = verify_token(bearer.token(), &state.auth)?;
        Ok(CurrentUser(claims.into()))
    }
}

/// Caller holding the `ADMIN` role. Required for catalog writes.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Requester);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(requester) = CurrentUser::from_request_parts(parts, state).await?;
        if !requester.is_admin() {
            return Err(AppError::AuthorizationError("Admin role required".into()));
        }
        Ok(AdminUser(requester))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig { secret: "test-secret".into(), expiration: 3600 }
    }

    #[test]
    fn test_token_roundtrip_preserves_identity() {
        let claims = Claims::new("guest-1".into(), Some("a@b.c".into()), Role::Customer, &auth());
        let token = issue_token(&claims, &auth()).unwrap();

        let requester: Requester = verify_token(&token, &auth()).unwrap().into();
        assert_eq!(requester.subject, "guest-1");
        assert_eq!(requester.role, Role::Customer);
        assert_eq!(requester.email.map(Masked::into_inner).as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let claims = Claims::new("guest-1".into(), None, Role::Admin, &auth());
        let token = issue_token(&claims, &AuthConfig { secret: "other".into(), expiration: 3600 }).unwrap();
        assert!(matches!(verify_token(&token, &auth()), Err(AppError::AuthenticationError(_))));
    }
}
