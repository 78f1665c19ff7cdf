use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError, models::User};

/// Scheme prefix expected in the `Authorization` header and prepended to issued tokens.
pub const TOKEN_SCHEME: &str = "JWT ";

/// Claims
///
/// Payload signed into every issued token. There is deliberately no `exp` claim:
/// tokens stay valid until the signing secret is rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id in the credential store.
    pub id: Uuid,
    pub username: String,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: i64,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers on protected routes
/// take it as an argument; the extractor also leaves a copy in the request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// issue_token
///
/// Signs `{id, username, iat}` with HS256 and the configured secret. The returned
/// string has no scheme prefix; callers add [`TOKEN_SCHEME`].
pub fn issue_token(secret: &str, id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        id,
        username: username.to_string(),
        iat: chrono::Utc::now().timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// decode_token
///
/// Verifies the signature of a bare token and returns its claims. Expiry is neither
/// required nor checked.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// hash_password
///
/// One-way bcrypt hash for storage at rest.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(plain, cost).map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// hash_password_blocking
///
/// [`hash_password`] on the blocking pool, for use inside request handlers.
pub async fn hash_password_blocking(plain: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
}

/// verify_password
///
/// Compares a candidate against the user's stored hash. A corrupt hash never
/// matches.
pub fn verify_password(user: &User, candidate: &str) -> bool {
    match bcrypt::verify(candidate, &user.password) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!("stored hash for {} could not be verified: {:?}", user.username, e);
            false
        }
    }
}

/// check_credentials
///
/// Verifies a signin attempt on the blocking pool and hands back the user on a match.
/// When no user was found the candidate is still hashed once at `cost`, so unknown
/// usernames take as long to reject as wrong passwords.
pub async fn check_credentials(
    user: Option<User>,
    candidate: String,
    cost: u32,
) -> Result<Option<User>, ApiError> {
    tokio::task::spawn_blocking(move || match user {
        Some(user) => verify_password(&user, &candidate).then_some(user),
        None => {
            let _ = bcrypt::hash(&candidate, cost);
            None
        }
    })
    .await
    .map_err(|e| ApiError::Internal(format!("credential check task failed: {e}")))
}

/// token_from_header
///
/// Splits an `Authorization` value into scheme and token. The scheme matches `JWT`
/// in any case and may be followed by any run of whitespace.
pub fn token_from_header(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() || !scheme.eq_ignore_ascii_case(TOKEN_SCHEME.trim_end()) {
        return None;
    }
    Some(token)
}

/// AuthUser Extractor Implementation
///
/// 1. Reads the `Authorization` header and strips the `JWT` scheme.
/// 2. Verifies the token signature against `AppConfig::jwt_secret`.
/// 3. Stores the identity in the request extensions.
///
/// Rejection: `ApiError::Unauthorized` (401) on any failure, before a handler or
/// repository runs.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("missing Authorization header");
                ApiError::Unauthorized
            })?;

        let token = token_from_header(auth_header).ok_or_else(|| {
            tracing::warn!("Authorization header without JWT scheme");
            ApiError::Unauthorized
        })?;

        let claims = decode_token(&config.jwt_secret, token).map_err(|e| {
            tracing::warn!("rejected token: {:?}", e.kind());
            ApiError::Unauthorized
        })?;

        let user = AuthUser {
            id: claims.id,
            username: claims.username,
        };
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}
