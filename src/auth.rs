//! Authentication: argon2 password hashing, JWT bearer tokens, the
//! `AuthUser` extractor gating protected routes, and the auth endpoints.

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse};
use crate::storage::UserStorage;

/// JWT claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hashes a password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verifies a password against a stored argon2 hash. An unparseable stored
/// hash counts as a failed verification, never an error to the caller.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Issues a signed bearer token for the user.
pub fn generate_token(user: &User, config: &Config) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(config.jwt_expires_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token issuance failed: {}", e)))
}

/// Decodes and validates a bearer token, including expiry.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

/// Whether the address passes the configured e-mail domain restriction.
/// With no domain configured, every address is allowed.
pub fn is_email_allowed(config: &Config, email: &str) -> bool {
    match &config.allowed_email_domain {
        Some(domain) => email
            .rsplit_once('@')
            .map(|(_, d)| d.eq_ignore_ascii_case(domain))
            .unwrap_or(false),
        None => true,
    }
}

/// Extractor for the authenticated caller.
///
/// Reads the `Authorization: Bearer` header, validates the token, and loads
/// the current user row; a token for a since-deleted user is rejected.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let claims = decode_token(token, &state.config.jwt_secret)?;

        let user = UserStorage::new(state.db.clone())
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// POST /api/auth/register
///
/// Creates a user and returns a token plus the sanitized profile. Restricted
/// to the configured e-mail domain when one is set.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() || payload.name.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Email, password and name are required".to_string(),
        ));
    }

    if !is_email_allowed(&state.config, &payload.email) {
        return Err(AppError::Forbidden(
            "Registration restricted to the allowed e-mail domain".to_string(),
        ));
    }

    let users = UserStorage::new(state.db.clone());
    if users.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = users
        .create(&payload.email, &password_hash, &payload.name)
        .await?;

    tracing::info!("User registered: {}", user.email);

    let token = generate_token(&user, &state.config)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    if !is_email_allowed(&state.config, &payload.email) {
        return Err(AppError::Forbidden(
            "Access restricted to the allowed e-mail domain".to_string(),
        ));
    }

    let user = UserStorage::new(state.db.clone())
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    tracing::info!("User logged in: {}", user.email);

    let token = generate_token(&user, &state.config)?;
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user": UserResponse::from(user) }))
}
