use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;
use uuid::Uuid;

use notable_db::Database;
use notable_db::models::UserRow;
use notable_types::api::{LoginRequest, SignupRequest, TokenResponse, UserResponse};

use crate::error::{ApiError, blocking_join};
use crate::middleware::CurrentUser;
use crate::parse_timestamp;
use crate::password;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("name", "must not be empty"));
    }
    if !req.email.contains('@') || req.email.len() > 100 {
        return Err(ApiError::validation("email", "must be a valid email address"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::validation("password", "must be at least 8 characters"));
    }

    // Hash password with Argon2id
    let password_hash = password::hash(&req.password)?;

    // Run blocking DB insert off the async runtime; the UNIQUE index on
    // email raises DuplicateEmail on collision.
    let db_state = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db_state.db.create_user(&req.name, &req.email, &password_hash)
    })
    .await
    .map_err(blocking_join)??;

    Ok((StatusCode::CREATED, Json(to_user_response(row))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let db_state = state.clone();
    let email = req.email.clone();
    let user = tokio::task::spawn_blocking(move || db_state.db.get_user_by_email(&email))
        .await
        .map_err(blocking_join)??
        // Same response whether the email is unknown or the password is
        // wrong, to avoid user enumeration.
        .ok_or(ApiError::InvalidCredentials)?;

    if !password::verify(&req.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = state.tokens.issue(user_id)?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(to_user_response(user.0))
}

pub(crate) fn to_user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
        name: row.name,
        email: row.email,
    }
}
