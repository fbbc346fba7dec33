use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use notable_db::models::UserRow;

use crate::auth::AppState;
use crate::error::{ApiError, AuthError, blocking_join};

/// The authenticated user resolved by the guard, attached to request
/// extensions for downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

/// Resolve the request's bearer token into an authenticated user, or reject.
///
/// Fails with `MissingCredentials` when no bearer token is present, with the
/// specific token error when validation fails, and with `UserNotFound` when
/// the subject no longer resolves (e.g. deleted after issuance).
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingCredentials)?;

    let claims = state.tokens.validate(token)?;

    // Run the blocking user lookup off the async runtime
    let db_state = state.clone();
    let subject = claims.sub.to_string();
    let user = tokio::task::spawn_blocking(move || db_state.db.get_user_by_id(&subject))
        .await
        .map_err(blocking_join)??
        .ok_or(AuthError::UserNotFound)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
