use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use notable_db::NoteChanges;
use notable_db::models::NoteRow;
use notable_types::api::{NoteCreateRequest, NoteResponse, NoteUpdateRequest};

use crate::auth::AppState;
use crate::error::{ApiError, blocking_join};
use crate::middleware::CurrentUser;
use crate::parse_timestamp;
use crate::policy::ensure_owner;

pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NoteCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::validation("title", "must not be empty"));
    }

    let db_state = state.clone();
    let owner_id = user.0.id;
    let row = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .create_note(&req.title, req.body.as_deref(), &owner_id)
    })
    .await
    .map_err(blocking_join)??;

    Ok((StatusCode::CREATED, Json(to_note_response(row))))
}

/// Only the requester's notes, most recently updated first. The scoping
/// happens in the store query, never by filtering a global list.
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let db_state = state.clone();
    let owner_id = user.0.id.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.list_notes_by_owner(&owner_id))
        .await
        .map_err(blocking_join)??;

    Ok(Json(rows.into_iter().map(to_note_response).collect()))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(note_id): Path<Uuid>,
) -> Result<Json<NoteResponse>, ApiError> {
    let row = fetch_note(&state, note_id).await?;
    ensure_owner(&row, &user)?;

    Ok(Json(to_note_response(row)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(note_id): Path<Uuid>,
    Json(req): Json<NoteUpdateRequest>,
) -> Result<Json<NoteResponse>, ApiError> {
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(ApiError::validation("title", "must not be empty"));
        }
    }

    let row = fetch_note(&state, note_id).await?;
    ensure_owner(&row, &user)?;

    let db_state = state.clone();
    let changes = NoteChanges {
        title: req.title,
        body: req.body,
    };
    let updated = tokio::task::spawn_blocking(move || {
        db_state.db.update_note(&note_id.to_string(), changes)
    })
    .await
    .map_err(blocking_join)??;

    Ok(Json(to_note_response(updated)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(note_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let row = fetch_note(&state, note_id).await?;
    ensure_owner(&row, &user)?;

    let db_state = state.clone();
    let deleted = tokio::task::spawn_blocking(move || db_state.db.delete_note(&note_id.to_string()))
        .await
        .map_err(blocking_join)??;

    // Removed concurrently between the ownership check and the delete.
    if !deleted {
        return Err(ApiError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_note(state: &AppState, note_id: Uuid) -> Result<NoteRow, ApiError> {
    let db_state = state.clone();
    tokio::task::spawn_blocking(move || db_state.db.get_note_by_id(&note_id.to_string()))
        .await
        .map_err(blocking_join)??
        .ok_or(ApiError::NotFound)
}

fn to_note_response(row: NoteRow) -> NoteResponse {
    NoteResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt note id '{}': {}", row.id, e);
            Uuid::default()
        }),
        owner_id: row.owner_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt owner_id '{}' on note '{}': {}", row.owner_id, row.id, e);
            Uuid::default()
        }),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
        title: row.title,
        body: row.body,
    }
}
