use notable_db::models::NoteRow;

use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Owner-only access: a note may be read, updated, or deleted only by the
/// user who created it. Listing never goes through this check — it is scoped
/// to the requester at the query.
pub fn ensure_owner(note: &NoteRow, user: &CurrentUser) -> Result<(), ApiError> {
    if note.owner_id == user.0.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
