use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::Database;
use crate::error::StoreError;
use crate::models::{NoteRow, UserRow};
use crate::now_rfc3339;

/// Optional fields for a user update. `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// Optional fields for a note update. `body` distinguishes unchanged
/// (`None`) from explicitly cleared (`Some(None)`).
#[derive(Debug, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
}

impl Database {
    // -- Users --

    /// Insert a new user. The UNIQUE index on email is the source of truth
    /// for duplicates; a constraint violation maps to `DuplicateEmail`.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRow, StoreError> {
        let now = now_rfc3339();
        let row = UserRow {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.email,
                    row.password_hash,
                    row.created_at,
                    row.updated_at
                ],
            )
            .map_err(map_unique_violation)?;
            Ok(())
        })?;

        Ok(row)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Apply the provided fields only; `updated_at` is refreshed. Fails with
    /// `NotFound` if the id is absent, `DuplicateEmail` if a changed email
    /// collides with another account.
    pub fn update_user(&self, id: &str, changes: UserChanges) -> Result<UserRow, StoreError> {
        self.with_conn_mut(|conn| {
            let mut row = query_user(conn, "id", id)?.ok_or(StoreError::NotFound)?;

            if let Some(name) = changes.name {
                row.name = name;
            }
            if let Some(email) = changes.email {
                row.email = email;
            }
            if let Some(password_hash) = changes.password_hash {
                row.password_hash = password_hash;
            }
            row.updated_at = now_rfc3339();

            conn.execute(
                "UPDATE users SET name = ?2, email = ?3, password_hash = ?4, updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![row.id, row.name, row.email, row.password_hash, row.updated_at],
            )
            .map_err(map_unique_violation)?;

            Ok(row)
        })
    }

    // -- Notes --

    /// Insert a new note owned by `owner_id`. Ownership is set here and
    /// never reassigned; no UPDATE statement touches `owner_id`.
    pub fn create_note(
        &self,
        title: &str,
        body: Option<&str>,
        owner_id: &str,
    ) -> Result<NoteRow, StoreError> {
        let now = now_rfc3339();
        let row = NoteRow {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            body: body.map(str::to_string),
            owner_id: owner_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notes (id, title, body, owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.title,
                    row.body,
                    row.owner_id,
                    row.created_at,
                    row.updated_at
                ],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    pub fn get_note_by_id(&self, id: &str) -> Result<Option<NoteRow>, StoreError> {
        self.with_conn(|conn| query_note(conn, id))
    }

    /// Notes owned by `owner_id`, most recently updated first. Scoping
    /// happens in the query itself, never by filtering a global list.
    pub fn list_notes_by_owner(&self, owner_id: &str) -> Result<Vec<NoteRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, body, owner_id, created_at, updated_at
                 FROM notes
                 WHERE owner_id = ?1
                 ORDER BY updated_at DESC, created_at DESC",
            )?;

            let rows = stmt
                .query_map([owner_id], note_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Apply the provided fields only; `updated_at` is refreshed. Does not
    /// check ownership — that is the access policy's responsibility.
    pub fn update_note(&self, id: &str, changes: NoteChanges) -> Result<NoteRow, StoreError> {
        self.with_conn_mut(|conn| {
            let mut row = query_note(conn, id)?.ok_or(StoreError::NotFound)?;

            if let Some(title) = changes.title {
                row.title = title;
            }
            if let Some(body) = changes.body {
                row.body = body;
            }
            row.updated_at = now_rfc3339();

            conn.execute(
                "UPDATE notes SET title = ?2, body = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![row.id, row.title, row.body, row.updated_at],
            )?;

            Ok(row)
        })
    }

    /// Returns false if the id is absent, true after removing the record.
    pub fn delete_note(&self, id: &str) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>, StoreError> {
    // `column` is a compile-time constant at every call site
    let sql = format!(
        "SELECT id, name, email, password_hash, created_at, updated_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_note(conn: &Connection, id: &str) -> Result<Option<NoteRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, body, owner_id, created_at, updated_at
         FROM notes WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], note_from_row).optional()?;

    Ok(row)
}

fn note_from_row(row: &rusqlite::Row<'_>) -> Result<NoteRow, rusqlite::Error> {
    Ok(NoteRow {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateEmail
        }
        _ => StoreError::Sqlite(e),
    }
}
