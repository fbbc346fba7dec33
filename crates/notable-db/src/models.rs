/// Database row types — these map directly to SQLite rows.
/// Distinct from notable-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NoteRow {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}
