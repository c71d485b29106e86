use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Read a TEXT column holding a uuid
pub fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).with_context(|| format!("Invalid uuid in column {}: {}", column, raw))
}

pub fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        Uuid::parse_str(&s).with_context(|| format!("Invalid uuid in column {}: {}", column, s))
    })
    .transpose()
}

pub fn opt_uuid_to_string(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}
