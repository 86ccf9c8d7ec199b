//! Media artifact queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MediaArtifact, MediaKind};

const MEDIA_COLUMNS: &str = "id, child_id, kind, url, description, processed_text, created_at";

struct MediaRow {
    id: String,
    child_id: String,
    kind: String,
    url: String,
    description: Option<String>,
    processed_text: Option<String>,
    created_at: String,
}

fn map_media_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        child_id: row.get(1)?,
        kind: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        processed_text: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_media(row: MediaRow) -> AppResult<MediaArtifact> {
    Ok(MediaArtifact {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| AppError::Database(format!("Invalid media id: {}", e)))?,
        child_id: Uuid::parse_str(&row.child_id)
            .map_err(|e| AppError::Database(format!("Invalid child id: {}", e)))?,
        kind: MediaKind::parse(&row.kind)
            .ok_or_else(|| AppError::Database(format!("Invalid media kind: {}", row.kind)))?,
        url: row.url,
        description: row.description,
        processed_text: row.processed_text,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| AppError::Database(format!("Invalid created_at: {}", e)))?
            .with_timezone(&Utc),
    })
}

/// Insert a new media artifact. `processed_text` starts absent.
pub fn insert_media(conn: &Connection, media: &MediaArtifact) -> AppResult<()> {
    conn.execute(
        "INSERT INTO media (id, child_id, kind, url, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            media.id.to_string(),
            media.child_id.to_string(),
            media.kind.as_str(),
            media.url.as_str(),
            media.description.as_deref(),
            media.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Persistence(format!("Failed to insert media artifact: {}", e)))?;

    Ok(())
}

/// Attach the extracted text to an artifact.
///
/// Guarded by `processed_text IS NULL`: the text is set exactly once and is
/// immutable afterwards.
pub fn attach_processed_text(conn: &Connection, id: Uuid, text: &str) -> AppResult<()> {
    let changed = conn
        .execute(
            "UPDATE media SET processed_text = ?1 WHERE id = ?2 AND processed_text IS NULL",
            params![text, id.to_string()],
        )
        .map_err(|e| AppError::Persistence(format!("Failed to attach processed text: {}", e)))?;

    if changed == 0 {
        return match get_media_by_id(conn, id)? {
            Some(_) => Err(AppError::Persistence(format!(
                "Processed text already attached to media {}",
                id
            ))),
            None => Err(AppError::NotFound(format!("Media {}", id))),
        };
    }

    Ok(())
}

/// Get a media artifact by id.
pub fn get_media_by_id(conn: &Connection, id: Uuid) -> AppResult<Option<MediaArtifact>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM media WHERE id = ?1",
            MEDIA_COLUMNS
        ))
        .map_err(|e| AppError::Database(e.to_string()))?;

    let result = stmt.query_row(params![id.to_string()], map_media_row);

    match result {
        Ok(row) => Ok(Some(row_to_media(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// List media for a child, optionally filtered by kind and a search term
/// matching the description or processed text.
pub fn list_media(
    conn: &Connection,
    child_id: Uuid,
    kind: Option<MediaKind>,
    search: Option<&str>,
) -> AppResult<Vec<MediaArtifact>> {
    let mut sql = format!(
        "SELECT {} FROM media WHERE child_id = ?1",
        MEDIA_COLUMNS
    );
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(child_id.to_string())];

    if let Some(kind) = kind {
        values.push(Box::new(kind.as_str().to_string()));
        sql.push_str(&format!(" AND kind = ?{}", values.len()));
    }

    if let Some(term) = search {
        let pattern = format!("%{}%", term);
        values.push(Box::new(pattern));
        sql.push_str(&format!(
            " AND (description LIKE ?{n} OR processed_text LIKE ?{n})",
            n = values.len()
        ));
    }

    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Database(e.to_string()))?;

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|v| v.as_ref()).collect();

    let rows = stmt
        .query_map(params_refs.as_slice(), map_media_row)
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    rows.into_iter().map(row_to_media).collect()
}

/// Hard-delete a media artifact. Returns whether a row was removed.
pub fn delete_media(conn: &Connection, id: Uuid) -> AppResult<bool> {
    let changed = conn
        .execute("DELETE FROM media WHERE id = ?1", params![id.to_string()])
        .map_err(|e| AppError::Database(format!("Failed to delete media: {}", e)))?;
    Ok(changed > 0)
}
