//! Child queries and observer/parent mappings.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Child;

struct ChildRow {
    id: String,
    name: String,
    date_of_birth: String,
    class: Option<String>,
    profile_image_url: Option<String>,
    created_at: String,
}

fn map_child_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChildRow> {
    Ok(ChildRow {
        id: row.get(0)?,
        name: row.get(1)?,
        date_of_birth: row.get(2)?,
        class: row.get(3)?,
        profile_image_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_child(row: ChildRow) -> AppResult<Child> {
    Ok(Child {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| AppError::Database(format!("Invalid child id: {}", e)))?,
        name: row.name,
        date_of_birth: NaiveDate::parse_from_str(&row.date_of_birth, "%Y-%m-%d")
            .map_err(|e| AppError::Database(format!("Invalid date_of_birth: {}", e)))?,
        class: row.class,
        profile_image_url: row.profile_image_url,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| AppError::Database(format!("Invalid created_at: {}", e)))?
            .with_timezone(&Utc),
    })
}

/// Insert a new child.
pub fn insert_child(conn: &Connection, child: &Child) -> AppResult<()> {
    conn.execute(
        "INSERT INTO children (id, name, date_of_birth, class, profile_image_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            child.id.to_string(),
            child.name.as_str(),
            child.date_of_birth.format("%Y-%m-%d").to_string(),
            child.class.as_deref(),
            child.profile_image_url.as_deref(),
            child.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Database(format!("Failed to insert child: {}", e)))?;

    Ok(())
}

/// Get a child by id.
pub fn get_child_by_id(conn: &Connection, id: Uuid) -> AppResult<Option<Child>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, date_of_birth, class, profile_image_url, created_at
             FROM children WHERE id = ?1",
        )
        .map_err(|e| AppError::Database(e.to_string()))?;

    let result = stmt.query_row(params![id.to_string()], map_child_row);

    match result {
        Ok(row) => Ok(Some(row_to_child(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// List all children, newest first.
pub fn list_children(conn: &Connection) -> AppResult<Vec<Child>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, date_of_birth, class, profile_image_url, created_at
             FROM children ORDER BY created_at DESC",
        )
        .map_err(|e| AppError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], map_child_row)
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    rows.into_iter().map(row_to_child).collect()
}

/// List children mapped to an observer.
pub fn list_children_for_observer(conn: &Connection, observer_id: Uuid) -> AppResult<Vec<Child>> {
    list_mapped_children(
        conn,
        "SELECT c.id, c.name, c.date_of_birth, c.class, c.profile_image_url, c.created_at
         FROM children c
         JOIN observer_child_mappings m ON m.child_id = c.id
         WHERE m.observer_id = ?1
         ORDER BY c.created_at DESC",
        observer_id,
    )
}

/// List children mapped to a parent.
pub fn list_children_for_parent(conn: &Connection, parent_id: Uuid) -> AppResult<Vec<Child>> {
    list_mapped_children(
        conn,
        "SELECT c.id, c.name, c.date_of_birth, c.class, c.profile_image_url, c.created_at
         FROM children c
         JOIN parent_child_mappings m ON m.child_id = c.id
         WHERE m.parent_id = ?1
         ORDER BY c.created_at DESC",
        parent_id,
    )
}

fn list_mapped_children(conn: &Connection, sql: &str, profile_id: Uuid) -> AppResult<Vec<Child>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::Database(e.to_string()))?;

    let rows = stmt
        .query_map(params![profile_id.to_string()], map_child_row)
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    rows.into_iter().map(row_to_child).collect()
}

/// Map an observer to a child.
pub fn map_observer(conn: &Connection, observer_id: Uuid, child_id: Uuid) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO observer_child_mappings (observer_id, child_id) VALUES (?1, ?2)",
        params![observer_id.to_string(), child_id.to_string()],
    )
    .map_err(|e| AppError::Database(format!("Failed to map observer: {}", e)))?;
    Ok(())
}

/// Map a parent to a child.
pub fn map_parent(conn: &Connection, parent_id: Uuid, child_id: Uuid) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO parent_child_mappings (parent_id, child_id) VALUES (?1, ?2)",
        params![parent_id.to_string(), child_id.to_string()],
    )
    .map_err(|e| AppError::Database(format!("Failed to map parent: {}", e)))?;
    Ok(())
}

/// Whether an observer is assigned to a child.
pub fn observer_has_child(conn: &Connection, observer_id: Uuid, child_id: Uuid) -> AppResult<bool> {
    mapping_exists(
        conn,
        "SELECT COUNT(*) FROM observer_child_mappings WHERE observer_id = ?1 AND child_id = ?2",
        observer_id,
        child_id,
    )
}

/// Whether a parent is linked to a child.
pub fn parent_has_child(conn: &Connection, parent_id: Uuid, child_id: Uuid) -> AppResult<bool> {
    mapping_exists(
        conn,
        "SELECT COUNT(*) FROM parent_child_mappings WHERE parent_id = ?1 AND child_id = ?2",
        parent_id,
        child_id,
    )
}

fn mapping_exists(conn: &Connection, sql: &str, a: Uuid, b: Uuid) -> AppResult<bool> {
    let count: i64 = conn
        .query_row(sql, params![a.to_string(), b.to_string()], |row| row.get(0))
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(count > 0)
}
