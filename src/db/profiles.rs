//! Profile queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Profile, UserRole};

const PROFILE_COLUMNS: &str =
    "id, name, email, role, phone, specialization, profile_image_url, password_hash, created_at";

struct ProfileRow {
    id: String,
    name: String,
    email: String,
    role: String,
    phone: Option<String>,
    specialization: Option<String>,
    profile_image_url: Option<String>,
    password_hash: String,
    created_at: String,
}

fn map_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        phone: row.get(4)?,
        specialization: row.get(5)?,
        profile_image_url: row.get(6)?,
        password_hash: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_profile(row: ProfileRow) -> AppResult<Profile> {
    Ok(Profile {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| AppError::Database(format!("Invalid profile id: {}", e)))?,
        name: row.name,
        email: row.email,
        role: UserRole::parse(&row.role)
            .ok_or_else(|| AppError::Database(format!("Invalid role: {}", row.role)))?,
        phone: row.phone,
        specialization: row.specialization,
        profile_image_url: row.profile_image_url,
        password_hash: row.password_hash,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| AppError::Database(format!("Invalid created_at: {}", e)))?
            .with_timezone(&Utc),
    })
}

/// Insert a new profile.
pub fn insert_profile(conn: &Connection, profile: &Profile) -> AppResult<()> {
    conn.execute(
        "INSERT INTO profiles (id, name, email, role, phone, specialization, profile_image_url, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            profile.id.to_string(),
            profile.name.as_str(),
            profile.email.as_str(),
            profile.role.as_str(),
            profile.phone.as_deref(),
            profile.specialization.as_deref(),
            profile.profile_image_url.as_deref(),
            profile.password_hash.as_str(),
            profile.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Database(format!("Failed to insert profile: {}", e)))?;

    Ok(())
}

/// Find a profile by email.
pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<Profile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM profiles WHERE email = ?1",
            PROFILE_COLUMNS
        ))
        .map_err(|e| AppError::Database(e.to_string()))?;

    let result = stmt.query_row(params![email], map_profile_row);

    match result {
        Ok(row) => Ok(Some(row_to_profile(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// Find a profile by id.
pub fn find_by_id(conn: &Connection, id: Uuid) -> AppResult<Option<Profile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM profiles WHERE id = ?1",
            PROFILE_COLUMNS
        ))
        .map_err(|e| AppError::Database(e.to_string()))?;

    let result = stmt.query_row(params![id.to_string()], map_profile_row);

    match result {
        Ok(row) => Ok(Some(row_to_profile(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// List all profiles, ordered by name.
pub fn list_profiles(conn: &Connection) -> AppResult<Vec<Profile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM profiles ORDER BY name ASC",
            PROFILE_COLUMNS
        ))
        .map_err(|e| AppError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], map_profile_row)
        .map_err(|e| AppError::Database(e.to_string()))?;

    let mut profiles = Vec::new();
    for row in rows {
        profiles.push(row_to_profile(
            row.map_err(|e| AppError::Database(e.to_string()))?,
        )?);
    }
    Ok(profiles)
}
