//! Session queries. Tokens are stored as sha256 hashes only.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Session, SessionUser, UserRole};

/// Insert a new session row.
pub fn insert_session(conn: &Connection, session: &Session) -> AppResult<()> {
    conn.execute(
        "INSERT INTO sessions (token_hash, profile_id, created_at, expires_at, revoked_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.token_hash.as_str(),
            session.profile_id.to_string(),
            session.created_at.to_rfc3339(),
            session.expires_at.to_rfc3339(),
            session.revoked_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(|e| AppError::Database(format!("Failed to insert session: {}", e)))?;

    Ok(())
}

/// Look up a session by token hash.
pub fn find_session(conn: &Connection, token_hash: &str) -> AppResult<Option<Session>> {
    let result = conn.query_row(
        "SELECT token_hash, profile_id, created_at, expires_at, revoked_at
         FROM sessions WHERE token_hash = ?1",
        params![token_hash],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        },
    );

    let (token_hash, profile_id, created_at, expires_at, revoked_at) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(AppError::Database(e.to_string())),
    };

    let parse_ts = |field: &str, value: &str| -> AppResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(value)
            .map_err(|e| AppError::Database(format!("Invalid {} in sessions table: {}", field, e)))?
            .with_timezone(&Utc))
    };

    Ok(Some(Session {
        token_hash,
        profile_id: Uuid::parse_str(&profile_id)
            .map_err(|e| AppError::Database(format!("Invalid profile_id: {}", e)))?,
        created_at: parse_ts("created_at", &created_at)?,
        expires_at: parse_ts("expires_at", &expires_at)?,
        revoked_at: revoked_at
            .map(|v| parse_ts("revoked_at", &v))
            .transpose()?,
    }))
}

/// Resolve a token hash to its user, joining through profiles.
/// Expired and revoked sessions resolve to `None`.
pub fn find_session_user(conn: &Connection, token_hash: &str) -> AppResult<Option<SessionUser>> {
    let session = match find_session(conn, token_hash)? {
        Some(s) => s,
        None => return Ok(None),
    };
    if session.is_revoked() || session.is_expired() {
        return Ok(None);
    }

    let result = conn.query_row(
        "SELECT id, name, email, role FROM profiles WHERE id = ?1",
        params![session.profile_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    let (id, name, email, role) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(AppError::Database(e.to_string())),
    };

    Ok(Some(SessionUser {
        profile_id: Uuid::parse_str(&id)
            .map_err(|e| AppError::Database(format!("Invalid profile id: {}", e)))?,
        name,
        email,
        role: UserRole::parse(&role)
            .ok_or_else(|| AppError::Database(format!("Invalid role: {}", role)))?,
    }))
}

/// Revoke a session. Returns whether a live session was revoked.
pub fn revoke_session(conn: &Connection, token_hash: &str) -> AppResult<bool> {
    let changed = conn
        .execute(
            "UPDATE sessions SET revoked_at = ?1 WHERE token_hash = ?2 AND revoked_at IS NULL",
            params![Utc::now().to_rfc3339(), token_hash],
        )
        .map_err(|e| AppError::Database(format!("Failed to revoke session: {}", e)))?;
    Ok(changed > 0)
}
