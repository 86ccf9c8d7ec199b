//! Session authentication: token generation, password hashing, login/logout.
//!
//! # Security
//! - Session tokens are random, shown once, and stored only as SHA-256 hashes
//! - Passwords are stored as salted SHA-256 hashes
//! - Constant-time comparison is used for password verification

mod extractor;

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub use extractor::SessionAuth;

use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, Session};

/// Session token prefix.
const TOKEN_PREFIX: &str = "sess_";
/// Length of the random part of a session token.
const TOKEN_RANDOM_LENGTH: usize = 32;
/// Session lifetime.
const SESSION_TTL_DAYS: i64 = 7;
/// Salt length for password hashing, in bytes.
const SALT_LENGTH: usize = 16;

/// Generate a new random session token.
pub fn generate_token() -> String {
    let random_part: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(TOKEN_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", TOKEN_PREFIX, random_part)
}

/// Hash a session token with SHA-256 for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt. Stored as `salt$hash`, hex.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LENGTH] = rand::thread_rng().gen();
    format!("{}${}", hex::encode(salt), digest_password(&salt, password))
}

/// Verify a password against a stored `salt$hash` value in constant time.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let computed = digest_password(&salt, password);
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn digest_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authenticate by email and password, creating a new session on success.
///
/// The raw token appears only in the response. Invalid email and invalid
/// password produce the same error.
pub fn login(pool: &DbPool, email: &str, password: &str) -> AppResult<LoginResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let conn = pool.connection();
    let profile = db::profiles::find_by_email(&conn, email)?.ok_or_else(invalid)?;

    if !verify_password(&profile.password_hash, password) {
        return Err(invalid());
    }

    let token = generate_token();
    let session = Session {
        token_hash: hash_token(&token),
        profile_id: profile.id,
        created_at: Utc::now(),
        expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
        revoked_at: None,
    };
    db::sessions::insert_session(&conn, &session)?;

    let user = db::sessions::find_session_user(&conn, &session.token_hash)?
        .ok_or_else(|| AppError::Database("Session vanished after insert".to_string()))?;

    Ok(LoginResponse { token, user })
}

/// Revoke the session behind a raw token. Unknown tokens are a no-op.
pub fn logout(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.connection();
    db::sessions::revoke_session(&conn, &hash_token(token))?;
    Ok(())
}

/// Create a profile with a hashed password. Used by the seed path and the
/// profile creation endpoint.
pub fn create_profile(
    pool: &DbPool,
    name: &str,
    email: &str,
    role: crate::models::UserRole,
    password: &str,
) -> AppResult<crate::models::Profile> {
    let profile = crate::models::Profile {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        phone: None,
        specialization: None,
        profile_image_url: None,
        password_hash: hash_password(password),
        created_at: Utc::now(),
    };
    let conn = pool.connection();
    db::profiles::insert_profile(&conn, &profile)?;
    Ok(profile)
}
