//! Actix-web extractor for session authentication.
//!
//! # Security
//! - The raw token is wrapped in `SecretString` as soon as it leaves the header
//! - Only the SHA-256 hash touches the database
//! - Memory is zeroized when the request completes

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use secrecy::{ExposeSecret, SecretString};
use std::future::{ready, Ready};

use super::hash_token;
use crate::config::SESSION_HEADER;
use crate::db::{sessions, DbPool};
use crate::error::ErrorResponse;
use crate::models::SessionUser;

/// Pull the session token from `Authorization: Bearer` or the session header,
/// wrapping it in SecretString. Returns None if neither is present.
fn extract_token(req: &HttpRequest) -> Option<SecretString> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok());

    bearer
        .or(header)
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for the extractor.
#[derive(Debug)]
pub struct AuthError {
    message: String,
    status: StatusCode,
}

impl AuthError {
    fn unauthorized(message: impl Into<String>) -> Self {
        AuthError {
            message: message.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// Session lookup infrastructure failed. The cause is logged; the
    /// response carries no detail.
    fn unavailable() -> Self {
        AuthError {
            message: "Authentication is temporarily unavailable".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        let code = if self.status == StatusCode::UNAUTHORIZED {
            "UNAUTHORIZED"
        } else {
            "INTERNAL_ERROR"
        };
        HttpResponse::build(self.status).json(ErrorResponse {
            error: code.to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor that requires a live session.
///
/// Use this in handlers that require authentication:
/// ```ignore
/// async fn protected_handler(auth: SessionAuth) -> impl Responder {
///     // auth.user is the authenticated user
/// }
/// ```
pub struct SessionAuth {
    pub user: SessionUser,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = match req.app_data::<web::Data<DbPool>>() {
            Some(pool) => pool,
            None => return ready(Err(AuthError::unavailable())),
        };

        let token = match extract_token(req) {
            Some(token) => token,
            None => {
                return ready(Err(AuthError::unauthorized(format!(
                    "Missing session token. Provide Authorization: Bearer or {} header.",
                    SESSION_HEADER
                ))));
            }
        };

        let token_hash = hash_token(token.expose_secret());
        // token dropped here, memory zeroized

        let conn = pool.connection();
        match sessions::find_session_user(&conn, &token_hash) {
            Ok(Some(user)) => ready(Ok(SessionAuth { user })),
            Ok(None) => ready(Err(AuthError::unauthorized("Invalid or expired session"))),
            Err(e) => {
                tracing::error!("Session lookup failed: {}", e);
                ready(Err(AuthError::unavailable()))
            }
        }
    }
}
