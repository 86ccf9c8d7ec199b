//! Authentication API handlers: login, logout, current user.

use actix_web::{post, get, web, HttpRequest, HttpResponse};
use tracing::info;

use crate::auth::{self, SessionAuth};
use crate::config::SESSION_HEADER;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::LoginRequest;

/// Log in with email and password.
///
/// The session token in the response is shown exactly once.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = crate::models::LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/login")]
pub async fn login(
    pool: web::Data<DbPool>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let response = auth::login(&pool, &body.email, &body.password)?;
    info!(user = %response.user.email, role = %response.user.role, "User logged in");
    Ok(HttpResponse::Ok().json(response))
}

/// Revoke the current session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/auth/logout")]
pub async fn logout(
    pool: web::Data<DbPool>,
    req: HttpRequest,
    _auth: SessionAuth,
) -> AppResult<HttpResponse> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| {
            req.headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
        })
        .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

    auth::logout(&pool, token)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Return the authenticated user.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = crate::models::SessionUser),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/auth/me")]
pub async fn me(auth: SessionAuth) -> HttpResponse {
    HttpResponse::Ok().json(auth.user)
}

/// Configure auth routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(logout).service(me);
}
