//! Profile directory API handlers.
//!
//! Admins see every profile; other roles can only fetch their own.

use actix_web::{get, web, HttpResponse};
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::ProfileView;

/// List all profiles. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    tag = "Profiles",
    responses(
        (status = 200, description = "Profiles", body = [ProfileView]),
        (status = 403, description = "Not an admin", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/profiles")]
pub async fn list_profiles(pool: web::Data<DbPool>, auth: SessionAuth) -> AppResult<HttpResponse> {
    if !auth.user.is_admin() {
        return Err(AppError::Forbidden(
            "only admins can list profiles".to_string(),
        ));
    }

    let conn = pool.connection();
    let profiles: Vec<ProfileView> = db::profiles::list_profiles(&conn)?
        .into_iter()
        .map(ProfileView::from)
        .collect();
    Ok(HttpResponse::Ok().json(profiles))
}

/// Get a single profile. Admins can fetch anyone; others only themselves.
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile", body = ProfileView),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/profiles/{id}")]
pub async fn get_profile(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let profile_id = path.into_inner();

    // Non-admins get NotFound rather than Forbidden so profile ids are not
    // probeable
    if !auth.user.is_admin() && auth.user.profile_id != profile_id {
        return Err(AppError::NotFound(format!("Profile {}", profile_id)));
    }

    let conn = pool.connection();
    let profile = db::profiles::find_by_id(&conn, profile_id)?
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", profile_id)))?;

    Ok(HttpResponse::Ok().json(ProfileView::from(profile)))
}

/// Configure profile routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_profiles).service(get_profile);
}
