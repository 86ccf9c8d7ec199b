//! Child registry API handlers.
//!
//! Listing is scoped by role: admins see everything, observers and parents
//! see only children mapped to them.

use actix_web::{get, post, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{Child, CreateChildRequest, UserRole};

/// Register a new child. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/children",
    tag = "Children",
    request_body = CreateChildRequest,
    responses(
        (status = 201, description = "Child registered", body = Child),
        (status = 403, description = "Not an admin", body = crate::error::ErrorResponse),
        (status = 422, description = "Invalid input", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/children")]
pub async fn create_child(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    body: web::Json<CreateChildRequest>,
) -> AppResult<HttpResponse> {
    if !auth.user.is_admin() {
        return Err(AppError::Forbidden(
            "only admins can register children".to_string(),
        ));
    }

    let request = body.into_inner();
    if request.name.trim().is_empty() {
        return Err(AppError::Validation(
            "missing required field(s): name".to_string(),
        ));
    }
    let date_of_birth = NaiveDate::parse_from_str(&request.date_of_birth, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date_of_birth must be YYYY-MM-DD".to_string()))?;

    let child = Child {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        date_of_birth,
        class: request.class,
        profile_image_url: None,
        created_at: Utc::now(),
    };

    let conn = pool.connection();
    db::children::insert_child(&conn, &child)?;
    if let Some(observer_id) = request.observer_id {
        db::children::map_observer(&conn, observer_id, child.id)?;
    }
    for parent_id in &request.parent_ids {
        db::children::map_parent(&conn, *parent_id, child.id)?;
    }

    info!(child_id = %child.id, "Child registered");
    Ok(HttpResponse::Created().json(child))
}

/// List children visible to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/children",
    tag = "Children",
    responses(
        (status = 200, description = "Children visible to the caller", body = [Child])
    ),
    security(("session_token" = []))
)]
#[get("/children")]
pub async fn list_children(pool: web::Data<DbPool>, auth: SessionAuth) -> AppResult<HttpResponse> {
    let conn = pool.connection();
    let children = match auth.user.role {
        UserRole::Admin => db::children::list_children(&conn)?,
        UserRole::Observer => db::children::list_children_for_observer(&conn, auth.user.profile_id)?,
        UserRole::Parent => db::children::list_children_for_parent(&conn, auth.user.profile_id)?,
    };
    Ok(HttpResponse::Ok().json(children))
}

/// Get a child by id, subject to the same scoping as listing.
#[utoipa::path(
    get,
    path = "/api/v1/children/{id}",
    tag = "Children",
    params(("id" = Uuid, Path, description = "Child id")),
    responses(
        (status = 200, description = "Child", body = Child),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/children/{id}")]
pub async fn get_child(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let child_id = path.into_inner();
    let conn = pool.connection();

    ensure_child_access(&conn, &auth, child_id)?;

    let child = db::children::get_child_by_id(&conn, child_id)?
        .ok_or_else(|| AppError::NotFound(format!("Child {}", child_id)))?;
    Ok(HttpResponse::Ok().json(child))
}

/// Check the caller may read this child. Unmapped callers see a 404, not a
/// 403, so child ids are not probeable.
pub fn ensure_child_access(
    conn: &rusqlite::Connection,
    auth: &SessionAuth,
    child_id: Uuid,
) -> AppResult<()> {
    let allowed = match auth.user.role {
        UserRole::Admin => true,
        UserRole::Observer => {
            db::children::observer_has_child(conn, auth.user.profile_id, child_id)?
        }
        UserRole::Parent => db::children::parent_has_child(conn, auth.user.profile_id, child_id)?,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Child {}", child_id)))
    }
}

/// Configure child routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_child)
        .service(list_children)
        .service(get_child);
}
