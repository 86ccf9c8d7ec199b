//! Report API handlers: generation, listing, review workflow.

use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::children::ensure_child_access;
use crate::auth::SessionAuth;
use crate::db::{self, reports::ReportFilter, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateReportRequest, ListReportsQuery, Pagination, PaginationParams, ReportSummary, UserRole,
};
use crate::services::ai::AiProvider;
use crate::services::report_builder;

/// Response for the report list endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSummary>,
    pub pagination: Pagination,
}

/// Generate and persist a new report.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report generated", body = crate::models::Report),
        (status = 403, description = "Not allowed for this child", body = crate::error::ErrorResponse),
        (status = 422, description = "Missing required fields", body = crate::error::ErrorResponse),
        (status = 502, description = "Generation failed", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/reports")]
pub async fn create_report(
    pool: web::Data<DbPool>,
    provider: web::Data<Arc<dyn AiProvider>>,
    auth: SessionAuth,
    body: web::Json<CreateReportRequest>,
) -> AppResult<HttpResponse> {
    let report = report_builder::build_report(
        &pool,
        provider.get_ref().as_ref(),
        &auth.user,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(report))
}

/// List report summaries visible to the caller.
///
/// Parents only see reports already released to them.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    tag = "Reports",
    params(
        ("child_id" = Option<Uuid>, Query, description = "Filter by child"),
        ("page" = Option<u32>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u32>, Query, description = "Page size, max 100")
    ),
    responses(
        (status = 200, description = "Report summaries", body = ReportListResponse)
    ),
    security(("session_token" = []))
)]
#[get("/reports")]
pub async fn list_reports(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    query: web::Query<ListReportsQuery>,
) -> AppResult<HttpResponse> {
    let conn = pool.connection();

    if let Some(child_id) = query.child_id {
        ensure_child_access(&conn, &auth, child_id)?;
    } else if auth.user.role != UserRole::Admin {
        return Err(AppError::InvalidInput(
            "child_id is required for non-admin callers".to_string(),
        ));
    }

    let filter = ReportFilter {
        child_id: query.child_id,
        sent_only: auth.user.role == UserRole::Parent,
    };

    let params = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let limit = params.clamped_limit();
    let reports = db::reports::list_reports(&conn, filter, limit, params.offset())?;
    let total = db::reports::count_reports(&conn, filter)?;

    Ok(HttpResponse::Ok().json(ReportListResponse {
        reports,
        pagination: Pagination::new(params.page(), limit, total),
    }))
}

/// Get a full report, growth areas included.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = crate::models::Report),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/reports/{id}")]
pub async fn get_report(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();
    let conn = pool.connection();

    let report = db::reports::get_report_by_id(&conn, report_id)?
        .ok_or_else(|| AppError::NotFound(format!("Report {}", report_id)))?;
    ensure_child_access(&conn, &auth, report.child_id)?;

    if auth.user.role == UserRole::Parent && !report.sent_to_parent {
        return Err(AppError::NotFound(format!("Report {}", report_id)));
    }

    Ok(HttpResponse::Ok().json(report))
}

/// Mark a report as reviewed. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/review",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 204, description = "Marked reviewed"),
        (status = 403, description = "Not an admin", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/reports/{id}/review")]
pub async fn review_report(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if !auth.user.is_admin() {
        return Err(AppError::Forbidden(
            "only admins can review reports".to_string(),
        ));
    }

    let report_id = path.into_inner();
    let conn = pool.connection();
    if !db::reports::set_admin_reviewed(&conn, report_id)? {
        return Err(AppError::NotFound(format!("Report {}", report_id)));
    }
    info!(report_id = %report_id, admin = %auth.user.email, "Report reviewed");
    Ok(HttpResponse::NoContent().finish())
}

/// Release a report to parents. Admin only.
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/send",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 204, description = "Released to parents"),
        (status = 403, description = "Not an admin", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/reports/{id}/send")]
pub async fn send_report(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if !auth.user.is_admin() {
        return Err(AppError::Forbidden(
            "only admins can release reports".to_string(),
        ));
    }

    let report_id = path.into_inner();
    let conn = pool.connection();
    if !db::reports::set_sent_to_parent(&conn, report_id)? {
        return Err(AppError::NotFound(format!("Report {}", report_id)));
    }
    info!(report_id = %report_id, admin = %auth.user.email, "Report released to parents");
    Ok(HttpResponse::NoContent().finish())
}

/// Configure report routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_report)
        .service(list_reports)
        .service(get_report)
        .service(review_report)
        .service(send_report);
}
