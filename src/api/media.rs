//! Media capture and library API handlers.
//!
//! `POST /media` takes a multipart form with a `file` part plus text fields
//! and runs the full capture pipeline. The extracted text always comes back
//! on pipeline success, even when the save step failed.

use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpResponse};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::children::ensure_child_access;
use crate::auth::SessionAuth;
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{ListMediaQuery, MediaKind, UserRole};
use crate::services::ai::AiProvider;
use crate::services::capture::{self, CaptureRequest};
use crate::services::Storage;

/// Parsed multipart capture form.
struct CaptureForm {
    child_id: Option<Uuid>,
    kind: Option<MediaKind>,
    description: Option<String>,
    bytes: Vec<u8>,
    extension: Option<String>,
}

async fn read_capture_form(mut payload: Multipart, max_size: usize) -> AppResult<CaptureForm> {
    let mut form = CaptureForm {
        child_id: None,
        kind: None,
        description: None,
        bytes: Vec::new(),
        extension: None,
    };

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;
        let field_name = content_disposition.get_name().map(|s| s.to_string());
        let file_name = content_disposition.get_filename().map(|s| s.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            data.extend_from_slice(&chunk);
            if data.len() > max_size {
                return Err(AppError::InvalidInput(format!(
                    "Media exceeds maximum upload size of {} bytes",
                    max_size
                )));
            }
        }

        match field_name.as_deref() {
            Some("file") => {
                form.extension = file_name
                    .as_deref()
                    .and_then(|n| n.rsplit_once('.'))
                    .map(|(_, ext)| ext.to_lowercase());
                form.bytes = data;
            }
            Some("child_id") => {
                let text = String::from_utf8_lossy(&data);
                form.child_id = Some(Uuid::parse_str(text.trim()).map_err(|_| {
                    AppError::InvalidInput("child_id must be a UUID".to_string())
                })?);
            }
            Some("kind") => {
                let text = String::from_utf8_lossy(&data);
                form.kind = Some(MediaKind::parse(text.trim()).ok_or_else(|| {
                    AppError::InvalidInput("kind must be 'image' or 'audio'".to_string())
                })?);
            }
            Some("description") => {
                let text = String::from_utf8_lossy(&data).trim().to_string();
                if !text.is_empty() {
                    form.description = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Capture and process a media sample.
#[utoipa::path(
    post,
    path = "/api/v1/media",
    tag = "Media",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Capture processed", body = crate::models::CaptureResponse),
        (status = 400, description = "Precondition failed", body = crate::error::ErrorResponse),
        (status = 502, description = "Provider failure", body = crate::error::ErrorResponse),
        (status = 504, description = "Provider timeout", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[post("/media")]
pub async fn capture_media(
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    provider: web::Data<Arc<dyn AiProvider>>,
    config: web::Data<Config>,
    auth: SessionAuth,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    if auth.user.role == UserRole::Parent {
        return Err(AppError::Forbidden(
            "parents cannot capture media".to_string(),
        ));
    }

    let form = read_capture_form(payload, config.max_upload_size).await?;
    let child_id = form
        .child_id
        .ok_or_else(|| AppError::Precondition("no child selected".to_string()))?;
    let kind = form
        .kind
        .ok_or_else(|| AppError::Precondition("no media kind given".to_string()))?;

    {
        let conn = pool.connection();
        ensure_child_access(&conn, &auth, child_id)?;
    }

    let response = capture::process_capture(
        &pool,
        storage.get_ref(),
        provider.get_ref().as_ref(),
        CaptureRequest {
            child_id,
            kind,
            bytes: form.bytes,
            description: form.description,
            extension: form.extension,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// List media for a child, with optional kind and text filters.
#[utoipa::path(
    get,
    path = "/api/v1/media",
    tag = "Media",
    params(
        ("child_id" = Uuid, Query, description = "Child id"),
        ("kind" = Option<String>, Query, description = "image or audio"),
        ("search" = Option<String>, Query, description = "Matches description and processed text")
    ),
    responses(
        (status = 200, description = "Media artifacts", body = [crate::models::MediaArtifact])
    ),
    security(("session_token" = []))
)]
#[get("/media")]
pub async fn list_media(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    query: web::Query<ListMediaQuery>,
) -> AppResult<HttpResponse> {
    let conn = pool.connection();
    ensure_child_access(&conn, &auth, query.child_id)?;

    let media = db::media::list_media(
        &conn,
        query.child_id,
        query.kind,
        query.search.as_deref(),
    )?;
    Ok(HttpResponse::Ok().json(media))
}

/// Get a media artifact by id.
#[utoipa::path(
    get,
    path = "/api/v1/media/{id}",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 200, description = "Media artifact", body = crate::models::MediaArtifact),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/media/{id}")]
pub async fn get_media(
    pool: web::Data<DbPool>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let media_id = path.into_inner();
    let conn = pool.connection();
    let media = db::media::get_media_by_id(&conn, media_id)?
        .ok_or_else(|| AppError::NotFound(format!("Media {}", media_id)))?;
    ensure_child_access(&conn, &auth, media.child_id)?;
    Ok(HttpResponse::Ok().json(media))
}

/// Serve a media file's stored bytes.
#[utoipa::path(
    get,
    path = "/api/v1/media/{id}/file",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 200, description = "Raw media bytes"),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[get("/media/{id}/file")]
pub async fn serve_media_file(
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let media_id = path.into_inner();
    let media = {
        let conn = pool.connection();
        let media = db::media::get_media_by_id(&conn, media_id)?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", media_id)))?;
        ensure_child_access(&conn, &auth, media.child_id)?;
        media
    };

    let (data, content_type) = storage.get(&media.url).await?;
    let content_type = content_type.unwrap_or_else(|| media.kind.content_type().to_string());

    Ok(HttpResponse::Ok().content_type(content_type).body(data))
}

/// Hard-delete a media artifact and its stored file.
#[utoipa::path(
    delete,
    path = "/api/v1/media/{id}",
    tag = "Media",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    ),
    security(("session_token" = []))
)]
#[delete("/media/{id}")]
pub async fn delete_media(
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    auth: SessionAuth,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if auth.user.role == UserRole::Parent {
        return Err(AppError::Forbidden(
            "parents cannot delete media".to_string(),
        ));
    }

    let media_id = path.into_inner();
    {
        let conn = pool.connection();
        let media = db::media::get_media_by_id(&conn, media_id)?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", media_id)))?;
        ensure_child_access(&conn, &auth, media.child_id)?;
    }

    capture::delete_capture(&pool, storage.get_ref(), media_id).await?;
    info!(media_id = %media_id, user = %auth.user.email, "Media deleted by user");
    Ok(HttpResponse::NoContent().finish())
}

/// Configure media routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(capture_media)
        .service(list_media)
        .service(get_media)
        .service(serve_media_file)
        .service(delete_media);
}
