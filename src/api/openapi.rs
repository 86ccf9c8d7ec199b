//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SproutLog Server",
        version = "0.3.0",
        description = "Child-development tracking server: media capture with OCR/transcription, AI-assisted growth reports, role-scoped access for observers, parents, and admins"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Auth endpoints
        api::auth::login,
        api::auth::logout,
        api::auth::me,
        // Profile endpoints
        api::profiles::list_profiles,
        api::profiles::get_profile,
        // Children endpoints
        api::children::create_child,
        api::children::list_children,
        api::children::get_child,
        // Media endpoints
        api::media::capture_media,
        api::media::list_media,
        api::media::get_media,
        api::media::serve_media_file,
        api::media::delete_media,
        // Report endpoints
        api::reports::create_report,
        api::reports::list_reports,
        api::reports::get_report,
        api::reports::review_report,
        api::reports::send_report,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            models::PaginationParams,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Auth
            models::UserRole,
            models::LoginRequest,
            models::LoginResponse,
            models::SessionUser,
            models::ProfileView,
            // Children
            models::Child,
            models::CreateChildRequest,
            // Media
            models::MediaKind,
            models::MediaArtifact,
            models::CaptureResponse,
            models::ListMediaQuery,
            // Reports
            models::GrowthAreaKind,
            models::GrowthRating,
            models::GrowthAreaObservation,
            models::GeneratedReport,
            models::Report,
            models::ReportSummary,
            models::CreateReportRequest,
            models::ListReportsQuery,
            api::reports::ReportListResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Session login and logout"),
        (name = "Profiles", description = "Profile directory"),
        (name = "Children", description = "Child registry"),
        (name = "Media", description = "Media capture and library"),
        (name = "Reports", description = "Growth report generation and review")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add session token security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(crate::config::SESSION_HEADER),
                    ),
                ),
            );
        }
    }
}
