//! Domain models for the growth-report server.

use utoipa::ToSchema;

pub mod media;
pub mod profile;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use media::{CaptureResponse, ListMediaQuery, MediaArtifact, MediaKind};
pub use profile::{Child, CreateChildRequest, Profile, ProfileView, UserRole};
pub use report::{
    activated_areas, clamp_curiosity_index, overall_score_label, CreateReportRequest,
    GeneratedReport, GrowthAreaKind, GrowthAreaObservation, GrowthRating, ListReportsQuery,
    Report, ReportGenerationInput, ReportSummary,
};
pub use session::{LoginRequest, LoginResponse, Session, SessionUser};

/// Pagination parameters.
#[derive(Debug, Clone, serde::Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    100
}

impl PaginationParams {
    /// Calculate the offset for database queries. Uses the clamped limit so
    /// offsets stay in step with the page size queries actually run with.
    pub fn offset(&self) -> u32 {
        let page = self.page.unwrap_or(default_page());
        page.saturating_sub(1).saturating_mul(self.clamped_limit())
    }

    /// Clamp limit to maximum allowed value.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.unwrap_or(default_limit()).min(100)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(default_page())
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total as f64) / (limit as f64)).ceil() as u32
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}
