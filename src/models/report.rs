//! Report domain models and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The seven developmental dimensions assessed per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum GrowthAreaKind {
    Intellectual,
    Emotional,
    Social,
    Creativity,
    Physical,
    Values,
    Independence,
}

impl GrowthAreaKind {
    /// Canonical ordering of all seven areas.
    pub const ALL: [GrowthAreaKind; 7] = [
        Self::Intellectual,
        Self::Emotional,
        Self::Social,
        Self::Creativity,
        Self::Physical,
        Self::Values,
        Self::Independence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intellectual => "Intellectual",
            Self::Emotional => "Emotional",
            Self::Social => "Social",
            Self::Creativity => "Creativity",
            Self::Physical => "Physical",
            Self::Values => "Values",
            Self::Independence => "Independence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Intellectual" => Some(Self::Intellectual),
            "Emotional" => Some(Self::Emotional),
            "Social" => Some(Self::Social),
            "Creativity" => Some(Self::Creativity),
            "Physical" => Some(Self::Physical),
            "Values" => Some(Self::Values),
            "Independence" => Some(Self::Independence),
            _ => None,
        }
    }

    /// Display glyph used when the provider omits one.
    pub fn default_emoji(&self) -> &'static str {
        match self {
            Self::Intellectual => "\u{1F9E0}",  // brain
            Self::Emotional => "\u{1F496}",     // sparkling heart
            Self::Social => "\u{1F91D}",        // handshake
            Self::Creativity => "\u{1F3A8}",    // palette
            Self::Physical => "\u{1F3C3}",      // runner
            Self::Values => "\u{1F331}",        // seedling
            Self::Independence => "\u{1F98B}",  // butterfly
        }
    }
}

impl std::fmt::Display for GrowthAreaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Four-level ordinal rating. Declaration order is ascending, so the derived
/// `Ord` gives excellent > good > fair > needs-work.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthRating {
    NeedsWork,
    Fair,
    Good,
    Excellent,
}

impl GrowthRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsWork => "needs-work",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "needs-work" => Some(Self::NeedsWork),
            "fair" => Some(Self::Fair),
            "good" => Some(Self::Good),
            "excellent" => Some(Self::Excellent),
            _ => None,
        }
    }

    /// An area counts as activated when rated strictly above the lowest tier.
    pub fn is_activated(&self) -> bool {
        *self > Self::NeedsWork
    }
}

impl std::fmt::Display for GrowthRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed growth area within a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GrowthAreaObservation {
    pub area: GrowthAreaKind,
    pub rating: GrowthRating,
    pub observation: String,
    pub emoji: String,
}

/// Count of observations rated strictly above `needs-work`.
pub fn activated_areas(observations: &[GrowthAreaObservation]) -> i32 {
    observations.iter().filter(|o| o.rating.is_activated()).count() as i32
}

/// Human-readable bucketed label derived from the activated/total ratio.
pub fn overall_score_label(activated: i32, total: i32) -> String {
    if total == 0 {
        return "No Areas Assessed".to_string();
    }
    let ratio = activated as f64 / total as f64;
    let tier = if ratio >= 0.99 {
        "Thriving"
    } else if ratio >= 0.7 {
        "Balanced Growth"
    } else if ratio >= 0.4 {
        "Emerging Growth"
    } else {
        "Needs Support"
    };
    format!("{} \u{2013} {}/{} Areas Active", tier, activated, total)
}

/// Clamp the curiosity response index to its documented [1, 10] range.
pub fn clamp_curiosity_index(value: f64) -> f64 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(1.0, 10.0)
}

/// Transient input to the report generation pipeline. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportGenerationInput {
    pub child_name: String,
    pub child_age: String,
    pub date: NaiveDate,
    pub theme: String,
    pub curiosity_seed: Option<String>,
    pub ocr_text: Option<String>,
    pub transcription: Option<String>,
    pub observer_notes: Option<String>,
}

/// Output of a generation strategy after normalization: the observation set
/// plus derived metrics and the parent-facing note.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeneratedReport {
    pub growth_areas: Vec<GrowthAreaObservation>,
    pub curiosity_response_index: f64,
    pub activated_areas: i32,
    pub total_areas: i32,
    pub parent_note: String,
    pub overall_score: String,
}

/// A persisted growth report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Report {
    pub id: Uuid,
    pub child_id: Uuid,
    pub observer_id: Uuid,
    pub date: NaiveDate,
    pub theme: String,
    pub curiosity_seed: Option<String>,
    pub curiosity_response_index: f64,
    pub overall_score: String,
    pub parent_note: String,
    /// Ordered observation set, one row per area.
    pub growth_areas: Vec<GrowthAreaObservation>,
    pub activated_areas: i32,
    pub total_areas: i32,
    pub admin_reviewed: bool,
    pub sent_to_parent: bool,
    pub created_at: DateTime<Utc>,
}

/// Report summary for list responses (no growth areas).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportSummary {
    pub id: Uuid,
    pub child_id: Uuid,
    pub observer_id: Uuid,
    pub date: NaiveDate,
    pub theme: String,
    pub curiosity_seed: Option<String>,
    pub overall_score: String,
    pub curiosity_response_index: f64,
    pub admin_reviewed: bool,
    pub sent_to_parent: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to generate and persist a new report.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    /// Target student.
    pub child_id: Option<Uuid>,
    /// Session date (YYYY-MM-DD).
    #[serde(default)]
    pub date: Option<String>,
    /// Theme of the day.
    #[serde(default)]
    pub theme: Option<String>,
    /// Curiosity seed topic explored in the session.
    #[serde(default)]
    pub curiosity_seed: Option<String>,
    /// Free-text observer notes.
    #[serde(default)]
    pub observer_notes: Option<String>,
    /// Inline OCR text, if the caller already has it.
    #[serde(default)]
    pub ocr_text: Option<String>,
    /// Inline transcript text, if the caller already has it.
    #[serde(default)]
    pub transcription: Option<String>,
    /// Previously processed media whose extracted text should be attached.
    #[serde(default)]
    pub media_ids: Vec<Uuid>,
}

/// Query parameters for listing reports.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    /// Filter by student.
    #[serde(default)]
    pub child_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
