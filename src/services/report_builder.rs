//! Report assembly: validate input, pull processed media text, call the
//! generation strategy, persist atomically.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{
    Child, CreateReportRequest, MediaKind, Report, ReportGenerationInput, SessionUser, UserRole,
};
use crate::services::ai::AiProvider;

/// Validate a creation request into its required parts.
///
/// The error names every missing field at once so the caller fixes the form
/// in one pass. No provider call happens until this passes.
fn validate_request(request: &CreateReportRequest) -> AppResult<(Uuid, NaiveDate, String)> {
    let mut missing = Vec::new();

    if request.child_id.is_none() {
        missing.push("child_id");
    }
    let theme = request.theme.as_deref().unwrap_or("").trim().to_string();
    if theme.is_empty() {
        missing.push("theme");
    }
    let date_str = request.date.as_deref().unwrap_or("").trim().to_string();
    if date_str.is_empty() {
        missing.push("date");
    }

    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;

    Ok((request.child_id.unwrap(), date, theme))
}

/// Check the caller may write reports for this child.
fn authorize_observer(pool: &DbPool, user: &SessionUser, child_id: Uuid) -> AppResult<()> {
    match user.role {
        UserRole::Admin => Ok(()),
        UserRole::Observer => {
            let conn = pool.connection();
            if db::children::observer_has_child(&conn, user.profile_id, child_id)? {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "child is not assigned to this observer".to_string(),
                ))
            }
        }
        UserRole::Parent => Err(AppError::Forbidden(
            "parents cannot create reports".to_string(),
        )),
    }
}

/// Pull extracted text out of previously processed media artifacts, split by
/// kind. Unprocessed artifacts are skipped.
fn collect_media_text(
    pool: &DbPool,
    child_id: Uuid,
    media_ids: &[Uuid],
) -> AppResult<(Vec<String>, Vec<String>)> {
    let mut ocr_texts = Vec::new();
    let mut transcripts = Vec::new();

    let conn = pool.connection();
    for id in media_ids {
        let media = db::media::get_media_by_id(&conn, *id)?
            .ok_or_else(|| AppError::Validation(format!("unknown media id: {}", id)))?;
        if media.child_id != child_id {
            return Err(AppError::Validation(format!(
                "media {} belongs to a different child",
                id
            )));
        }
        match media.processed_text {
            Some(text) if !text.is_empty() => match media.kind {
                MediaKind::Image => ocr_texts.push(text),
                MediaKind::Audio => transcripts.push(text),
            },
            _ => debug!(media_id = %id, "Skipping media without processed text"),
        }
    }

    Ok((ocr_texts, transcripts))
}

fn join_optional(explicit: Option<String>, mut collected: Vec<String>) -> Option<String> {
    if let Some(text) = explicit {
        if !text.trim().is_empty() {
            collected.insert(0, text);
        }
    }
    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n\n"))
    }
}

/// Build, generate, and persist a report for the given request.
pub async fn build_report(
    pool: &DbPool,
    provider: &dyn AiProvider,
    user: &SessionUser,
    request: CreateReportRequest,
) -> AppResult<Report> {
    let (child_id, date, theme) = validate_request(&request)?;
    authorize_observer(pool, user, child_id)?;

    let child: Child = {
        let conn = pool.connection();
        db::children::get_child_by_id(&conn, child_id)?
            .ok_or_else(|| AppError::NotFound(format!("Child {}", child_id)))?
    };

    let (ocr_texts, transcripts) = collect_media_text(pool, child_id, &request.media_ids)?;

    let input = ReportGenerationInput {
        child_name: child.name.clone(),
        child_age: child.age_at(date).to_string(),
        date,
        theme: theme.clone(),
        curiosity_seed: request.curiosity_seed.clone(),
        ocr_text: join_optional(request.ocr_text.clone(), ocr_texts),
        transcription: join_optional(request.transcription.clone(), transcripts),
        observer_notes: request.observer_notes.clone(),
    };

    let generated = provider.generate_report(&input).await?;

    let report = Report {
        id: Uuid::new_v4(),
        child_id,
        observer_id: user.profile_id,
        date,
        theme,
        curiosity_seed: request.curiosity_seed,
        curiosity_response_index: generated.curiosity_response_index,
        overall_score: generated.overall_score,
        parent_note: generated.parent_note,
        growth_areas: generated.growth_areas,
        activated_areas: generated.activated_areas,
        total_areas: generated.total_areas,
        admin_reviewed: false,
        sent_to_parent: false,
        created_at: Utc::now(),
    };

    {
        let mut conn = pool.connection();
        db::reports::insert_report_with_areas(&mut conn, &report)?;
    }

    info!(
        report_id = %report.id,
        child_id = %child_id,
        activated = report.activated_areas,
        total = report.total_areas,
        "Report generated and persisted"
    );

    Ok(report)
}
