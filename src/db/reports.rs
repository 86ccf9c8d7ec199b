//! Report and growth area queries.
//!
//! A report and its growth areas are written in a single transaction so a
//! partial write never becomes visible. Derived counts are recomputed from
//! the observation rows on load.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    activated_areas, GrowthAreaKind, GrowthAreaObservation, GrowthRating, Report, ReportSummary,
};

const REPORT_COLUMNS: &str = "id, child_id, observer_id, date, theme, curiosity_seed, \
     curiosity_response_index, overall_score, parent_note, admin_reviewed, sent_to_parent, \
     created_at";

struct ReportRow {
    id: String,
    child_id: String,
    observer_id: String,
    date: String,
    theme: String,
    curiosity_seed: Option<String>,
    curiosity_response_index: f64,
    overall_score: String,
    parent_note: String,
    admin_reviewed: i64,
    sent_to_parent: i64,
    created_at: String,
}

fn map_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        child_id: row.get(1)?,
        observer_id: row.get(2)?,
        date: row.get(3)?,
        theme: row.get(4)?,
        curiosity_seed: row.get(5)?,
        curiosity_response_index: row.get(6)?,
        overall_score: row.get(7)?,
        parent_note: row.get(8)?,
        admin_reviewed: row.get(9)?,
        sent_to_parent: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn parse_uuid(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::Database(format!("Invalid {} in reports table: {}", field, e)))
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::Database(format!("Invalid report date: {}", e)))
}

fn parse_created_at(value: &str) -> AppResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| AppError::Database(format!("Invalid created_at: {}", e)))?
        .with_timezone(&Utc))
}

fn row_to_summary(row: ReportRow) -> AppResult<ReportSummary> {
    Ok(ReportSummary {
        id: parse_uuid("id", &row.id)?,
        child_id: parse_uuid("child_id", &row.child_id)?,
        observer_id: parse_uuid("observer_id", &row.observer_id)?,
        date: parse_date(&row.date)?,
        theme: row.theme,
        curiosity_seed: row.curiosity_seed,
        overall_score: row.overall_score,
        curiosity_response_index: row.curiosity_response_index,
        admin_reviewed: row.admin_reviewed != 0,
        sent_to_parent: row.sent_to_parent != 0,
        created_at: parse_created_at(&row.created_at)?,
    })
}

fn row_to_report(row: ReportRow, areas: Vec<GrowthAreaObservation>) -> AppResult<Report> {
    let activated = activated_areas(&areas);
    let total = areas.len() as i32;
    Ok(Report {
        id: parse_uuid("id", &row.id)?,
        child_id: parse_uuid("child_id", &row.child_id)?,
        observer_id: parse_uuid("observer_id", &row.observer_id)?,
        date: parse_date(&row.date)?,
        theme: row.theme,
        curiosity_seed: row.curiosity_seed,
        curiosity_response_index: row.curiosity_response_index,
        overall_score: row.overall_score,
        parent_note: row.parent_note,
        growth_areas: areas,
        activated_areas: activated,
        total_areas: total,
        admin_reviewed: row.admin_reviewed != 0,
        sent_to_parent: row.sent_to_parent != 0,
        created_at: parse_created_at(&row.created_at)?,
    })
}

fn load_growth_areas(conn: &Connection, report_id: Uuid) -> AppResult<Vec<GrowthAreaObservation>> {
    let mut stmt = conn
        .prepare(
            "SELECT area, rating, observation, emoji FROM growth_areas
             WHERE report_id = ?1 ORDER BY position ASC",
        )
        .map_err(|e| AppError::Database(e.to_string()))?;

    let rows = stmt
        .query_map(params![report_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    rows.into_iter()
        .map(|(area, rating, observation, emoji)| {
            Ok(GrowthAreaObservation {
                area: GrowthAreaKind::parse(&area)
                    .ok_or_else(|| AppError::Database(format!("Invalid growth area: {}", area)))?,
                rating: GrowthRating::parse(&rating)
                    .ok_or_else(|| AppError::Database(format!("Invalid rating: {}", rating)))?,
                observation,
                emoji,
            })
        })
        .collect()
}

/// Persist a report and its growth areas atomically.
pub fn insert_report_with_areas(conn: &mut Connection, report: &Report) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Persistence(format!("Failed to start transaction: {}", e)))?;

    tx.execute(
        &format!(
            "INSERT INTO reports ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            REPORT_COLUMNS
        ),
        params![
            report.id.to_string(),
            report.child_id.to_string(),
            report.observer_id.to_string(),
            report.date.format("%Y-%m-%d").to_string(),
            report.theme.as_str(),
            report.curiosity_seed.as_deref(),
            report.curiosity_response_index,
            report.overall_score.as_str(),
            report.parent_note.as_str(),
            report.admin_reviewed as i64,
            report.sent_to_parent as i64,
            report.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Persistence(format!("Failed to insert report: {}", e)))?;

    for (position, area) in report.growth_areas.iter().enumerate() {
        tx.execute(
            "INSERT INTO growth_areas (report_id, area, rating, observation, emoji, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.id.to_string(),
                area.area.as_str(),
                area.rating.as_str(),
                area.observation.as_str(),
                area.emoji.as_str(),
                position as i64,
            ],
        )
        .map_err(|e| AppError::Persistence(format!("Failed to insert growth area: {}", e)))?;
    }

    tx.commit()
        .map_err(|e| AppError::Persistence(format!("Failed to commit report: {}", e)))?;

    Ok(())
}

/// Get a report with its ordered growth areas.
pub fn get_report_by_id(conn: &Connection, id: Uuid) -> AppResult<Option<Report>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM reports WHERE id = ?1",
            REPORT_COLUMNS
        ))
        .map_err(|e| AppError::Database(e.to_string()))?;

    let result = stmt.query_row(params![id.to_string()], map_report_row);

    match result {
        Ok(row) => {
            let areas = load_growth_areas(conn, id)?;
            Ok(Some(row_to_report(row, areas)?))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// Filters applied when listing reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub child_id: Option<Uuid>,
    /// When set, only reports already released to parents are returned.
    pub sent_only: bool,
}

/// List report summaries, newest first, with pagination.
pub fn list_reports(
    conn: &Connection,
    filter: ReportFilter,
    limit: u32,
    offset: u32,
) -> AppResult<Vec<ReportSummary>> {
    let mut sql = format!("SELECT {} FROM reports WHERE 1 = 1", REPORT_COLUMNS);
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(child_id) = filter.child_id {
        values.push(Box::new(child_id.to_string()));
        sql.push_str(&format!(" AND child_id = ?{}", values.len()));
    }
    if filter.sent_only {
        sql.push_str(" AND sent_to_parent = 1");
    }

    values.push(Box::new(limit as i64));
    sql.push_str(&format!(" ORDER BY created_at DESC LIMIT ?{}", values.len()));
    values.push(Box::new(offset as i64));
    sql.push_str(&format!(" OFFSET ?{}", values.len()));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Database(e.to_string()))?;

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|v| v.as_ref()).collect();

    let rows = stmt
        .query_map(params_refs.as_slice(), map_report_row)
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    rows.into_iter().map(row_to_summary).collect()
}

/// Total number of reports matching the filter.
pub fn count_reports(conn: &Connection, filter: ReportFilter) -> AppResult<u64> {
    let mut sql = "SELECT COUNT(*) FROM reports WHERE 1 = 1".to_string();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(child_id) = filter.child_id {
        values.push(Box::new(child_id.to_string()));
        sql.push_str(&format!(" AND child_id = ?{}", values.len()));
    }
    if filter.sent_only {
        sql.push_str(" AND sent_to_parent = 1");
    }

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|v| v.as_ref()).collect();

    let count: i64 = conn
        .query_row(&sql, params_refs.as_slice(), |row| row.get(0))
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(count as u64)
}

/// Mark a report as reviewed by an admin. Returns whether a row changed.
pub fn set_admin_reviewed(conn: &Connection, id: Uuid) -> AppResult<bool> {
    let changed = conn
        .execute(
            "UPDATE reports SET admin_reviewed = 1 WHERE id = ?1",
            params![id.to_string()],
        )
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(changed > 0)
}

/// Release a report to parents. Returns whether a row changed.
pub fn set_sent_to_parent(conn: &Connection, id: Uuid) -> AppResult<bool> {
    let changed = conn
        .execute(
            "UPDATE reports SET sent_to_parent = 1 WHERE id = ?1",
            params![id.to_string()],
        )
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{children, migrations, profiles, DbPool};
    use crate::models::{overall_score_label, Child, Profile, UserRole};

    fn seeded_pool() -> (DbPool, Uuid, Uuid) {
        let pool = DbPool::open_in_memory().unwrap();
        migrations::run_migrations(&pool).unwrap();

        let observer = Profile {
            id: Uuid::new_v4(),
            name: "Observer One".to_string(),
            email: "observer@example.com".to_string(),
            role: UserRole::Observer,
            phone: None,
            specialization: None,
            profile_image_url: None,
            password_hash: "x".to_string(),
            created_at: Utc::now(),
        };
        let child = Child {
            id: Uuid::new_v4(),
            name: "Maya".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
            class: None,
            profile_image_url: None,
            created_at: Utc::now(),
        };
        {
            let conn = pool.connection();
            profiles::insert_profile(&conn, &observer).unwrap();
            children::insert_child(&conn, &child).unwrap();
        }
        (pool, child.id, observer.id)
    }

    fn sample_report(child_id: Uuid, observer_id: Uuid) -> Report {
        let areas: Vec<GrowthAreaObservation> = GrowthAreaKind::ALL
            .iter()
            .enumerate()
            .map(|(i, area)| GrowthAreaObservation {
                area: *area,
                rating: if i == 6 {
                    GrowthRating::NeedsWork
                } else {
                    GrowthRating::Good
                },
                observation: format!("Observed {} growth", area),
                emoji: area.default_emoji().to_string(),
            })
            .collect();
        let activated = activated_areas(&areas);
        let total = areas.len() as i32;
        Report {
            id: Uuid::new_v4(),
            child_id,
            observer_id,
            date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            theme: "Gardening".to_string(),
            curiosity_seed: Some("Why do leaves turn yellow?".to_string()),
            curiosity_response_index: 7.5,
            overall_score: overall_score_label(activated, total),
            parent_note: "Maya had a wonderful session.".to_string(),
            growth_areas: areas,
            activated_areas: activated,
            total_areas: total,
            admin_reviewed: false,
            sent_to_parent: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_trip_preserves_observations_and_order() {
        let (pool, child_id, observer_id) = seeded_pool();
        let report = sample_report(child_id, observer_id);
        {
            let mut conn = pool.connection();
            insert_report_with_areas(&mut conn, &report).unwrap();
        }

        let conn = pool.connection();
        let found = get_report_by_id(&conn, report.id).unwrap().unwrap();
        assert_eq!(found.growth_areas, report.growth_areas);
        assert_eq!(found.activated_areas, 6);
        assert_eq!(found.total_areas, 7);
        assert_eq!(
            found.overall_score,
            "Balanced Growth \u{2013} 6/7 Areas Active"
        );
        assert_eq!(found.theme, "Gardening");
        assert!(!found.admin_reviewed);
        assert!(!found.sent_to_parent);
    }

    #[test]
    fn test_list_filters_by_child_and_sent_flag() {
        let (pool, child_id, observer_id) = seeded_pool();
        let first = sample_report(child_id, observer_id);
        let second = sample_report(child_id, observer_id);
        {
            let mut conn = pool.connection();
            insert_report_with_areas(&mut conn, &first).unwrap();
            insert_report_with_areas(&mut conn, &second).unwrap();
        }

        let conn = pool.connection();
        let filter = ReportFilter {
            child_id: Some(child_id),
            sent_only: false,
        };
        assert_eq!(list_reports(&conn, filter, 10, 0).unwrap().len(), 2);
        assert_eq!(count_reports(&conn, filter).unwrap(), 2);

        let sent_filter = ReportFilter {
            child_id: Some(child_id),
            sent_only: true,
        };
        assert!(list_reports(&conn, sent_filter, 10, 0).unwrap().is_empty());

        set_sent_to_parent(&conn, first.id).unwrap();
        let sent = list_reports(&conn, sent_filter, 10, 0).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, first.id);
        assert!(sent[0].sent_to_parent);
    }

    #[test]
    fn test_review_flag_updates() {
        let (pool, child_id, observer_id) = seeded_pool();
        let report = sample_report(child_id, observer_id);
        {
            let mut conn = pool.connection();
            insert_report_with_areas(&mut conn, &report).unwrap();
        }

        let conn = pool.connection();
        assert!(set_admin_reviewed(&conn, report.id).unwrap());
        let found = get_report_by_id(&conn, report.id).unwrap().unwrap();
        assert!(found.admin_reviewed);

        assert!(!set_admin_reviewed(&conn, Uuid::new_v4()).unwrap());
    }
}
