use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::info;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Interview, NewInterview, PositionStatus};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).map_err(|_| {
        AppError::Validation(format!(
            "'{}' is not a valid date and time (expected YYYY-MM-DD HH:MM)",
            raw.trim()
        ))
    })
}

pub struct ScheduleRequest<'a> {
    pub candidate_id: i64,
    pub position_id: i64,
    pub recruiter_id: Option<i64>,
    pub when: &'a str,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

pub fn schedule(db: &Database, request: &ScheduleRequest) -> Result<i64> {
    let scheduled_at = parse_datetime(request.when)?;
    let candidate = db
        .get_candidate(request.candidate_id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", request.candidate_id)))?;
    let position = db
        .get_position(request.position_id)?
        .ok_or_else(|| AppError::NotFound(format!("position #{}", request.position_id)))?;
    if position.status == PositionStatus::Closed {
        return Err(AppError::Validation(format!("{} is closed", position.title)));
    }

    let id = db.insert_interview(&NewInterview {
        candidate_id: candidate.id,
        position_id: position.id,
        recruiter_id: request.recruiter_id,
        scheduled_at,
        kind: request.kind.clone().filter(|k| !k.trim().is_empty()),
        notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
    })?;
    info!(
        interview_id = id,
        candidate = %candidate.name,
        position = %position.title,
        at = %scheduled_at.format(DATETIME_FORMAT),
        "interview scheduled"
    );
    Ok(id)
}

pub fn upcoming(db: &Database, now: NaiveDateTime) -> Result<Vec<Interview>> {
    db.list_interviews(Some(now))
}

pub fn cancel(db: &Database, id: i64) -> Result<()> {
    db.delete_interview(id)?;
    info!(interview_id = id, "interview cancelled");
    Ok(())
}

/// Interviews bucketed by calendar day, days in order.
pub fn by_day(interviews: &[Interview]) -> BTreeMap<NaiveDate, Vec<&Interview>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Interview>> = BTreeMap::new();
    for interview in interviews {
        days.entry(interview.scheduled_at.date()).or_default().push(interview);
    }
    days
}
