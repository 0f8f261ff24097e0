//! Talent Pool filtering.
//!
//! Every active predicate narrows the set: the base filters are applied in
//! order over the whole candidate collection, then the sourcing filters
//! narrow further when `linkedin_only` is set. Nothing here widens a result.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::candidates::normalize_linkedin;
use crate::models::{
    Candidate, OutreachRecord, OutreachStatus, PipelineEntry, PipelineStatus, split_skills,
};
use crate::outreach::latest_by_linkedin;

#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    /// Case-insensitive substring of name, email, phone or notes.
    pub search: Option<String>,
    /// Comma-delimited; every listed skill must be present.
    pub skills: Option<String>,
    pub location: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub has_resume: bool,
    pub has_linkedin: bool,
    pub in_active_pipeline: bool,
    pub linkedin_only: bool,
    pub sourcing: SourcingFilter,
}

/// Filters over outreach history, only consulted with `linkedin_only`.
#[derive(Debug, Clone, Default)]
pub struct SourcingFilter {
    pub position_id: Option<i64>,
    pub last_status: Option<OutreachStatus>,
    pub min_rating: Option<u8>,
    pub recruiter_id: Option<i64>,
}

impl SourcingFilter {
    pub fn is_empty(&self) -> bool {
        self.position_id.is_none()
            && self.last_status.is_none()
            && self.min_rating.is_none()
            && self.recruiter_id.is_none()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(needle))
}

fn matches_search(c: &Candidate, needle: &str) -> bool {
    c.name.to_lowercase().contains(needle)
        || contains_ci(&c.email, needle)
        || contains_ci(&c.phone, needle)
        || contains_ci(&c.notes, needle)
}

fn has_all_skills(c: &Candidate, wanted: &[String]) -> bool {
    let have: HashSet<String> = c.skill_list().iter().map(|s| s.to_lowercase()).collect();
    wanted.iter().all(|s| have.contains(&s.to_lowercase()))
}

/// Candidates with at least one live entry: stage not terminal and status not Reject.
pub fn active_pipeline_candidates(pipeline: &[PipelineEntry]) -> HashSet<i64> {
    pipeline
        .iter()
        .filter(|e| !e.stage.is_terminal() && e.status != PipelineStatus::Reject)
        .map(|e| e.candidate_id)
        .collect()
}

pub fn apply<'a>(
    filter: &PoolFilter,
    candidates: &'a [Candidate],
    pipeline: &[PipelineEntry],
    outreach: &[OutreachRecord],
) -> Vec<&'a Candidate> {
    let mut pool: Vec<&Candidate> = candidates.iter().collect();

    if let Some(needle) = non_blank(&filter.search) {
        let needle = needle.to_lowercase();
        pool.retain(|c| matches_search(c, &needle));
    }
    if let Some(skills) = non_blank(&filter.skills) {
        let wanted = split_skills(skills);
        pool.retain(|c| has_all_skills(c, &wanted));
    }
    if let Some(location) = non_blank(&filter.location) {
        pool.retain(|c| {
            c.location
                .as_deref()
                .is_some_and(|l| l.trim().eq_ignore_ascii_case(location))
        });
    }
    if let Some(from) = filter.created_from {
        pool.retain(|c| c.created_at.date() >= from);
    }
    if let Some(to) = filter.created_to {
        pool.retain(|c| c.created_at.date() <= to);
    }
    if filter.has_resume {
        pool.retain(|c| non_blank(&c.resume_url).is_some());
    }
    if filter.has_linkedin {
        pool.retain(|c| non_blank(&c.linkedin_url).is_some());
    }
    if filter.in_active_pipeline {
        let active = active_pipeline_candidates(pipeline);
        pool.retain(|c| active.contains(&c.id));
    }

    if filter.linkedin_only {
        pool.retain(|c| non_blank(&c.linkedin_url).is_some());
        if !filter.sourcing.is_empty() {
            pool = apply_sourcing(&filter.sourcing, pool, outreach);
        }
    }
    pool
}

fn apply_sourcing<'a>(
    sourcing: &SourcingFilter,
    mut pool: Vec<&'a Candidate>,
    outreach: &[OutreachRecord],
) -> Vec<&'a Candidate> {
    let latest = latest_by_linkedin(outreach);
    let mut positions: HashMap<String, HashSet<i64>> = HashMap::new();
    for record in outreach {
        if let (Some(url), Some(position_id)) = (record.linkedin_url.as_deref(), record.position_id) {
            positions
                .entry(normalize_linkedin(url))
                .or_default()
                .insert(position_id);
        }
    }
    let key = |c: &Candidate| c.linkedin_url.as_deref().map(normalize_linkedin).unwrap_or_default();

    if let Some(position_id) = sourcing.position_id {
        pool.retain(|c| positions.get(&key(c)).is_some_and(|p| p.contains(&position_id)));
    }
    if let Some(status) = sourcing.last_status {
        pool.retain(|c| latest.get(&key(c)).is_some_and(|r| r.status == status));
    }
    if let Some(min) = sourcing.min_rating {
        pool.retain(|c| latest.get(&key(c)).is_some_and(|r| r.rating >= min));
    }
    if let Some(recruiter_id) = sourcing.recruiter_id {
        pool.retain(|c| latest.get(&key(c)).is_some_and(|r| r.recruiter_id == recruiter_id));
    }
    pool
}
