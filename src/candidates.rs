//! Candidate records: creation with duplicate checks, shell profiles from
//! outreach, cascading delete, resume attachment, and author-owned comments.

use std::path::Path;
use tracing::{info, warn};

use crate::auth::Session;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Candidate, CandidateDraft, OutreachRecord, ProfileType};
use crate::prompt::{AlertKind, Prompt};
use crate::storage::{Bucket, ObjectStorage};

/// Names at or above this Jaro-Winkler similarity are reported as possible duplicates.
const SIMILAR_NAME_THRESHOLD: f64 = 0.93;

/// Canonical form of a LinkedIn profile URL for comparisons:
/// no scheme, no `www.`, no query or fragment, no trailing slash, lowercase.
pub fn normalize_linkedin(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let end = without_www.find(['?', '#']).unwrap_or(without_www.len());
    without_www[..end].trim_end_matches('/').to_string()
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims every field and turns blanks into `None`.
pub fn normalize_draft(draft: &CandidateDraft) -> CandidateDraft {
    CandidateDraft {
        name: draft.name.trim().to_string(),
        email: clean(&draft.email).map(|e| e.to_lowercase()),
        phone: clean(&draft.phone),
        location: clean(&draft.location),
        linkedin_url: clean(&draft.linkedin_url),
        resume_url: clean(&draft.resume_url),
        skills: clean(&draft.skills),
        notes: clean(&draft.notes),
    }
}

/// Required fields: a name, and an email or LinkedIn URL.
pub fn validate_draft(draft: &CandidateDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(AppError::Validation(
            "missing information: candidate name is required".to_string(),
        ));
    }
    if clean(&draft.email).is_none() && clean(&draft.linkedin_url).is_none() {
        return Err(AppError::Validation(
            "missing information: provide an email or a LinkedIn URL".to_string(),
        ));
    }
    if let Some(email) = clean(&draft.email) {
        if !email.contains('@') {
            return Err(AppError::Validation(format!("'{}' is not an email address", email)));
        }
    }
    Ok(())
}

/// Refuses a draft whose email or LinkedIn URL already belongs to another candidate.
pub fn check_duplicate(db: &Database, draft: &CandidateDraft, exclude_id: Option<i64>) -> Result<()> {
    let other = |c: &Candidate| Some(c.id) != exclude_id;

    if let Some(email) = clean(&draft.email) {
        if let Some(existing) = db.find_candidate_by_email(&email)?.filter(other) {
            return Err(AppError::Duplicate(format!(
                "{} already uses {} (#{})",
                existing.name, email, existing.id
            )));
        }
    }
    if let Some(url) = clean(&draft.linkedin_url) {
        if let Some(existing) = db.find_candidate_by_linkedin(&url)?.filter(other) {
            return Err(AppError::Duplicate(format!(
                "{} already has LinkedIn profile {} (#{})",
                existing.name, url, existing.id
            )));
        }
    }
    Ok(())
}

/// Existing candidates whose names look like `name`.
pub fn similar_names<'a>(existing: &'a [Candidate], name: &str) -> Vec<&'a Candidate> {
    let wanted = name.trim().to_lowercase();
    existing
        .iter()
        .filter(|c| strsim::jaro_winkler(&c.name.to_lowercase(), &wanted) >= SIMILAR_NAME_THRESHOLD)
        .collect()
}

pub fn create_candidate(db: &Database, draft: &CandidateDraft, created_by: Option<i64>) -> Result<i64> {
    validate_draft(draft)?;
    let mut draft = normalize_draft(draft);
    draft.linkedin_url = draft.linkedin_url.as_deref().map(canonical_linkedin_url);
    check_duplicate(db, &draft, None)?;

    let id = db.insert_candidate(&draft, ProfileType::Full, created_by)?;
    info!(candidate_id = id, name = %draft.name, "candidate created");
    Ok(id)
}

fn canonical_linkedin_url(url: &str) -> String {
    format!("https://www.{}", normalize_linkedin(url))
}

/// Minimal candidate derived from an outreach contact, pending promotion.
pub fn create_shell_from_outreach(
    db: &Database,
    outreach: &OutreachRecord,
    created_by: Option<i64>,
) -> Result<i64> {
    let Some(url) = outreach.linkedin_url.as_deref().filter(|u| !u.trim().is_empty()) else {
        return Err(AppError::Validation(
            "missing information: outreach record has no LinkedIn URL".to_string(),
        ));
    };
    let draft = CandidateDraft {
        name: outreach.candidate_name.trim().to_string(),
        linkedin_url: Some(canonical_linkedin_url(url)),
        notes: outreach.notes.clone(),
        ..Default::default()
    };
    validate_draft(&draft)?;
    check_duplicate(db, &draft, None)?;

    let id = db.insert_candidate(&draft, ProfileType::Shell, created_by)?;
    info!(candidate_id = id, outreach_id = outreach.id, "shell profile created");
    Ok(id)
}

/// Fills a shell profile's missing fields and turns it into a full profile.
/// A promoted profile needs an email address.
pub fn promote_shell(db: &Database, id: i64, updates: &CandidateDraft) -> Result<()> {
    let shell = db
        .get_candidate(id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", id)))?;
    if shell.profile_type != ProfileType::Shell {
        return Err(AppError::Validation(format!("{} already has a full profile", shell.name)));
    }

    let pick = |update: &Option<String>, current: &Option<String>| clean(update).or_else(|| current.clone());
    let merged = CandidateDraft {
        name: if updates.name.trim().is_empty() {
            shell.name.clone()
        } else {
            updates.name.clone()
        },
        email: pick(&updates.email, &shell.email),
        phone: pick(&updates.phone, &shell.phone),
        location: pick(&updates.location, &shell.location),
        linkedin_url: pick(&updates.linkedin_url, &shell.linkedin_url),
        resume_url: pick(&updates.resume_url, &shell.resume_url),
        skills: pick(&updates.skills, &shell.skills),
        notes: pick(&updates.notes, &shell.notes),
    };

    validate_draft(&merged)?;
    if clean(&merged.email).is_none() {
        return Err(AppError::Validation(
            "missing information: an email is required to promote a shell profile".to_string(),
        ));
    }
    let mut merged = normalize_draft(&merged);
    merged.linkedin_url = merged.linkedin_url.as_deref().map(canonical_linkedin_url);
    check_duplicate(db, &merged, Some(id))?;

    db.update_candidate(id, &merged, ProfileType::Full)?;
    info!(candidate_id = id, "shell profile promoted");
    Ok(())
}

/// Deletes a candidate with its comments and pipeline rows after confirmation.
/// Returns `false` when the user cancelled.
pub fn delete_candidate(db: &Database, id: i64, prompt: &dyn Prompt) -> Result<bool> {
    let candidate = db
        .get_candidate(id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", id)))?;
    if !prompt.confirm(
        "Delete candidate?",
        &format!(
            "{} will be removed together with their comments and pipeline entries.",
            candidate.name
        ),
    ) {
        return Ok(false);
    }

    let (comments, pipeline) = db.in_transaction(|db| {
        let comments = db.delete_comments_for_candidate(id)?;
        let pipeline = db.delete_pipeline_for_candidate(id)?;
        db.delete_candidate(id)?;
        Ok((comments, pipeline))
    })?;
    info!(candidate_id = id, comments, pipeline, "candidate deleted");
    prompt.alert(AlertKind::Success, &format!("Deleted {}.", candidate.name));
    Ok(true)
}

/// Uploads a resume file to the resumes bucket and links it to the candidate.
pub fn attach_resume(db: &Database, storage: &ObjectStorage, id: i64, file: &Path) -> Result<String> {
    db.get_candidate(id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", id)))?;
    let stored = storage.upload(Bucket::Resumes, file)?;
    db.set_candidate_resume(id, &stored.public_url)?;
    info!(candidate_id = id, key = %stored.key, "resume attached");
    Ok(stored.public_url)
}

// --- Comments ---

pub fn add_comment(db: &Database, author: &Session, candidate_id: i64, body: &str) -> Result<i64> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("comment cannot be empty".to_string()));
    }
    db.get_candidate(candidate_id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", candidate_id)))?;
    db.insert_comment(candidate_id, author.recruiter_id, body)
}

pub fn edit_comment(db: &Database, author: &Session, comment_id: i64, body: &str) -> Result<()> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("comment cannot be empty".to_string()));
    }
    owned_comment(db, author, comment_id)?;
    db.update_comment_body(comment_id, body)
}

pub fn delete_comment(db: &Database, author: &Session, comment_id: i64) -> Result<()> {
    owned_comment(db, author, comment_id)?;
    db.delete_comment(comment_id)
}

fn owned_comment(db: &Database, author: &Session, comment_id: i64) -> Result<()> {
    let comment = db
        .get_comment(comment_id)?
        .ok_or_else(|| AppError::NotFound(format!("comment #{}", comment_id)))?;
    if comment.author_id != author.recruiter_id {
        warn!(comment_id, by = author.recruiter_id, "comment change by non-author refused");
        return Err(AppError::PermissionDenied(
            "only the author can change a comment".to_string(),
        ));
    }
    Ok(())
}
