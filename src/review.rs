//! Director Review: the screening and hold queues, their aging banners, and
//! review decisions.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::auth::Session;
use crate::config::AgingThresholds;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    text_enum, NewNotification, NotificationKind, PipelineEntry, PipelineStatus, Stage,
};
use crate::outbox::NotificationSink;
use crate::pipeline::PipelineWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Hold,
    Reject,
    SubmitToClient,
    CommentOnly,
}

text_enum!(ReviewDecision, "review decision", {
    Hold => "Hold",
    Reject => "Reject",
    SubmitToClient => "Submit to Client",
    CommentOnly => "Comment Only",
});

impl ReviewDecision {
    pub fn requires_comment(&self) -> bool {
        matches!(self, ReviewDecision::Hold | ReviewDecision::Reject)
    }

    fn notification_message(&self, reviewer: &str, entry: &PipelineEntry, comment: Option<&str>) -> String {
        let base = match self {
            ReviewDecision::Hold => format!(
                "{} put {} ({}) on hold.",
                reviewer, entry.candidate_name, entry.position_title
            ),
            ReviewDecision::Reject => format!(
                "{} rejected {} for {}.",
                reviewer, entry.candidate_name, entry.position_title
            ),
            ReviewDecision::SubmitToClient => format!(
                "{} approved {} for submission to {} ({}).",
                reviewer,
                entry.candidate_name,
                entry.client_name.as_deref().unwrap_or("the client"),
                entry.position_title
            ),
            ReviewDecision::CommentOnly => format!(
                "{} commented on {} ({}).",
                reviewer, entry.candidate_name, entry.position_title
            ),
        };
        match comment {
            Some(c) => format!("{} Comment: {}", base, c),
            None => base,
        }
    }
}

pub trait CommentWriter {
    fn add_comment(&self, candidate_id: i64, author_id: i64, body: &str) -> Result<i64>;
}

impl CommentWriter for Database {
    fn add_comment(&self, candidate_id: i64, author_id: i64, body: &str) -> Result<i64> {
        self.insert_comment(candidate_id, author_id, body)
    }
}

/// Whole days elapsed since the entry was created.
pub fn age_in_days(entry: &PipelineEntry, now: NaiveDateTime) -> i64 {
    (now - entry.created_at).num_days().max(0)
}

/// Screening entries not on hold, oldest first.
pub fn screening_queue(entries: &[PipelineEntry]) -> Vec<&PipelineEntry> {
    let mut queue: Vec<&PipelineEntry> = entries
        .iter()
        .filter(|e| e.stage == Stage::Screening && e.status != PipelineStatus::Hold)
        .collect();
    queue.sort_by_key(|e| (e.created_at, e.id));
    queue
}

/// Entries on hold, oldest first. Archived rows are out of review.
pub fn hold_queue(entries: &[PipelineEntry]) -> Vec<&PipelineEntry> {
    let mut queue: Vec<&PipelineEntry> = entries
        .iter()
        .filter(|e| e.status == PipelineStatus::Hold && e.stage != Stage::Archived)
        .collect();
    queue.sort_by_key(|e| (e.created_at, e.id));
    queue
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgingBanner {
    /// Older than `critical_days`.
    High(Vec<String>),
    /// Between `warn_days` and `critical_days` inclusive.
    Medium(Vec<String>),
}

/// At most one banner: high wins when both populations exist.
pub fn aging_banner(
    queue: &[&PipelineEntry],
    now: NaiveDateTime,
    thresholds: AgingThresholds,
) -> Option<AgingBanner> {
    let mut high = Vec::new();
    let mut medium = Vec::new();
    for entry in queue {
        let age = age_in_days(entry, now);
        if age > thresholds.critical_days {
            high.push(entry.candidate_name.clone());
        } else if age >= thresholds.warn_days {
            medium.push(entry.candidate_name.clone());
        }
    }
    if !high.is_empty() {
        Some(AgingBanner::High(high))
    } else if !medium.is_empty() {
        Some(AgingBanner::Medium(medium))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub comment_id: Option<i64>,
    pub stage: Stage,
    pub status: PipelineStatus,
    pub notified: bool,
}

/// Applies a review decision. Order: validate, store the comment, mutate the
/// pipeline row, then notify the owning recruiter when the director decided.
pub fn decide(
    reviewer: &Session,
    entry: &PipelineEntry,
    decision: ReviewDecision,
    comment: &str,
    writer: &dyn PipelineWriter,
    comments: &dyn CommentWriter,
    outbox: &dyn NotificationSink,
) -> Result<DecisionOutcome> {
    if !reviewer.role.can_review() {
        return Err(AppError::PermissionDenied(
            "only managers and the director can review candidates".to_string(),
        ));
    }
    let comment = comment.trim();
    if decision.requires_comment() && comment.is_empty() {
        return Err(AppError::Validation(format!(
            "a comment is required to {}",
            decision.as_str().to_lowercase()
        )));
    }

    let comment_id = if comment.is_empty() {
        None
    } else {
        Some(comments.add_comment(entry.candidate_id, reviewer.recruiter_id, comment)?)
    };

    let (stage, status) = match decision {
        ReviewDecision::Hold => {
            writer.update_status(entry.id, PipelineStatus::Hold)?;
            (entry.stage, PipelineStatus::Hold)
        }
        ReviewDecision::Reject => {
            writer.update_stage(entry.id, Stage::Reject)?;
            writer.update_status(entry.id, PipelineStatus::Reject)?;
            (Stage::Reject, PipelineStatus::Reject)
        }
        ReviewDecision::SubmitToClient => {
            writer.update_stage(entry.id, Stage::SubmitToClient)?;
            if entry.status != PipelineStatus::Active {
                writer.update_status(entry.id, PipelineStatus::Active)?;
            }
            (Stage::SubmitToClient, PipelineStatus::Active)
        }
        ReviewDecision::CommentOnly => (entry.stage, entry.status),
    };

    let mut notified = false;
    if reviewer.role.can_approve_stage_changes() {
        let notification = NewNotification {
            recipient_id: entry.recruiter_id,
            recipient_email: entry.recruiter_email.clone(),
            message: decision.notification_message(
                &reviewer.name,
                entry,
                (!comment.is_empty()).then_some(comment),
            ),
            kind: NotificationKind::ReviewDecision,
        };
        match outbox.enqueue(&notification) {
            Ok(()) => notified = true,
            Err(err) => warn!(entry_id = entry.id, error = %err, "review saved but notification failed"),
        }
    }

    info!(entry_id = entry.id, %decision, %stage, %status, notified, "review decision applied");
    Ok(DecisionOutcome {
        comment_id,
        stage,
        status,
        notified,
    })
}
