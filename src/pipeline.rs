//! Pipeline stage state machine for the Active Tracker board.
//!
//! Any stage may move to any other. What differs is the protocol around a move:
//! recruiters and managers write immediately and roll back on failure, while the
//! director's moves are held locally until approved, then persisted and followed
//! by a notification to the owning recruiter. Board drags and stage selection
//! both end up in [`PipelineBoard::request_stage`].

use tracing::{info, warn};

use crate::auth::Session;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    NewNotification, NotificationKind, PipelineEntry, PipelineStatus, PositionStatus, Stage,
};
use crate::optimistic::{self, Pending};
use crate::outbox::NotificationSink;
use crate::prompt::{AlertKind, Prompt};

pub trait PipelineWriter {
    fn update_stage(&self, id: i64, stage: Stage) -> Result<()>;
    fn update_status(&self, id: i64, status: PipelineStatus) -> Result<()>;
}

impl PipelineWriter for Database {
    fn update_stage(&self, id: i64, stage: Stage) -> Result<()> {
        self.update_pipeline_stage(id, stage)
    }

    fn update_status(&self, id: i64, status: PipelineStatus) -> Result<()> {
        self.update_pipeline_status(id, status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    Dropdown,
    Drag,
}

/// A director move shown on the board but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    change: Pending<Stage>,
    pub source: TransitionSource,
    pub candidate_name: String,
    pub position_title: String,
    pub recruiter_id: i64,
    pub recruiter_name: String,
    pub recruiter_email: String,
    pub director_name: String,
}

impl PendingApproval {
    pub fn entry_id(&self) -> i64 {
        self.change.id
    }

    pub fn from(&self) -> Stage {
        self.change.prior
    }

    pub fn to(&self) -> Stage {
        self.change.next
    }

    pub fn title(&self) -> &'static str {
        "Approve stage change?"
    }

    pub fn message(&self) -> String {
        format!(
            "Candidate: {}\nPosition:  {}\nRecruiter: {}\nStage:     {} -> {}",
            self.candidate_name,
            self.position_title,
            self.recruiter_name,
            self.from(),
            self.to()
        )
    }

    fn notification(&self) -> NewNotification {
        NewNotification {
            recipient_id: self.recruiter_id,
            recipient_email: self.recruiter_email.clone(),
            message: format!(
                "{} moved {} ({}) from {} to {}.",
                self.director_name,
                self.candidate_name,
                self.position_title,
                self.from(),
                self.to()
            ),
            kind: NotificationKind::StageChange,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Requested stage equals the current one; nothing happened.
    Unchanged,
    Applied { from: Stage, to: Stage },
    /// Shown locally, waiting for [`PipelineBoard::resolve`].
    AwaitingApproval(PendingApproval),
    Approved { from: Stage, to: Stage, notified: bool },
    Dismissed { restored: Stage },
    RolledBack { restored: Stage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Unchanged,
    Applied { from: PipelineStatus, to: PipelineStatus },
    RolledBack { restored: PipelineStatus, error: String },
}

/// Local, optimistic copy of the pipeline collection.
pub struct PipelineBoard {
    entries: Vec<PipelineEntry>,
}

impl PipelineBoard {
    pub fn new(entries: Vec<PipelineEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&PipelineEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Replaces local state with freshly fetched rows.
    pub fn reconcile(&mut self, fresh: Vec<PipelineEntry>) {
        self.entries = fresh;
    }

    /// Board columns in [`Stage::BOARD`] order; archived entries are left out.
    pub fn columns(&self) -> Vec<(Stage, Vec<&PipelineEntry>)> {
        Stage::BOARD
            .iter()
            .map(|stage| {
                let cards = self.entries.iter().filter(|e| e.stage == *stage).collect();
                (*stage, cards)
            })
            .collect()
    }

    fn entry_mut(&mut self, id: i64) -> Result<&mut PipelineEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("pipeline entry #{}", id)))
    }

    /// A card dropped on board column `column`.
    pub fn request_drop(
        &mut self,
        actor: &Session,
        id: i64,
        column: usize,
        writer: &dyn PipelineWriter,
        prompt: &dyn Prompt,
    ) -> Result<StageOutcome> {
        let stage = Stage::from_column(column)
            .ok_or_else(|| AppError::Validation(format!("no board column {}", column)))?;
        self.request_stage(actor, id, stage, TransitionSource::Drag, writer, prompt)
    }

    /// First half of every stage transition. Non-director moves settle here;
    /// director moves come back as [`StageOutcome::AwaitingApproval`].
    pub fn request_stage(
        &mut self,
        actor: &Session,
        id: i64,
        to: Stage,
        source: TransitionSource,
        writer: &dyn PipelineWriter,
        prompt: &dyn Prompt,
    ) -> Result<StageOutcome> {
        let entry = self.entry_mut(id)?;
        if entry.stage == to {
            return Ok(StageOutcome::Unchanged);
        }

        if actor.role.can_approve_stage_changes() {
            let change = Pending::begin(id, &mut entry.stage, to);
            return Ok(StageOutcome::AwaitingApproval(PendingApproval {
                change,
                source,
                candidate_name: entry.candidate_name.clone(),
                position_title: entry.position_title.clone(),
                recruiter_id: entry.recruiter_id,
                recruiter_name: entry.recruiter_name.clone(),
                recruiter_email: entry.recruiter_email.clone(),
                director_name: actor.name.clone(),
            }));
        }

        let candidate = entry.candidate_name.clone();
        match optimistic::apply(&mut entry.stage, to, |stage| writer.update_stage(id, *stage)) {
            Ok(from) => {
                info!(entry_id = id, %from, %to, ?source, "stage changed");
                Ok(StageOutcome::Applied { from, to })
            }
            Err(err) => {
                let restored = entry.stage;
                warn!(entry_id = id, %to, error = %err, "stage change failed, rolled back");
                prompt.alert(
                    AlertKind::Error,
                    &format!("Could not move {} to {}: {}", candidate, to, err),
                );
                Ok(StageOutcome::RolledBack {
                    restored,
                    error: err.to_string(),
                })
            }
        }
    }

    /// Second half of a director move: approve persists and notifies, dismiss reverts.
    pub fn resolve(
        &mut self,
        pending: PendingApproval,
        approve: bool,
        writer: &dyn PipelineWriter,
        outbox: &dyn NotificationSink,
        prompt: &dyn Prompt,
    ) -> StageOutcome {
        let id = pending.entry_id();
        let Ok(entry) = self.entry_mut(id) else {
            // Entry vanished (e.g. the board was reconciled meanwhile); drop the decision.
            warn!(entry_id = id, "approval resolved for an entry no longer on the board");
            return StageOutcome::Dismissed {
                restored: pending.from(),
            };
        };

        if !approve {
            pending.change.revert(&mut entry.stage);
            info!(entry_id = id, "director stage change dismissed");
            return StageOutcome::Dismissed {
                restored: entry.stage,
            };
        }

        if let Err(err) = pending
            .change
            .commit(&mut entry.stage, |stage| writer.update_stage(id, *stage))
        {
            warn!(entry_id = id, error = %err, "approved stage change failed, rolled back");
            prompt.alert(
                AlertKind::Error,
                &format!("Could not move {} to {}: {}", pending.candidate_name, pending.to(), err),
            );
            return StageOutcome::RolledBack {
                restored: entry.stage,
                error: err.to_string(),
            };
        }

        let notified = match outbox.enqueue(&pending.notification()) {
            Ok(()) => true,
            Err(err) => {
                warn!(entry_id = id, error = %err, "stage change saved but notification failed");
                prompt.alert(
                    AlertKind::Warning,
                    &format!("Stage saved, but {} was not notified: {}", pending.recruiter_name, err),
                );
                false
            }
        };
        info!(entry_id = id, from = %pending.from(), to = %pending.to(), notified, "director stage change approved");
        StageOutcome::Approved {
            from: pending.from(),
            to: pending.to(),
            notified,
        }
    }

    /// Full transition including the approval prompt, for callers that can block on it.
    #[allow(clippy::too_many_arguments)]
    pub fn change_stage(
        &mut self,
        actor: &Session,
        id: i64,
        to: Stage,
        source: TransitionSource,
        writer: &dyn PipelineWriter,
        outbox: &dyn NotificationSink,
        prompt: &dyn Prompt,
    ) -> Result<StageOutcome> {
        match self.request_stage(actor, id, to, source, writer, prompt)? {
            StageOutcome::AwaitingApproval(pending) => {
                let approve = prompt.confirm(pending.title(), &pending.message());
                Ok(self.resolve(pending, approve, writer, outbox, prompt))
            }
            other => Ok(other),
        }
    }

    /// Soft delete: the entry moves to Archived through the normal transition path.
    pub fn archive(
        &mut self,
        actor: &Session,
        id: i64,
        writer: &dyn PipelineWriter,
        outbox: &dyn NotificationSink,
        prompt: &dyn Prompt,
    ) -> Result<StageOutcome> {
        self.change_stage(
            actor,
            id,
            Stage::Archived,
            TransitionSource::Dropdown,
            writer,
            outbox,
            prompt,
        )
    }

    /// Status changes never wait for approval and never notify.
    pub fn change_status(
        &mut self,
        id: i64,
        to: PipelineStatus,
        writer: &dyn PipelineWriter,
        prompt: &dyn Prompt,
    ) -> Result<StatusOutcome> {
        let entry = self.entry_mut(id)?;
        if entry.status == to {
            return Ok(StatusOutcome::Unchanged);
        }
        let candidate = entry.candidate_name.clone();
        match optimistic::apply(&mut entry.status, to, |status| writer.update_status(id, *status)) {
            Ok(from) => {
                info!(entry_id = id, %from, %to, "status changed");
                Ok(StatusOutcome::Applied { from, to })
            }
            Err(err) => {
                warn!(entry_id = id, %to, error = %err, "status change failed, rolled back");
                prompt.alert(
                    AlertKind::Error,
                    &format!("Could not set {} to {}: {}", candidate, to, err),
                );
                Ok(StatusOutcome::RolledBack {
                    restored: entry.status,
                    error: err.to_string(),
                })
            }
        }
    }
}

/// Adds a candidate to a position's pipeline at Screening.
pub fn assign(db: &Database, candidate_id: i64, position_id: i64, recruiter_id: i64) -> Result<i64> {
    db.get_candidate(candidate_id)?
        .ok_or_else(|| AppError::NotFound(format!("candidate #{}", candidate_id)))?;
    let position = db
        .get_position(position_id)?
        .ok_or_else(|| AppError::NotFound(format!("position #{}", position_id)))?;
    if position.status == PositionStatus::Closed {
        return Err(AppError::Validation(format!(
            "position '{}' is closed",
            position.title
        )));
    }
    if let Some(existing) = db.find_open_pipeline(candidate_id, position_id)? {
        return Err(AppError::Validation(format!(
            "candidate is already in this pipeline (entry #{})",
            existing
        )));
    }
    let id = db.insert_pipeline(candidate_id, position_id, recruiter_id)?;
    info!(entry_id = id, candidate_id, position_id, recruiter_id, "added to pipeline");
    Ok(id)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Records writes and fails them on demand.
    #[derive(Default)]
    pub(crate) struct FlakyWriter {
        pub fail: Cell<bool>,
        pub stages: RefCell<Vec<(i64, Stage)>>,
        pub statuses: RefCell<Vec<(i64, PipelineStatus)>>,
    }

    impl FlakyWriter {
        pub(crate) fn failing() -> Self {
            let writer = Self::default();
            writer.fail.set(true);
            writer
        }

        pub(crate) fn write_count(&self) -> usize {
            self.stages.borrow().len() + self.statuses.borrow().len()
        }
    }

    impl PipelineWriter for FlakyWriter {
        fn update_stage(&self, id: i64, stage: Stage) -> Result<()> {
            self.stages.borrow_mut().push((id, stage));
            if self.fail.get() {
                return Err(AppError::Validation("backend unavailable".to_string()));
            }
            Ok(())
        }

        fn update_status(&self, id: i64, status: PipelineStatus) -> Result<()> {
            self.statuses.borrow_mut().push((id, status));
            if self.fail.get() {
                return Err(AppError::Validation("backend unavailable".to_string()));
            }
            Ok(())
        }
    }

    pub(crate) fn entry(id: i64, stage: Stage) -> PipelineEntry {
        let created = chrono::NaiveDate::from_ymd_opt(2026, 10, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        PipelineEntry {
            id,
            candidate_id: id * 10,
            position_id: 1,
            recruiter_id: 5,
            candidate_name: format!("Candidate {}", id),
            position_title: "Backend Engineer".to_string(),
            client_name: Some("Acme".to_string()),
            recruiter_name: "Rita".to_string(),
            recruiter_email: "rita@agency.test".to_string(),
            stage,
            status: PipelineStatus::Active,
            created_at: created,
            updated_at: created,
        }
    }

    pub(crate) fn session(role: crate::models::Role) -> Session {
        Session {
            recruiter_id: 5,
            name: match role {
                crate::models::Role::Director => "Dana".to_string(),
                _ => "Rita".to_string(),
            },
            email: "user@agency.test".to_string(),
            role,
            signed_in_at: chrono::Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::db::tests::fixture;
    use crate::models::Role;
    use crate::outbox::testing::RecordingSink;
    use crate::prompt::testing::ScriptedPrompt;

    #[test]
    fn test_recruiter_move_persists_immediately_without_notification() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Interview1)]);
        let writer = FlakyWriter::default();
        let outbox = RecordingSink::default();
        let prompt = ScriptedPrompt::default();

        let outcome = board
            .change_stage(&session(Role::Recruiter), 1, Stage::Offer, TransitionSource::Dropdown, &writer, &outbox, &prompt)
            .unwrap();

        assert_eq!(outcome, StageOutcome::Applied { from: Stage::Interview1, to: Stage::Offer });
        assert_eq!(board.get(1).unwrap().stage, Stage::Offer);
        assert_eq!(*writer.stages.borrow(), vec![(1, Stage::Offer)]);
        assert!(outbox.sent.borrow().is_empty());
        assert!(prompt.confirms.borrow().is_empty());
    }

    #[test]
    fn test_failed_recruiter_move_reverts_and_alerts() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Interview1)]);
        let writer = FlakyWriter::failing();
        let prompt = ScriptedPrompt::default();

        let outcome = board
            .request_stage(&session(Role::Recruiter), 1, Stage::Offer, TransitionSource::Dropdown, &writer, &prompt)
            .unwrap();

        assert!(matches!(outcome, StageOutcome::RolledBack { restored: Stage::Interview1, .. }));
        assert_eq!(board.get(1).unwrap().stage, Stage::Interview1);
        assert_eq!(prompt.alert_kinds(), vec![AlertKind::Error]);
    }

    #[test]
    fn test_failed_move_never_diverges_for_any_stage_pair() {
        let writer = FlakyWriter::failing();
        let prompt = ScriptedPrompt::default();
        for from in Stage::ALL {
            for to in Stage::ALL {
                let mut board = PipelineBoard::new(vec![entry(1, *from)]);
                board
                    .request_stage(&session(Role::Manager), 1, *to, TransitionSource::Drag, &writer, &prompt)
                    .unwrap();
                assert_eq!(board.get(1).unwrap().stage, *from);
            }
        }
    }

    #[test]
    fn test_director_move_waits_for_approval() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();

        let outcome = board
            .request_stage(&session(Role::Director), 1, Stage::SubmitToClient, TransitionSource::Drag, &writer, &prompt)
            .unwrap();

        let StageOutcome::AwaitingApproval(pending) = outcome else {
            panic!("expected approval gate");
        };
        assert_eq!(pending.from(), Stage::Screening);
        assert_eq!(pending.to(), Stage::SubmitToClient);
        assert!(pending.message().contains("Candidate 1"));
        assert!(pending.message().contains("Rita"));
        assert!(pending.message().contains("Backend Engineer"));
        // Optimistically shown, nothing written.
        assert_eq!(board.get(1).unwrap().stage, Stage::SubmitToClient);
        assert_eq!(writer.write_count(), 0);
    }

    #[test]
    fn test_director_approval_persists_then_notifies_recruiter() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Interview2)]);
        let writer = FlakyWriter::default();
        let outbox = RecordingSink::default();
        let prompt = ScriptedPrompt::answering(&[true]);

        let outcome = board
            .change_stage(&session(Role::Director), 1, Stage::Offer, TransitionSource::Dropdown, &writer, &outbox, &prompt)
            .unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Approved { from: Stage::Interview2, to: Stage::Offer, notified: true }
        );
        assert_eq!(*writer.stages.borrow(), vec![(1, Stage::Offer)]);
        let sent = outbox.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_id, 5);
        assert_eq!(sent[0].kind, NotificationKind::StageChange);
        assert!(sent[0].message.contains("Interview 2"));
        assert!(sent[0].message.contains("Offer"));
    }

    #[test]
    fn test_director_dismissal_reverts_without_writing() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Offer)]);
        let writer = FlakyWriter::default();
        let outbox = RecordingSink::default();
        let prompt = ScriptedPrompt::answering(&[false]);

        let outcome = board
            .change_stage(&session(Role::Director), 1, Stage::Hired, TransitionSource::Drag, &writer, &outbox, &prompt)
            .unwrap();

        assert_eq!(outcome, StageOutcome::Dismissed { restored: Stage::Offer });
        assert_eq!(board.get(1).unwrap().stage, Stage::Offer);
        assert_eq!(writer.write_count(), 0);
        assert!(outbox.sent.borrow().is_empty());
    }

    #[test]
    fn test_director_approved_write_failure_rolls_back_without_notifying() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Offer)]);
        let writer = FlakyWriter::failing();
        let outbox = RecordingSink::default();
        let prompt = ScriptedPrompt::answering(&[true]);

        let outcome = board
            .change_stage(&session(Role::Director), 1, Stage::Hired, TransitionSource::Dropdown, &writer, &outbox, &prompt)
            .unwrap();

        assert!(matches!(outcome, StageOutcome::RolledBack { restored: Stage::Offer, .. }));
        assert_eq!(board.get(1).unwrap().stage, Stage::Offer);
        assert!(outbox.sent.borrow().is_empty());
    }

    #[test]
    fn test_notification_failure_keeps_saved_stage() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Offer)]);
        let writer = FlakyWriter::default();
        let outbox = RecordingSink::default();
        outbox.fail.set(true);
        let prompt = ScriptedPrompt::answering(&[true]);

        let outcome = board
            .change_stage(&session(Role::Director), 1, Stage::Hired, TransitionSource::Dropdown, &writer, &outbox, &prompt)
            .unwrap();

        assert_eq!(outcome, StageOutcome::Approved { from: Stage::Offer, to: Stage::Hired, notified: false });
        assert_eq!(board.get(1).unwrap().stage, Stage::Hired);
        assert_eq!(prompt.alert_kinds(), vec![AlertKind::Warning]);
    }

    #[test]
    fn test_drag_and_dropdown_share_the_gate() {
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();
        let director = session(Role::Director);

        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let dragged = board.request_drop(&director, 1, 5, &writer, &prompt).unwrap();
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let selected = board
            .request_stage(&director, 1, Stage::Offer, TransitionSource::Dropdown, &writer, &prompt)
            .unwrap();

        for outcome in [dragged, selected] {
            let StageOutcome::AwaitingApproval(p) = outcome else {
                panic!("both paths must hit the approval gate");
            };
            assert_eq!(p.to(), Stage::Offer);
        }
        assert_eq!(writer.write_count(), 0);
    }

    #[test]
    fn test_drop_on_unknown_column_is_rejected() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();
        let err = board
            .request_drop(&session(Role::Recruiter), 1, 42, &writer, &prompt)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_same_stage_is_a_no_op() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Offer)]);
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();
        let outcome = board
            .request_stage(&session(Role::Director), 1, Stage::Offer, TransitionSource::Dropdown, &writer, &prompt)
            .unwrap();
        assert_eq!(outcome, StageOutcome::Unchanged);
        assert_eq!(writer.write_count(), 0);
    }

    #[test]
    fn test_archive_hides_entry_from_columns() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening), entry(2, Stage::Offer)]);
        let writer = FlakyWriter::default();
        let outbox = RecordingSink::default();
        let prompt = ScriptedPrompt::default();

        board.archive(&session(Role::Recruiter), 1, &writer, &outbox, &prompt).unwrap();

        assert_eq!(board.get(1).unwrap().stage, Stage::Archived);
        let visible: usize = board.columns().iter().map(|(_, cards)| cards.len()).sum();
        assert_eq!(visible, 1);
    }

    #[test]
    fn test_status_change_has_no_gate_even_for_director() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();

        let outcome = board.change_status(1, PipelineStatus::Hold, &writer, &prompt).unwrap();
        assert_eq!(
            outcome,
            StatusOutcome::Applied { from: PipelineStatus::Active, to: PipelineStatus::Hold }
        );
        assert!(prompt.confirms.borrow().is_empty());
    }

    #[test]
    fn test_failed_status_change_reverts() {
        let mut board = PipelineBoard::new(vec![entry(1, Stage::Screening)]);
        let writer = FlakyWriter::failing();
        let prompt = ScriptedPrompt::default();

        let outcome = board.change_status(1, PipelineStatus::Reject, &writer, &prompt).unwrap();
        assert!(matches!(outcome, StatusOutcome::RolledBack { restored: PipelineStatus::Active, .. }));
        assert_eq!(board.get(1).unwrap().status, PipelineStatus::Active);
    }

    #[test]
    fn test_unknown_entry_is_not_found() {
        let mut board = PipelineBoard::new(vec![]);
        let writer = FlakyWriter::default();
        let prompt = ScriptedPrompt::default();
        let err = board
            .request_stage(&session(Role::Recruiter), 9, Stage::Offer, TransitionSource::Dropdown, &writer, &prompt)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_database_backed_move_and_assign() {
        let f = fixture();
        let id = assign(&f.db, f.candidate_id, f.position_id, f.recruiter_id).unwrap();
        assert!(assign(&f.db, f.candidate_id, f.position_id, f.recruiter_id).is_err());

        let mut board = PipelineBoard::new(f.db.list_pipeline().unwrap());
        let prompt = ScriptedPrompt::default();
        board
            .change_stage(&session(Role::Recruiter), id, Stage::Interview1, TransitionSource::Dropdown, &f.db, &f.db, &prompt)
            .unwrap();
        assert_eq!(f.db.get_pipeline(id).unwrap().unwrap().stage, Stage::Interview1);
    }

    #[test]
    fn test_assign_refuses_closed_position() {
        let f = fixture();
        f.db.set_position_status(f.position_id, PositionStatus::Closed).unwrap();
        let err = assign(&f.db, f.candidate_id, f.position_id, f.recruiter_id).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
