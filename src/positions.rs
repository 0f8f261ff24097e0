use tracing::{info, warn};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{NewClient, NewPosition, PositionStatus};
use crate::prompt::{AlertKind, Prompt};

pub fn create_client(db: &Database, client: &NewClient) -> Result<i64> {
    let name = client.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "missing information: client name is required".to_string(),
        ));
    }
    if let Some(existing) = db.get_client_by_name(name)? {
        return Err(AppError::Duplicate(format!(
            "client '{}' already exists (#{})",
            existing.name, existing.id
        )));
    }
    let id = db.insert_client(&NewClient {
        name: name.to_string(),
        ..client.clone()
    })?;
    info!(client_id = id, name, "client created");
    Ok(id)
}

/// Refuses while the client still has positions.
pub fn delete_client(db: &Database, name: &str, prompt: &dyn Prompt) -> Result<bool> {
    let client = db
        .get_client_by_name(name)?
        .ok_or_else(|| AppError::NotFound(format!("client '{}'", name)))?;
    let positions = db.list_positions(None, Some(client.id))?;
    if !positions.is_empty() {
        return Err(AppError::Validation(format!(
            "{} still has {} position(s); delete them first",
            client.name,
            positions.len()
        )));
    }
    if !prompt.confirm("Delete client?", &format!("{} will be removed.", client.name)) {
        return Ok(false);
    }
    db.delete_client(client.id)?;
    info!(client_id = client.id, "client deleted");
    Ok(true)
}

pub fn create_position(db: &Database, client_name: &str, position: &NewPosition) -> Result<i64> {
    let title = position.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation(
            "missing information: position title is required".to_string(),
        ));
    }
    let client = db
        .get_client_by_name(client_name)?
        .ok_or_else(|| AppError::NotFound(format!("client '{}'", client_name)))?;

    let id = db.insert_position(&NewPosition {
        client_id: client.id,
        title: title.to_string(),
        ..position.clone()
    })?;
    info!(position_id = id, client = %client.name, title, "position created");
    Ok(id)
}

pub fn set_status(db: &Database, id: i64, status: PositionStatus) -> Result<()> {
    let position = db
        .get_position(id)?
        .ok_or_else(|| AppError::NotFound(format!("position #{}", id)))?;
    if position.status == status {
        return Ok(());
    }
    db.set_position_status(id, status)?;
    info!(position_id = id, from = %position.status, to = %status, "position status changed");
    Ok(())
}

/// What a position delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteReport {
    pub pipeline: usize,
    pub interviews: usize,
}

/// Deletes a position along with its pipeline rows and interviews.
/// `None` means the user cancelled.
pub fn delete_position(db: &Database, id: i64, prompt: &dyn Prompt) -> Result<Option<DeleteReport>> {
    let position = db
        .get_position(id)?
        .ok_or_else(|| AppError::NotFound(format!("position #{}", id)))?;
    let in_pipeline = db
        .list_pipeline()?
        .iter()
        .filter(|e| e.position_id == id)
        .count();

    let message = format!(
        "{} ({}) will be removed with {} pipeline entr{} and its interviews.",
        position.title,
        position.client_name.as_deref().unwrap_or("no client"),
        in_pipeline,
        if in_pipeline == 1 { "y" } else { "ies" }
    );
    if !prompt.confirm("Delete position?", &message) {
        return Ok(None);
    }

    let report = db.in_transaction(|db| {
        let report = DeleteReport {
            pipeline: db.delete_pipeline_for_position(id)?,
            interviews: db.delete_interviews_for_position(id)?,
        };
        db.delete_position(id)?;
        Ok(report)
    })?;
    if report.pipeline > 0 {
        warn!(position_id = id, removed = report.pipeline, "pipeline entries removed with position");
    }
    info!(position_id = id, interviews = report.interviews, "position deleted");
    prompt.alert(AlertKind::Success, &format!("Deleted {}.", position.title));
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;
    use crate::models::NewInterview;
    use crate::prompt::testing::ScriptedPrompt;

    #[test]
    fn test_client_name_required_and_unique() {
        let f = fixture();
        assert!(matches!(
            create_client(&f.db, &NewClient::default()),
            Err(AppError::Validation(_))
        ));
        let dup = NewClient {
            name: " acme ".to_string(),
            ..Default::default()
        };
        assert!(matches!(create_client(&f.db, &dup), Err(AppError::Duplicate(_))));
    }

    #[test]
    fn test_client_with_positions_cannot_be_deleted() {
        let f = fixture();
        let prompt = ScriptedPrompt::answering(&[true]);
        assert!(delete_client(&f.db, "Acme", &prompt).is_err());
        assert_eq!(prompt.confirms.borrow().len(), 0);

        create_client(
            &f.db,
            &NewClient {
                name: "Globex".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(delete_client(&f.db, "globex", &prompt).unwrap());
        assert!(f.db.get_client_by_name("Globex").unwrap().is_none());
    }

    #[test]
    fn test_create_position_for_unknown_client() {
        let f = fixture();
        let position = NewPosition {
            title: "SRE".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_position(&f.db, "Nobody", &position),
            Err(AppError::NotFound(_))
        ));
        let id = create_position(&f.db, "acme", &position).unwrap();
        let stored = f.db.get_position(id).unwrap().unwrap();
        assert_eq!(stored.client_id, f.client_id);
        assert_eq!(stored.status, PositionStatus::Open);
    }

    #[test]
    fn test_close_and_reopen() {
        let f = fixture();
        set_status(&f.db, f.position_id, PositionStatus::Closed).unwrap();
        assert_eq!(
            f.db.get_position(f.position_id).unwrap().unwrap().status,
            PositionStatus::Closed
        );
        set_status(&f.db, f.position_id, PositionStatus::Open).unwrap();
        assert!(set_status(&f.db, 999, PositionStatus::Open).is_err());
    }

    #[test]
    fn test_delete_position_cascades() {
        let f = fixture();
        f.db.insert_pipeline(f.candidate_id, f.position_id, f.recruiter_id).unwrap();
        f.db.insert_interview(&NewInterview {
            candidate_id: f.candidate_id,
            position_id: f.position_id,
            recruiter_id: Some(f.recruiter_id),
            scheduled_at: chrono::NaiveDate::from_ymd_opt(2026, 11, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            kind: None,
            notes: None,
        })
        .unwrap();

        let cancel = ScriptedPrompt::answering(&[false]);
        assert_eq!(delete_position(&f.db, f.position_id, &cancel).unwrap(), None);
        assert_eq!(f.db.list_pipeline().unwrap().len(), 1);

        let confirm = ScriptedPrompt::answering(&[true]);
        let report = delete_position(&f.db, f.position_id, &confirm).unwrap().unwrap();
        assert_eq!(report, DeleteReport { pipeline: 1, interviews: 1 });
        assert!(f.db.get_position(f.position_id).unwrap().is_none());
        assert!(f.db.list_pipeline().unwrap().is_empty());
        assert!(f.db.list_interviews(None).unwrap().is_empty());
    }

    #[test]
    fn test_failed_position_delete_keeps_its_pipeline() {
        let f = fixture();
        f.db.insert_pipeline(f.candidate_id, f.position_id, f.recruiter_id).unwrap();
        f.db.execute_batch(
            "CREATE TRIGGER keep_positions BEFORE DELETE ON positions
             BEGIN SELECT RAISE(ABORT, 'positions are locked'); END;",
        )
        .unwrap();

        let confirm = ScriptedPrompt::answering(&[true]);
        assert!(delete_position(&f.db, f.position_id, &confirm).is_err());
        assert!(f.db.get_position(f.position_id).unwrap().is_some());
        assert_eq!(f.db.list_pipeline().unwrap().len(), 1);
    }
}
