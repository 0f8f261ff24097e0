use std::collections::BTreeMap;

use crate::models::{PipelineEntry, Position, Stage};

/// How one position's pipeline played out.
#[derive(Debug, Clone)]
pub struct RoleHistory<'a> {
    pub position: &'a Position,
    pub by_stage: BTreeMap<Stage, Vec<&'a PipelineEntry>>,
    pub hired: Option<&'a PipelineEntry>,
    /// Whole days from position creation to the hire's last update.
    pub days_to_fill: Option<i64>,
}

impl RoleHistory<'_> {
    pub fn total(&self) -> usize {
        self.by_stage.values().map(Vec::len).sum()
    }
}

pub fn role_history<'a>(position: &'a Position, pipeline: &'a [PipelineEntry]) -> RoleHistory<'a> {
    let mut by_stage: BTreeMap<Stage, Vec<&PipelineEntry>> = BTreeMap::new();
    for entry in pipeline.iter().filter(|e| e.position_id == position.id) {
        by_stage.entry(entry.stage).or_default().push(entry);
    }

    // Earliest hire wins when a role was filled more than once.
    let hired = by_stage
        .get(&Stage::Hired)
        .and_then(|hires| hires.iter().min_by_key(|e| (e.updated_at, e.id)).copied());
    let days_to_fill = hired.map(|e| (e.updated_at - position.created_at).num_days().max(0));

    RoleHistory {
        position,
        by_stage,
        hired,
        days_to_fill,
    }
}

/// Histories for every position, newest position first.
pub fn all_histories<'a>(positions: &'a [Position], pipeline: &'a [PipelineEntry]) -> Vec<RoleHistory<'a>> {
    let mut histories: Vec<RoleHistory> = positions.iter().map(|p| role_history(p, pipeline)).collect();
    histories.sort_by(|a, b| b.position.created_at.cmp(&a.position.created_at));
    histories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionStatus;
    use crate::pipeline::testing::entry;
    use chrono::{Duration, NaiveDate};

    fn position(id: i64) -> Position {
        Position {
            id,
            client_id: 1,
            client_name: Some("Acme".to_string()),
            title: "Backend Engineer".to_string(),
            status: PositionStatus::Closed,
            description: None,
            location: None,
            salary_range: None,
            created_at: NaiveDate::from_ymd_opt(2026, 9, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_groups_by_stage_and_finds_hire() {
        let p = position(1);
        let mut hire = entry(1, Stage::Hired);
        hire.updated_at = p.created_at + Duration::days(23) + Duration::hours(3);
        let mut other_role = entry(4, Stage::Hired);
        other_role.position_id = 2;
        let pipeline = vec![
            hire,
            entry(2, Stage::Reject),
            entry(3, Stage::Reject),
            other_role,
        ];

        let history = role_history(&p, &pipeline);
        assert_eq!(history.total(), 3);
        assert_eq!(history.by_stage[&Stage::Reject].len(), 2);
        assert_eq!(history.hired.map(|e| e.id), Some(1));
        assert_eq!(history.days_to_fill, Some(23));
    }

    #[test]
    fn test_unfilled_role_has_no_days_to_fill() {
        let p = position(1);
        let pipeline = vec![entry(1, Stage::Offer)];
        let history = role_history(&p, &pipeline);
        assert!(history.hired.is_none());
        assert_eq!(history.days_to_fill, None);
    }

    #[test]
    fn test_all_histories_newest_first() {
        let older = position(1);
        let mut newer = position(2);
        newer.created_at += Duration::days(10);
        let positions = vec![older, newer];
        let ids: Vec<i64> = all_histories(&positions, &[]).iter().map(|h| h.position.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
