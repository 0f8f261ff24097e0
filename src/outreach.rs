//! Sourcing activity: contacts logged from LinkedIn before they become candidates.

use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::candidates::{self, normalize_linkedin};
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{NewOutreach, OutreachRecord, OutreachStatus};

pub const MAX_RATING: u8 = 5;

fn check_rating(rating: u8) -> Result<()> {
    if rating > MAX_RATING {
        return Err(AppError::Validation(format!(
            "rating must be between 0 and {}, got {}",
            MAX_RATING, rating
        )));
    }
    Ok(())
}

pub fn log_contact(db: &Database, outreach: &NewOutreach) -> Result<i64> {
    let name = outreach.candidate_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "missing information: contact name is required".to_string(),
        ));
    }
    check_rating(outreach.rating)?;
    if let Some(position_id) = outreach.position_id {
        db.get_position(position_id)?
            .ok_or_else(|| AppError::NotFound(format!("position #{}", position_id)))?;
    }

    let id = db.insert_outreach(&NewOutreach {
        candidate_name: name.to_string(),
        linkedin_url: outreach
            .linkedin_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        ..outreach.clone()
    })?;
    info!(outreach_id = id, name, status = %outreach.status, "outreach logged");
    Ok(id)
}

pub fn update(db: &Database, id: i64, status: OutreachStatus, rating: u8) -> Result<()> {
    check_rating(rating)?;
    db.update_outreach(id, status, rating)?;
    info!(outreach_id = id, %status, rating, "outreach updated");
    Ok(())
}

/// Turns an outreach contact into a shell candidate profile.
pub fn convert_to_shell(db: &Database, id: i64, created_by: Option<i64>) -> Result<i64> {
    let record = db
        .get_outreach(id)?
        .ok_or_else(|| AppError::NotFound(format!("outreach #{}", id)))?;
    candidates::create_shell_from_outreach(db, &record, created_by)
}

/// Most recent outreach record per normalized LinkedIn URL.
pub fn latest_by_linkedin(records: &[OutreachRecord]) -> HashMap<String, &OutreachRecord> {
    let mut latest: HashMap<String, &OutreachRecord> = HashMap::new();
    for record in records {
        let Some(url) = record.linkedin_url.as_deref() else { continue };
        let key = normalize_linkedin(url);
        if key.is_empty() {
            continue;
        }
        latest
            .entry(key)
            .and_modify(|current| {
                if (record.created_at, record.id) > (current.created_at, current.id) {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

pub fn status_summary(records: &[OutreachRecord]) -> BTreeMap<OutreachStatus, usize> {
    let mut summary = BTreeMap::new();
    for record in records {
        *summary.entry(record.status).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;
    use crate::models::ProfileType;
    use chrono::NaiveDate;

    fn contact(recruiter_id: i64, name: &str, linkedin: Option<&str>, rating: u8) -> NewOutreach {
        NewOutreach {
            recruiter_id,
            position_id: None,
            candidate_name: name.to_string(),
            linkedin_url: linkedin.map(str::to_string),
            status: OutreachStatus::Contacted,
            rating,
            notes: None,
        }
    }

    fn record(id: i64, linkedin: &str, day: u32, status: OutreachStatus) -> OutreachRecord {
        OutreachRecord {
            id,
            recruiter_id: 1,
            recruiter_name: None,
            position_id: None,
            position_title: None,
            candidate_name: format!("Contact {}", id),
            linkedin_url: Some(linkedin.to_string()),
            status,
            rating: 3,
            notes: None,
            created_at: NaiveDate::from_ymd_opt(2026, 10, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_log_validates_name_and_rating() {
        let f = fixture();
        assert!(log_contact(&f.db, &contact(f.recruiter_id, " ", None, 3)).is_err());
        assert!(log_contact(&f.db, &contact(f.recruiter_id, "Jamie", None, 6)).is_err());
        let id = log_contact(&f.db, &contact(f.recruiter_id, "Jamie", Some(" "), 5)).unwrap();
        let stored = f.db.get_outreach(id).unwrap().unwrap();
        assert_eq!(stored.linkedin_url, None);
        assert_eq!(stored.recruiter_name.as_deref(), Some("Rita"));
    }

    #[test]
    fn test_update_status_and_rating() {
        let f = fixture();
        let id = log_contact(&f.db, &contact(f.recruiter_id, "Jamie", None, 2)).unwrap();
        update(&f.db, id, OutreachStatus::Interested, 4).unwrap();
        let stored = f.db.get_outreach(id).unwrap().unwrap();
        assert_eq!(stored.status, OutreachStatus::Interested);
        assert_eq!(stored.rating, 4);
        assert!(update(&f.db, id, OutreachStatus::Replied, 9).is_err());
        assert!(update(&f.db, 999, OutreachStatus::Replied, 1).is_err());
    }

    #[test]
    fn test_convert_to_shell() {
        let f = fixture();
        let id = log_contact(
            &f.db,
            &contact(f.recruiter_id, "Jamie Rivera", Some("https://linkedin.com/in/jamie"), 4),
        )
        .unwrap();
        let candidate_id = convert_to_shell(&f.db, id, Some(f.recruiter_id)).unwrap();
        let shell = f.db.get_candidate(candidate_id).unwrap().unwrap();
        assert_eq!(shell.profile_type, ProfileType::Shell);
        assert_eq!(shell.name, "Jamie Rivera");

        assert!(matches!(
            convert_to_shell(&f.db, id, None),
            Err(AppError::Duplicate(_))
        ));
    }

    #[test]
    fn test_latest_by_linkedin_picks_newest() {
        let records = vec![
            record(1, "https://www.linkedin.com/in/jamie/", 3, OutreachStatus::Contacted),
            record(2, "linkedin.com/in/jamie", 9, OutreachStatus::Interested),
            record(3, "linkedin.com/in/sam", 5, OutreachStatus::NoResponse),
        ];
        let latest = latest_by_linkedin(&records);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["linkedin.com/in/jamie"].id, 2);
        assert_eq!(latest["linkedin.com/in/sam"].status, OutreachStatus::NoResponse);
    }

    #[test]
    fn test_status_summary_counts() {
        let records = vec![
            record(1, "a", 1, OutreachStatus::Replied),
            record(2, "b", 1, OutreachStatus::Contacted),
            record(3, "c", 1, OutreachStatus::Replied),
        ];
        let summary: Vec<(OutreachStatus, usize)> = status_summary(&records).into_iter().collect();
        assert_eq!(
            summary,
            vec![(OutreachStatus::Contacted, 1), (OutreachStatus::Replied, 2)]
        );
    }
}
