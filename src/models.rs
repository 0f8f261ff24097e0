use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error produced when a stored or typed label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Lowercases and drops spaces, hyphens and underscores so that
/// "Submit to Client", "submit-to-client" and "SUBMIT_TO_CLIENT" compare equal.
pub fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Label-backed enum: display/parse through its label, stored as TEXT, serialized as a string.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let wanted = $crate::models::normalize_label(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| $crate::models::normalize_label(v.as_str()) == wanted)
                    .ok_or_else(|| $crate::models::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> ::std::result::Result<S::Ok, S::Error> {
                s.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> ::std::result::Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(d)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Screening,
    SubmitToClient,
    Interview1,
    Interview2,
    Interview3,
    Offer,
    Hired,
    Reject,
    Archived,
}

text_enum!(Stage, "stage", {
    Screening => "Screening",
    SubmitToClient => "Submit to Client",
    Interview1 => "Interview 1",
    Interview2 => "Interview 2",
    Interview3 => "Interview 3",
    Offer => "Offer",
    Hired => "Hired",
    Reject => "Reject",
    Archived => "Archived",
});

impl Stage {
    /// Columns of the tracker board, left to right. Archived entries are not shown.
    pub const BOARD: [Stage; 8] = [
        Stage::Screening,
        Stage::SubmitToClient,
        Stage::Interview1,
        Stage::Interview2,
        Stage::Interview3,
        Stage::Offer,
        Stage::Hired,
        Stage::Reject,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Hired | Stage::Reject | Stage::Archived)
    }

    pub fn column(&self) -> Option<usize> {
        Self::BOARD.iter().position(|s| s == self)
    }

    pub fn from_column(column: usize) -> Option<Stage> {
        Self::BOARD.get(column).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStatus {
    Active,
    Hold,
    Reject,
}

text_enum!(PipelineStatus, "pipeline status", {
    Active => "Active",
    Hold => "Hold",
    Reject => "Reject",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

text_enum!(PositionStatus, "position status", {
    Open => "Open",
    Closed => "Closed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    Full,
    Shell,
}

text_enum!(ProfileType, "profile type", {
    Full => "full",
    Shell => "shell",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Recruiter,
    Manager,
    Director,
}

text_enum!(Role, "role", {
    Recruiter => "Recruiter",
    Manager => "Manager",
    Director => "Director",
});

impl Role {
    /// Stage changes requested by this role wait for an explicit approval.
    pub fn can_approve_stage_changes(&self) -> bool {
        matches!(self, Role::Director)
    }

    pub fn can_review(&self) -> bool {
        matches!(self, Role::Director | Role::Manager)
    }

    /// Only the configured director address may carry the Director role.
    pub fn resolve(stored: Role, email: &str, director_email: &str) -> Role {
        if !director_email.is_empty() && email.eq_ignore_ascii_case(director_email) {
            Role::Director
        } else if stored == Role::Director {
            Role::Manager
        } else {
            stored
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionType {
    Placement,
    Contract,
    TeamInterview,
}

text_enum!(CommissionType, "commission type", {
    Placement => "Placement",
    Contract => "Contract",
    TeamInterview => "Team Interview",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutreachStatus {
    Contacted,
    Replied,
    Interested,
    NotInterested,
    NoResponse,
}

text_enum!(OutreachStatus, "outreach status", {
    Contacted => "Contacted",
    Replied => "Replied",
    Interested => "Interested",
    NotInterested => "Not Interested",
    NoResponse => "No Response",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    StageChange,
    ReviewDecision,
}

text_enum!(NotificationKind, "notification kind", {
    StageChange => "stage_change",
    ReviewDecision => "review_decision",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub client_id: i64,
    pub client_name: Option<String>, // denormalized for display
    pub title: String,
    pub status: PositionStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recruiter {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Option<String>, // comma-delimited
    pub notes: Option<String>,
    pub profile_type: ProfileType,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl Candidate {
    pub fn skill_list(&self) -> Vec<String> {
        split_skills(self.skills.as_deref().unwrap_or(""))
    }
}

/// Splits a comma-delimited skill string into trimmed, non-empty entries.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Field values for creating or promoting a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub id: i64,
    pub candidate_id: i64,
    pub position_id: i64,
    pub recruiter_id: i64,
    pub candidate_name: String,
    pub position_title: String,
    pub client_name: Option<String>,
    pub recruiter_name: String,
    pub recruiter_email: String,
    pub stage: Stage,
    pub status: PipelineStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub candidate_id: i64,
    pub author_id: i64,
    pub author_name: Option<String>,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: i64,
    pub candidate_id: i64,
    pub position_id: i64,
    pub recruiter_id: Option<i64>,
    pub candidate_name: Option<String>,
    pub position_title: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub kind: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub id: i64,
    pub recruiter_id: i64,
    pub recruiter_name: Option<String>,
    pub position_id: Option<i64>,
    pub position_title: Option<String>,
    pub candidate_name: String,
    pub linkedin_url: Option<String>,
    pub status: OutreachStatus,
    pub rating: u8,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub recruiter_id: i64,
    pub position_id: i64,
    pub candidate_id: i64,
    pub commission_type: CommissionType,
    pub placement_fee: Option<String>,
    pub client_rate: Option<String>,
    pub contractor_rate: Option<String>,
    pub source_fee: Option<String>,
    pub stage_percentage: Option<String>,
    pub commission_rate: Option<String>,
    pub amount: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDocument {
    pub id: i64,
    pub title: String,
    pub file_name: String,
    pub storage_path: String,
    pub public_url: String,
    pub uploaded_by: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Row written to the notification outbox. Never read back by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub recipient_email: String,
    pub message: String,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub industry: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub client_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInterview {
    pub candidate_id: i64,
    pub position_id: i64,
    pub recruiter_id: Option<i64>,
    pub scheduled_at: NaiveDateTime,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOutreach {
    pub recruiter_id: i64,
    pub position_id: Option<i64>,
    pub candidate_name: String,
    pub linkedin_url: Option<String>,
    pub status: OutreachStatus,
    pub rating: u8,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub file_name: String,
    pub storage_path: String,
    pub public_url: String,
    pub uploaded_by: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parses_cli_spellings() {
        assert_eq!("submit-to-client".parse::<Stage>().unwrap(), Stage::SubmitToClient);
        assert_eq!("Submit to Client".parse::<Stage>().unwrap(), Stage::SubmitToClient);
        assert_eq!("interview_2".parse::<Stage>().unwrap(), Stage::Interview2);
        assert_eq!("OFFER".parse::<Stage>().unwrap(), Stage::Offer);
        assert!("Interview 4".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_terminal_set() {
        let terminal: Vec<Stage> = Stage::ALL.iter().copied().filter(Stage::is_terminal).collect();
        assert_eq!(terminal, vec![Stage::Hired, Stage::Reject, Stage::Archived]);
    }

    #[test]
    fn test_board_columns_round_trip() {
        for (i, stage) in Stage::BOARD.iter().enumerate() {
            assert_eq!(stage.column(), Some(i));
            assert_eq!(Stage::from_column(i), Some(*stage));
        }
        assert_eq!(Stage::Archived.column(), None);
        assert_eq!(Stage::from_column(8), None);
    }

    #[test]
    fn test_role_resolution_pins_director_to_configured_email() {
        let director = "boss@agency.test";
        assert_eq!(Role::resolve(Role::Recruiter, "Boss@Agency.test", director), Role::Director);
        assert_eq!(Role::resolve(Role::Director, "other@agency.test", director), Role::Manager);
        assert_eq!(Role::resolve(Role::Manager, "m@agency.test", director), Role::Manager);
        assert_eq!(Role::resolve(Role::Director, "x@agency.test", ""), Role::Manager);
    }

    #[test]
    fn test_only_director_approves_stage_changes() {
        assert!(Role::Director.can_approve_stage_changes());
        assert!(!Role::Manager.can_approve_stage_changes());
        assert!(!Role::Recruiter.can_approve_stage_changes());
    }

    #[test]
    fn test_split_skills_trims_and_drops_empty() {
        assert_eq!(split_skills(" Rust, SQL ,, Go "), vec!["Rust", "SQL", "Go"]);
        assert!(split_skills("").is_empty());
    }

    #[test]
    fn test_enum_serializes_as_label() {
        let json = serde_json::to_string(&CommissionType::TeamInterview).unwrap();
        assert_eq!(json, "\"Team Interview\"");
        let back: CommissionType = serde_json::from_str("\"team-interview\"").unwrap();
        assert_eq!(back, CommissionType::TeamInterview);
    }
}
