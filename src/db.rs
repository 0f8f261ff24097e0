use chrono::NaiveDateTime;
use rusqlite::hooks::Action;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use tracing::debug;

use crate::commission::CommissionInputs;
use crate::error::{AppError, Result};
use crate::models::{
    Candidate, CandidateDraft, Client, Comment, Commission, CommissionType, CompanyDocument,
    Interview, NewClient, NewDocument, NewInterview, NewNotification, NewOutreach, NewPosition,
    OutreachRecord, OutreachStatus, PipelineEntry, PipelineStatus, Position, PositionStatus,
    ProfileType, Recruiter, Role, Stage,
};

/// Tables exposed by the backend facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Clients,
    Positions,
    Candidates,
    Recruiters,
    Pipeline,
    Interviews,
    Comments,
    RecruiterOutreach,
    Commissions,
    CompanyDocuments,
    NotificationOutbox,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Positions => "positions",
            Table::Candidates => "candidates",
            Table::Recruiters => "recruiters",
            Table::Pipeline => "pipeline",
            Table::Interviews => "interviews",
            Table::Comments => "comments",
            Table::RecruiterOutreach => "recruiter_outreach",
            Table::Commissions => "commissions",
            Table::CompanyDocuments => "company_documents",
            Table::NotificationOutbox => "notification_outbox",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        [
            Table::Clients,
            Table::Positions,
            Table::Candidates,
            Table::Recruiters,
            Table::Pipeline,
            Table::Interviews,
            Table::Comments,
            Table::RecruiterOutreach,
            Table::Commissions,
            Table::CompanyDocuments,
            Table::NotificationOutbox,
        ]
        .into_iter()
        .find(|t| t.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
    /// Another connection committed; the table may have changed in any row.
    Reload,
}

/// One row-level change delivered by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub action: ChangeAction,
    pub row_id: i64,
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

const PIPELINE_SELECT: &str = "SELECT p.id, p.candidate_id, p.position_id, p.recruiter_id,
            c.name, pos.title, cl.name, r.name, r.email,
            p.stage, p.status, p.created_at, p.updated_at
     FROM pipeline p
     JOIN candidates c ON c.id = p.candidate_id
     JOIN positions pos ON pos.id = p.position_id
     LEFT JOIN clients cl ON cl.id = pos.client_id
     JOIN recruiters r ON r.id = p.recruiter_id";

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, location, linkedin_url, resume_url,
            skills, notes, profile_type, created_by, created_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                industry TEXT,
                contact_name TEXT,
                contact_email TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER NOT NULL REFERENCES clients(id),
                title TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Open' CHECK (status IN ('Open', 'Closed')),
                description TEXT,
                location TEXT,
                salary_range TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS recruiters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                role TEXT NOT NULL DEFAULT 'Recruiter' CHECK (role IN ('Recruiter', 'Manager', 'Director')),
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS candidates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                location TEXT,
                linkedin_url TEXT,
                resume_url TEXT,
                skills TEXT,
                notes TEXT,
                profile_type TEXT NOT NULL DEFAULT 'full' CHECK (profile_type IN ('full', 'shell')),
                created_by INTEGER REFERENCES recruiters(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS pipeline (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id INTEGER NOT NULL REFERENCES candidates(id),
                position_id INTEGER NOT NULL REFERENCES positions(id),
                recruiter_id INTEGER NOT NULL REFERENCES recruiters(id),
                stage TEXT NOT NULL DEFAULT 'Screening',
                status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Hold', 'Reject')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id INTEGER NOT NULL REFERENCES candidates(id),
                author_id INTEGER NOT NULL REFERENCES recruiters(id),
                body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS interviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_id INTEGER NOT NULL REFERENCES candidates(id),
                position_id INTEGER NOT NULL REFERENCES positions(id),
                recruiter_id INTEGER REFERENCES recruiters(id),
                scheduled_at TEXT NOT NULL,
                kind TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS recruiter_outreach (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recruiter_id INTEGER NOT NULL REFERENCES recruiters(id),
                position_id INTEGER REFERENCES positions(id),
                candidate_name TEXT NOT NULL,
                linkedin_url TEXT,
                status TEXT NOT NULL DEFAULT 'Contacted',
                rating INTEGER NOT NULL DEFAULT 0 CHECK (rating BETWEEN 0 AND 5),
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS commissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recruiter_id INTEGER NOT NULL REFERENCES recruiters(id),
                position_id INTEGER NOT NULL REFERENCES positions(id),
                candidate_id INTEGER NOT NULL REFERENCES candidates(id),
                commission_type TEXT NOT NULL,
                placement_fee TEXT,
                client_rate TEXT,
                contractor_rate TEXT,
                source_fee TEXT,
                stage_percentage TEXT,
                commission_rate TEXT,
                amount REAL NOT NULL CHECK (amount >= 0),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS company_documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                file_name TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                public_url TEXT NOT NULL,
                uploaded_by INTEGER REFERENCES recruiters(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS notification_outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL,
                recipient_email TEXT NOT NULL,
                message TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_positions_client ON positions(client_id);
            CREATE INDEX IF NOT EXISTS idx_pipeline_candidate ON pipeline(candidate_id);
            CREATE INDEX IF NOT EXISTS idx_pipeline_position ON pipeline(position_id);
            CREATE INDEX IF NOT EXISTS idx_comments_candidate ON comments(candidate_id);
            CREATE INDEX IF NOT EXISTS idx_candidates_email ON candidates(email);
            CREATE INDEX IF NOT EXISTS idx_candidates_linkedin ON candidates(linkedin_url);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='pipeline'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(AppError::Config(
                "database not initialized. Run 'recruit init' first.".to_string(),
            ));
        }
        Ok(())
    }

    /// Starts the change feed. Each row change made through this connection is
    /// pushed to the returned receiver when its statement runs, so rows from a
    /// transaction that later rolls back are reported too. Writes from other
    /// connections never appear here; see [`Database::data_version`].
    /// Calling again replaces the previous feed.
    pub fn watch_changes(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.conn.update_hook(Some(
            move |action: Action, _db: &str, table: &str, row_id: i64| {
                let Some(table) = Table::from_name(table) else {
                    return;
                };
                let action = match action {
                    Action::SQLITE_INSERT => ChangeAction::Insert,
                    Action::SQLITE_UPDATE => ChangeAction::Update,
                    Action::SQLITE_DELETE => ChangeAction::Delete,
                    _ => return,
                };
                // Receiver gone means nobody is listening any more.
                let _ = tx.send(ChangeEvent {
                    table,
                    action,
                    row_id,
                });
            },
        ));
        rx
    }

    /// Current time on the clock that stamps `created_at` columns (UTC).
    pub fn now(&self) -> Result<NaiveDateTime> {
        Ok(self
            .conn
            .query_row("SELECT datetime('now')", [], |row| row.get(0))?)
    }

    /// Counter that moves whenever another connection commits to the database file.
    pub fn data_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }

    /// Runs `f` inside one transaction. Any error rolls back everything `f` wrote.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // --- Client operations ---

    pub fn insert_client(&self, client: &NewClient) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO clients (name, industry, contact_name, contact_email, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                client.name,
                client.industry,
                client.contact_name,
                client.contact_email,
                client.notes
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, industry, contact_name, contact_email, notes, created_at
             FROM clients ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::row_to_client)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, industry, contact_name, contact_email, notes, created_at
                 FROM clients WHERE LOWER(name) = LOWER(?1)",
                [name],
                Self::row_to_client,
            )
            .optional()?)
    }

    pub fn delete_client(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM clients WHERE id = ?1", [id])?;
        Ok(())
    }

    fn row_to_client(row: &rusqlite::Row) -> rusqlite::Result<Client> {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            industry: row.get(2)?,
            contact_name: row.get(3)?,
            contact_email: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // --- Position operations ---

    pub fn insert_position(&self, position: &NewPosition) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO positions (client_id, title, description, location, salary_range)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                position.client_id,
                position.title,
                position.description,
                position.location,
                position.salary_range
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_positions(
        &self,
        status: Option<PositionStatus>,
        client_id: Option<i64>,
    ) -> Result<Vec<Position>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.client_id, c.name, p.title, p.status, p.description,
                    p.location, p.salary_range, p.created_at
             FROM positions p
             LEFT JOIN clients c ON c.id = p.client_id
             WHERE (?1 IS NULL OR p.status = ?1)
               AND (?2 IS NULL OR p.client_id = ?2)
             ORDER BY p.created_at DESC, p.id DESC",
        )?;
        let rows = stmt.query_map(params![status, client_id], Self::row_to_position)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_position(&self, id: i64) -> Result<Option<Position>> {
        Ok(self
            .conn
            .query_row(
                "SELECT p.id, p.client_id, c.name, p.title, p.status, p.description,
                        p.location, p.salary_range, p.created_at
                 FROM positions p
                 LEFT JOIN clients c ON c.id = p.client_id
                 WHERE p.id = ?1",
                [id],
                Self::row_to_position,
            )
            .optional()?)
    }

    pub fn set_position_status(&self, id: i64, status: PositionStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE positions SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("position #{}", id)));
        }
        Ok(())
    }

    pub fn delete_position(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM positions WHERE id = ?1", [id])?;
        Ok(())
    }

    fn row_to_position(row: &rusqlite::Row) -> rusqlite::Result<Position> {
        Ok(Position {
            id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            title: row.get(3)?,
            status: row.get(4)?,
            description: row.get(5)?,
            location: row.get(6)?,
            salary_range: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    // --- Recruiter operations ---

    pub fn insert_recruiter(
        &self,
        name: &str,
        email: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO recruiters (name, email, role, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, role, password_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_recruiters(&self) -> Result<Vec<Recruiter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, created_at FROM recruiters ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::row_to_recruiter)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_recruiter(&self, id: i64) -> Result<Option<Recruiter>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, email, role, created_at FROM recruiters WHERE id = ?1",
                [id],
                Self::row_to_recruiter,
            )
            .optional()?)
    }

    /// Recruiter plus stored password hash, for sign-in.
    pub fn get_credentials(&self, email: &str) -> Result<Option<(Recruiter, String)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, email, role, created_at, password_hash
                 FROM recruiters WHERE email = ?1",
                [email],
                |row| Ok((Self::row_to_recruiter(row)?, row.get(5)?)),
            )
            .optional()?)
    }

    pub fn set_recruiter_role(&self, id: i64, role: Role) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE recruiters SET role = ?1 WHERE id = ?2",
            params![role, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("recruiter #{}", id)));
        }
        Ok(())
    }

    fn row_to_recruiter(row: &rusqlite::Row) -> rusqlite::Result<Recruiter> {
        Ok(Recruiter {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Candidate operations ---

    pub fn insert_candidate(
        &self,
        draft: &CandidateDraft,
        profile_type: ProfileType,
        created_by: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO candidates (name, email, phone, location, linkedin_url, resume_url,
                                     skills, notes, profile_type, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                draft.name,
                draft.email,
                draft.phone,
                draft.location,
                draft.linkedin_url,
                draft.resume_url,
                draft.skills,
                draft.notes,
                profile_type,
                created_by
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_candidate(
        &self,
        id: i64,
        draft: &CandidateDraft,
        profile_type: ProfileType,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE candidates SET name = ?1, email = ?2, phone = ?3, location = ?4,
                    linkedin_url = ?5, resume_url = ?6, skills = ?7, notes = ?8,
                    profile_type = ?9
             WHERE id = ?10",
            params![
                draft.name,
                draft.email,
                draft.phone,
                draft.location,
                draft.linkedin_url,
                draft.resume_url,
                draft.skills,
                draft.notes,
                profile_type,
                id
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("candidate #{}", id)));
        }
        Ok(())
    }

    pub fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates ORDER BY created_at DESC, id DESC",
            CANDIDATE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_candidate)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        let sql = format!("SELECT {} FROM candidates WHERE id = ?1", CANDIDATE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_candidate)
            .optional()?)
    }

    pub fn find_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE LOWER(email) = LOWER(?1) LIMIT 1",
            CANDIDATE_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, [email], Self::row_to_candidate)
            .optional()?)
    }

    pub fn find_candidate_by_linkedin(&self, linkedin_url: &str) -> Result<Option<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE LOWER(linkedin_url) = LOWER(?1) LIMIT 1",
            CANDIDATE_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, [linkedin_url], Self::row_to_candidate)
            .optional()?)
    }

    pub fn set_candidate_resume(&self, id: i64, resume_url: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE candidates SET resume_url = ?1 WHERE id = ?2",
            params![resume_url, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("candidate #{}", id)));
        }
        Ok(())
    }

    pub fn delete_candidate(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM candidates WHERE id = ?1", [id])?;
        Ok(())
    }

    fn row_to_candidate(row: &rusqlite::Row) -> rusqlite::Result<Candidate> {
        Ok(Candidate {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            location: row.get(4)?,
            linkedin_url: row.get(5)?,
            resume_url: row.get(6)?,
            skills: row.get(7)?,
            notes: row.get(8)?,
            profile_type: row.get(9)?,
            created_by: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    // --- Pipeline operations ---

    pub fn insert_pipeline(
        &self,
        candidate_id: i64,
        position_id: i64,
        recruiter_id: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pipeline (candidate_id, position_id, recruiter_id, stage, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                candidate_id,
                position_id,
                recruiter_id,
                Stage::Screening,
                PipelineStatus::Active
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_pipeline(&self) -> Result<Vec<PipelineEntry>> {
        let sql = format!("{} ORDER BY p.created_at, p.id", PIPELINE_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_pipeline)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_pipeline(&self, id: i64) -> Result<Option<PipelineEntry>> {
        let sql = format!("{} WHERE p.id = ?1", PIPELINE_SELECT);
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_pipeline)
            .optional()?)
    }

    /// An existing non-archived entry joining this candidate to this position.
    pub fn find_open_pipeline(&self, candidate_id: i64, position_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM pipeline
                 WHERE candidate_id = ?1 AND position_id = ?2 AND stage != ?3",
                params![candidate_id, position_id, Stage::Archived],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn update_pipeline_stage(&self, id: i64, stage: Stage) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE pipeline SET stage = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![stage, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline entry #{}", id)));
        }
        Ok(())
    }

    pub fn update_pipeline_status(&self, id: i64, status: PipelineStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE pipeline SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("pipeline entry #{}", id)));
        }
        Ok(())
    }

    pub fn delete_pipeline_for_candidate(&self, candidate_id: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM pipeline WHERE candidate_id = ?1", [candidate_id])?)
    }

    pub fn delete_pipeline_for_position(&self, position_id: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM pipeline WHERE position_id = ?1", [position_id])?)
    }

    fn row_to_pipeline(row: &rusqlite::Row) -> rusqlite::Result<PipelineEntry> {
        Ok(PipelineEntry {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            position_id: row.get(2)?,
            recruiter_id: row.get(3)?,
            candidate_name: row.get(4)?,
            position_title: row.get(5)?,
            client_name: row.get(6)?,
            recruiter_name: row.get(7)?,
            recruiter_email: row.get(8)?,
            stage: row.get(9)?,
            status: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    // --- Comment operations ---

    pub fn insert_comment(&self, candidate_id: i64, author_id: i64, body: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO comments (candidate_id, author_id, body) VALUES (?1, ?2, ?3)",
            params![candidate_id, author_id, body],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_comments(&self, candidate_id: i64) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT cm.id, cm.candidate_id, cm.author_id, r.name, cm.body, cm.created_at, cm.updated_at
             FROM comments cm
             LEFT JOIN recruiters r ON r.id = cm.author_id
             WHERE cm.candidate_id = ?1
             ORDER BY cm.created_at, cm.id",
        )?;
        let rows = stmt.query_map([candidate_id], Self::row_to_comment)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self
            .conn
            .query_row(
                "SELECT cm.id, cm.candidate_id, cm.author_id, r.name, cm.body, cm.created_at, cm.updated_at
                 FROM comments cm
                 LEFT JOIN recruiters r ON r.id = cm.author_id
                 WHERE cm.id = ?1",
                [id],
                Self::row_to_comment,
            )
            .optional()?)
    }

    /// Comments with an id above `after_id`, oldest first, as `(id, author_id)`.
    pub fn comment_ids_after(&self, after_id: i64) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, author_id FROM comments WHERE id > ?1 ORDER BY id")?;
        let rows = stmt.query_map([after_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn max_comment_id(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM comments", [], |row| row.get(0))?)
    }

    pub fn update_comment_body(&self, id: i64, body: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE comments SET body = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![body, id],
        )?;
        Ok(())
    }

    pub fn delete_comment(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn delete_comments_for_candidate(&self, candidate_id: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM comments WHERE candidate_id = ?1", [candidate_id])?)
    }

    fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            author_id: row.get(2)?,
            author_name: row.get(3)?,
            body: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Interview operations ---

    pub fn insert_interview(&self, interview: &NewInterview) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO interviews (candidate_id, position_id, recruiter_id, scheduled_at, kind, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                interview.candidate_id,
                interview.position_id,
                interview.recruiter_id,
                interview.scheduled_at,
                interview.kind,
                interview.notes
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Interviews ordered by time, optionally only those at or after `from`.
    pub fn list_interviews(&self, from: Option<NaiveDateTime>) -> Result<Vec<Interview>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.candidate_id, i.position_id, i.recruiter_id, c.name, p.title,
                    i.scheduled_at, i.kind, i.notes, i.created_at
             FROM interviews i
             LEFT JOIN candidates c ON c.id = i.candidate_id
             LEFT JOIN positions p ON p.id = i.position_id
             WHERE (?1 IS NULL OR i.scheduled_at >= ?1)
             ORDER BY i.scheduled_at, i.id",
        )?;
        let rows = stmt.query_map(params![from], Self::row_to_interview)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_interview(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM interviews WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("interview #{}", id)));
        }
        Ok(())
    }

    pub fn delete_interviews_for_position(&self, position_id: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM interviews WHERE position_id = ?1", [position_id])?)
    }

    fn row_to_interview(row: &rusqlite::Row) -> rusqlite::Result<Interview> {
        Ok(Interview {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            position_id: row.get(2)?,
            recruiter_id: row.get(3)?,
            candidate_name: row.get(4)?,
            position_title: row.get(5)?,
            scheduled_at: row.get(6)?,
            kind: row.get(7)?,
            notes: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    // --- Outreach operations ---

    pub fn insert_outreach(&self, outreach: &NewOutreach) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO recruiter_outreach (recruiter_id, position_id, candidate_name,
                                             linkedin_url, status, rating, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                outreach.recruiter_id,
                outreach.position_id,
                outreach.candidate_name,
                outreach.linkedin_url,
                outreach.status,
                outreach.rating,
                outreach.notes
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_outreach(&self) -> Result<Vec<OutreachRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, o.recruiter_id, r.name, o.position_id, p.title, o.candidate_name,
                    o.linkedin_url, o.status, o.rating, o.notes, o.created_at
             FROM recruiter_outreach o
             LEFT JOIN recruiters r ON r.id = o.recruiter_id
             LEFT JOIN positions p ON p.id = o.position_id
             ORDER BY o.created_at DESC, o.id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_outreach)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_outreach(&self, id: i64) -> Result<Option<OutreachRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT o.id, o.recruiter_id, r.name, o.position_id, p.title, o.candidate_name,
                        o.linkedin_url, o.status, o.rating, o.notes, o.created_at
                 FROM recruiter_outreach o
                 LEFT JOIN recruiters r ON r.id = o.recruiter_id
                 LEFT JOIN positions p ON p.id = o.position_id
                 WHERE o.id = ?1",
                [id],
                Self::row_to_outreach,
            )
            .optional()?)
    }

    pub fn update_outreach(&self, id: i64, status: OutreachStatus, rating: u8) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE recruiter_outreach SET status = ?1, rating = ?2 WHERE id = ?3",
            params![status, rating, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("outreach #{}", id)));
        }
        Ok(())
    }

    fn row_to_outreach(row: &rusqlite::Row) -> rusqlite::Result<OutreachRecord> {
        Ok(OutreachRecord {
            id: row.get(0)?,
            recruiter_id: row.get(1)?,
            recruiter_name: row.get(2)?,
            position_id: row.get(3)?,
            position_title: row.get(4)?,
            candidate_name: row.get(5)?,
            linkedin_url: row.get(6)?,
            status: row.get(7)?,
            rating: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    // --- Commission operations ---

    pub fn insert_commission(
        &self,
        recruiter_id: i64,
        position_id: i64,
        candidate_id: i64,
        commission_type: CommissionType,
        inputs: &CommissionInputs,
        amount: f64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO commissions (recruiter_id, position_id, candidate_id, commission_type,
                                      placement_fee, client_rate, contractor_rate, source_fee,
                                      stage_percentage, commission_rate, amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                recruiter_id,
                position_id,
                candidate_id,
                commission_type,
                inputs.placement_fee,
                inputs.client_rate,
                inputs.contractor_rate,
                inputs.source_fee,
                inputs.stage_percentage,
                inputs.commission_rate,
                amount
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_commissions(&self, recruiter_id: Option<i64>) -> Result<Vec<Commission>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recruiter_id, position_id, candidate_id, commission_type, placement_fee,
                    client_rate, contractor_rate, source_fee, stage_percentage, commission_rate,
                    amount, created_at
             FROM commissions
             WHERE (?1 IS NULL OR recruiter_id = ?1)
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![recruiter_id], |row| {
            Ok(Commission {
                id: row.get(0)?,
                recruiter_id: row.get(1)?,
                position_id: row.get(2)?,
                candidate_id: row.get(3)?,
                commission_type: row.get(4)?,
                placement_fee: row.get(5)?,
                client_rate: row.get(6)?,
                contractor_rate: row.get(7)?,
                source_fee: row.get(8)?,
                stage_percentage: row.get(9)?,
                commission_rate: row.get(10)?,
                amount: row.get(11)?,
                created_at: row.get(12)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_commission(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM commissions WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("commission #{}", id)));
        }
        Ok(())
    }

    // --- Company document operations ---

    pub fn insert_document(&self, doc: &NewDocument) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO company_documents (title, file_name, storage_path, public_url, uploaded_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doc.title,
                doc.file_name,
                doc.storage_path,
                doc.public_url,
                doc.uploaded_by
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_documents(&self) -> Result<Vec<CompanyDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, file_name, storage_path, public_url, uploaded_by, created_at
             FROM company_documents ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_document)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_document(&self, id: i64) -> Result<Option<CompanyDocument>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, title, file_name, storage_path, public_url, uploaded_by, created_at
                 FROM company_documents WHERE id = ?1",
                [id],
                Self::row_to_document,
            )
            .optional()?)
    }

    pub fn delete_document(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM company_documents WHERE id = ?1", [id])?;
        Ok(())
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<CompanyDocument> {
        Ok(CompanyDocument {
            id: row.get(0)?,
            title: row.get(1)?,
            file_name: row.get(2)?,
            storage_path: row.get(3)?,
            public_url: row.get(4)?,
            uploaded_by: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // --- Notification outbox (write-only) ---

    pub fn insert_notification(&self, notification: &NewNotification) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notification_outbox (recipient_id, recipient_email, message, kind)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                notification.recipient_id,
                notification.recipient_email,
                notification.message,
                notification.kind
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
