mod auth;
mod candidates;
mod commission;
mod config;
mod db;
mod documents;
mod error;
mod history;
mod interviews;
mod models;
mod optimistic;
mod outbox;
mod outreach;
mod pipeline;
mod positions;
mod prompt;
mod resume_parse;
mod review;
mod storage;
mod store;
mod talent_pool;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use auth::{Session, SessionStore};
use commission::{CommissionField, CommissionForm};
use config::Config;
use db::Database;
use documents::Preview;
use interviews::{ScheduleRequest, DATETIME_FORMAT};
use models::{
    CandidateDraft, CommissionType, NewClient, NewOutreach, NewPosition, OutreachStatus,
    PipelineStatus, PositionStatus, Role, Stage,
};
use pipeline::{PipelineBoard, StageOutcome, StatusOutcome, TransitionSource};
use prompt::{AlertKind, Prompt, TerminalPrompt};
use review::{AgingBanner, ReviewDecision};
use storage::ObjectStorage;
use store::AppStore;
use talent_pool::{PoolFilter, SourcingFilter};

#[derive(Parser)]
#[command(name = "recruit")]
#[command(about = "Recruitment agency tracker - candidates, pipelines, reviews and commissions")]
struct Cli {
    /// Path to recruit.toml
    #[arg(long, global = true, env = "RECRUIT_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (overrides the config)
    #[arg(long, global = true, env = "RECRUIT_DB")]
    db: Option<PathBuf>,

    /// Address that holds the Director role (overrides the config)
    #[arg(long, global = true, env = "RECRUIT_DIRECTOR_EMAIL")]
    director_email: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database, optionally with the first account
    Init {
        /// Name for the first account
        #[arg(long, requires_all = ["email", "password"])]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, env = "RECRUIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in with email and password
    Login {
        email: String,

        #[arg(long, env = "RECRUIT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in identity
    Whoami,

    /// Manage clients
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage positions
    Position {
        #[command(subcommand)]
        command: PositionCommands,
    },

    /// Manage recruiter accounts
    Recruiter {
        #[command(subcommand)]
        command: RecruiterCommands,
    },

    /// Manage candidates
    Candidate {
        #[command(subcommand)]
        command: CandidateCommands,
    },

    /// Candidate comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Search the talent pool
    Pool(PoolArgs),

    /// Pipeline entries and stage changes
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },

    /// Interactive pipeline board
    Board,

    /// Director review queues
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// Interview scheduling
    Interview {
        #[command(subcommand)]
        command: InterviewCommands,
    },

    /// LinkedIn sourcing activity
    Outreach {
        #[command(subcommand)]
        command: OutreachCommands,
    },

    /// Commission calculator and records
    Commission {
        #[command(subcommand)]
        command: CommissionCommands,
    },

    /// How past positions were filled
    History {
        /// Single position ID
        position: Option<i64>,
    },

    /// Company documents
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },

    /// Extract candidate fields from a resume with an LLM
    ParseResume {
        /// Resume file (.docx or plain text)
        file: PathBuf,

        /// Model (api-sonnet, api-haiku, gpt-4o, gpt-4o-mini)
        #[arg(short, long)]
        model: Option<String>,

        /// Create a candidate from the result and attach the file
        #[arg(long)]
        create: bool,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Add a client
    Add {
        name: String,

        #[arg(long)]
        industry: Option<String>,

        #[arg(long)]
        contact_name: Option<String>,

        #[arg(long)]
        contact_email: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List clients
    List,

    /// Delete a client with no positions
    Delete { name: String },
}

#[derive(Subcommand)]
enum PositionCommands {
    /// Open a position for a client
    Add {
        /// Client name
        client: String,

        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        salary: Option<String>,
    },

    /// List positions
    List {
        /// Filter by status (open, closed)
        #[arg(short, long)]
        status: Option<PositionStatus>,

        /// Filter by client name
        #[arg(short, long)]
        client: Option<String>,
    },

    /// Show position details and its pipeline
    Show { id: i64 },

    /// Set position status (open, closed)
    Status { id: i64, status: PositionStatus },

    /// Delete a position with its pipeline and interviews
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum RecruiterCommands {
    /// Add an account
    Add {
        name: String,

        email: String,

        /// recruiter, manager or director
        #[arg(short, long, default_value = "recruiter")]
        role: Role,

        #[arg(long, env = "RECRUIT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List accounts
    List,

    /// Change an account's stored role
    SetRole { id: i64, role: Role },
}

#[derive(clap::Args)]
struct CandidateFields {
    #[arg(short, long)]
    email: Option<String>,

    #[arg(short, long)]
    phone: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(long)]
    linkedin: Option<String>,

    /// Comma-separated
    #[arg(short, long)]
    skills: Option<String>,

    #[arg(short, long)]
    notes: Option<String>,
}

impl CandidateFields {
    fn into_draft(self, name: String) -> CandidateDraft {
        CandidateDraft {
            name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            linkedin_url: self.linkedin,
            resume_url: None,
            skills: self.skills,
            notes: self.notes,
        }
    }
}

#[derive(Subcommand)]
enum CandidateCommands {
    /// Add a full candidate profile
    Add {
        name: String,

        #[command(flatten)]
        fields: CandidateFields,

        /// Resume file to attach
        #[arg(short, long)]
        resume: Option<PathBuf>,
    },

    /// List candidates
    List,

    /// Show a candidate with pipeline entries and comments
    Show { id: i64 },

    /// Complete a shell profile
    Promote {
        id: i64,

        /// Replacement name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: CandidateFields,
    },

    /// Attach a resume file
    Resume { id: i64, file: PathBuf },

    /// Delete a candidate with comments and pipeline entries
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comment on a candidate
    Add { candidate: i64, body: String },

    /// List comments on a candidate
    List { candidate: i64 },

    /// Edit one of your comments
    Edit { id: i64, body: String },

    /// Delete one of your comments
    Delete { id: i64 },
}

#[derive(clap::Args)]
struct PoolArgs {
    /// Substring of name, email, phone or notes
    #[arg(short, long)]
    search: Option<String>,

    /// Comma-separated; all must match
    #[arg(long)]
    skills: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    /// Created on or after (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Created on or before (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long)]
    has_resume: bool,

    #[arg(long)]
    has_linkedin: bool,

    #[arg(long)]
    active: bool,

    /// Sourced LinkedIn profiles only; enables the sourcing filters below
    #[arg(long)]
    linkedin_only: bool,

    /// Sourced for this position
    #[arg(long)]
    position: Option<i64>,

    /// Last outreach status
    #[arg(long)]
    last_status: Option<OutreachStatus>,

    #[arg(long)]
    min_rating: Option<u8>,

    /// Sourced by this recruiter ID
    #[arg(long)]
    recruiter: Option<i64>,
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// Put a candidate into a position's pipeline
    Assign { candidate: i64, position: i64 },

    /// List pipeline entries
    List {
        #[arg(short, long)]
        position: Option<i64>,

        #[arg(short, long)]
        stage: Option<Stage>,
    },

    /// Move an entry to another stage
    Stage { id: i64, stage: Stage },

    /// Set entry status (active, hold, reject)
    Status { id: i64, status: PipelineStatus },

    /// Archive an entry
    Archive { id: i64 },
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// Show the screening queue (or the hold queue)
    Queue {
        #[arg(long)]
        hold: bool,
    },

    /// Decide on an entry: hold, reject, submit-to-client, comment-only
    Decide {
        id: i64,

        decision: ReviewDecision,

        #[arg(short, long, default_value = "")]
        comment: String,
    },
}

#[derive(Subcommand)]
enum InterviewCommands {
    /// Schedule an interview
    Schedule {
        candidate: i64,

        position: i64,

        /// "YYYY-MM-DD HH:MM"
        when: String,

        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Upcoming interviews grouped by day
    List {
        /// Include past interviews
        #[arg(long)]
        all: bool,
    },

    /// Cancel an interview
    Cancel { id: i64 },
}

#[derive(Subcommand)]
enum OutreachCommands {
    /// Log a contact
    Log {
        name: String,

        #[arg(long)]
        linkedin: Option<String>,

        #[arg(short, long)]
        position: Option<i64>,

        #[arg(short, long, default_value = "contacted")]
        status: OutreachStatus,

        #[arg(short, long, default_value = "0")]
        rating: u8,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List outreach records
    List,

    /// Update status and rating
    Update {
        id: i64,

        status: OutreachStatus,

        #[arg(short, long, default_value = "0")]
        rating: u8,
    },

    /// Create a shell candidate from a contact
    Convert { id: i64 },

    /// Count contacts per status
    Summary,
}

#[derive(clap::Args)]
struct CommissionArgs {
    /// placement, contract or team-interview
    #[arg(short = 't', long = "type")]
    commission_type: CommissionType,

    #[arg(long)]
    placement_fee: Option<String>,

    #[arg(long)]
    client_rate: Option<String>,

    #[arg(long)]
    contractor_rate: Option<String>,

    #[arg(long)]
    source_fee: Option<String>,

    #[arg(long)]
    stage_percentage: Option<String>,

    #[arg(long)]
    rate: Option<String>,
}

impl CommissionArgs {
    fn form(self) -> CommissionForm {
        let mut form = CommissionForm::new(self.commission_type);
        for (field, value) in [
            (CommissionField::PlacementFee, self.placement_fee),
            (CommissionField::ClientRate, self.client_rate),
            (CommissionField::ContractorRate, self.contractor_rate),
            (CommissionField::SourceFee, self.source_fee),
            (CommissionField::StagePercentage, self.stage_percentage),
            (CommissionField::CommissionRate, self.rate),
        ] {
            if let Some(value) = value {
                form.set(field, &value);
            }
        }
        form
    }
}

#[derive(Subcommand)]
enum CommissionCommands {
    /// Compute an amount without saving
    Calc(CommissionArgs),

    /// Record a commission
    Add {
        position: i64,

        candidate: i64,

        /// Credit another recruiter (defaults to you)
        #[arg(long)]
        recruiter: Option<i64>,

        #[command(flatten)]
        args: CommissionArgs,
    },

    /// List commissions
    List {
        #[arg(short, long)]
        recruiter: Option<i64>,
    },

    /// Totals per recruiter
    Totals,

    /// Delete a commission record
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum DocsCommands {
    /// Upload a company document
    Upload {
        file: PathBuf,

        #[arg(short, long)]
        title: Option<String>,
    },

    /// List documents
    List,

    /// Preview a .docx as HTML
    Preview { id: i64 },

    /// Delete a document
    Delete { id: i64 },
}

/// Everything a command needs besides its arguments.
struct App {
    config: Config,
    db: Database,
    storage: ObjectStorage,
    sessions: SessionStore,
    prompt: TerminalPrompt,
}

impl App {
    fn session(&self) -> Result<Session> {
        Ok(self.sessions.require(&self.db, &self.config.director_email)?)
    }

    fn reviewer(&self) -> Result<Session> {
        let session = self.session()?;
        if !session.role.can_review() {
            return Err(anyhow!("review is limited to managers and the director"));
        }
        Ok(session)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recruit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(email) = cli.director_email {
        config.director_email = email;
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let app = App {
        storage: ObjectStorage::new(&config.storage_dir),
        sessions: SessionStore::new(&config.session_path),
        prompt: TerminalPrompt::new(cli.yes),
        db,
        config,
    };

    match cli.command {
        Commands::Init { name, email, password } => init(&app, name, email, password),
        command => {
            app.db.ensure_initialized()?;
            run(&app, command)
        }
    }
}

fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Init { name, email, password } => init(app, name, email, password)?,

        Commands::Login { email, password } => {
            let session = auth::sign_in(&app.db, &email, &password, &app.config.director_email)?;
            app.sessions.save(&session)?;
            println!("Signed in as {} ({}).", session.name, session.role);
        }

        Commands::Logout => {
            if app.sessions.clear()? {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }

        Commands::Whoami => match app.sessions.restore(&app.db, &app.config.director_email)? {
            Some(s) => println!(
                "{} <{}> - {} (since {})",
                s.name,
                s.email,
                s.role,
                s.signed_in_at.format(DATETIME_FORMAT)
            ),
            None => println!("Not signed in."),
        },

        Commands::Client { command } => client_command(app, command)?,
        Commands::Position { command } => position_command(app, command)?,
        Commands::Recruiter { command } => recruiter_command(app, command)?,
        Commands::Candidate { command } => candidate_command(app, command)?,
        Commands::Comment { command } => comment_command(app, command)?,
        Commands::Pool(args) => pool_command(app, args)?,
        Commands::Pipeline { command } => pipeline_command(app, command)?,

        Commands::Board => {
            let session = app.session()?;
            let mut store = AppStore::new(&app.db, Some(session));
            let failed = store.refresh_all();
            if failed > 0 {
                app.prompt.alert(
                    AlertKind::Warning,
                    &format!("{} collection(s) failed to load; see the log.", failed),
                );
            }
            tui::run_board(&mut store)?;
        }

        Commands::Review { command } => review_command(app, command)?,
        Commands::Interview { command } => interview_command(app, command)?,
        Commands::Outreach { command } => outreach_command(app, command)?,
        Commands::Commission { command } => commission_command(app, command)?,
        Commands::History { position } => history_command(app, position)?,
        Commands::Docs { command } => docs_command(app, command)?,

        Commands::ParseResume { file, model, create } => {
            parse_resume_command(app, file, model, create)?
        }
    }

    Ok(())
}

fn init(app: &App, name: Option<String>, email: Option<String>, password: Option<String>) -> Result<()> {
    app.db.init()?;
    println!("Database initialized at {}", app.db.path().display());

    if let (Some(name), Some(email), Some(password)) = (name, email, password) {
        if app.db.get_credentials(&email)?.is_some() {
            println!("Account {} already exists.", email);
            return Ok(());
        }
        let role = Role::resolve(Role::Manager, &email, &app.config.director_email);
        let id = app
            .db
            .insert_recruiter(&name, &email, role, &auth::hash_password(&password))?;
        println!("Created account #{} for {} ({}).", id, name, role);
    }
    Ok(())
}

fn client_command(app: &App, command: ClientCommands) -> Result<()> {
    match command {
        ClientCommands::Add {
            name,
            industry,
            contact_name,
            contact_email,
            notes,
        } => {
            let id = positions::create_client(
                &app.db,
                &NewClient {
                    name,
                    industry,
                    contact_name,
                    contact_email,
                    notes,
                },
            )?;
            println!("Added client #{}", id);
        }

        ClientCommands::List => {
            let clients = app.db.list_clients()?;
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<6} {:<28} {:<18} {:<28}", "ID", "NAME", "INDUSTRY", "CONTACT");
                println!("{}", "-".repeat(82));
                for client in clients {
                    let contact = match (&client.contact_name, &client.contact_email) {
                        (Some(n), Some(e)) => format!("{} <{}>", n, e),
                        (Some(n), None) => n.clone(),
                        (None, Some(e)) => e.clone(),
                        (None, None) => "-".to_string(),
                    };
                    println!(
                        "{:<6} {:<28} {:<18} {:<28}",
                        client.id,
                        truncate(&client.name, 26),
                        truncate(client.industry.as_deref().unwrap_or("-"), 16),
                        truncate(&contact, 28)
                    );
                }
            }
        }

        ClientCommands::Delete { name } => {
            if positions::delete_client(&app.db, &name, &app.prompt)? {
                println!("Deleted client '{}'.", name);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

fn position_command(app: &App, command: PositionCommands) -> Result<()> {
    match command {
        PositionCommands::Add {
            client,
            title,
            description,
            location,
            salary,
        } => {
            let id = positions::create_position(
                &app.db,
                &client,
                &NewPosition {
                    title,
                    description,
                    location,
                    salary_range: salary,
                    ..Default::default()
                },
            )?;
            println!("Opened position #{}", id);
        }

        PositionCommands::List { status, client } => {
            let client_id = match client {
                Some(name) => Some(
                    app.db
                        .get_client_by_name(&name)?
                        .ok_or_else(|| anyhow!("Client '{}' not found", name))?
                        .id,
                ),
                None => None,
            };
            let positions = app.db.list_positions(status, client_id)?;
            if positions.is_empty() {
                println!("No positions found.");
            } else {
                println!("{:<6} {:<8} {:<30} {:<20} {:<16}", "ID", "STATUS", "TITLE", "CLIENT", "LOCATION");
                println!("{}", "-".repeat(84));
                for p in positions {
                    println!(
                        "{:<6} {:<8} {:<30} {:<20} {:<16}",
                        p.id,
                        p.status,
                        truncate(&p.title, 28),
                        truncate(p.client_name.as_deref().unwrap_or("-"), 18),
                        truncate(p.location.as_deref().unwrap_or("-"), 16)
                    );
                }
            }
        }

        PositionCommands::Show { id } => match app.db.get_position(id)? {
            Some(p) => {
                println!("Position #{}", p.id);
                println!("Title: {}", p.title);
                if let Some(client) = &p.client_name {
                    println!("Client: {}", client);
                }
                println!("Status: {}", p.status);
                if let Some(location) = &p.location {
                    println!("Location: {}", location);
                }
                if let Some(salary) = &p.salary_range {
                    println!("Salary: {}", salary);
                }
                println!("Opened: {}", p.created_at.format(DATETIME_FORMAT));
                if let Some(description) = &p.description {
                    println!("\n{}", textwrap::fill(description, 80));
                }
                let pipeline: Vec<_> = app
                    .db
                    .list_pipeline()?
                    .into_iter()
                    .filter(|e| e.position_id == id)
                    .collect();
                if !pipeline.is_empty() {
                    println!("\nPipeline ({}):", pipeline.len());
                    for e in pipeline {
                        println!("  #{} - {} [{} / {}]", e.id, e.candidate_name, e.stage, e.status);
                    }
                }
            }
            None => println!("Position #{} not found.", id),
        },

        PositionCommands::Status { id, status } => {
            positions::set_status(&app.db, id, status)?;
            println!("Position #{} is now {}.", id, status);
        }

        PositionCommands::Delete { id } => match positions::delete_position(&app.db, id, &app.prompt)? {
            Some(report) => println!(
                "Deleted position #{} ({} pipeline entries, {} interviews).",
                id, report.pipeline, report.interviews
            ),
            None => println!("Cancelled."),
        },
    }
    Ok(())
}

fn recruiter_command(app: &App, command: RecruiterCommands) -> Result<()> {
    match command {
        RecruiterCommands::Add {
            name,
            email,
            role,
            password,
        } => {
            // The very first account can be created without signing in.
            if !app.db.list_recruiters()?.is_empty() {
                app.reviewer()?;
            }
            if name.trim().is_empty() || !email.contains('@') {
                return Err(anyhow!("A name and a valid email are required"));
            }
            let role = Role::resolve(role, &email, &app.config.director_email);
            let id = app
                .db
                .insert_recruiter(name.trim(), email.trim(), role, &auth::hash_password(&password))
                .with_context(|| format!("Could not add {}", email))?;
            println!("Added {} #{} ({}).", role, id, email);
        }

        RecruiterCommands::List => {
            let recruiters = app.db.list_recruiters()?;
            if recruiters.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<6} {:<10} {:<24} {:<32}", "ID", "ROLE", "NAME", "EMAIL");
                println!("{}", "-".repeat(74));
                for r in recruiters {
                    println!(
                        "{:<6} {:<10} {:<24} {:<32}",
                        r.id,
                        r.role,
                        truncate(&r.name, 22),
                        truncate(&r.email, 32)
                    );
                }
            }
        }

        RecruiterCommands::SetRole { id, role } => {
            let session = app.session()?;
            if !session.role.can_approve_stage_changes() {
                return Err(anyhow!("Only the director can change roles"));
            }
            let recruiter = app
                .db
                .get_recruiter(id)?
                .ok_or_else(|| anyhow!("Recruiter #{} not found", id))?;
            let effective = Role::resolve(role, &recruiter.email, &app.config.director_email);
            app.db.set_recruiter_role(id, effective)?;
            if effective != role {
                app.prompt.alert(
                    AlertKind::Warning,
                    &format!("{} is stored as {} (Director is tied to the configured address).", recruiter.email, effective),
                );
            }
            println!("{} is now {}.", recruiter.name, effective);
        }
    }
    Ok(())
}

fn candidate_command(app: &App, command: CandidateCommands) -> Result<()> {
    match command {
        CandidateCommands::Add { name, fields, resume } => {
            let session = app.session()?;
            let draft = fields.into_draft(name);
            let existing = app.db.list_candidates()?;
            for similar in candidates::similar_names(&existing, &draft.name) {
                app.prompt.alert(
                    AlertKind::Warning,
                    &format!("Similar name already on file: #{} {}", similar.id, similar.name),
                );
            }
            let id = candidates::create_candidate(&app.db, &draft, Some(session.recruiter_id))?;
            println!("Added candidate #{}", id);
            if let Some(file) = resume {
                let url = candidates::attach_resume(&app.db, &app.storage, id, &file)?;
                println!("Resume: {}", url);
            }
        }

        CandidateCommands::List => {
            let candidates = app.db.list_candidates()?;
            print_candidates(&candidates.iter().collect::<Vec<_>>());
        }

        CandidateCommands::Show { id } => match app.db.get_candidate(id)? {
            Some(c) => {
                println!("Candidate #{} ({})", c.id, c.profile_type);
                println!("Name: {}", c.name);
                for (label, value) in [
                    ("Email", &c.email),
                    ("Phone", &c.phone),
                    ("Location", &c.location),
                    ("LinkedIn", &c.linkedin_url),
                    ("Resume", &c.resume_url),
                    ("Skills", &c.skills),
                ] {
                    if let Some(v) = value {
                        println!("{}: {}", label, v);
                    }
                }
                println!("Added: {}", c.created_at.format(DATETIME_FORMAT));
                if let Some(notes) = &c.notes {
                    println!("\n{}", textwrap::fill(notes, 80));
                }

                let entries: Vec<_> = app
                    .db
                    .list_pipeline()?
                    .into_iter()
                    .filter(|e| e.candidate_id == id)
                    .collect();
                if !entries.is_empty() {
                    println!("\nPipeline ({}):", entries.len());
                    for e in entries {
                        println!(
                            "  #{} - {} [{} / {}] via {}",
                            e.id, e.position_title, e.stage, e.status, e.recruiter_name
                        );
                    }
                }
                print_comments(&app.db.list_comments(id)?);
            }
            None => println!("Candidate #{} not found.", id),
        },

        CandidateCommands::Promote { id, name, fields } => {
            let draft = fields.into_draft(name.unwrap_or_default());
            candidates::promote_shell(&app.db, id, &draft)?;
            println!("Candidate #{} promoted to a full profile.", id);
        }

        CandidateCommands::Resume { id, file } => {
            let url = candidates::attach_resume(&app.db, &app.storage, id, &file)?;
            println!("Resume attached: {}", url);
        }

        CandidateCommands::Delete { id } => {
            if candidates::delete_candidate(&app.db, id, &app.prompt)? {
                println!("Deleted candidate #{}.", id);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

fn print_candidates(candidates: &[&models::Candidate]) {
    if candidates.is_empty() {
        println!("No candidates found.");
        return;
    }
    println!("{:<6} {:<6} {:<24} {:<28} {:<16} {:<20}", "ID", "TYPE", "NAME", "EMAIL", "LOCATION", "SKILLS");
    println!("{}", "-".repeat(104));
    for c in candidates {
        println!(
            "{:<6} {:<6} {:<24} {:<28} {:<16} {:<20}",
            c.id,
            c.profile_type,
            truncate(&c.name, 22),
            truncate(c.email.as_deref().unwrap_or("-"), 26),
            truncate(c.location.as_deref().unwrap_or("-"), 14),
            truncate(c.skills.as_deref().unwrap_or("-"), 20)
        );
    }
}

fn print_comments(comments: &[models::Comment]) {
    if comments.is_empty() {
        return;
    }
    println!("\nComments ({}):", comments.len());
    for c in comments {
        let edited = if c.updated_at > c.created_at { " (edited)" } else { "" };
        println!(
            "  #{} {} - {}{}",
            c.id,
            c.author_name.as_deref().unwrap_or("unknown"),
            c.created_at.format(DATETIME_FORMAT),
            edited
        );
        println!("{}", textwrap::indent(&textwrap::fill(&c.body, 76), "    "));
    }
}

fn comment_command(app: &App, command: CommentCommands) -> Result<()> {
    match command {
        CommentCommands::Add { candidate, body } => {
            let session = app.session()?;
            let id = candidates::add_comment(&app.db, &session, candidate, &body)?;
            println!("Added comment #{}", id);
        }

        CommentCommands::List { candidate } => {
            let comments = app.db.list_comments(candidate)?;
            if comments.is_empty() {
                println!("No comments on candidate #{}.", candidate);
            } else {
                print_comments(&comments);
            }
        }

        CommentCommands::Edit { id, body } => {
            let session = app.session()?;
            candidates::edit_comment(&app.db, &session, id, &body)?;
            println!("Updated comment #{}", id);
        }

        CommentCommands::Delete { id } => {
            let session = app.session()?;
            candidates::delete_comment(&app.db, &session, id)?;
            println!("Deleted comment #{}", id);
        }
    }
    Ok(())
}

fn pool_command(app: &App, args: PoolArgs) -> Result<()> {
    let filter = PoolFilter {
        search: args.search,
        skills: args.skills,
        location: args.location,
        created_from: args.from,
        created_to: args.to,
        has_resume: args.has_resume,
        has_linkedin: args.has_linkedin,
        in_active_pipeline: args.active,
        linkedin_only: args.linkedin_only,
        sourcing: SourcingFilter {
            position_id: args.position,
            last_status: args.last_status,
            min_rating: args.min_rating,
            recruiter_id: args.recruiter,
        },
    };
    if !filter.linkedin_only && !filter.sourcing.is_empty() {
        app.prompt.alert(
            AlertKind::Info,
            "Sourcing filters only apply together with --linkedin-only.",
        );
    }

    let mut store = AppStore::new(
        &app.db,
        app.sessions.restore(&app.db, &app.config.director_email)?,
    );
    if store.refresh_all() > 0 {
        app.prompt
            .alert(AlertKind::Warning, "Some data failed to load; results may be incomplete.");
    }
    let pool = talent_pool::apply(&filter, &store.candidates, &store.pipeline, &store.outreach);
    print_candidates(&pool);
    if !pool.is_empty() {
        println!("\n{} of {} candidates", pool.len(), store.candidates.len());
    }
    Ok(())
}

fn pipeline_command(app: &App, command: PipelineCommands) -> Result<()> {
    match command {
        PipelineCommands::Assign { candidate, position } => {
            let session = app.session()?;
            let id = pipeline::assign(&app.db, candidate, position, session.recruiter_id)?;
            println!("Added pipeline entry #{} at {}.", id, Stage::Screening);
        }

        PipelineCommands::List { position, stage } => {
            let entries: Vec<_> = app
                .db
                .list_pipeline()?
                .into_iter()
                .filter(|e| position.is_none_or(|p| e.position_id == p))
                .filter(|e| stage.is_none_or(|s| e.stage == s))
                .collect();
            if entries.is_empty() {
                println!("No pipeline entries found.");
            } else {
                println!(
                    "{:<6} {:<22} {:<24} {:<18} {:<8} {:<16}",
                    "ID", "CANDIDATE", "POSITION", "STAGE", "STATUS", "RECRUITER"
                );
                println!("{}", "-".repeat(98));
                for e in entries {
                    println!(
                        "{:<6} {:<22} {:<24} {:<18} {:<8} {:<16}",
                        e.id,
                        truncate(&e.candidate_name, 20),
                        truncate(&e.position_title, 22),
                        e.stage,
                        e.status,
                        truncate(&e.recruiter_name, 16)
                    );
                }
            }
        }

        PipelineCommands::Stage { id, stage } => {
            let session = app.session()?;
            let mut board = PipelineBoard::new(app.db.list_pipeline()?);
            let outcome = board.change_stage(
                &session,
                id,
                stage,
                TransitionSource::Dropdown,
                &app.db,
                &app.db,
                &app.prompt,
            )?;
            report_stage(id, outcome);
        }

        PipelineCommands::Status { id, status } => {
            app.session()?;
            let mut board = PipelineBoard::new(app.db.list_pipeline()?);
            match board.change_status(id, status, &app.db, &app.prompt)? {
                StatusOutcome::Unchanged => println!("Entry #{} is already {}.", id, status),
                StatusOutcome::Applied { from, to } => {
                    println!("Entry #{}: {} -> {}", id, from, to)
                }
                StatusOutcome::RolledBack { .. } => {}
            }
        }

        PipelineCommands::Archive { id } => {
            let session = app.session()?;
            let mut board = PipelineBoard::new(app.db.list_pipeline()?);
            let outcome = board.archive(&session, id, &app.db, &app.db, &app.prompt)?;
            report_stage(id, outcome);
        }
    }
    Ok(())
}

fn report_stage(id: i64, outcome: StageOutcome) {
    match outcome {
        StageOutcome::Unchanged => println!("Entry #{} is already at that stage.", id),
        StageOutcome::Applied { from, to } => println!("Entry #{}: {} -> {}", id, from, to),
        StageOutcome::Approved { from, to, notified } => {
            println!("Entry #{}: {} -> {}", id, from, to);
            if notified {
                println!("Recruiter notified.");
            }
        }
        StageOutcome::Dismissed { restored } => {
            println!("Not approved; entry #{} stays at {}.", id, restored)
        }
        // Alert already shown by the board.
        StageOutcome::RolledBack { .. } | StageOutcome::AwaitingApproval(_) => {}
    }
}

fn review_command(app: &App, command: ReviewCommands) -> Result<()> {
    match command {
        ReviewCommands::Queue { hold } => {
            app.reviewer()?;
            let entries = app.db.list_pipeline()?;
            let queue = if hold {
                review::hold_queue(&entries)
            } else {
                review::screening_queue(&entries)
            };
            let now = app.db.now()?;

            match review::aging_banner(&queue, now, app.config.aging) {
                Some(AgingBanner::High(names)) => app.prompt.alert(
                    AlertKind::Error,
                    &format!(
                        "Waiting more than {} days: {}",
                        app.config.aging.critical_days,
                        names.join(", ")
                    ),
                ),
                Some(AgingBanner::Medium(names)) => app.prompt.alert(
                    AlertKind::Warning,
                    &format!(
                        "Waiting {}+ days: {}",
                        app.config.aging.warn_days,
                        names.join(", ")
                    ),
                ),
                None => {}
            }

            if queue.is_empty() {
                println!("Nothing to review.");
            } else {
                println!(
                    "{:<6} {:<22} {:<24} {:<18} {:<16} {:>5}",
                    "ID", "CANDIDATE", "POSITION", "CLIENT", "RECRUITER", "DAYS"
                );
                println!("{}", "-".repeat(96));
                for e in queue {
                    println!(
                        "{:<6} {:<22} {:<24} {:<18} {:<16} {:>5}",
                        e.id,
                        truncate(&e.candidate_name, 20),
                        truncate(&e.position_title, 22),
                        truncate(e.client_name.as_deref().unwrap_or("-"), 16),
                        truncate(&e.recruiter_name, 16),
                        review::age_in_days(e, now)
                    );
                }
            }
        }

        ReviewCommands::Decide { id, decision, comment } => {
            let reviewer = app.reviewer()?;
            let entry = app
                .db
                .get_pipeline(id)?
                .ok_or_else(|| anyhow!("Pipeline entry #{} not found", id))?;
            let outcome = review::decide(&reviewer, &entry, decision, &comment, &app.db, &app.db, &app.db)?;
            println!(
                "{}: {} is at {} / {}.",
                decision, entry.candidate_name, outcome.stage, outcome.status
            );
            if outcome.notified {
                println!("{} notified.", entry.recruiter_name);
            }
        }
    }
    Ok(())
}

fn interview_command(app: &App, command: InterviewCommands) -> Result<()> {
    match command {
        InterviewCommands::Schedule {
            candidate,
            position,
            when,
            kind,
            notes,
        } => {
            let session = app.session()?;
            let id = interviews::schedule(
                &app.db,
                &ScheduleRequest {
                    candidate_id: candidate,
                    position_id: position,
                    recruiter_id: Some(session.recruiter_id),
                    when: &when,
                    kind,
                    notes,
                },
            )?;
            println!("Scheduled interview #{}", id);
        }

        InterviewCommands::List { all } => {
            let list = if all {
                app.db.list_interviews(None)?
            } else {
                interviews::upcoming(&app.db, Local::now().naive_local())?
            };
            if list.is_empty() {
                println!("No interviews scheduled.");
            }
            for (day, items) in interviews::by_day(&list) {
                println!("{}", day.format("%A %Y-%m-%d"));
                for i in items {
                    println!(
                        "  {} #{:<4} {:<22} {:<24} {}",
                        i.scheduled_at.format("%H:%M"),
                        i.id,
                        truncate(i.candidate_name.as_deref().unwrap_or("-"), 20),
                        truncate(i.position_title.as_deref().unwrap_or("-"), 22),
                        i.kind.as_deref().unwrap_or("")
                    );
                }
            }
        }

        InterviewCommands::Cancel { id } => {
            let confirmed = app
                .prompt
                .confirm("Cancel interview?", &format!("Interview #{} will be removed.", id));
            if confirmed {
                interviews::cancel(&app.db, id)?;
                println!("Cancelled interview #{}", id);
            }
        }
    }
    Ok(())
}

fn outreach_command(app: &App, command: OutreachCommands) -> Result<()> {
    match command {
        OutreachCommands::Log {
            name,
            linkedin,
            position,
            status,
            rating,
            notes,
        } => {
            let session = app.session()?;
            let id = outreach::log_contact(
                &app.db,
                &NewOutreach {
                    recruiter_id: session.recruiter_id,
                    position_id: position,
                    candidate_name: name,
                    linkedin_url: linkedin,
                    status,
                    rating,
                    notes,
                },
            )?;
            println!("Logged outreach #{}", id);
        }

        OutreachCommands::List => {
            let records = app.db.list_outreach()?;
            if records.is_empty() {
                println!("No outreach logged.");
            } else {
                println!(
                    "{:<6} {:<22} {:<15} {:<6} {:<22} {:<16}",
                    "ID", "NAME", "STATUS", "RATING", "POSITION", "RECRUITER"
                );
                println!("{}", "-".repeat(92));
                for r in records {
                    println!(
                        "{:<6} {:<22} {:<15} {:<6} {:<22} {:<16}",
                        r.id,
                        truncate(&r.candidate_name, 20),
                        r.status,
                        format!("{}/{}", r.rating, outreach::MAX_RATING),
                        truncate(r.position_title.as_deref().unwrap_or("-"), 20),
                        truncate(r.recruiter_name.as_deref().unwrap_or("-"), 16)
                    );
                }
            }
        }

        OutreachCommands::Update { id, status, rating } => {
            outreach::update(&app.db, id, status, rating)?;
            println!("Outreach #{} is now {} ({}/{}).", id, status, rating, outreach::MAX_RATING);
        }

        OutreachCommands::Convert { id } => {
            let session = app.session()?;
            let candidate = outreach::convert_to_shell(&app.db, id, Some(session.recruiter_id))?;
            println!("Created shell candidate #{}", candidate);
        }

        OutreachCommands::Summary => {
            let records = app.db.list_outreach()?;
            let summary = outreach::status_summary(&records);
            for status in OutreachStatus::ALL {
                println!("{:<15} {:>5}", status, summary.get(status).copied().unwrap_or(0));
            }
            println!("{:<15} {:>5}", "Total", records.len());
        }
    }
    Ok(())
}

fn commission_command(app: &App, command: CommissionCommands) -> Result<()> {
    match command {
        CommissionCommands::Calc(args) => {
            let form = args.form();
            println!("{} commission: ${:.2}", form.commission_type(), form.amount());
        }

        CommissionCommands::Add {
            position,
            candidate,
            recruiter,
            args,
        } => {
            let session = app.session()?;
            let form = args.form();
            let recruiter_id = recruiter.unwrap_or(session.recruiter_id);
            let id = form.submit(&app.db, recruiter_id, position, candidate)?;
            println!("Recorded commission #{}: ${:.2}", id, form.amount());
        }

        CommissionCommands::List { recruiter } => {
            let commissions = app.db.list_commissions(recruiter)?;
            if commissions.is_empty() {
                println!("No commissions recorded.");
            } else {
                println!(
                    "{:<6} {:<15} {:<10} {:<10} {:<10} {:>12}",
                    "ID", "TYPE", "RECRUITER", "POSITION", "CANDIDATE", "AMOUNT"
                );
                println!("{}", "-".repeat(68));
                for c in commissions {
                    println!(
                        "{:<6} {:<15} {:<10} {:<10} {:<10} {:>12.2}",
                        c.id, c.commission_type, c.recruiter_id, c.position_id, c.candidate_id, c.amount
                    );
                }
            }
        }

        CommissionCommands::Totals => {
            let commissions = app.db.list_commissions(None)?;
            let recruiters = app.db.list_recruiters()?;
            let totals = commission::totals_by_recruiter(&commissions);
            if totals.is_empty() {
                println!("No commissions recorded.");
            }
            for (recruiter_id, total) in totals {
                let name = recruiters
                    .iter()
                    .find(|r| r.id == recruiter_id)
                    .map(|r| r.name.as_str())
                    .unwrap_or("unknown");
                println!("{:<24} {:>12.2}", truncate(name, 22), total);
            }
        }

        CommissionCommands::Delete { id } => {
            app.reviewer()?;
            let confirmed = app
                .prompt
                .confirm("Delete commission?", &format!("Commission #{} will be removed.", id));
            if confirmed {
                app.db.delete_commission(id)?;
                println!("Deleted commission #{}", id);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

fn history_command(app: &App, position: Option<i64>) -> Result<()> {
    let positions = app.db.list_positions(None, None)?;
    let pipeline = app.db.list_pipeline()?;
    let histories: Vec<_> = history::all_histories(&positions, &pipeline)
        .into_iter()
        .filter(|h| position.is_none_or(|id| h.position.id == id))
        .collect();
    if histories.is_empty() {
        println!("No positions found.");
    }

    for h in histories {
        println!(
            "#{} {} - {} [{}]",
            h.position.id,
            h.position.title,
            h.position.client_name.as_deref().unwrap_or("-"),
            h.position.status
        );
        match (h.hired, h.days_to_fill) {
            (Some(hire), Some(days)) => println!("  Filled by {} in {} days", hire.candidate_name, days),
            _ => println!("  Not filled"),
        }
        for (stage, entries) in &h.by_stage {
            let names: Vec<&str> = entries.iter().map(|e| e.candidate_name.as_str()).collect();
            println!("  {:<18} {:>3}  {}", stage, entries.len(), truncate(&names.join(", "), 56));
        }
        println!("  {:<18} {:>3}\n", "Total", h.total());
    }
    Ok(())
}

fn docs_command(app: &App, command: DocsCommands) -> Result<()> {
    match command {
        DocsCommands::Upload { file, title } => {
            let session = app.session()?;
            let id = documents::upload(
                &app.db,
                &app.storage,
                &file,
                title.as_deref(),
                Some(session.recruiter_id),
            )?;
            println!("Uploaded document #{}", id);
        }

        DocsCommands::List => {
            let docs = app.db.list_documents()?;
            if docs.is_empty() {
                println!("No documents found.");
            } else {
                println!("{:<6} {:<30} {:<28} {:<16}", "ID", "TITLE", "FILE", "UPLOADED");
                println!("{}", "-".repeat(82));
                for d in docs {
                    println!(
                        "{:<6} {:<30} {:<28} {:<16}",
                        d.id,
                        truncate(&d.title, 28),
                        truncate(&d.file_name, 26),
                        d.created_at.format(DATETIME_FORMAT)
                    );
                }
            }
        }

        DocsCommands::Preview { id } => match documents::preview(&app.db, &app.storage, id)? {
            Preview::Html(html) => println!("{}", html),
            Preview::Download { url, reason } => {
                app.prompt.alert(AlertKind::Info, &reason);
                println!("Download: {}", url);
            }
        },

        DocsCommands::Delete { id } => {
            if documents::delete(&app.db, &app.storage, id, &app.prompt)? {
                println!("Deleted document #{}", id);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

fn parse_resume_command(app: &App, file: PathBuf, model: Option<String>, create: bool) -> Result<()> {
    let text = resume_parse::resume_text(&file)?;
    let spec = resume_parse::resolve_model(model.as_deref().unwrap_or(&app.config.model))?;
    let provider = resume_parse::create_provider(&spec)?;
    println!("Parsing {} with {}...", file.display(), provider.model_name());

    let parsed = resume_parse::parse_resume(provider.as_ref(), &text)?;
    let draft = parsed.to_draft();
    println!("{}", serde_json::to_string_pretty(&parsed)?);

    if create {
        let session = app.session()?;
        let id = candidates::create_candidate(&app.db, &draft, Some(session.recruiter_id))?;
        let url = candidates::attach_resume(&app.db, &app.storage, id, &file)?;
        println!("Added candidate #{} ({}), resume at {}", id, draft.name, url);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
