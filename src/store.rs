//! In-memory application state: cached collections, the signed-in session,
//! and table subscriptions fed by the database change feed.

use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc::Receiver;
use tracing::{debug, error};

use crate::auth::Session;
use crate::db::{ChangeAction, ChangeEvent, Database, Table};
use crate::error::Result;
use crate::models::{
    Candidate, Client, Interview, OutreachRecord, PipelineEntry, Position, Recruiter,
};

pub type Subscriber = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscriptions {
    next: u64,
    by_table: HashMap<Table, Vec<(SubscriptionId, Subscriber)>>,
}

pub struct AppStore<'db> {
    db: &'db Database,
    feed: Receiver<ChangeEvent>,
    session: Option<Session>,
    subscriptions: Subscriptions,
    data_version: Option<i64>,
    comment_cursor: i64,
    unread_comments: BTreeSet<i64>,
    pub clients: Vec<Client>,
    pub positions: Vec<Position>,
    pub candidates: Vec<Candidate>,
    pub recruiters: Vec<Recruiter>,
    pub pipeline: Vec<PipelineEntry>,
    pub interviews: Vec<Interview>,
    pub outreach: Vec<OutreachRecord>,
}

/// Tables with a cached collection in the store.
pub const CACHED_TABLES: [Table; 7] = [
    Table::Clients,
    Table::Positions,
    Table::Candidates,
    Table::Recruiters,
    Table::Pipeline,
    Table::Interviews,
    Table::RecruiterOutreach,
];

fn load<T>(table: Table, slot: &mut Vec<T>, fetched: Result<Vec<T>>) -> bool {
    match fetched {
        Ok(rows) => {
            debug!(table = table.name(), rows = rows.len(), "refreshed");
            *slot = rows;
            true
        }
        Err(e) => {
            error!(table = table.name(), error = %e, "refresh failed; collection emptied");
            slot.clear();
            false
        }
    }
}

impl<'db> AppStore<'db> {
    /// Takes over the database change feed. Comments already stored count as read.
    pub fn new(db: &'db Database, session: Option<Session>) -> Self {
        let data_version = db
            .data_version()
            .map_err(|e| error!(error = %e, "could not read data version"))
            .ok();
        let comment_cursor = db.max_comment_id().unwrap_or_else(|e| {
            error!(error = %e, "could not read latest comment");
            0
        });
        Self {
            feed: db.watch_changes(),
            db,
            session,
            subscriptions: Subscriptions::default(),
            data_version,
            comment_cursor,
            unread_comments: BTreeSet::new(),
            clients: Vec::new(),
            positions: Vec::new(),
            candidates: Vec::new(),
            recruiters: Vec::new(),
            pipeline: Vec::new(),
            interviews: Vec::new(),
            outreach: Vec::new(),
        }
    }

    pub fn db(&self) -> &'db Database {
        self.db
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Re-reads one cached collection. Returns `false` when the read failed
    /// and the collection was emptied. Tables without a cache are ignored.
    pub fn refresh(&mut self, table: Table) -> bool {
        let db = self.db;
        match table {
            Table::Clients => load(table, &mut self.clients, db.list_clients()),
            Table::Positions => load(table, &mut self.positions, db.list_positions(None, None)),
            Table::Candidates => load(table, &mut self.candidates, db.list_candidates()),
            Table::Recruiters => load(table, &mut self.recruiters, db.list_recruiters()),
            Table::Pipeline => load(table, &mut self.pipeline, db.list_pipeline()),
            Table::Interviews => load(table, &mut self.interviews, db.list_interviews(None)),
            Table::RecruiterOutreach => load(table, &mut self.outreach, db.list_outreach()),
            _ => true,
        }
    }

    /// Returns how many collections failed to load.
    pub fn refresh_all(&mut self) -> usize {
        CACHED_TABLES.iter().filter(|t| !self.refresh(**t)).count()
    }

    pub fn subscribe(&mut self, table: Table, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.subscriptions.next);
        self.subscriptions.next += 1;
        self.subscriptions
            .by_table
            .entry(table)
            .or_default()
            .push((id, subscriber));
        debug!(table = table.name(), id = id.0, "subscribed");
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.subscriptions.by_table.values_mut() {
            if let Some(pos) = subscribers.iter().position(|(sid, _)| *sid == id) {
                subscribers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drains the change feed and checks for commits made by other
    /// connections. Touched collections are refreshed once, comments from
    /// other authors are tracked as unread, and every event goes to the
    /// subscribers of its table in arrival order. An outside commit refreshes
    /// every cached collection and sends each of them a `Reload` event, after
    /// `Insert` events for any comments it added. Returns the number of events.
    pub fn poll_changes(&mut self) -> usize {
        let mut events: Vec<ChangeEvent> = self.feed.try_iter().collect();
        let external = self.external_commit();

        let local_comments: Vec<i64> = events
            .iter()
            .filter(|e| e.table == Table::Comments && e.action == ChangeAction::Insert)
            .map(|e| e.row_id)
            .collect();
        if external || !local_comments.is_empty() {
            for (id, author_id) in self.scan_comments() {
                self.track_comment(id, author_id);
                if !local_comments.contains(&id) {
                    events.push(ChangeEvent {
                        table: Table::Comments,
                        action: ChangeAction::Insert,
                        row_id: id,
                    });
                }
            }
        }
        if external {
            events.extend(CACHED_TABLES.iter().map(|&table| ChangeEvent {
                table,
                action: ChangeAction::Reload,
                row_id: 0,
            }));
        }
        if events.is_empty() {
            return 0;
        }

        let mut touched: Vec<Table> = Vec::new();
        for event in &events {
            if !touched.contains(&event.table) {
                touched.push(event.table);
            }
        }
        for table in touched {
            self.refresh(table);
        }

        for event in &events {
            if let Some(subscribers) = self.subscriptions.by_table.get_mut(&event.table) {
                for (_, subscriber) in subscribers.iter_mut() {
                    subscriber(event);
                }
            }
        }
        events.len()
    }

    /// True when another connection committed since the last check.
    fn external_commit(&mut self) -> bool {
        match self.db.data_version() {
            Ok(version) => {
                let changed = self.data_version.is_some_and(|seen| seen != version);
                self.data_version = Some(version);
                if changed {
                    debug!(version, "outside commit detected");
                }
                changed
            }
            Err(e) => {
                error!(error = %e, "could not read data version");
                false
            }
        }
    }

    /// Comments stored since the last scan, advancing the cursor past them.
    fn scan_comments(&mut self) -> Vec<(i64, i64)> {
        match self.db.comment_ids_after(self.comment_cursor) {
            Ok(rows) => {
                if let Some(&(last, _)) = rows.last() {
                    self.comment_cursor = last;
                }
                rows
            }
            Err(e) => {
                error!(error = %e, "could not scan for new comments");
                Vec::new()
            }
        }
    }

    fn track_comment(&mut self, comment_id: i64, author_id: i64) {
        let Some(me) = self.session.as_ref().map(|s| s.recruiter_id) else {
            return;
        };
        if author_id != me {
            self.unread_comments.insert(comment_id);
        }
    }

    pub fn unread_comments(&self) -> &BTreeSet<i64> {
        &self.unread_comments
    }

    pub fn mark_read(&mut self, comment_id: i64) -> bool {
        self.unread_comments.remove(&comment_id)
    }

    pub fn mark_all_read(&mut self) {
        self.unread_comments.clear();
    }
}
