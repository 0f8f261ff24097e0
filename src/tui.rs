use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::cell::{Cell, RefCell};
use std::io::stdout;
use std::rc::Rc;
use std::time::Duration;

use crate::auth::Session;
use crate::db::Table;
use crate::error::AppError;
use crate::models::{PipelineEntry, PipelineStatus, Stage};
use crate::outbox::NotificationSink;
use crate::pipeline::{
    PendingApproval, PipelineBoard, PipelineWriter, StageOutcome, StatusOutcome, TransitionSource,
};
use crate::prompt::{AlertKind, Prompt};
use crate::store::AppStore;

/// Collects alerts for the status line. The board asks for approval through
/// its own modal, so confirmations never come through here.
#[derive(Default)]
struct StatusLine {
    last: RefCell<Option<(AlertKind, String)>>,
}

impl Prompt for StatusLine {
    fn confirm(&self, _title: &str, _message: &str) -> bool {
        false
    }

    fn alert(&self, kind: AlertKind, message: &str) {
        *self.last.borrow_mut() = Some((kind, message.to_string()));
    }
}

struct BoardState {
    board: PipelineBoard,
    column: usize,
    row: usize,
    pending: Option<PendingApproval>,
    status_line: StatusLine,
}

/// Dependencies a key press may need.
struct Ctx<'a> {
    actor: &'a Session,
    writer: &'a dyn PipelineWriter,
    outbox: &'a dyn NotificationSink,
}

impl BoardState {
    fn new(entries: Vec<PipelineEntry>) -> Self {
        Self {
            board: PipelineBoard::new(entries),
            column: 0,
            row: 0,
            pending: None,
            status_line: StatusLine::default(),
        }
    }

    fn column_len(&self, column: usize) -> usize {
        let stage = Stage::BOARD[column];
        self.board.entries().iter().filter(|e| e.stage == stage).count()
    }

    fn selected(&self) -> Option<&PipelineEntry> {
        let stage = *Stage::BOARD.get(self.column)?;
        self.board
            .entries()
            .iter()
            .filter(|e| e.stage == stage)
            .nth(self.row)
    }

    fn clamp_row(&mut self) {
        let len = self.column_len(self.column);
        self.row = self.row.min(len.saturating_sub(1));
    }

    fn say(&self, kind: AlertKind, message: String) {
        self.status_line.alert(kind, &message);
    }

    /// Keeps the local copy in step with the store unless a director move is on screen.
    fn reconcile(&mut self, fresh: &[PipelineEntry]) {
        if self.pending.is_none() {
            self.board.reconcile(fresh.to_vec());
            self.clamp_row();
        }
    }

    fn move_card(&mut self, to: Stage, source: TransitionSource, ctx: &Ctx) {
        let Some(id) = self.selected().map(|e| e.id) else { return };
        let outcome = self.board.request_stage(
            ctx.actor,
            id,
            to,
            source,
            ctx.writer,
            &self.status_line,
        );
        match outcome {
            Ok(StageOutcome::AwaitingApproval(pending)) => self.pending = Some(pending),
            Ok(StageOutcome::Applied { from, to }) => {
                self.say(AlertKind::Success, format!("Moved from {} to {}", from, to))
            }
            Ok(_) => {}
            Err(e) => self.say(AlertKind::Error, e.to_string()),
        }
        self.clamp_row();
    }

    fn drag(&mut self, forward: bool, ctx: &Ctx) {
        let target = if forward {
            self.column + 1
        } else {
            match self.column.checked_sub(1) {
                Some(c) => c,
                None => return,
            }
        };
        let Some(id) = self.selected().map(|e| e.id) else { return };
        match self
            .board
            .request_drop(ctx.actor, id, target, ctx.writer, &self.status_line)
        {
            Ok(StageOutcome::AwaitingApproval(pending)) => self.pending = Some(pending),
            Ok(StageOutcome::Applied { to, .. }) => {
                self.column = target;
                self.row = 0;
                self.say(AlertKind::Success, format!("Moved to {}", to));
            }
            Ok(_) => {}
            Err(e) => self.say(AlertKind::Error, e.to_string()),
        }
        self.clamp_row();
    }

    fn set_status(&mut self, status: PipelineStatus, ctx: &Ctx) {
        let Some(id) = self.selected().map(|e| e.id) else { return };
        match self.board.change_status(id, status, ctx.writer, &self.status_line) {
            Ok(StatusOutcome::Applied { to, .. }) => {
                self.say(AlertKind::Success, format!("Status set to {}", to))
            }
            Ok(_) => {}
            Err(e) => self.say(AlertKind::Error, e.to_string()),
        }
    }

    fn decide(&mut self, approve: bool, ctx: &Ctx) {
        let Some(pending) = self.pending.take() else { return };
        let outcome = self
            .board
            .resolve(pending, approve, ctx.writer, ctx.outbox, &self.status_line);
        match outcome {
            StageOutcome::Approved { to, notified, .. } => self.say(
                AlertKind::Success,
                format!(
                    "Moved to {}{}",
                    to,
                    if notified { "; recruiter notified" } else { "" }
                ),
            ),
            StageOutcome::Dismissed { restored } => {
                self.say(AlertKind::Info, format!("Change dismissed; stays in {}", restored))
            }
            _ => {}
        }
        self.clamp_row();
    }

    /// Returns `false` when the board should close.
    fn handle_key(&mut self, code: KeyCode, ctx: &Ctx) -> bool {
        if self.pending.is_some() {
            match code {
                KeyCode::Char('y') | KeyCode::Enter => self.decide(true, ctx),
                KeyCode::Char('n') | KeyCode::Esc => self.decide(false, ctx),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Left | KeyCode::Char('h') => {
                self.column = self.column.saturating_sub(1);
                self.clamp_row();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.column = (self.column + 1).min(Stage::BOARD.len() - 1);
                self.clamp_row();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.row + 1 < self.column_len(self.column) {
                    self.row += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.row = self.row.saturating_sub(1),
            KeyCode::Char('H') => self.drag(false, ctx),
            KeyCode::Char('L') => self.drag(true, ctx),
            KeyCode::Char('R') => self.move_card(Stage::Reject, TransitionSource::Dropdown, ctx),
            KeyCode::Char('x') => self.move_card(Stage::Archived, TransitionSource::Dropdown, ctx),
            KeyCode::Char('a') => self.set_status(PipelineStatus::Active, ctx),
            KeyCode::Char('o') => self.set_status(PipelineStatus::Hold, ctx),
            KeyCode::Char('r') => self.set_status(PipelineStatus::Reject, ctx),
            _ => {}
        }
        true
    }
}

/// How long the board waits for a key before checking for outside changes.
const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

pub fn run_board(store: &mut AppStore) -> Result<()> {
    let actor = store.session().cloned().ok_or(AppError::NotSignedIn)?;
    store.refresh(Table::Pipeline);
    if store.pipeline.is_empty() {
        println!("Pipeline is empty.");
        return Ok(());
    }
    let mut state = BoardState::new(store.pipeline.clone());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store, &actor);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    store: &mut AppStore,
    actor: &Session,
) -> Result<()> {
    let db = store.db();
    let ctx = Ctx {
        actor,
        writer: db,
        outbox: db,
    };

    let dirty = Rc::new(Cell::new(false));
    let flag = Rc::clone(&dirty);
    let subscription = store.subscribe(Table::Pipeline, Box::new(move |_| flag.set(true)));

    loop {
        let unread = store.unread_comments().len();
        terminal.draw(|frame| draw(frame, state, actor, unread))?;

        if event::poll(REFRESH_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.code == KeyCode::Char('m') && state.pending.is_none() {
                    store.mark_all_read();
                    continue;
                }
                if !state.handle_key(key.code, &ctx) {
                    break;
                }
            }
        }
        store.poll_changes();
        // Keep the flag while an approval modal is open so the refresh is not lost.
        if state.pending.is_none() && dirty.replace(false) {
            state.reconcile(&store.pipeline);
        }
    }
    store.unsubscribe(subscription);
    Ok(())
}

fn status_marker(status: PipelineStatus) -> (&'static str, Color) {
    match status {
        PipelineStatus::Active => (" ", Color::Green),
        PipelineStatus::Hold => ("~", Color::Yellow),
        PipelineStatus::Reject => ("x", Color::Red),
    }
}

fn draw(frame: &mut Frame, state: &BoardState, actor: &Session, unread: usize) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            Stage::BOARD
                .iter()
                .map(|_| Constraint::Ratio(1, Stage::BOARD.len() as u32))
                .collect::<Vec<_>>(),
        )
        .split(rows[0]);

    for (i, (stage, cards)) in state.board.columns().into_iter().enumerate() {
        let items: Vec<ListItem> = cards
            .iter()
            .map(|entry| {
                let (marker, color) = status_marker(entry.status);
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(marker, Style::default().fg(color)),
                        Span::raw(" "),
                        Span::styled(
                            entry.candidate_name.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}", entry.position_title),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let focused = i == state.column;
        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ({}) ", stage, cards.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

        let mut list_state = ListState::default();
        if focused && !cards.is_empty() {
            list_state.select(Some(state.row));
        }
        frame.render_stateful_widget(list, columns[i], &mut list_state);
    }

    let status = match &*state.status_line.last.borrow() {
        Some((kind, message)) => {
            let color = match kind {
                AlertKind::Success => Color::Green,
                AlertKind::Error => Color::Red,
                AlertKind::Warning => Color::Yellow,
                AlertKind::Info => Color::Cyan,
            };
            Paragraph::new(message.clone()).style(Style::default().fg(color))
        }
        None if unread > 0 => Paragraph::new(format!(
            "Signed in as {} ({})  |  {} unread comment(s), m to mark read",
            actor.name, actor.role, unread
        ))
        .style(Style::default().fg(Color::Cyan)),
        None => Paragraph::new(format!("Signed in as {} ({})", actor.name, actor.role))
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, rows[1]);

    let help = Paragraph::new(
        " h/l:column  j/k:card  H/L:drag  R:reject x:archive  a/o/r:active/hold/reject status  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);

    if let Some(pending) = &state.pending {
        let area = centered(frame.area(), 60, 9);
        let mut text: Vec<Line> = pending.message().lines().map(|l| Line::from(l.to_string())).collect();
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "y: approve   n: dismiss",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let modal = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(format!(" {} ", pending.title())),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(Clear, area);
        frame.render_widget(modal, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::outbox::testing::RecordingSink;
    use crate::pipeline::testing::{entry, session, FlakyWriter};

    fn state() -> BoardState {
        BoardState::new(vec![
            entry(1, Stage::Screening),
            entry(2, Stage::Screening),
            entry(3, Stage::Offer),
        ])
    }

    #[test]
    fn test_drag_right_applies_for_recruiter() {
        let actor = session(Role::Recruiter);
        let writer = FlakyWriter::default();
        let sink = RecordingSink::default();
        let ctx = Ctx { actor: &actor, writer: &writer, outbox: &sink };

        let mut s = state();
        s.handle_key(KeyCode::Char('j'), &ctx);
        s.handle_key(KeyCode::Char('L'), &ctx);
        assert_eq!(s.board.get(2).unwrap().stage, Stage::SubmitToClient);
        assert_eq!(s.column, 1);
        assert_eq!(*writer.stages.borrow(), vec![(2, Stage::SubmitToClient)]);
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn test_failed_drag_rolls_back_and_reports() {
        let actor = session(Role::Manager);
        let writer = FlakyWriter::failing();
        let sink = RecordingSink::default();
        let ctx = Ctx { actor: &actor, writer: &writer, outbox: &sink };

        let mut s = state();
        s.handle_key(KeyCode::Char('L'), &ctx);
        assert_eq!(s.board.get(1).unwrap().stage, Stage::Screening);
        assert_eq!(s.column, 0);
        let last = s.status_line.last.borrow().clone().unwrap();
        assert_eq!(last.0, AlertKind::Error);
    }

    #[test]
    fn test_director_drag_waits_for_modal() {
        let actor = session(Role::Director);
        let writer = FlakyWriter::default();
        let sink = RecordingSink::default();
        let ctx = Ctx { actor: &actor, writer: &writer, outbox: &sink };

        let mut s = state();
        s.handle_key(KeyCode::Char('L'), &ctx);
        assert!(s.pending.is_some());
        assert_eq!(s.board.get(1).unwrap().stage, Stage::SubmitToClient);
        assert_eq!(writer.write_count(), 0);

        // Navigation is ignored while the modal is up, and reconcile is held back.
        s.handle_key(KeyCode::Char('l'), &ctx);
        s.reconcile(&[entry(1, Stage::Screening)]);
        assert_eq!(s.board.entries().len(), 3);

        s.handle_key(KeyCode::Char('n'), &ctx);
        assert!(s.pending.is_none());
        assert_eq!(s.board.get(1).unwrap().stage, Stage::Screening);
        assert_eq!(writer.write_count(), 0);

        s.handle_key(KeyCode::Char('L'), &ctx);
        s.handle_key(KeyCode::Char('y'), &ctx);
        assert_eq!(*writer.stages.borrow(), vec![(1, Stage::SubmitToClient)]);
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn test_status_keys_and_bounds() {
        let actor = session(Role::Recruiter);
        let writer = FlakyWriter::default();
        let sink = RecordingSink::default();
        let ctx = Ctx { actor: &actor, writer: &writer, outbox: &sink };

        let mut s = state();
        s.handle_key(KeyCode::Char('H'), &ctx);
        assert_eq!(s.board.get(1).unwrap().stage, Stage::Screening);

        s.handle_key(KeyCode::Char('o'), &ctx);
        assert_eq!(s.board.get(1).unwrap().status, PipelineStatus::Hold);

        for _ in 0..20 {
            s.handle_key(KeyCode::Char('l'), &ctx);
        }
        assert_eq!(s.column, Stage::BOARD.len() - 1);
        assert!(!s.handle_key(KeyCode::Char('q'), &ctx));
    }
}
