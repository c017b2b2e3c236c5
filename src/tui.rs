use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::{Patch, Record, RecordId, Status, TextField};
use crate::remote::RemoteStore;
use crate::store::{CollectionStore, LoadStatus};
use crate::sync::{DeleteOutcome, EnrichOutcome, SyncEngine, UpdateOutcome};
use crate::view;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    List,
    Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    ConfirmDelete,
    PickField,
    EditField(TextField),
}

/// Key that picks a text field in the edit prompt.
fn editable_field(key: char) -> Option<TextField> {
    match key {
        'r' => Some(TextField::Role),
        'c' => Some(TextField::Company),
        'l' => Some(TextField::Location),
        's' => Some(TextField::Salary),
        'u' => Some(TextField::Link),
        'n' => Some(TextField::Notes),
        'd' => Some(TextField::Description),
        _ => None,
    }
}

struct AppState {
    view: ViewMode,
    input: InputMode,
    search_input: String,
    edit_input: String,
    edit_target: Option<RecordId>,
    board_column: usize,
    scroll_offset: u16,
    message: Option<String>,
}

impl AppState {
    fn new() -> Self {
        Self {
            view: ViewMode::List,
            input: InputMode::Normal,
            search_input: String::new(),
            edit_input: String::new(),
            edit_target: None,
            board_column: 0,
            scroll_offset: 0,
            message: None,
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Open the editor for the field picked by `code`, prefilled with the
    /// record's current value. Any other key cancels.
    fn begin_edit(&mut self, code: KeyCode, record: Option<&Record>) {
        self.input = InputMode::Normal;
        let (KeyCode::Char(key), Some(record)) = (code, record) else {
            return;
        };
        let Some(field) = editable_field(key) else {
            return;
        };
        self.edit_input = record.fields.text(field).unwrap_or_default().to_string();
        self.edit_target = Some(record.id.clone());
        self.input = InputMode::EditField(field);
    }

    /// Feed a key to the open editor. Enter yields the edit to save.
    fn edit_key(&mut self, code: KeyCode) -> Option<(RecordId, Patch)> {
        let InputMode::EditField(field) = self.input else {
            return None;
        };
        match code {
            KeyCode::Enter => {
                self.input = InputMode::Normal;
                let value = std::mem::take(&mut self.edit_input);
                let id = self.edit_target.take()?;
                Some((id, Patch::Text(field, Some(value))))
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.edit_input.clear();
                self.edit_target = None;
                None
            }
            KeyCode::Backspace => {
                self.edit_input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.edit_input.push(c);
                None
            }
            _ => None,
        }
    }

    /// Ids the j/k keys walk through in the current view.
    fn navigable(&self, store: &CollectionStore) -> Vec<RecordId> {
        match self.view {
            ViewMode::List => view::visible_list(store.records(), store.search_term())
                .into_iter()
                .map(|r| r.id.clone())
                .collect(),
            ViewMode::Board => view::board(store.records())
                .column(Status::ALL[self.board_column])
                .iter()
                .map(|r| r.id.clone())
                .collect(),
        }
    }
}

/// Next id when moving `delta` rows from `current`. A selection that is not
/// in `ids` (filtered out, or in another column) snaps to the first row.
fn step(ids: &[RecordId], current: Option<&RecordId>, delta: isize) -> Option<RecordId> {
    let last = ids.len().checked_sub(1)?;
    let idx = match current.and_then(|id| ids.iter().position(|i| i == id)) {
        Some(pos) => pos.saturating_add_signed(delta).min(last),
        None => 0,
    };
    ids.get(idx).cloned()
}

pub async fn run_browse<R: RemoteStore + 'static>(engine: Arc<SyncEngine<R>>) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_load(&engine, &tx);

    // crossterm's poll/read block, so the UI gets a thread of its own
    tokio::task::spawn_blocking(move || browse(engine, tx, rx)).await?
}

fn browse<R: RemoteStore + 'static>(
    engine: Arc<SyncEngine<R>>,
    tx: UnboundedSender<String>,
    mut rx: UnboundedReceiver<String>,
) -> Result<()> {
    let mut state = AppState::new();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &engine, &tx, &mut rx);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<R: RemoteStore + 'static>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    engine: &Arc<SyncEngine<R>>,
    tx: &UnboundedSender<String>,
    rx: &mut UnboundedReceiver<String>,
) -> Result<()> {
    loop {
        while let Ok(message) = rx.try_recv() {
            state.message = Some(message);
        }

        let store = engine.snapshot();
        terminal.draw(|frame| draw(frame, state, &store, engine.is_saving(), engine.is_analyzing()))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match state.input {
            InputMode::Search => match key.code {
                KeyCode::Enter => state.input = InputMode::Normal,
                KeyCode::Esc => {
                    state.search_input.clear();
                    engine.set_search_term("");
                    state.input = InputMode::Normal;
                }
                KeyCode::Backspace => {
                    state.search_input.pop();
                    engine.set_search_term(state.search_input.clone());
                }
                KeyCode::Char(c) => {
                    state.search_input.push(c);
                    engine.set_search_term(state.search_input.clone());
                }
                _ => {}
            },

            InputMode::PickField => state.begin_edit(key.code, store.selected()),

            InputMode::EditField(_) => {
                if let Some((id, patch)) = state.edit_key(key.code) {
                    spawn_update(engine, tx, id, patch);
                }
            }

            InputMode::ConfirmDelete => {
                if let (KeyCode::Char('y'), Some(id)) = (key.code, store.selected_id()) {
                    spawn_delete(engine, tx, id.clone());
                }
                state.input = InputMode::Normal;
            }

            InputMode::Normal => {
                let prev_selected = store.selected_id().cloned();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => {
                        let ids = state.navigable(&store);
                        if let Some(id) = step(&ids, store.selected_id(), 1) {
                            engine.select(&id);
                        }
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        let ids = state.navigable(&store);
                        if let Some(id) = step(&ids, store.selected_id(), -1) {
                            engine.select(&id);
                        }
                    }
                    KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                    KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                    KeyCode::Tab | KeyCode::Char('b') => {
                        state.view = match state.view {
                            ViewMode::List => ViewMode::Board,
                            ViewMode::Board => ViewMode::List,
                        };
                        if let Some(record) = store.selected() {
                            state.board_column = record.fields.status.position();
                        }
                    }
                    KeyCode::Left | KeyCode::Char('h') if state.view == ViewMode::Board => {
                        state.board_column = state.board_column.saturating_sub(1);
                        select_column_head(state, engine, &store);
                    }
                    KeyCode::Right | KeyCode::Char('l') if state.view == ViewMode::Board => {
                        state.board_column = (state.board_column + 1).min(Status::ALL.len() - 1);
                        select_column_head(state, engine, &store);
                    }
                    KeyCode::Enter if state.view == ViewMode::Board => {
                        state.view = ViewMode::List;
                    }
                    KeyCode::Char('/') => {
                        state.search_input = store.search_term().to_string();
                        state.input = InputMode::Search;
                    }
                    KeyCode::Char('n') => spawn_create(engine, tx),
                    KeyCode::Char('r') => spawn_load(engine, tx),
                    KeyCode::Char('x') => engine.dismiss_error(),
                    KeyCode::Char(c @ '1'..='4') => {
                        let status = Status::ALL[c as usize - '1' as usize];
                        if let Some(id) = store.selected_id() {
                            spawn_update(engine, tx, id.clone(), Patch::Status(status));
                            if state.view == ViewMode::Board {
                                state.board_column = status.position();
                            }
                        }
                    }
                    KeyCode::Char('s') => {
                        if let Some(record) = store.selected() {
                            let patch = Patch::Stage(record.fields.stage.next());
                            spawn_update(engine, tx, record.id.clone(), patch);
                        }
                    }
                    KeyCode::Char('a') => {
                        if !engine.has_enrichment() {
                            state.message = Some("AI analysis disabled (no GEMINI_API_KEY)".to_string());
                        } else if let Some(id) = store.selected_id() {
                            spawn_enrich(engine, tx, id.clone());
                        }
                    }
                    KeyCode::Char('d') => {
                        if store.selected_id().is_some() {
                            state.input = InputMode::ConfirmDelete;
                        }
                    }
                    KeyCode::Char('e') => {
                        if store.selected_id().is_some() {
                            state.input = InputMode::PickField;
                        }
                    }
                    _ => {}
                }
                if engine.read(|s| s.selected_id().cloned()) != prev_selected {
                    state.scroll_offset = 0;
                }
            }
        }
    }
    Ok(())
}

fn select_column_head<R: RemoteStore>(
    state: &AppState,
    engine: &SyncEngine<R>,
    store: &CollectionStore,
) {
    let ids = state.navigable(store);
    if let Some(id) = step(&ids, store.selected_id(), 0) {
        engine.select(&id);
    }
}

// --- Background tasks ---

fn spawn_load<R: RemoteStore + 'static>(engine: &Arc<SyncEngine<R>>, tx: &UnboundedSender<String>) {
    let engine = Arc::clone(engine);
    let tx = tx.clone();
    tokio::spawn(async move {
        if engine.load().await {
            let count = engine.read(|s| s.len());
            let _ = tx.send(format!("Loaded {} applications", count));
        }
    });
}

fn spawn_create<R: RemoteStore + 'static>(engine: &Arc<SyncEngine<R>>, tx: &UnboundedSender<String>) {
    let engine = Arc::clone(engine);
    let tx = tx.clone();
    tokio::spawn(async move {
        let message = match engine.create().await {
            Some(id) => format!("Created application #{}", id),
            None => "Could not create application".to_string(),
        };
        let _ = tx.send(message);
    });
}

fn spawn_update<R: RemoteStore + 'static>(
    engine: &Arc<SyncEngine<R>>,
    tx: &UnboundedSender<String>,
    id: RecordId,
    patch: Patch,
) {
    let engine = Arc::clone(engine);
    let tx = tx.clone();
    tokio::spawn(async move {
        let field = patch.field_name();
        let message = match engine.update(&id, patch).await {
            UpdateOutcome::Saved => format!("Saved {}", field),
            UpdateOutcome::Missing => format!("Application #{} is gone", id),
            UpdateOutcome::RolledBack(err) => format!("Not saved, change reverted: {}", err),
        };
        let _ = tx.send(message);
    });
}

fn spawn_delete<R: RemoteStore + 'static>(
    engine: &Arc<SyncEngine<R>>,
    tx: &UnboundedSender<String>,
    id: RecordId,
) {
    let engine = Arc::clone(engine);
    let tx = tx.clone();
    tokio::spawn(async move {
        // Already confirmed in the footer prompt.
        let message = match engine.delete(&id, &|_: &str| true).await {
            DeleteOutcome::Removed => format!("Deleted application #{}", id),
            DeleteOutcome::Declined | DeleteOutcome::Missing => return,
            DeleteOutcome::Failed(err) => format!("Delete failed: {}", err),
        };
        let _ = tx.send(message);
    });
}

fn spawn_enrich<R: RemoteStore + 'static>(
    engine: &Arc<SyncEngine<R>>,
    tx: &UnboundedSender<String>,
    id: RecordId,
) {
    let engine = Arc::clone(engine);
    let tx = tx.clone();
    tokio::spawn(async move {
        let message = match engine.enrich(&id).await {
            EnrichOutcome::Applied => "AI insights saved".to_string(),
            EnrichOutcome::Disabled => "AI analysis disabled (no GEMINI_API_KEY)".to_string(),
            EnrichOutcome::Skipped => "Description too short to analyze".to_string(),
            EnrichOutcome::NoInsight => "The model returned no insight".to_string(),
            EnrichOutcome::Missing => return,
            EnrichOutcome::Failed(err) => format!("Analysis failed: {}", err),
        };
        let _ = tx.send(message);
    });
}

// --- Drawing ---

fn status_color(status: Status) -> Color {
    match status {
        Status::Applied => Color::Blue,
        Status::NotApplied => Color::Red,
        Status::VacancyNotAvailable => Color::Yellow,
        Status::AwaitingResults => Color::Magenta,
    }
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Applied => "+",
        Status::NotApplied => "o",
        Status::VacancyNotAvailable => "x",
        Status::AwaitingResults => "*",
    }
}

fn draw(frame: &mut Frame, state: &AppState, store: &CollectionStore, saving: bool, analyzing: bool) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, rows[0], state, store, saving, analyzing);
    match state.view {
        ViewMode::List => draw_list(frame, rows[1], state, store),
        ViewMode::Board => draw_board(frame, rows[1], state, store),
    }
    draw_footer(frame, rows[2], state, store);
}

fn draw_header(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    store: &CollectionStore,
    saving: bool,
    analyzing: bool,
) {
    let mut spans = vec![Span::styled(
        " Hunt Board ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if saving {
        spans.push(Span::styled(" SYNCING... ", Style::default().fg(Color::Cyan)));
    }
    if analyzing {
        spans.push(Span::styled(" ANALYZING... ", Style::default().fg(Color::Magenta)));
    }
    match store.status() {
        LoadStatus::Loading => {
            spans.push(Span::styled(" Loading... ", Style::default().fg(Color::DarkGray)))
        }
        LoadStatus::Error(msg) => spans.push(Span::styled(
            format!(" {} (r:retry x:dismiss) ", msg),
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        LoadStatus::Ready => {
            if let Some(message) = &state.message {
                spans.push(Span::styled(
                    format!(" {} ", message),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_list(frame: &mut Frame, area: Rect, state: &AppState, store: &CollectionStore) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let visible = view::visible_list(store.records(), store.search_term());
    let items: Vec<ListItem> = visible
        .iter()
        .map(|record| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    status_icon(record.fields.status),
                    Style::default().fg(status_color(record.fields.status)),
                ),
                Span::raw(format!(
                    " {} | {} | {}",
                    record.role(),
                    record.company(),
                    record.fields.date_applied
                )),
            ]))
        })
        .collect();

    let title = if store.search_term().is_empty() {
        format!(" Applications ({}) ", visible.len())
    } else {
        format!(
            " Applications ({}/{}) matching '{}' ",
            visible.len(),
            store.len(),
            store.search_term()
        )
    };

    let mut list_state = ListState::default();
    list_state.select(
        store
            .selected_id()
            .and_then(|id| visible.iter().position(|r| &r.id == id)),
    );

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut list_state);

    draw_detail(frame, chunks[1], state, store.selected());
}

fn draw_board(frame: &mut Frame, area: Rect, state: &AppState, store: &CollectionStore) {
    let board = view::board(store.records());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (idx, column) in board.columns.iter().enumerate() {
        let focused = idx == state.board_column;
        let items: Vec<ListItem> = column
            .records
            .iter()
            .map(|record| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        record.role().to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(format!("  {}", record.company())),
                    Line::from(Span::styled(
                        format!("  {}", record.fields.stage),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let mut list_state = ListState::default();
        if focused {
            list_state.select(
                store
                    .selected_id()
                    .and_then(|id| column.records.iter().position(|r| &r.id == id)),
            );
        }

        let border = if focused {
            Style::default().fg(status_color(column.status))
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ({}) ", column.status, column.records.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[idx], &mut list_state);
    }
}

fn draw_detail(frame: &mut Frame, area: Rect, state: &AppState, record: Option<&Record>) {
    let detail = Paragraph::new(build_detail(record))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &AppState, store: &CollectionStore) {
    let (text, style) = match state.input {
        InputMode::Search => (
            format!(" /{}  (enter:keep  esc:clear)", state.search_input),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::PickField => (
            " Edit: r:role c:company l:location s:salary u:link n:notes d:description (other key cancels)"
                .to_string(),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::EditField(field) => (
            format!(" {}: {}_  (enter:save  esc:cancel)", field.wire_name(), state.edit_input),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::ConfirmDelete => {
            let label = store
                .selected()
                .map(|r| format!("{} at {}", r.role(), r.company()))
                .unwrap_or_default();
            (
                format!(" Delete this application ({})? y/n", label),
                Style::default().fg(Color::Red),
            )
        }
        InputMode::Normal => (
            match state.view {
                ViewMode::List => " j/k:move J/K:scroll /:search n:new e:edit 1-4:status s:stage a:analyze d:delete r:reload tab:board q:quit",
                ViewMode::Board => " h/l:column j/k:move e:edit 1-4:status s:stage enter:list tab:list q:quit",
            }
            .to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn build_detail(record: Option<&Record>) -> Text<'_> {
    let Some(record) = record else {
        return Text::raw("No application selected");
    };
    let fields = &record.fields;

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        record.role(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", record.company())));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", fields.status),
        Style::default().fg(status_color(fields.status)),
    )));
    lines.push(Line::from(format!("Stage: {}", fields.stage)));
    lines.push(Line::from(format!("Applied: {}", fields.date_applied)));

    if let Some(location) = fields.location.as_deref().filter(|s| !s.is_empty()) {
        lines.push(Line::from(format!("Location: {}", location)));
    }
    if let Some(salary) = fields.salary.as_deref().filter(|s| !s.is_empty()) {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }
    if let Some(link) = fields.link.as_deref().filter(|s| !s.is_empty()) {
        lines.push(Line::from(format!("Link: {}", link)));
    }
    lines.push(Line::from(""));

    for (title, body) in [("NOTES", &fields.notes), ("DESCRIPTION", &fields.description)] {
        let Some(body) = body.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        lines.push(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in body.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::from(""));
    }

    match fields.ai_insights.as_deref().filter(|s| !s.is_empty()) {
        Some(insights) => {
            lines.push(Line::from(Span::styled(
                "AI INSIGHTS",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(insights, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No AI insights yet, press a to analyze)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;

    fn ids(ns: &[i64]) -> Vec<RecordId> {
        ns.iter().map(|n| RecordId::from(*n)).collect()
    }

    #[test]
    fn test_step_moves_and_clamps() {
        let list = ids(&[1, 2, 3]);
        assert_eq!(step(&list, Some(&list[0]), 1), Some(list[1].clone()));
        assert_eq!(step(&list, Some(&list[2]), 1), Some(list[2].clone()));
        assert_eq!(step(&list, Some(&list[0]), -1), Some(list[0].clone()));
    }

    #[test]
    fn test_step_snaps_foreign_selection_to_first() {
        let list = ids(&[4, 5]);
        let other = RecordId::from(9_i64);
        assert_eq!(step(&list, Some(&other), 1), Some(list[0].clone()));
        assert_eq!(step(&list, None, -1), Some(list[0].clone()));
        assert_eq!(step(&[], None, 1), None);
    }

    #[test]
    fn test_navigable_follows_view() {
        let mut store = CollectionStore::new();
        let mut applied = record(1, "Engineer", "Acme", "2024-01-10");
        applied.fields.apply(Patch::Status(Status::Applied));
        store.replace_all(vec![applied, record(2, "Designer", "Globex", "2024-02-01")]);

        let mut state = AppState::new();
        assert_eq!(state.navigable(&store), ids(&[2, 1]));

        store.set_search_term("acme");
        assert_eq!(state.navigable(&store), ids(&[1]));

        state.view = ViewMode::Board;
        state.board_column = Status::NotApplied.position();
        assert_eq!(state.navigable(&store), ids(&[2]));
    }

    #[test]
    fn test_edit_prefills_and_commits_text_field() {
        let mut rec = record(1, "New Opportunity", "Target Company", "2025-06-01");
        rec.fields.description = Some(String::new());
        let mut state = AppState::new();
        state.input = InputMode::PickField;

        state.begin_edit(KeyCode::Char('c'), Some(&rec));
        assert_eq!(state.input, InputMode::EditField(TextField::Company));
        assert_eq!(state.edit_input, "Target Company");

        for _ in 0.."Company".len() {
            assert_eq!(state.edit_key(KeyCode::Backspace), None);
        }
        for c in "Globex".chars() {
            state.edit_key(KeyCode::Char(c));
        }
        let (id, patch) = state.edit_key(KeyCode::Enter).unwrap();
        assert_eq!(id, RecordId::from(1_i64));
        assert_eq!(
            patch,
            Patch::Text(TextField::Company, Some("Target Globex".to_string()))
        );
        assert_eq!(state.input, InputMode::Normal);
        assert!(state.edit_input.is_empty());
    }

    #[test]
    fn test_edit_description_then_cancel() {
        let rec = record(1, "Engineer", "Acme", "2024-01-10");
        let mut state = AppState::new();

        state.begin_edit(KeyCode::Char('d'), Some(&rec));
        assert_eq!(state.input, InputMode::EditField(TextField::Description));
        state.edit_key(KeyCode::Char('R'));
        assert_eq!(state.edit_key(KeyCode::Esc), None);
        assert_eq!(state.input, InputMode::Normal);
        assert_eq!(state.edit_target, None);
    }

    #[test]
    fn test_unknown_pick_key_cancels_edit() {
        let rec = record(1, "Engineer", "Acme", "2024-01-10");
        let mut state = AppState::new();
        state.input = InputMode::PickField;
        state.begin_edit(KeyCode::Char('z'), Some(&rec));
        assert_eq!(state.input, InputMode::Normal);

        state.input = InputMode::PickField;
        state.begin_edit(KeyCode::Char('r'), None);
        assert_eq!(state.input, InputMode::Normal);
        assert_eq!(state.edit_key(KeyCode::Enter), None);
    }

    #[test]
    fn test_every_status_has_a_visible_icon() {
        let icons: Vec<&str> = Status::ALL.into_iter().map(status_icon).collect();
        assert!(icons.iter().all(|icon| !icon.trim().is_empty()));
        let mut unique = icons.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), icons.len());
    }

    #[test]
    fn test_detail_shows_insights_hint() {
        let rec = record(1, "Engineer", "Acme", "2024-01-10");
        let text = build_detail(Some(&rec));
        let rendered: Vec<String> = text.lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(rendered[0], "Engineer");
        assert!(rendered.iter().any(|l| l.contains("press a to analyze")));
        assert_eq!(build_detail(None).lines.len(), 1);
    }
}
