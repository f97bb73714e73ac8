use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::error::StoreError;
use crate::models::{ApplicationRecord, Draft, Status, today};
use crate::store::Store;
use crate::view::{self, SortKey};

const FORM_LABELS: [&str; 4] = ["Date (DD/MM/YYYY)", "Company", "Job Title", "Description"];

/// In-progress add/edit form. `editing` holds the id of the record
/// being replaced; None means a new record.
struct Form {
    editing: Option<i64>,
    fields: [String; 4], // date, company, job, description
    status: usize,       // index into Status::ALL
    focus: usize,        // 0..=4, 4 is the status selector
}

impl Form {
    fn blank() -> Self {
        Self {
            editing: None,
            fields: [today(), String::new(), String::new(), String::new()],
            status: 0,
            focus: 0,
        }
    }

    fn from_record(record: &ApplicationRecord) -> Self {
        let status = Status::ALL
            .iter()
            .position(|s| *s == record.status)
            .unwrap_or(0);
        Self {
            editing: Some(record.id),
            fields: [
                record.date.clone(),
                record.company.clone(),
                record.job.clone(),
                record.description.clone(),
            ],
            status,
            focus: 0,
        }
    }

    fn draft(&self) -> Draft {
        Draft {
            date: self.fields[0].clone(),
            company: self.fields[1].clone(),
            job: self.fields[2].clone(),
            description: self.fields[3].clone(),
            status: Status::ALL[self.status],
        }
    }
}

enum Mode {
    Browse,
    Search,
    Form(Form),
    ConfirmDelete(i64),
}

struct AppState {
    store: Store,
    sort: SortKey,
    search: String,
    // Rows carry the record id; selections travel as ids, never as
    // list positions.
    rows: Vec<(i64, ApplicationRecord)>,
    selected: usize,
    scroll_offset: u16,
    mode: Mode,
    message: Option<String>,
}

impl AppState {
    fn new(store: Store, sort: SortKey, search: String) -> Self {
        let mut state = Self {
            store,
            sort,
            search,
            rows: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            mode: Mode::Browse,
            message: None,
        };
        state.refresh();
        state
    }

    fn refresh(&mut self) {
        self.rows = view::view(self.store.all(), self.sort, &self.search)
            .into_iter()
            .map(|(id, record)| (id, record.clone()))
            .collect();
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn selected_id(&self) -> Option<i64> {
        self.rows.get(self.selected).map(|(id, _)| *id)
    }

    fn current(&self) -> Option<&ApplicationRecord> {
        self.rows.get(self.selected).map(|(_, record)| record)
    }

    fn next(&mut self) {
        if !self.rows.is_empty() && self.selected < self.rows.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }
}

pub fn run(store: Store, sort: SortKey, search: String) -> Result<()> {
    let mut state = AppState::new(store, sort, search);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            state.message = None;
            match &state.mode {
                Mode::Browse => {
                    if !handle_browse_key(state, key.code) {
                        break;
                    }
                }
                Mode::Search => handle_search_key(state, key.code),
                Mode::Form(_) => handle_form_key(state, key.code),
                Mode::ConfirmDelete(_) => handle_confirm_key(state, key.code),
            }
            list_state.select(if state.rows.is_empty() {
                None
            } else {
                Some(state.selected)
            });
        }
    }
    Ok(())
}

/// Returns false when the app should quit.
fn handle_browse_key(state: &mut AppState, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.prev(),
        KeyCode::Char('g') => {
            state.selected = 0;
            state.scroll_offset = 0;
        }
        KeyCode::Char('G') => {
            state.selected = state.rows.len().saturating_sub(1);
            state.scroll_offset = 0;
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            state.scroll_offset = state.scroll_offset.saturating_add(3);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            state.scroll_offset = state.scroll_offset.saturating_sub(3);
        }
        KeyCode::Char('a') => state.mode = Mode::Form(Form::blank()),
        KeyCode::Char('e') => {
            if let Some(id) = state.selected_id() {
                match state.store.resolve(id) {
                    Ok(record) => state.mode = Mode::Form(Form::from_record(record)),
                    Err(e) => {
                        state.message = Some(e.to_string());
                        state.refresh();
                    }
                }
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = state.selected_id() {
                state.mode = Mode::ConfirmDelete(id);
            }
        }
        KeyCode::Char('s') => {
            state.sort = state.sort.next();
            state.refresh();
        }
        KeyCode::Char('/') => state.mode = Mode::Search,
        _ => {}
    }
    true
}

fn handle_search_key(state: &mut AppState, code: KeyCode) {
    match code {
        KeyCode::Enter | KeyCode::Esc => state.mode = Mode::Browse,
        KeyCode::Backspace => {
            state.search.pop();
            state.refresh();
        }
        KeyCode::Char(c) => {
            state.search.push(c);
            state.refresh();
        }
        _ => {}
    }
}

fn handle_form_key(state: &mut AppState, code: KeyCode) {
    let Mode::Form(form) = &mut state.mode else {
        return;
    };
    match code {
        KeyCode::Esc => state.mode = Mode::Browse,
        KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % 5,
        KeyCode::BackTab | KeyCode::Up => form.focus = (form.focus + 4) % 5,
        KeyCode::Left if form.focus == 4 => {
            form.status = (form.status + Status::ALL.len() - 1) % Status::ALL.len();
        }
        KeyCode::Right if form.focus == 4 => {
            form.status = (form.status + 1) % Status::ALL.len();
        }
        KeyCode::Backspace => {
            if form.focus < 4 {
                form.fields[form.focus].pop();
            }
        }
        KeyCode::Enter => {
            if form.focus < 4 {
                form.focus += 1;
            } else {
                submit_form(state);
            }
        }
        KeyCode::Char(c) => {
            if form.focus < 4 {
                form.fields[form.focus].push(c);
            }
        }
        _ => {}
    }
}

fn submit_form(state: &mut AppState) {
    let Mode::Form(form) = &state.mode else {
        return;
    };
    let draft = form.draft();
    let result = match form.editing {
        Some(id) => state.store.edit(id, draft),
        None => state.store.add(draft),
    };
    match result {
        Ok(record) => {
            state.message = Some(format!("Saved #{} {}", record.id, record.company));
            state.mode = Mode::Browse;
            state.refresh();
        }
        // The change is applied in memory even though the write failed;
        // close the form so a resubmit cannot duplicate it.
        Err(e @ StoreError::Persist { .. }) => {
            state.message = Some(format!("{e} (change kept, will retry on next save)"));
            state.mode = Mode::Browse;
            state.refresh();
        }
        // Validation failure: stay in the form so nothing typed is lost.
        Err(e) => state.message = Some(e.to_string()),
    }
}

fn handle_confirm_key(state: &mut AppState, code: KeyCode) {
    let Mode::ConfirmDelete(id) = &state.mode else {
        return;
    };
    let id = *id;
    match code {
        KeyCode::Char('y') | KeyCode::Enter => {
            match state.store.remove(&[id]) {
                Ok(_) => state.message = Some(format!("Removed #{id}")),
                Err(e) => state.message = Some(e.to_string()),
            }
            state.mode = Mode::Browse;
            state.refresh();
        }
        KeyCode::Char('n') | KeyCode::Esc => state.mode = Mode::Browse,
        _ => {}
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(outer[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .rows
        .iter()
        .map(|(id, record)| {
            let company = truncate(&record.company, 18);
            let job = truncate(&record.job, 22);
            ListItem::new(format!(
                "#{:<4} {}  {:<18} {} [{}]",
                id, record.date, company, job, record.status
            ))
        })
        .collect();

    let mut title = format!(" Applications ({}) | sort: {} ", state.rows.len(), state.sort.label());
    if !state.search.is_empty() {
        title.push_str(&format!("| filter: {} ", state.search));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, panels[0], list_state);

    // Right panel: record detail
    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, panels[1]);

    // Footer: search input, message, or key help
    let footer = match &state.mode {
        Mode::Search => format!(" search: {}_", state.search),
        _ => state.message.clone().unwrap_or_else(|| {
            " j/k:move  a:add e:edit d:delete  s:sort /:search  q:quit".to_string()
        }),
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        outer[1],
    );

    match &state.mode {
        Mode::Form(form) => draw_form(frame, form, state.message.as_deref()),
        Mode::ConfirmDelete(id) => draw_confirm(frame, *id),
        _ => {}
    }
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(record) = state.current() else {
        return Text::raw("Nothing to show. Press 'a' to add an application.");
    };

    let status_style = match record.status {
        Status::Pending => Style::default().fg(Color::Yellow),
        Status::Submitted => Style::default().fg(Color::Cyan),
        Status::Assessment => Style::default().fg(Color::Magenta),
        Status::Interview => Style::default().fg(Color::Blue),
        Status::Offer | Status::Accepted => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
        Status::Withdrawn => Style::default().fg(Color::DarkGray),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            record.company.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(record.job.as_str()),
        Line::from(format!("Applied: {}", record.date)),
        Line::from(Span::styled(
            format!("Status: {}", record.status),
            status_style,
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    for line in record.description.lines() {
        lines.push(Line::from(line));
    }
    Text::from(lines)
}

fn draw_form(frame: &mut Frame, form: &Form, message: Option<&str>) {
    let area = centered_rect(60, 13, frame.area());
    frame.render_widget(Clear, area);

    let title = match form.editing {
        Some(id) => format!(" Edit Application #{id} "),
        None => " Add Application ".to_string(),
    };

    let mut lines = Vec::new();
    for (i, label) in FORM_LABELS.iter().enumerate() {
        let marker = if form.focus == i { "> " } else { "  " };
        let style = if form.focus == i {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        // Show the tail of long values so the typing position stays visible.
        let value = tail(&form.fields[i], 50);
        lines.push(Line::from(Span::styled(
            format!("{marker}{label}: {value}"),
            style,
        )));
    }
    let marker = if form.focus == 4 { "> " } else { "  " };
    let style = if form.focus == 4 {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    lines.push(Line::from(Span::styled(
        format!("{marker}Status: < {} >", Status::ALL[form.status]),
        style,
    )));
    lines.push(Line::from(""));
    if let Some(msg) = message {
        lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Tab/Enter:next field  Left/Right:status  Enter on status:save  Esc:cancel",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_confirm(frame: &mut Frame, id: i64) {
    let area = centered_rect(40, 3, frame.area());
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(format!("Remove application #{id}? (y/n)"))
        .block(Block::default().borders(Borders::ALL).title(" Confirm "));
    frame.render_widget(widget, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        let skipped: String = s.chars().skip(count - max.saturating_sub(3)).collect();
        format!("...{skipped}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
