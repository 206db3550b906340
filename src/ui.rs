use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use friendly_debts::{
    DebtForm, DebtSelection, Ledger, LedgerError, LedgerState, SelectionMode, VERSION,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    AddDebt,
    EditDebt(i64),
    NewProfile,
    RenameProfile,
}

impl FormKind {
    pub fn title(&self) -> &str {
        match self {
            FormKind::AddDebt => " Add Debt ",
            FormKind::EditDebt(_) => " Edit Debt ",
            FormKind::NewProfile => " New Profile ",
            FormKind::RenameProfile => " Rename Profile ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

impl Field {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// Modal text form. The debt forms also pick the owning profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<Field>,
    pub focused: usize,
    /// Index into the profile list, debt forms only
    pub profile_idx: Option<usize>,
}

impl FormState {
    fn debt(kind: FormKind, form: DebtForm, profile_idx: Option<usize>) -> Self {
        Self {
            kind,
            fields: vec![
                Field::new("Date (dd.mm.yy)", form.date),
                Field::new("Amount", form.amount),
                Field::new("Note", form.note),
            ],
            focused: 1,
            profile_idx,
        }
    }

    fn profile(kind: FormKind, name: &str) -> Self {
        Self {
            kind,
            fields: vec![Field::new("Name", name)],
            focused: 0,
            profile_idx: None,
        }
    }

    fn debt_form(&self) -> DebtForm {
        let value = |i: usize| self.fields.get(i).map(|f| f.value.clone()).unwrap_or_default();
        DebtForm {
            date: value(0),
            amount: value(1),
            note: value(2),
        }
    }

    fn focused_value(&mut self) -> Option<&mut String> {
        self.fields.get_mut(self.focused).map(|f| &mut f.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Form(FormState),
    ProfilePicker,
    About,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    pub ledger: Ledger,
    pub state: TableState,
    pub picker_state: TableState,
    pub mode: Mode,
    pub selection: SelectionMode,
    pub status: Option<Status>,
    pub should_quit: bool,
}

impl App {
    pub fn new(ledger: Ledger) -> Self {
        let mut app = Self {
            ledger,
            state: TableState::default(),
            picker_state: TableState::default(),
            mode: Mode::Browse,
            selection: SelectionMode::default(),
            status: None,
            should_quit: false,
        };
        app.select_last();
        app
    }

    pub fn ledger_state(&self) -> &LedgerState {
        self.ledger.state()
    }

    fn debt_count(&self) -> usize {
        self.ledger.state().debts.len()
    }

    pub fn highlighted_debt_id(&self) -> Option<i64> {
        self.state
            .selected()
            .and_then(|i| self.ledger.state().debts.get(i))
            .map(|d| d.id)
    }

    fn select_last(&mut self) {
        let len = self.debt_count();
        self.state.select(if len == 0 { None } else { Some(len - 1) });
    }

    /// Highlight the most recently stored debt (highest id).
    fn select_newest(&mut self) {
        let newest = self
            .ledger
            .state()
            .debts
            .iter()
            .enumerate()
            .max_by_key(|(_, d)| d.id)
            .map(|(i, _)| i);
        self.state.select(newest);
    }

    /// Keep the highlight and the marked rows valid after the list changed.
    fn sync_after_change(&mut self) {
        let len = self.debt_count();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(len - 1)),
            _ => {}
        }
        let state = self.ledger.state();
        let ids: Vec<i64> = state.debts.iter().map(|d| d.id).collect();
        self.selection.retain_existing(|id| ids.contains(&id));
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_error: false,
        });
    }

    /// Invalid input gets the generic notice; anything else is logged.
    fn report(&mut self, err: LedgerError) {
        let text = if err.is_invalid_input() {
            tracing::debug!(error = %err, "rejected input");
            "Invalid input".to_string()
        } else {
            tracing::error!(error = %err, "ledger operation failed");
            format!("Error: {}", err)
        };
        self.status = Some(Status {
            text,
            is_error: true,
        });
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn next(&mut self) {
        let len = self.debt_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.debt_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.debt_count();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + PAGE).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE));
        if self.debt_count() > 0 {
            self.state.select(Some(i));
        }
    }

    // ========================================================================
    // INTENTS
    // ========================================================================

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.mode.clone() {
            Mode::Browse => self.handle_browse_key(key.code),
            Mode::Form(form) => self.handle_form_key(form, key.code),
            Mode::ProfilePicker => self.handle_picker_key(key.code),
            Mode::About => self.mode = Mode::Browse,
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        let selecting = self.selection.is_selecting();
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc if selecting => {
                self.selection.cancel();
                self.info("Selection cleared");
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home if self.debt_count() > 0 => self.state.select(Some(0)),
            KeyCode::End => self.select_last(),
            KeyCode::Char(' ') => self.toggle_highlighted(),
            KeyCode::Enter if selecting => self.toggle_highlighted(),
            KeyCode::Char('d') if selecting => self.delete_selected(),
            KeyCode::Char('s') if selecting => self.summarize(true),
            _ if selecting => {}
            KeyCode::Char('a') => self.open_add_debt(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_debt(),
            KeyCode::Char('s') => self.summarize(false),
            KeyCode::Char('c') => self.clear_debts(),
            KeyCode::Char('n') => {
                self.mode = Mode::Form(FormState::profile(FormKind::NewProfile, ""));
            }
            KeyCode::Char('r') => {
                let name = self
                    .ledger
                    .state()
                    .active_profile()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                self.mode = Mode::Form(FormState::profile(FormKind::RenameProfile, &name));
            }
            KeyCode::Char('p') => self.open_picker(),
            KeyCode::Char('x') => self.delete_profile(),
            KeyCode::Char('?') => self.mode = Mode::About,
            _ => {}
        }
    }

    fn toggle_highlighted(&mut self) {
        if let Some(id) = self.highlighted_debt_id() {
            self.selection.toggle(id);
        }
    }

    fn active_profile_idx(&self) -> Option<usize> {
        let state = self.ledger.state();
        state.profiles.iter().position(|p| p.id == state.active_id)
    }

    fn open_add_debt(&mut self) {
        let active_idx = self.active_profile_idx();
        self.mode = Mode::Form(FormState::debt(FormKind::AddDebt, DebtForm::today(), active_idx));
    }

    fn open_edit_debt(&mut self) {
        let Some(debt) = self
            .state
            .selected()
            .and_then(|i| self.ledger.state().debts.get(i))
            .cloned()
        else {
            return;
        };
        let form = DebtForm {
            date: debt.date.to_display(),
            amount: debt.amount.to_string(),
            note: debt.note.unwrap_or_default(),
        };
        let active_idx = self.active_profile_idx();
        self.mode = Mode::Form(FormState::debt(FormKind::EditDebt(debt.id), form, active_idx));
    }

    fn open_picker(&mut self) {
        let state = self.ledger.state();
        let idx = state.profiles.iter().position(|p| p.id == state.active_id);
        self.picker_state.select(idx);
        self.mode = Mode::ProfilePicker;
    }

    fn delete_selected(&mut self) {
        let ids = self.selection.take();
        match self.ledger.delete_debts(&ids) {
            Ok(_) => self.info(format!("Deleted {} debts", ids.len())),
            Err(e) => self.report(e),
        }
        self.sync_after_change();
    }

    fn summarize(&mut self, selected_only: bool) {
        let selection = if selected_only {
            DebtSelection::Ids(self.selection.take())
        } else {
            DebtSelection::All
        };
        match self.ledger.summarize_debts(selection) {
            Ok(_) => {
                self.select_last();
                self.info("Debts summarized");
            }
            Err(e) => self.report(e),
        }
        self.sync_after_change();
    }

    fn clear_debts(&mut self) {
        match self.ledger.clear_debts() {
            Ok(_) => self.info("Debts cleared"),
            Err(e) => self.report(e),
        }
        self.sync_after_change();
    }

    fn delete_profile(&mut self) {
        match self.ledger.delete_profile() {
            Ok(state) => {
                let name = state.active_profile().map(|p| p.name.clone()).unwrap_or_default();
                self.selection.cancel();
                self.select_last();
                self.info(format!("Profile deleted, now on {}", name));
            }
            Err(e) => self.report(e),
        }
    }

    fn handle_form_key(&mut self, mut form: FormState, code: KeyCode) {
        let profile_count = self.ledger.state().profiles.len();
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Enter => {
                self.submit_form(form);
                return;
            }
            KeyCode::Tab | KeyCode::Down => {
                form.focused = (form.focused + 1) % form.fields.len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.focused = (form.focused + form.fields.len() - 1) % form.fields.len();
            }
            KeyCode::Left => {
                if let Some(idx) = form.profile_idx.as_mut() {
                    *idx = (*idx + profile_count - 1) % profile_count;
                }
            }
            KeyCode::Right => {
                if let Some(idx) = form.profile_idx.as_mut() {
                    *idx = (*idx + 1) % profile_count;
                }
            }
            KeyCode::Backspace => {
                if let Some(value) = form.focused_value() {
                    value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(value) = form.focused_value() {
                    value.push(c);
                }
            }
            _ => {}
        }
        self.mode = Mode::Form(form);
    }

    /// Profile picked in a debt form, the active one by default.
    fn form_profile_id(&self, form: &FormState) -> i64 {
        let state = self.ledger.state();
        form.profile_idx
            .and_then(|i| state.profiles.get(i))
            .map_or(state.active_id, |p| p.id)
    }

    /// Validate and run the form's intent. On failure the form stays open.
    fn submit_form(&mut self, form: FormState) {
        let outcome = match form.kind {
            FormKind::AddDebt => form.debt_form().parse().and_then(|input| {
                let profile_id = self.form_profile_id(&form);
                self.ledger
                    .add_debt(input.date, profile_id, input.amount, input.note.as_deref())
                    .map(|_| ())
            }),
            FormKind::EditDebt(id) => form.debt_form().parse().and_then(|input| {
                let profile_id = self.form_profile_id(&form);
                self.ledger
                    .edit_debt(id, input.date, profile_id, input.amount, input.note.as_deref())
                    .map(|_| ())
            }),
            FormKind::NewProfile => self.ledger.create_profile(&form.fields[0].value).map(|_| ()),
            FormKind::RenameProfile => self.ledger.rename_profile(&form.fields[0].value).map(|_| ()),
        };

        match outcome {
            Ok(()) => {
                self.mode = Mode::Browse;
                self.status = None;
                match form.kind {
                    FormKind::AddDebt | FormKind::EditDebt(_) => self.select_newest(),
                    FormKind::NewProfile => {
                        self.selection.cancel();
                        self.select_last();
                    }
                    FormKind::RenameProfile => {}
                }
                self.sync_after_change();
            }
            Err(e) => {
                self.report(e);
                self.mode = Mode::Form(form);
            }
        }
    }

    fn handle_picker_key(&mut self, code: KeyCode) {
        let len = self.ledger.state().profiles.len();
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.mode = Mode::Browse,
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.picker_state.selected().map_or(0, |i| (i + 1) % len);
                self.picker_state.select(Some(i));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.picker_state.selected().map_or(0, |i| (i + len - 1) % len);
                self.picker_state.select(Some(i));
            }
            KeyCode::Enter => {
                let target = self
                    .picker_state
                    .selected()
                    .and_then(|i| self.ledger.state().profiles.get(i))
                    .map(|p| p.id);
                self.mode = Mode::Browse;
                if let Some(id) = target {
                    match self.ledger.switch_profile(id) {
                        Ok(_) => {
                            self.selection.cancel();
                            self.select_last();
                            self.status = None;
                        }
                        Err(e) => self.report(e),
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            app.handle_key(key);
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Profile and total
            Constraint::Min(0),    // Debts
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_table(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);

    match app.mode.clone() {
        Mode::Browse => {}
        Mode::Form(form) => render_form(f, &form, app),
        Mode::ProfilePicker => render_picker(f, app),
        Mode::About => render_about(f),
    }
}

fn amount_color(negative: bool) -> Color {
    if negative {
        Color::Red
    } else {
        Color::Green
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let state = app.ledger_state();
    let (name, total) = state
        .active_profile()
        .map(|p| (p.name.clone(), p.total))
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(
            format!(" {} ", name),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled("Total: ", Style::default().fg(Color::White)),
        Span::styled(
            total.to_string(),
            Style::default()
                .fg(amount_color(total.is_negative()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} debts", state.debts.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if app.selection.is_selecting() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("{} selected", app.selection.selected().len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["", "Date", "Amount", "Note"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selection = &app.selection;
    let rows = app.ledger.state().debts.iter().map(|debt| {
        let marked = selection.is_selected(debt.id);
        let cells = vec![
            Cell::from(if marked { "●" } else { " " }).style(Style::default().fg(Color::Cyan)),
            Cell::from(debt.date.to_display()),
            Cell::from(format!("{:>10}", debt.amount))
                .style(Style::default().fg(amount_color(debt.amount.is_negative()))),
            Cell::from(truncate(debt.note.as_deref().unwrap_or(""), 48)),
        ];

        let row = Row::new(cells).height(1);
        if marked {
            row.style(Style::default().bg(Color::Rgb(48, 48, 48)))
        } else {
            row
        }
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Debts "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn hint(spans: &mut Vec<Span<'static>>, key: &'static str, label: &'static str) {
    spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(label));
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans: Vec<Span<'static>> = Vec::new();

    if let Some(status) = &app.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        spans.push(Span::styled(
            format!(" {} ", status.text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("| "));
    }

    if app.selection.is_selecting() {
        hint(&mut spans, "Space", " Mark | ");
        hint(&mut spans, "d", " Delete | ");
        hint(&mut spans, "s", " Summarize | ");
        hint(&mut spans, "Esc", " Cancel");
    } else {
        hint(&mut spans, "a", " Add | ");
        hint(&mut spans, "e", " Edit | ");
        hint(&mut spans, "Space", " Select | ");
        hint(&mut spans, "s", " Summarize | ");
        hint(&mut spans, "c", " Clear | ");
        hint(&mut spans, "n/p/r/x", " Profile new/switch/rename/delete | ");
        hint(&mut spans, "?", " About | ");
        spans.push(Span::styled("q", Style::default().fg(Color::Red)));
        spans.push(Span::raw(" Quit"));
    }

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_form(f: &mut Frame, form: &FormState, app: &App) {
    let area = centered_rect(60, 12, f.size());
    let mut lines = vec![Line::from("")];

    if let Some(idx) = form.profile_idx {
        let name = app
            .ledger_state()
            .profiles
            .get(idx)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("  Profile: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!("◀ {} ▶", name)),
        ]));
        lines.push(Line::from(""));
    }

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focused;
        let value_style = if focused {
            Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {}: ", field.label),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}{}", field.value, if focused { "▏" } else { "" }),
                value_style,
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Enter save | Tab next field | Esc cancel",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(form.kind.title()),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_picker(f: &mut Frame, app: &mut App) {
    let height = (app.ledger_state().profiles.len() as u16 + 4).min(f.size().height);
    let area = centered_rect(50, height, f.size());

    let active_id = app.ledger_state().active_id;
    let rows = app.ledger.state().profiles.iter().map(|p| {
        let style = if p.id == active_id {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(p.name.clone()).style(style),
            Cell::from(format!("{:>10}", p.total))
                .style(Style::default().fg(amount_color(p.total.is_negative()))),
        ])
    });

    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(12)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Switch Profile "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_widget(Clear, area);
    f.render_stateful_widget(table, area, &mut app.picker_state);
}

fn render_about(f: &mut Frame) {
    let area = centered_rect(50, 7, f.size());
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  Friendly Debts v{}", VERSION),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from("  Keep track of who owes whom."),
        Line::from(Span::styled(
            "  Press any key to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];
    let about = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" About "),
    );
    f.render_widget(Clear, area);
    f.render_widget(about, area);
}

/// Rect of `percent_x` width and `height` rows, centered in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height - height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use friendly_debts::{DebtDate, LedgerOptions, Money};
    use ratatui::backend::TestBackend;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with_debts(amounts: &[i64]) -> App {
        let mut ledger = Ledger::open_in_memory(LedgerOptions::default()).unwrap();
        let pid = ledger.state().active_id;
        for (i, cents) in amounts.iter().enumerate() {
            let date = DebtDate::from_ymd(2024, 1, i as u32 + 1).unwrap();
            ledger.add_debt(date, pid, Money::from_cents(*cents), None).unwrap();
        }
        App::new(ledger)
    }

    #[test]
    fn test_add_debt_through_form() {
        let mut app = app_with_debts(&[]);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "12.5");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.ledger_state().debts.len(), 1);
        assert_eq!(app.ledger_state().active_profile().unwrap().total, Money::from_cents(1250));
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_invalid_amount_keeps_form_open() {
        let mut app = app_with_debts(&[]);
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Form(_)));
        let status = app.status.clone().unwrap();
        assert!(status.is_error);
        assert_eq!(status.text, "Invalid input");
        assert!(app.ledger_state().debts.is_empty());
    }

    #[test]
    fn test_selection_mode_bulk_delete() {
        let mut app = app_with_debts(&[100, 200, 300]);
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.selection.is_selecting());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));

        // editing is disabled while selecting
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.mode, Mode::Browse);

        press(&mut app, KeyCode::Char('d'));
        assert!(!app.selection.is_selecting());
        assert_eq!(app.ledger_state().debts.len(), 1);
        assert_eq!(app.ledger_state().active_profile().unwrap().total, Money::from_cents(300));
    }

    #[test]
    fn test_escape_cancels_selection_before_quitting() {
        let mut app = app_with_debts(&[100]);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Esc);
        assert!(!app.selection.is_selecting());
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_summarize_all_from_browse() {
        let mut app = app_with_debts(&[100, -250]);
        press(&mut app, KeyCode::Char('s'));
        let debts = &app.ledger_state().debts;
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].amount, Money::from_cents(-150));
    }

    #[test]
    fn test_new_profile_and_switch_back() {
        let mut app = app_with_debts(&[100]);
        let first = app.ledger_state().active_id;

        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Bob");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ledger_state().active_profile().unwrap().name, "Bob");
        assert!(app.ledger_state().debts.is_empty());

        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ledger_state().active_id, first);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_edit_prefills_and_replaces() {
        let mut app = app_with_debts(&[100]);
        press(&mut app, KeyCode::Char('e'));
        match &app.mode {
            Mode::Form(form) => assert_eq!(form.fields[1].value, "1.00"),
            other => panic!("unexpected mode {:?}", other),
        }
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "7");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.ledger_state().debts[0].amount, Money::from_cents(700));
        assert_eq!(app.ledger_state().active_profile().unwrap().total, Money::from_cents(700));
    }

    #[test]
    fn test_edit_can_move_debt_to_other_profile() {
        let mut app = app_with_debts(&[100, 250]);
        let first = app.ledger_state().active_id;
        app.ledger.create_profile("Other").unwrap();
        let other = app.ledger_state().active_id;
        app.ledger.switch_profile(first).unwrap();
        app.state.select(Some(0));

        press(&mut app, KeyCode::Char('e'));
        match &app.mode {
            Mode::Form(form) => assert_eq!(form.profile_idx, Some(0)),
            other => panic!("unexpected mode {:?}", other),
        }
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Browse);
        let state = app.ledger_state();
        assert_eq!(state.debts.len(), 1);
        assert_eq!(state.debts[0].amount, Money::from_cents(250));
        assert_eq!(state.profile(first).unwrap().total, Money::from_cents(250));
        assert_eq!(state.profile(other).unwrap().total, Money::from_cents(100));
    }

    fn status_bar_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(200, 3)).unwrap();
        terminal
            .draw(|f| render_status_bar(f, f.size(), app))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_status_bar_lists_about_key() {
        let app = app_with_debts(&[]);
        let text = status_bar_text(&app);
        assert!(text.contains("? About"));
        assert!(text.contains("q Quit"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("äöüäöüäöüäöü", 6), "äöü...");
    }
}
