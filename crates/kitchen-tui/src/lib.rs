// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use kitchen_app::{
    Action, ActionOutcome, ActionStatus, ActionTarget, AppCommand, AppEvent, AppMode, AppState,
    FormKind, FormState, ItemField, ItemFormInput, SettingsFormInput, Tab, TabData, TabView,
    UNIT_CHOICES,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const PAGE_ROWS: isize = 10;
const LOADING_TEXT: &str = "Laden...";
const EMPTY_TEXT: &str = "Keine Einträge";
const PENDING_TEXT: &str = "läuft...";

/// Backend seam for the front-end. `spawn_*` must eventually deliver exactly one
/// [`InternalEvent`] per call on `tx`; the defaults run synchronously.
pub trait AppRuntime {
    fn load_tab(&mut self, tab: Tab) -> Result<TabData>;
    fn run_action(&mut self, action: &Action) -> Result<ActionOutcome>;

    fn spawn_load(&mut self, request_id: u64, tab: Tab, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.load_tab(tab).map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Loaded { request_id, result })
            .map_err(|_| anyhow!("load event channel closed"))?;
        Ok(())
    }

    fn spawn_action(&mut self, action: Action, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .run_action(&action)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::ActionFinished { action, result })
            .map_err(|_| anyhow!("action event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Loaded {
        request_id: u64,
        result: Result<TabData, String>,
    },
    ActionFinished {
        action: Action,
        result: Result<ActionOutcome, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    form_field: usize,
    help_visible: bool,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct RowView {
    name: String,
    amount: String,
    action: &'static str,
    status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq)]
struct CardView {
    title: String,
    servings: String,
    description: String,
    ingredients: String,
    status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq)]
enum BodyProjection {
    Loading,
    Empty,
    Error(String),
    Rows(Vec<RowView>),
    Cards(Vec<CardView>),
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    start_session(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn start_session<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    tracing::info!(tab = state.active_tab.as_str(), "session started");
    dispatch_and_handle(state, runtime, view_data, internal_tx, AppCommand::Reload);
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Loaded { request_id, result } => {
                dispatch_and_handle(
                    state,
                    runtime,
                    view_data,
                    tx,
                    AppCommand::FinishLoad { request_id, result },
                );
            }
            InternalEvent::ActionFinished { action, result } => {
                dispatch_and_handle(
                    state,
                    runtime,
                    view_data,
                    tx,
                    AppCommand::FinishAction { action, result },
                );
            }
        }
    }
}

/// Applies `command` and starts whatever backend work its events ask for.
fn dispatch_and_handle<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    let mut follow_ups = Vec::new();

    for event in &events {
        match event {
            AppEvent::LoadRequested { tab, request_id } => {
                tracing::debug!(tab = tab.as_str(), request_id, "load requested");
                if let Err(error) = runtime.spawn_load(*request_id, *tab, internal_tx.clone()) {
                    follow_ups.push(AppCommand::FinishLoad {
                        request_id: *request_id,
                        result: Err(format!("{error:#}")),
                    });
                }
            }
            AppEvent::ActionStarted(action) => {
                tracing::debug!(action = action.label(), target = ?action.target(), "action started");
                if let Err(error) = runtime.spawn_action(action.clone(), internal_tx.clone()) {
                    follow_ups.push(AppCommand::FinishAction {
                        action: action.clone(),
                        result: Err(format!("{error:#}")),
                    });
                }
            }
            AppEvent::ActionFailed { target, reason } => {
                tracing::warn!(?target, reason = reason.as_str(), "action failed");
            }
            AppEvent::LoadFailed(reason) => {
                tracing::warn!(
                    tab = state.active_tab.as_str(),
                    reason = reason.as_str(),
                    "load failed"
                );
            }
            AppEvent::ModeChanged(AppMode::Form(_)) => view_data.form_field = 0,
            _ => {}
        }
    }

    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }

    for command in follow_ups {
        dispatch_and_handle(state, runtime, view_data, internal_tx, command);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.help_visible {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            view_data.help_visible = false;
        }
        return false;
    }

    let command = match state.mode {
        AppMode::Confirm => confirm_command_for_key(key),
        AppMode::Form(FormKind::Item) => handle_item_form_key(state, view_data, key),
        AppMode::Form(FormKind::Settings) => handle_settings_form_key(state, key),
        AppMode::Nav => match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('?') => {
                view_data.help_visible = true;
                None
            }
            _ => nav_command_for_key(key),
        },
    };

    if let Some(command) = command {
        dispatch_and_handle(state, runtime, view_data, internal_tx, command);
    }
    false
}

fn nav_command_for_key(key: KeyEvent) -> Option<AppCommand> {
    let command = match key.code {
        KeyCode::Char(digit @ '1'..='4') => {
            let index = usize::from(digit as u8 - b'1');
            AppCommand::SwitchTab(Tab::ALL[index])
        }
        KeyCode::Tab | KeyCode::Char('f') | KeyCode::Right => AppCommand::NextTab,
        KeyCode::BackTab | KeyCode::Char('b') | KeyCode::Left => AppCommand::PrevTab,
        KeyCode::Char('j') | KeyCode::Down => AppCommand::MoveSelection(1),
        KeyCode::Char('k') | KeyCode::Up => AppCommand::MoveSelection(-1),
        KeyCode::PageDown => AppCommand::MoveSelection(PAGE_ROWS),
        KeyCode::PageUp => AppCommand::MoveSelection(-PAGE_ROWS),
        KeyCode::Char('a') => AppCommand::OpenCreateForm,
        KeyCode::Char('e') | KeyCode::Enter => AppCommand::OpenEditForm,
        KeyCode::Char('d') | KeyCode::Delete => AppCommand::DeleteSelected,
        KeyCode::Char('m') | KeyCode::Char(' ') => AppCommand::RunContextAction,
        KeyCode::Char('r') => AppCommand::Reload,
        KeyCode::Char('s') => AppCommand::OpenSettingsForm,
        _ => return None,
    };
    Some(command)
}

fn confirm_command_for_key(key: KeyEvent) -> Option<AppCommand> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('j') | KeyCode::Enter => Some(AppCommand::Confirm),
        KeyCode::Char('n') | KeyCode::Esc => Some(AppCommand::Decline),
        _ => None,
    }
}

fn handle_item_form_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Option<AppCommand> {
    match key.code {
        KeyCode::Esc => return Some(AppCommand::CancelForm),
        KeyCode::Enter => return Some(AppCommand::SubmitForm),
        KeyCode::Tab | KeyCode::Down => {
            move_form_field(view_data, 1);
            return None;
        }
        KeyCode::BackTab | KeyCode::Up => {
            move_form_field(view_data, -1);
            return None;
        }
        _ => {}
    }

    let field = active_item_field(view_data);
    let Some(FormState::Item(input)) = &mut state.form else {
        return None;
    };

    if field == ItemField::Unit {
        match key.code {
            KeyCode::Char(digit @ '1'..='9') => {
                let index = usize::from(digit as u8 - b'1');
                if let Some(unit) = UNIT_CHOICES.get(index) {
                    input.unit = (*unit).to_owned();
                }
            }
            KeyCode::Left | KeyCode::Char('h') => cycle_unit(input, -1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => cycle_unit(input, 1),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Backspace => {
            input.field_mut(field).pop();
        }
        KeyCode::Char(ch)
            if key.modifiers == KeyModifiers::NONE || key.modifiers == KeyModifiers::SHIFT =>
        {
            input.field_mut(field).push(ch);
        }
        _ => {}
    }
    None
}

fn handle_settings_form_key(state: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    match key.code {
        KeyCode::Esc => return Some(AppCommand::CancelForm),
        KeyCode::Enter => return Some(AppCommand::SubmitForm),
        _ => {}
    }

    let Some(FormState::Settings(input)) = &mut state.form else {
        return None;
    };
    match key.code {
        KeyCode::Char(digit @ '1'..='4') => {
            input.default_tab = Tab::ALL[usize::from(digit as u8 - b'1')];
        }
        KeyCode::Left | KeyCode::Up | KeyCode::BackTab | KeyCode::Char('k') => {
            input.default_tab = rotate(input.default_tab, -1);
        }
        KeyCode::Right | KeyCode::Down | KeyCode::Tab | KeyCode::Char('j') => {
            input.default_tab = rotate(input.default_tab, 1);
        }
        _ => {}
    }
    None
}

fn rotate(tab: Tab, delta: isize) -> Tab {
    let current = Tab::ALL.iter().position(|entry| *entry == tab).unwrap_or(0) as isize;
    let len = Tab::ALL.len() as isize;
    Tab::ALL[(current + delta).rem_euclid(len) as usize]
}

fn move_form_field(view_data: &mut ViewData, delta: isize) {
    let len = ItemField::ALL.len() as isize;
    view_data.form_field = (view_data.form_field as isize + delta).rem_euclid(len) as usize;
}

fn active_item_field(view_data: &ViewData) -> ItemField {
    ItemField::ALL
        .get(view_data.form_field)
        .copied()
        .unwrap_or(ItemField::Name)
}

fn cycle_unit(input: &mut ItemFormInput, delta: isize) {
    let len = UNIT_CHOICES.len() as isize;
    let next = match UNIT_CHOICES.iter().position(|unit| *unit == input.unit) {
        Some(index) => (index as isize + delta).rem_euclid(len),
        None => 0,
    };
    input.unit = UNIT_CHOICES[next as usize].to_owned();
}

fn body_projection(state: &AppState) -> BodyProjection {
    let tab = state.active_tab;
    match &state.view {
        TabView::Loading { .. } => BodyProjection::Loading,
        TabView::Failed(reason) => BodyProjection::Error(reason.clone()),
        TabView::Ready(data) if data.is_empty() => BodyProjection::Empty,
        TabView::Ready(TabData::Items(items)) => BodyProjection::Rows(
            items
                .iter()
                .map(|item| RowView {
                    name: item.name.clone(),
                    amount: item.amount_label(),
                    action: tab.context_action().label(),
                    status: state.status_of(ActionTarget::Item(tab, item.id)),
                })
                .collect(),
        ),
        TabView::Ready(TabData::Recipes(recipes)) => BodyProjection::Cards(
            recipes
                .iter()
                .map(|recipe| CardView {
                    title: recipe.title.clone(),
                    servings: recipe.servings_label(),
                    description: recipe.description.clone(),
                    ingredients: recipe.ingredient_names(),
                    status: state.status_of(ActionTarget::Recipe(recipe.id)),
                })
                .collect(),
        ),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = Tab::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let titles = Tab::ALL
        .iter()
        .enumerate()
        .map(|(index, tab)| format!("{} {}", index + 1, tab.label()))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("kitchen").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_body(frame, layout[1], state);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    match (&state.mode, &state.form) {
        (AppMode::Form(_), Some(FormState::Item(input))) => {
            let title = if input.id.is_some() {
                format!("{}: Eintrag bearbeiten", state.active_tab.label())
            } else {
                format!("{}: Neuer Eintrag", state.active_tab.label())
            };
            render_overlay(
                frame,
                (56, 40),
                &title,
                item_form_text(input, active_item_field(view_data)),
            );
        }
        (AppMode::Form(_), Some(FormState::Settings(input))) => {
            render_overlay(frame, (50, 40), "Einstellungen", settings_form_text(*input));
        }
        (AppMode::Confirm, _) => {
            if let Some(action) = &state.confirm {
                render_overlay(frame, (50, 24), "Bestätigen", confirm_text(action));
            }
        }
        _ => {}
    }

    if view_data.help_visible {
        render_overlay(frame, (76, 64), "Hilfe", help_overlay_text().to_owned());
    }
}

fn render_overlay(frame: &mut ratatui::Frame<'_>, size: (u16, u16), title: &str, text: String) {
    let area = centered_rect(size.0, size.1, frame.area());
    frame.render_widget(Clear, area);
    let overlay = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title.to_owned())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(overlay, area);
}

fn render_body(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(state.active_tab.label());

    match body_projection(state) {
        BodyProjection::Loading => {
            frame.render_widget(Paragraph::new(LOADING_TEXT).block(block), area);
        }
        BodyProjection::Empty => {
            let empty = Paragraph::new(EMPTY_TEXT)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, area);
        }
        BodyProjection::Error(reason) => {
            let error = Paragraph::new(format!("Fehler: {reason}"))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false })
                .block(block);
            frame.render_widget(error, area);
        }
        BodyProjection::Rows(rows) => render_rows(frame, area, block, &rows, state.selected),
        BodyProjection::Cards(cards) => render_cards(frame, area, block, &cards, state.selected),
    }
}

fn render_rows(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'_>,
    rows: &[RowView],
    selected: usize,
) {
    let header = Row::new(["Name", "Menge", "Aktionen"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let body = rows.iter().enumerate().map(|(index, row)| {
        let mut style = status_style(&row.status);
        if index == selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Row::new(vec![
            Cell::from(row.name.clone()),
            Cell::from(row.amount.clone()),
            Cell::from(row_action_text(row)),
        ])
        .style(style)
    });

    let table = Table::new(
        body,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(40),
        ],
    )
    .header(header)
    .block(block);
    let mut table_state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn row_action_text(row: &RowView) -> String {
    match &row.status {
        ActionStatus::Idle => format!("e bearbeiten | d löschen | m {}", row.action),
        ActionStatus::Pending => PENDING_TEXT.to_owned(),
        ActionStatus::Failed(reason) => format!("Fehler: {reason}"),
    }
}

fn render_cards(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    block: Block<'_>,
    cards: &[CardView],
    selected: usize,
) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_span = (0_usize, 0_usize);

    for (index, card) in cards.iter().enumerate() {
        let start = lines.len();
        let is_selected = index == selected;
        let cursor = if is_selected { "▸ " } else { "  " };
        let mut title_style = Style::default().add_modifier(Modifier::BOLD);
        if is_selected {
            title_style = title_style.fg(Color::Cyan);
        }
        lines.push(Line::from(vec![
            Span::raw(cursor),
            Span::styled(card.title.clone(), title_style),
            Span::raw(format!("  ({})", card.servings)),
        ]));
        if !card.description.is_empty() {
            lines.push(Line::from(format!("  {}", card.description)));
        }
        if !card.ingredients.is_empty() {
            lines.push(Line::from(format!("  Zutaten: {}", card.ingredients)));
        }
        let action = match &card.status {
            ActionStatus::Idle => format!("  [m] {}", Tab::Recipes.context_action().label()),
            ActionStatus::Pending => format!("  {PENDING_TEXT}"),
            ActionStatus::Failed(reason) => format!("  Fehler: {reason}"),
        };
        lines.push(Line::styled(action, status_style(&card.status)));
        lines.push(Line::default());
        if is_selected {
            selected_span = (start, lines.len());
        }
    }

    let visible = usize::from(area.height.saturating_sub(2));
    let scroll = selected_span.1.saturating_sub(visible);
    let scroll = u16::try_from(scroll.min(selected_span.0)).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn status_style(status: &ActionStatus) -> Style {
    match status {
        ActionStatus::Idle => Style::default(),
        ActionStatus::Pending => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        ActionStatus::Failed(_) => Style::default().fg(Color::Red),
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }

    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Form(_) => "FORM",
        AppMode::Confirm => "CONFIRM",
    };
    let hints = match state.mode {
        AppMode::Nav => nav_hints(state.active_tab),
        AppMode::Form(FormKind::Item) => {
            "tab Feld | 1-6 Einheit | enter speichern | esc abbrechen".to_owned()
        }
        AppMode::Form(FormKind::Settings) => {
            "1-4/←→ Tab wählen | enter speichern | esc abbrechen".to_owned()
        }
        AppMode::Confirm => "y ja | n nein".to_owned(),
    };

    let pending = state
        .statuses
        .values()
        .filter(|status| **status == ActionStatus::Pending)
        .count();
    let mut parts = vec![mode.to_owned()];
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    if pending > 0 {
        parts.push(format!("{pending} {PENDING_TEXT}"));
    }
    parts.push(hints);
    parts.join(" | ")
}

fn nav_hints(tab: Tab) -> String {
    let context = tab.context_action().label();
    if tab.supports_create() {
        format!("1-4 tabs | j/k | a neu | e bearb. | d löschen | m {context} | r | s | ? | q")
    } else {
        format!("1-4 tabs | j/k | m {context} | r | s | ? | q")
    }
}

fn item_form_text(input: &ItemFormInput, active: ItemField) -> String {
    let mut lines = Vec::new();
    for field in ItemField::ALL {
        let cursor = if field == active { ">" } else { " " };
        let value = match field {
            ItemField::Unit => UNIT_CHOICES
                .iter()
                .enumerate()
                .map(|(index, unit)| {
                    if *unit == input.unit {
                        format!("{}:[{unit}]", index + 1)
                    } else {
                        format!("{}:{unit}", index + 1)
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            _ if field == active => format!("{}_", input.field(field)),
            _ => input.field(field).to_owned(),
        };
        lines.push(format!("{cursor} {:<8} {value}", field.label()));
    }
    lines.push(String::new());
    lines.push("enter speichern | esc abbrechen".to_owned());
    lines.join("\n")
}

fn settings_form_text(input: SettingsFormInput) -> String {
    let mut lines = vec!["Standard-Tab beim Start:".to_owned(), String::new()];
    for (index, tab) in Tab::ALL.iter().enumerate() {
        let mark = if *tab == input.default_tab { "(x)" } else { "( )" };
        lines.push(format!("  {mark} {} {}", index + 1, tab.label()));
    }
    lines.push(String::new());
    lines.push("enter speichern | esc abbrechen".to_owned());
    lines.join("\n")
}

fn confirm_text(action: &Action) -> String {
    let prompt = action.confirmation_prompt().unwrap_or("Fortfahren?");
    format!("{prompt}\n\ny ja | n nein")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
nav: 1-4 tab | tab/shift+tab or f/b next/prev tab | j/k select | pgup/pgdn page\n\
nav: a add | e/enter edit | d delete | m move/use/cook | r reload | s settings | q quit\n\
form: tab/shift+tab field | 1-6 or h/l unit | enter save | esc cancel\n\
settings: 1-4 or arrows choose tab | enter save | esc cancel\n\
confirm: y/enter yes | n/esc no"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, BodyProjection, InternalEvent, ViewData, body_projection, handle_key_event,
        process_internal_events, render, start_session, status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use kitchen_app::{
        Action, ActionOutcome, ActionStatus, AppMode, AppState, FormKind, Item, ItemId,
        ItemPayload, RecipeId, Settings, Tab, TabData,
    };
    use kitchen_testkit::{sample_items, sample_recipes};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::collections::BTreeMap;
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Default)]
    struct TestRuntime {
        data: BTreeMap<Tab, TabData>,
        loads: Vec<Tab>,
        actions: Vec<Action>,
        fail_actions: bool,
        fail_loads: bool,
    }

    impl TestRuntime {
        fn stocked() -> Self {
            let mut data = BTreeMap::new();
            for tab in [Tab::Shopping, Tab::Inventory, Tab::Templates] {
                data.insert(tab, TabData::Items(sample_items(tab)));
            }
            data.insert(Tab::Recipes, TabData::Recipes(sample_recipes()));
            Self {
                data,
                ..Self::default()
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_tab(&mut self, tab: Tab) -> Result<TabData> {
            self.loads.push(tab);
            if self.fail_loads {
                bail!("connection refused");
            }
            Ok(self.data.get(&tab).cloned().unwrap_or_else(|| {
                if tab.holds_items() {
                    TabData::Items(Vec::new())
                } else {
                    TabData::Recipes(Vec::new())
                }
            }))
        }

        fn run_action(&mut self, action: &Action) -> Result<ActionOutcome> {
            self.actions.push(action.clone());
            if self.fail_actions {
                bail!("server returned 500");
            }
            Ok(match action {
                Action::Save { id, payload, .. } => ActionOutcome::Saved(Item {
                    id: id.unwrap_or(ItemId::new(99)),
                    name: payload.name.clone(),
                    amount: payload.amount,
                    unit: payload.unit.clone(),
                }),
                Action::Delete { id, .. } => ActionOutcome::Removed(*id),
                Action::Move { id, .. } => ActionOutcome::Moved(*id),
                Action::UseTemplate { .. } => ActionOutcome::TemplateUsed,
                Action::Cook { .. } => ActionOutcome::Cooked,
                Action::SaveSettings(settings) => ActionOutcome::SettingsSaved(*settings),
            })
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn start(tab: Tab, runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::with_settings(Settings { default_tab: tab }),
                runtime,
                view_data: ViewData::default(),
                tx,
                rx,
            };
            start_session(
                &mut harness.state,
                &mut harness.runtime,
                &mut harness.view_data,
                &harness.tx,
            );
            harness.pump();
            harness
        }

        fn key(&mut self, code: KeyCode) -> bool {
            self.key_with(code, KeyModifiers::NONE)
        }

        fn key_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            )
        }

        fn typed(&mut self, text: &str) {
            for ch in text.chars() {
                self.key(KeyCode::Char(ch));
            }
        }

        fn pump(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn row_names(&self) -> Vec<String> {
            match body_projection(&self.state) {
                BodyProjection::Rows(rows) => rows.into_iter().map(|row| row.name).collect(),
                _ => Vec::new(),
            }
        }

        fn screen(&self) -> Result<String> {
            let mut terminal = Terminal::new(TestBackend::new(120, 24))?;
            terminal.draw(|frame| render(frame, &self.state, &self.view_data))?;
            let text = terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|cell| cell.symbol())
                .collect::<String>();
            Ok(text)
        }
    }

    #[test]
    fn session_starts_on_default_tab_with_one_load() {
        let harness = Harness::start(Tab::Templates, TestRuntime::stocked());
        assert_eq!(harness.runtime.loads, vec![Tab::Templates]);
        assert_eq!(harness.row_names(), vec!["Kaffee", "Nudeln"]);
    }

    #[test]
    fn number_keys_switch_tabs_and_load_once() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::stocked());
        harness.key(KeyCode::Char('2'));
        assert_eq!(harness.state.active_tab, Tab::Inventory);
        assert!(harness.state.is_loading());
        assert_eq!(body_projection(&harness.state), BodyProjection::Loading);

        harness.pump();
        assert_eq!(harness.runtime.loads, vec![Tab::Shopping, Tab::Inventory]);
        assert_eq!(harness.row_names().len(), 4);
    }

    #[test]
    fn tab_key_cycles_and_wraps() {
        let mut harness = Harness::start(Tab::Recipes, TestRuntime::stocked());
        harness.key(KeyCode::Tab);
        assert_eq!(harness.state.active_tab, Tab::Shopping);
        harness.key(KeyCode::BackTab);
        assert_eq!(harness.state.active_tab, Tab::Recipes);
    }

    #[test]
    fn empty_and_failed_loads_have_placeholders() -> Result<()> {
        let harness = Harness::start(Tab::Inventory, TestRuntime::default());
        assert_eq!(body_projection(&harness.state), BodyProjection::Empty);
        assert!(harness.screen()?.contains("Keine Einträge"));

        let failing = TestRuntime {
            fail_loads: true,
            ..TestRuntime::default()
        };
        let harness = Harness::start(Tab::Shopping, failing);
        assert_eq!(
            body_projection(&harness.state),
            BodyProjection::Error("connection refused".to_owned())
        );
        assert!(harness.screen()?.contains("Fehler: connection refused"));
        Ok(())
    }

    #[test]
    fn screen_shows_tabs_rows_and_context_labels() -> Result<()> {
        let harness = Harness::start(Tab::Shopping, TestRuntime::stocked());
        let screen = harness.screen()?;
        for label in ["Einkauf", "Vorrat", "Vorlagen", "Rezepte", "Milch", "2 l", "→ Vorrat"] {
            assert!(screen.contains(label), "missing {label:?}");
        }
        Ok(())
    }

    #[test]
    fn recipe_cards_show_servings_and_ingredients() -> Result<()> {
        let harness = Harness::start(Tab::Recipes, TestRuntime::stocked());
        match body_projection(&harness.state) {
            BodyProjection::Cards(cards) => {
                assert_eq!(cards.len(), 2);
                assert_eq!(cards[0].servings, "4 Portionen");
                assert_eq!(cards[0].ingredients, "Mehl, Milch, Eier");
            }
            other => panic!("expected cards, got {other:?}"),
        }
        let screen = harness.screen()?;
        assert!(screen.contains("Pfannkuchen"));
        assert!(screen.contains("kochen"));
        Ok(())
    }

    #[test]
    fn add_is_hidden_and_refused_on_recipes() {
        let mut harness = Harness::start(Tab::Recipes, TestRuntime::stocked());
        assert!(!status_text(&harness.state, &harness.view_data).contains("a neu"));

        harness.key(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("Rezepte hinzufügen noch nicht implementiert")
        );

        harness.key(KeyCode::Char('1'));
        assert!(status_text(&harness.state, &harness.view_data).contains("a neu"));
    }

    #[test]
    fn item_form_creates_entry_with_chosen_unit() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::default());
        harness.key(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Item));

        harness.typed("Milk");
        harness.key(KeyCode::Tab);
        harness.typed("2");
        harness.key(KeyCode::Tab);
        harness.key(KeyCode::Char('4'));
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Nav);

        assert_eq!(
            harness.runtime.actions,
            vec![Action::Save {
                tab: Tab::Shopping,
                id: None,
                payload: ItemPayload {
                    name: "Milk".to_owned(),
                    amount: 2.0,
                    unit: "l".to_owned(),
                },
            }]
        );

        harness.pump();
        assert_eq!(harness.row_names(), vec!["Milk"]);
        assert_eq!(harness.runtime.loads, vec![Tab::Shopping]);
    }

    #[test]
    fn invalid_form_stays_open_without_request() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::default());
        harness.key(KeyCode::Char('a'));
        harness.key(KeyCode::Tab);
        harness.typed("2");
        harness.key(KeyCode::Enter);

        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Item));
        assert!(harness.runtime.actions.is_empty());
    }

    #[test]
    fn edit_form_prefills_and_sends_put_payload() {
        let mut harness = Harness::start(Tab::Inventory, TestRuntime::stocked());
        harness.key(KeyCode::Char('j'));
        harness.key(KeyCode::Char('e'));
        harness.key(KeyCode::Tab);
        harness.key(KeyCode::Backspace);
        harness.typed("3");
        harness.key(KeyCode::Enter);

        match harness.runtime.actions.as_slice() {
            [Action::Save { id, payload, .. }] => {
                assert_eq!(*id, Some(ItemId::new(2)));
                assert_eq!(payload.name, "Milch");
                assert_eq!(payload.amount, 3.0);
            }
            other => panic!("expected one save, got {other:?}"),
        }
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::stocked());
        harness.key(KeyCode::Char('d'));
        assert_eq!(harness.state.mode, AppMode::Confirm);
        harness.key(KeyCode::Char('n'));
        assert!(harness.runtime.actions.is_empty());
        assert_eq!(harness.row_names().len(), 3);

        harness.key(KeyCode::Char('d'));
        harness.key(KeyCode::Char('y'));
        harness.pump();
        assert_eq!(
            harness.runtime.actions,
            vec![Action::Delete {
                tab: Tab::Shopping,
                id: ItemId::new(1),
            }]
        );
        assert_eq!(harness.row_names(), vec!["Brot", "Eier"]);
    }

    #[test]
    fn cook_confirms_then_reports_success() {
        let mut harness = Harness::start(Tab::Recipes, TestRuntime::stocked());
        harness.key(KeyCode::Char('j'));
        harness.key(KeyCode::Char('m'));
        assert_eq!(harness.state.mode, AppMode::Confirm);
        harness.key(KeyCode::Enter);
        harness.pump();

        assert_eq!(
            harness.runtime.actions,
            vec![Action::Cook {
                id: RecipeId::new(3)
            }]
        );
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("Guten Appetit! Bestand aktualisiert.")
        );
    }

    #[test]
    fn move_marks_row_pending_until_finished() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::stocked());
        harness.key(KeyCode::Char('m'));
        match body_projection(&harness.state) {
            BodyProjection::Rows(rows) => assert_eq!(rows[0].status, ActionStatus::Pending),
            other => panic!("expected rows, got {other:?}"),
        }

        harness.key(KeyCode::Char('m'));
        assert_eq!(harness.runtime.actions.len(), 1);

        harness.pump();
        assert_eq!(harness.row_names(), vec!["Brot", "Eier"]);
        assert_eq!(harness.runtime.loads, vec![Tab::Shopping]);
    }

    #[test]
    fn failed_action_marks_row_and_reloads() {
        let runtime = TestRuntime {
            fail_actions: true,
            ..TestRuntime::stocked()
        };
        let mut harness = Harness::start(Tab::Inventory, runtime);
        harness.key(KeyCode::Char('m'));
        harness.pump();

        assert_eq!(harness.runtime.loads, vec![Tab::Inventory, Tab::Inventory]);
        match body_projection(&harness.state) {
            BodyProjection::Rows(rows) => assert_eq!(
                rows[0].status,
                ActionStatus::Failed("server returned 500".to_owned())
            ),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn settings_dialog_saves_default_tab() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::default());
        harness.key(KeyCode::Char('s'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Settings));
        harness.key(KeyCode::Char('4'));
        harness.key(KeyCode::Enter);
        harness.pump();

        assert_eq!(
            harness.runtime.actions,
            vec![Action::SaveSettings(Settings {
                default_tab: Tab::Recipes,
            })]
        );
        assert_eq!(harness.state.settings.default_tab, Tab::Recipes);
        assert_eq!(harness.state.active_tab, Tab::Shopping);
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::stocked());
        harness.key(KeyCode::Char('?'));
        assert!(harness.view_data.help_visible);
        assert!(status_text(&harness.state, &harness.view_data).is_empty());

        assert!(!harness.key(KeyCode::Char('q')));
        assert!(!harness.view_data.help_visible);
        assert!(harness.key(KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_q_quits_from_any_mode() {
        let mut harness = Harness::start(Tab::Shopping, TestRuntime::default());
        harness.key(KeyCode::Char('a'));
        assert!(!harness.key(KeyCode::Char('q')));
        assert!(harness.key_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn reload_requests_fresh_data() {
        let mut harness = Harness::start(Tab::Templates, TestRuntime::stocked());
        harness.key(KeyCode::Char('r'));
        harness.pump();
        assert_eq!(harness.runtime.loads, vec![Tab::Templates, Tab::Templates]);
    }
}
