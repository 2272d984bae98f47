use crate::wizard::form::{FormControl, FormEvent, StepForm};
use crate::wizard::session::{NavigateOutcome, SubmitOutcome, WizardSession};
use crate::wizard::state::FieldId;
use crate::wizard::steps::REVIEW_ROUTE;
use crate::wizard::sync::TEXT_SYNC_DEBOUNCE;
use crate::wizard::{max_step, session::CONTENT_SETTLE};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use ratatui::Terminal;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

pub const SCRIPT_KEYS_ENV: &str = "FORMWORK_SCRIPT_KEYS";

const BROWSE_HINT: &str = "Up/Down move | Space toggle/edit | n next | p back | s submit | q quit";
const EDIT_HINT: &str = "type to edit | Enter finish | Esc finish";

pub fn run_wizard(session: &mut WizardSession) -> Result<String, String> {
    session
        .start(Instant::now())
        .map_err(|err| format!("failed to load the first step: {err}"))?;
    if let Some(keys) = load_script_keys()? {
        return run_scripted(session, keys);
    }
    if !is_interactive() {
        return Err(format!(
            "formwork run needs an interactive terminal (or {SCRIPT_KEYS_ENV})"
        ));
    }
    run_interactive(session)
}

fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

pub fn parse_script_keys(raw: &str) -> Result<Vec<KeyEvent>, String> {
    let mut keys = Vec::new();
    for token in raw.split(',') {
        let normalized = token.trim().to_string();
        if normalized.is_empty() {
            continue;
        }
        let key = match normalized.as_str() {
            "up" => KeyEvent::new(KeyCode::Up, KeyModifiers::NONE),
            "down" => KeyEvent::new(KeyCode::Down, KeyModifiers::NONE),
            "enter" => KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            "esc" => KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            "space" => KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE),
            "backspace" => KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE),
            "ctrl-c" => KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE),
                    _ => {
                        return Err(format!(
                            "invalid {SCRIPT_KEYS_ENV} token `{other}`; valid tokens: \
                             up,down,enter,esc,space,backspace,ctrl-c or a single character"
                        ));
                    }
                }
            }
        };
        keys.push(key);
    }
    Ok(keys)
}

fn load_script_keys() -> Result<Option<Vec<KeyEvent>>, String> {
    let Ok(raw) = std::env::var(SCRIPT_KEYS_ENV) else {
        return Ok(None);
    };
    parse_script_keys(&raw).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WizardRow {
    Text {
        field: FieldId,
        value: String,
        placeholder: String,
    },
    Choice {
        field: FieldId,
        value: String,
        checked: bool,
    },
    Radio {
        field: FieldId,
        value: String,
        selected: bool,
    },
    Flag {
        field: FieldId,
        checked: bool,
    },
}

fn rows_for(form: &StepForm) -> Vec<WizardRow> {
    form.controls()
        .iter()
        .filter_map(|control| match control {
            FormControl::Text {
                field,
                value,
                placeholder,
            } => Some(WizardRow::Text {
                field: *field,
                value: value.clone(),
                placeholder: placeholder.clone(),
            }),
            FormControl::Choice {
                field,
                value,
                checked,
            } => Some(WizardRow::Choice {
                field: *field,
                value: value.clone(),
                checked: *checked,
            }),
            FormControl::Radio {
                field,
                value,
                selected,
            } => Some(WizardRow::Radio {
                field: *field,
                value: value.clone(),
                selected: *selected,
            }),
            FormControl::FlagToggle { field, checked } => Some(WizardRow::Flag {
                field: *field,
                checked: *checked,
            }),
            FormControl::Hidden { .. } => None,
        })
        .collect()
}

#[derive(Debug, Default)]
struct UiState {
    selected: usize,
    editing: Option<FieldId>,
    status: String,
}

#[derive(Debug, PartialEq, Eq)]
enum WizardExit {
    Canceled,
    Submitted(String),
}

fn run_interactive(session: &mut WizardSession) -> Result<String, String> {
    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|err| format!("failed to enable raw mode: {err}"))?;
    execute!(stdout, EnterAlternateScreen, Hide)
        .map_err(|err| format!("failed to enter wizard screen: {err}"))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|err| format!("failed to create wizard terminal: {err}"))?;
    let result = run_interactive_loop(session, &mut terminal);
    disable_raw_mode().map_err(|err| format!("failed to disable raw mode: {err}"))?;
    execute!(terminal.backend_mut(), Show, LeaveAlternateScreen)
        .map_err(|err| format!("failed to leave wizard screen: {err}"))?;
    result
}

fn run_interactive_loop(
    session: &mut WizardSession,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<String, String> {
    let mut ui = UiState::default();
    loop {
        let now = Instant::now();
        session.tick(now);
        clamp_selection(session, &mut ui);
        terminal
            .draw(|frame| draw_wizard(frame, session, &ui))
            .map_err(|err| format!("failed to draw wizard: {err}"))?;
        if !event::poll(Duration::from_millis(50))
            .map_err(|err| format!("failed to poll wizard input: {err}"))?
        {
            continue;
        }
        let ev = event::read().map_err(|err| format!("failed to read wizard input: {err}"))?;
        let Event::Key(key) = ev else { continue };
        if let Some(exit) = handle_key(session, &mut ui, key, Instant::now())? {
            return Ok(exit_message(session, exit));
        }
    }
}

fn run_scripted(session: &mut WizardSession, keys: Vec<KeyEvent>) -> Result<String, String> {
    let mut ui = UiState::default();
    for key in keys {
        // No real wall-clock passes between scripted keys; push the pump past
        // the settle window so restores and listeners are in place.
        let now = Instant::now() + CONTENT_SETTLE;
        session.tick(now);
        clamp_selection(session, &mut ui);
        if let Some(exit) = handle_key(session, &mut ui, key, now)? {
            return Ok(exit_message(session, exit));
        }
    }
    session.tick(Instant::now() + CONTENT_SETTLE + TEXT_SYNC_DEBOUNCE);
    let state = session.store().load();
    Ok(format!(
        "wizard paused at step {} of {} (setup_type={})",
        state.current_step,
        max_step(state.setup_type),
        state.setup_type
    ))
}

fn exit_message(session: &WizardSession, exit: WizardExit) -> String {
    match exit {
        WizardExit::Canceled => {
            let state = session.store().load();
            format!(
                "wizard canceled at step {} (answers kept; run `formwork reset` to discard)",
                state.current_step
            )
        }
        WizardExit::Submitted(body) => format!("wizard submitted\n{body}"),
    }
}

fn clamp_selection(session: &WizardSession, ui: &mut UiState) {
    let rows = session.form().map(|form| rows_for(form).len()).unwrap_or(0);
    if rows == 0 {
        ui.selected = 0;
    } else {
        ui.selected = ui.selected.min(rows - 1);
    }
}

fn handle_key(
    session: &mut WizardSession,
    ui: &mut UiState,
    key: KeyEvent,
    now: Instant,
) -> Result<Option<WizardExit>, String> {
    if key.kind == KeyEventKind::Release {
        return Ok(None);
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(Some(WizardExit::Canceled));
    }
    if ui.editing.is_some() {
        handle_edit_key(session, ui, key, now);
        return Ok(None);
    }
    match key.code {
        KeyCode::Up => {
            ui.selected = ui.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            ui.selected += 1;
            clamp_selection(session, ui);
        }
        KeyCode::Char(' ') | KeyCode::Enter => activate_row(session, ui, now),
        KeyCode::Char('n') | KeyCode::Right => match session.navigate_next(now) {
            Ok(NavigateOutcome::Moved(step)) => {
                ui.selected = 0;
                ui.status = format!("moved to step {step}");
            }
            Ok(NavigateOutcome::Blocked(error)) => ui.status = error.to_string(),
            Ok(NavigateOutcome::AtBoundary) => {
                ui.status = "already at the last step; press s to submit".to_string();
            }
            Err(err) => ui.status = format!("navigation failed: {err}"),
        },
        KeyCode::Char('p') | KeyCode::Left => match session.navigate_previous(now) {
            Ok(NavigateOutcome::Moved(step)) => {
                ui.selected = 0;
                ui.status = format!("moved to step {step}");
            }
            Ok(NavigateOutcome::Blocked(error)) => ui.status = error.to_string(),
            Ok(NavigateOutcome::AtBoundary) => {
                ui.status = "already at the first step".to_string();
            }
            Err(err) => ui.status = format!("navigation failed: {err}"),
        },
        KeyCode::Char('s') => {
            let on_review = session
                .form()
                .map(|form| form.route == REVIEW_ROUTE)
                .unwrap_or(false);
            if !on_review {
                ui.status = "submit is available on the review step".to_string();
                return Ok(None);
            }
            match session.submit(now) {
                Ok(SubmitOutcome::Accepted(body)) => {
                    return Ok(Some(WizardExit::Submitted(body)));
                }
                Ok(SubmitOutcome::Blocked(error)) => ui.status = error.to_string(),
                Err(err) => ui.status = format!("submit failed: {err}"),
            }
        }
        KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(WizardExit::Canceled)),
        _ => {}
    }
    Ok(None)
}

fn activate_row(session: &mut WizardSession, ui: &mut UiState, now: Instant) {
    let Some(form) = session.form() else { return };
    let rows = rows_for(form);
    let Some(row) = rows.get(ui.selected).cloned() else {
        return;
    };
    let generation = form.generation;
    match row {
        WizardRow::Text { field, .. } => {
            ui.editing = Some(field);
            ui.status = format!("editing {field}");
        }
        WizardRow::Choice {
            field,
            value,
            checked,
        } => {
            if let Some(form) = session.form_mut() {
                form.set_checked(field, &value, !checked);
            }
            session.handle_event(
                &FormEvent::ChoiceToggled {
                    generation,
                    field,
                    value,
                    checked: !checked,
                },
                now,
            );
        }
        WizardRow::Radio { field, value, .. } => {
            if let Some(form) = session.form_mut() {
                form.select_radio(field, &value);
            }
            session.handle_event(
                &FormEvent::RadioSelected {
                    generation,
                    field,
                    value,
                },
                now,
            );
        }
        WizardRow::Flag { field, checked } => {
            let next = !checked;
            if let Some(form) = session.form_mut() {
                form.set_flag_checked(field, next);
                if !next {
                    // Mirror the parent/child rule in the rendered controls.
                    for sub in crate::wizard::ALL_FIELDS {
                        if sub.parent_flag() == Some(field) {
                            form.set_flag_checked(sub, false);
                        }
                    }
                }
            }
            session.handle_event(
                &FormEvent::FlagToggled {
                    generation,
                    field,
                    checked: next,
                },
                now,
            );
        }
    }
}

fn handle_edit_key(session: &mut WizardSession, ui: &mut UiState, key: KeyEvent, now: Instant) {
    let Some(field) = ui.editing else { return };
    let Some(form) = session.form() else {
        ui.editing = None;
        return;
    };
    let generation = form.generation;
    let current = form.scalar_value(field).unwrap_or_default();
    let next = match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            ui.editing = None;
            ui.status = String::new();
            return;
        }
        KeyCode::Backspace => {
            let mut value = current;
            value.pop();
            value
        }
        KeyCode::Char(ch) => format!("{current}{ch}"),
        _ => return,
    };
    if let Some(form) = session.form_mut() {
        form.set_text_value(field, &next);
    }
    session.handle_event(
        &FormEvent::TextChanged {
            generation,
            field,
            value: next,
        },
        now,
    );
}

fn draw_wizard(frame: &mut ratatui::Frame<'_>, session: &WizardSession, ui: &UiState) {
    let state = session.store().load();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let title = match session.form() {
        Some(form) => format!(
            " Formwork - {} (step {}/{}) ",
            form.route,
            form.step,
            max_step(state.setup_type)
        ),
        None => " Formwork ".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL)),
        areas[0],
    );

    let mut lines: Vec<Line> = Vec::new();
    if let Some(form) = session.form() {
        for (index, row) in rows_for(form).iter().enumerate() {
            let marker = if index == ui.selected { "> " } else { "  " };
            let text = match row {
                WizardRow::Text {
                    field,
                    value,
                    placeholder,
                } => {
                    let shown = if value.is_empty() && ui.editing != Some(*field) {
                        format!("({placeholder})")
                    } else if ui.editing == Some(*field) {
                        format!("{value}_")
                    } else {
                        value.clone()
                    };
                    format!("{marker}{field}: {shown}")
                }
                WizardRow::Choice {
                    field,
                    value,
                    checked,
                } => format!("{marker}[{}] {field}: {value}", if *checked { "x" } else { " " }),
                WizardRow::Radio {
                    field,
                    value,
                    selected,
                } => format!("{marker}({}) {field}: {value}", if *selected { "*" } else { " " }),
                WizardRow::Flag { field, checked } => {
                    format!("{marker}[{}] {field}", if *checked { "x" } else { " " })
                }
            };
            let style = if index == ui.selected {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }
    } else {
        lines.push(Line::from("loading step..."));
    }
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .padding(Padding::horizontal(1)),
        ),
        areas[1],
    );

    let hint = if ui.editing.is_some() { EDIT_HINT } else { BROWSE_HINT };
    let footer = vec![
        Line::from(ui.status.clone()),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::TOP)),
        areas[2],
    );
}
