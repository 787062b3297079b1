use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expense_tracker::{ControllerState, ExpenseError, Field, FormController, TABLE_HEADERS};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message box shown over the form until the next key press
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }

    fn from_error(err: &ExpenseError) -> Self {
        match err {
            ExpenseError::NoSelection => Self::new(
                NoticeLevel::Warning,
                "No expenses chosen",
                "Please choose expenses to delete",
            ),
            e if e.is_user_error() => Self::new(NoticeLevel::Warning, "Invalid expense", e.to_string()),
            e => Self::new(NoticeLevel::Error, "Error", e.to_string()),
        }
    }
}

pub struct App {
    pub controller: FormController,
    pub table_state: TableState,
    pub notice: Option<Notice>,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: FormController) -> Self {
        Self {
            controller,
            table_state: TableState::default(),
            notice: None,
            should_quit: false,
        }
    }

    fn report(&mut self, result: expense_tracker::Result<()>) {
        if let Err(e) = result {
            if !e.is_user_error() {
                error!(error = %e, "command failed");
            }
            self.notice = Some(Notice::from_error(&e));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Any key dismisses the current notice
        if self.notice.take().is_some() {
            return;
        }

        if let ControllerState::ConfirmDelete { .. } = self.controller.state() {
            let answer = match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
                _ => None,
            };
            if let Some(confirmed) = answer {
                let result = self.controller.resolve_delete(confirmed).map(|_| ());
                self.report(result);
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let result = self.controller.delete_expenses().map(|_| ());
                self.report(result);
            }
            KeyCode::Delete => {
                let result = self.controller.delete_expenses().map(|_| ());
                self.report(result);
            }
            KeyCode::Enter => {
                let result = self.controller.add_expenses().map(|id| {
                    self.notice = Some(Notice::new(
                        NoticeLevel::Info,
                        "Saved",
                        format!("Expense #{} added", id),
                    ));
                });
                self.report(result);
            }
            KeyCode::Tab => self.controller.form.focus_next(),
            KeyCode::BackTab => self.controller.form.focus_previous(),
            KeyCode::Right => self.controller.form.increment(),
            KeyCode::Left => self.controller.form.decrement(),
            KeyCode::Backspace => self.controller.form.backspace(),
            KeyCode::Char(c) => self.controller.form.input_char(c),
            KeyCode::Down => self.controller.select_next(),
            KeyCode::Up => self.controller.select_previous(),
            KeyCode::Home => self.controller.select_first(),
            KeyCode::End => self.controller.select_last(),
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

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            // Windows reports releases too
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
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
            Constraint::Length(3), // Header
            Constraint::Length(6), // Form
            Constraint::Min(0),    // Expense table
            Constraint::Length(3), // Key hints
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_form(f, chunks[1], app);
    render_table(f, chunks[2], app);
    render_status_bar(f, chunks[3]);

    if let ControllerState::ConfirmDelete { id } = app.controller.state() {
        render_confirm(f, id);
    }
    if let Some(notice) = &app.notice {
        render_notice(f, notice);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let spans = vec![
        Span::styled(
            "Expense Tracker",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Expenses: {}", app.controller.rows().len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Total: {:.2}", app.controller.total_amount()),
            Style::default().fg(Color::Green),
        ),
    ];

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.controller.form;

    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|field| {
            let focused = *field == form.focus;
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            let mut value = form.display_value(*field);
            if focused {
                if field.is_text() {
                    value.push('▏');
                } else {
                    value = format!("◀ {} ▶", value);
                }
            }

            Line::from(vec![
                Span::styled(format!(" {:<12}", format!("{}:", field.label())), label_style),
                Span::styled(value, Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let form_widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" New Expense "),
    );

    f.render_widget(form_widget, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = TABLE_HEADERS.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.controller.rows().iter().map(|row| {
        let cells = row.cells().map(|text| Cell::from(text.to_string()));
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(10),
            Constraint::Percentage(18),
            Constraint::Percentage(20),
            Constraint::Percentage(15),
            Constraint::Percentage(37),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    app.table_state.select(app.controller.selected());
    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = vec![
        Span::raw(" "),
        key("Enter"),
        Span::raw(" Add Expense | "),
        key("Del/Ctrl-D"),
        Span::raw(" Delete Expense | "),
        key("Tab"),
        Span::raw(" Field | "),
        key("←/→"),
        Span::raw(" Change | "),
        key("↑/↓"),
        Span::raw(" Select | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_confirm(f: &mut Frame, id: i64) {
    let area = centered_rect(40, 5, f.size());
    let text = vec![
        Line::from(format!("Delete expenses? (#{})", id)),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Green)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(Color::Red)),
            Span::raw(" No"),
        ]),
    ];

    let dialog = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Are you sure "),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn render_notice(f: &mut Frame, notice: &Notice) {
    let color = match notice.level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    let width = (notice.message.len().max(notice.title.len()) + 4) as u16;
    let area = centered_rect(width, 4, f.size());

    let dialog = Paragraph::new(vec![
        Line::from(notice.message.as_str()),
        Line::from(Span::styled("any key to close", Style::default().fg(Color::DarkGray))),
    ])
    .style(Style::default().fg(color))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", notice.title)),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

/// Fixed-size rect centred in `area`, shrunk to fit
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use expense_tracker::{ExpenseForm, ExpenseStore};

    fn app() -> App {
        let store = ExpenseStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        let form = ExpenseForm::with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        App::new(FormController::with_form(store, form).unwrap())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_enter_submits_form() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "12.50");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "lunch");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.controller.rows().len(), 1);
        assert_eq!(app.controller.rows()[0].description, "lunch");
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Info));
    }

    #[test]
    fn test_delete_without_selection_shows_warning() {
        let mut app = app();
        press(&mut app, KeyCode::Delete);

        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.title, "No expenses chosen");
        assert_eq!(notice.message, "Please choose expenses to delete");

        // The next key only closes the warning
        press(&mut app, KeyCode::Esc);
        assert!(app.notice.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let mut app = app();
        app.controller.form.amount = "5".to_string();
        app.controller.add_expenses().unwrap();
        press(&mut app, KeyCode::Down);

        press(&mut app, KeyCode::Delete);
        assert!(matches!(app.controller.state(), ControllerState::ConfirmDelete { .. }));

        // Unrelated keys are ignored while the question is open
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.controller.rows().len(), 1);

        press(&mut app, KeyCode::Char('y'));
        assert!(app.controller.rows().is_empty());
        assert_eq!(app.controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_escape_quits() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_centered_rect_fits_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(40, 4, area);
        assert_eq!(rect, Rect::new(0, 3, 20, 4));
    }
}
