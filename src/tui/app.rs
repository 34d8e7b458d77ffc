//! Task board: a full-screen view of every task with keyboard actions.
//!
//! All changes go through `TaskService`, so the board follows the same
//! lifecycle rules and writes the same audit entries as the line menu.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::cmd::{parse_code, validate_task_name};
use crate::service::{AssigneeLabel, TaskLine, TaskService};
use crate::task::{LogEntry, Session};
use crate::tui::colors::status_color;
use crate::tui::enums::{AppState, FormField};
use crate::tui::input::InputField;
use crate::tui::utils::centered_rect;

/// Register form state.
#[derive(Debug)]
struct RegisterForm {
    code: InputField,
    name: InputField,
    assignee: InputField,
    current: FormField,
}

impl RegisterForm {
    fn new() -> Self {
        RegisterForm {
            code: InputField::new(),
            name: InputField::new(),
            assignee: InputField::new(),
            current: FormField::Code,
        }
    }

    fn field(&self, which: FormField) -> &InputField {
        match which {
            FormField::Code => &self.code,
            FormField::Name => &self.name,
            FormField::Assignee => &self.assignee,
        }
    }

    fn current_mut(&mut self) -> &mut InputField {
        match self.current {
            FormField::Code => &mut self.code,
            FormField::Name => &mut self.name,
            FormField::Assignee => &mut self.assignee,
        }
    }

    /// Validate the inputs into `(code, name, assignee)`.
    fn parse(&self) -> Result<(u32, String, u32), String> {
        let code = parse_code(&self.code.value).ok_or("Enter the task code using digits 0-9")?;
        validate_task_name(&self.name.value)?;
        let assignee = parse_code(&self.assignee.value).ok_or("Enter the user code using digits 0-9")?;
        Ok((code, self.name.value.clone(), assignee))
    }
}

pub struct BoardApp<'a> {
    service: &'a TaskService,
    session: &'a Session,
    state: AppState,
    lines: Vec<TaskLine>,
    list_state: ListState,
    form: RegisterForm,
    history: Vec<LogEntry>,
    status_message: String,
    should_exit: bool,
}

impl<'a> BoardApp<'a> {
    pub fn new(service: &'a TaskService, session: &'a Session) -> Self {
        let mut app = BoardApp {
            service,
            session,
            state: AppState::TaskList,
            lines: Vec::new(),
            list_state: ListState::default(),
            form: RegisterForm::new(),
            history: Vec::new(),
            status_message: String::new(),
            should_exit: false,
        };
        app.refresh();
        app
    }

    /// Reload tasks from disk, keeping the selection in range.
    fn refresh(&mut self) {
        match self.service.list_all(self.session) {
            Ok(lines) => self.lines = lines,
            Err(e) => self.status_message = format!("Error: {e}"),
        }
        let selected = match self.list_state.selected() {
            _ if self.lines.is_empty() => None,
            Some(i) => Some(i.min(self.lines.len() - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    fn selected_line(&self) -> Option<&TaskLine> {
        self.list_state.selected().and_then(|i| self.lines.get(i))
    }

    /// Main event loop for the board.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            if self.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// Dispatch a key press to the handler for the current state.
    pub fn handle_key(&mut self, key: KeyCode) {
        if self.state != AppState::AddTask {
            self.status_message.clear();
        }
        match self.state {
            AppState::TaskList => self.handle_list_input(key),
            AppState::AddTask => self.handle_form_input(key),
            AppState::ConfirmDelete => self.handle_confirm_input(key),
            AppState::History | AppState::Help => self.state = AppState::TaskList,
        }
    }

    fn handle_list_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(selected) = self.list_state.selected() {
                    if selected > 0 {
                        self.list_state.select(Some(selected - 1));
                    }
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(selected) = self.list_state.selected() {
                    if selected + 1 < self.lines.len() {
                        self.list_state.select(Some(selected + 1));
                    }
                }
            }
            KeyCode::Enter | KeyCode::Char('s') => self.advance_selected(),
            KeyCode::Char('a') => {
                self.form = RegisterForm::new();
                self.state = AppState::AddTask;
            }
            KeyCode::Char('d') => {
                if self.selected_line().is_some() {
                    self.state = AppState::ConfirmDelete;
                }
            }
            KeyCode::Char('h') => self.open_history(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('?') => self.state = AppState::Help,
            KeyCode::Esc | KeyCode::Char('q') => self.should_exit = true,
            _ => {}
        }
    }

    /// Move the selected task to its next status.
    fn advance_selected(&mut self) {
        let Some(line) = self.selected_line() else {
            return;
        };
        let code = line.code;
        // A done task has no next status; asking for `Done` again reports it as terminal.
        let target = line.status.next().unwrap_or(line.status);
        match self.service.change_status(code, target, self.session) {
            Ok(task) => {
                self.status_message = format!("Task {} is now {}.", task.code, task.status);
                self.refresh();
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn open_history(&mut self) {
        let Some(code) = self.selected_line().map(|l| l.code) else {
            return;
        };
        match self.service.history(code) {
            Ok(entries) => {
                self.history = entries;
                self.state = AppState::History;
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn handle_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.status_message.clear();
                self.state = AppState::TaskList;
            }
            KeyCode::Tab | KeyCode::Down => self.form.current = self.form.current.next(),
            KeyCode::BackTab | KeyCode::Up => self.form.current = self.form.current.previous(),
            KeyCode::Left => self.form.current_mut().move_cursor_left(),
            KeyCode::Right => self.form.current_mut().move_cursor_right(),
            KeyCode::Backspace => self.form.current_mut().handle_backspace(),
            KeyCode::Delete => self.form.current_mut().handle_delete(),
            KeyCode::Char(c) => self.form.current_mut().handle_char(c),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let (code, name, assignee) = match self.form.parse() {
            Ok(parsed) => parsed,
            Err(msg) => {
                self.status_message = msg;
                return;
            }
        };
        match self.service.register(code, &name, assignee, self.session) {
            Ok(task) => {
                self.status_message = format!("{} registered.", task.name);
                self.state = AppState::TaskList;
                self.refresh();
                let position = self.lines.iter().position(|l| l.code == code);
                self.list_state.select(position);
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn handle_confirm_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(code) = self.selected_line().map(|l| l.code) {
                    match self.service.delete(code) {
                        Ok(task) => self.status_message = format!("Deleted task {} ({}).", task.code, task.name),
                        Err(e) => self.status_message = e.to_string(),
                    }
                }
                self.state = AppState::TaskList;
                self.refresh();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state = AppState::TaskList;
            }
            _ => {}
        }
    }

    /// Main render function that dispatches to state-specific renderers.
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_task_list(f, chunks[1]);
        match self.state {
            AppState::TaskList => {}
            AppState::AddTask => self.render_form(f, chunks[1]),
            AppState::ConfirmDelete => self.render_confirm(f, chunks[1]),
            AppState::History => self.render_history(f, chunks[1]),
            AppState::Help => self.render_help(f, chunks[1]),
        }
        self.render_status_bar(f, chunks[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Paragraph::new(Line::from(vec![
            Span::styled("TASKS", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  logged in as {}", self.session.user.name)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
        f.render_widget(header, area);
    }

    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .lines
            .iter()
            .map(|line| {
                let assignee_style = match line.assignee {
                    AssigneeLabel::You => Style::default().add_modifier(Modifier::BOLD),
                    AssigneeLabel::Other(_) => Style::default(),
                    AssigneeLabel::Unknown => Style::default().fg(Color::Red),
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:>5}  ", line.code)),
                    Span::styled(format!("{:<12}", line.status.label()), Style::default().fg(status_color(line.status))),
                    Span::raw(format!("{:<12}", line.name)),
                    Span::styled(line.assignee.to_string(), assignee_style),
                ]))
            })
            .collect();

        let title = format!("Tasks ({})", self.lines.len());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol("► ");

        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_form(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 60, area);
        f.render_widget(Clear, area);
        let outer = Block::default().borders(Borders::ALL).title("Register Task");
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let fields = [FormField::Code, FormField::Name, FormField::Assignee];
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        for (field, chunk) in fields.iter().zip(chunks.iter()) {
            let active = *field == self.form.current;
            let border = if active { Style::default().fg(Color::Yellow) } else { Style::default() };
            let input = Paragraph::new(self.form.field(*field).value.as_str()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(field.label())
                    .border_style(border),
            );
            f.render_widget(input, *chunk);
            if active {
                let cursor = self.form.field(*field).cursor as u16;
                f.set_cursor_position((chunk.x + cursor + 1, chunk.y + 1));
            }
        }
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 30, area);
        f.render_widget(Clear, area);
        let name = self.selected_line().map(|l| l.name.clone()).unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Are you sure?",
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Red),
            )),
            Line::from(""),
            Line::from(format!("Delete task {name} and its history?")),
            Line::from(""),
            Line::from("Press Y to confirm, N or Esc to cancel"),
        ];
        let confirm = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Delete Task")
                    .border_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(confirm, area);
    }

    fn render_history(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 60, area);
        f.render_widget(Clear, area);
        let mut text = vec![Line::from(Span::styled(
            format!("{:<12} {:<8} {}", "Date", "User", "Status"),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        text.extend(self.history.iter().map(|e| {
            Line::from(vec![
                Span::raw(format!("{:<12} {:<8} ", e.date, e.changed_by)),
                Span::styled(e.status.label(), Style::default().fg(status_color(e.status))),
            ])
        }));
        let history = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("History"));
        f.render_widget(history, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 60, area);
        f.render_widget(Clear, area);
        let text = vec![
            Line::from("↑/k ↓/j   move selection"),
            Line::from("Enter/s   advance status one step"),
            Line::from("a         register a task"),
            Line::from("d         delete a done task"),
            Line::from("h         show history"),
            Line::from("r         reload from disk"),
            Line::from("q/Esc     quit"),
        ];
        let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::TaskList => "↑↓ move, Enter advance, a add, d delete, h history, ? help, q quit".to_string(),
                AppState::AddTask => "Tab next field, Enter register, Esc cancel".to_string(),
                AppState::ConfirmDelete => "Press Y to confirm, N or Esc to cancel".to_string(),
                AppState::History | AppState::Help => "Press any key to return".to_string(),
            }
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }
}
