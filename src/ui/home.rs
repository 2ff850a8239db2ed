use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::reports::{money, Overview};
use crate::ui::components::popup::{render_error, render_input};

// Overview of every project, entry point for all other screens
pub struct HomeState {
    overview: Overview,
    list_state: ListState,
    /// Path typed in the import prompt, when it is open.
    import_path: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

pub enum HomeAction {
    Quit,
    NewProject,
    NewEntry(Option<i32>),
    ViewProject(i32),
    Materials,
    Import(String),
}

impl HomeState {
    pub fn new(overview: Overview) -> Self {
        let mut list_state = ListState::default();
        if !overview.projects.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            overview,
            list_state,
            import_path: None,
            status: None,
            error: None,
        }
    }

    pub fn next(&mut self) {
        let len = self.overview.projects.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.overview.projects.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_project_id(&self) -> Option<i32> {
        self.list_state
            .selected()
            .and_then(|i| self.overview.projects.get(i))
            .map(|p| p.project_id)
    }
}

pub fn render_home<B: Backend>(frame: &mut Frame<B>, state: &mut HomeState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let overview = &state.overview;
    let header = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled("Budget: ", Style::default().fg(Color::Yellow)),
            Span::raw(money(&overview.total_budget)),
            Span::styled("   Spent: ", Style::default().fg(Color::Yellow)),
            Span::raw(money(&overview.total_spent)),
            Span::styled("   Balance: ", Style::default().fg(Color::Yellow)),
            Span::raw(money(&overview.balance)),
        ]),
        Spans::from(vec![
            Span::styled("Received: ", Style::default().fg(Color::Yellow)),
            Span::raw(money(&overview.total_received)),
            Span::raw(format!("   Projects: {}", overview.projects.len())),
        ]),
        Spans::from(Span::styled(
            state.status.clone().unwrap_or_default(),
            Style::default().fg(Color::Green),
        )),
    ])
    .block(Block::default().title("Obras").borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = overview
        .projects
        .iter()
        .map(|project| {
            let percent_style = if project.percent_used > 100.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{:<24}", project.name), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    " {:<20} budget {:>16} spent {:>16} balance {:>16} ",
                    project.client_name,
                    money(&project.budget),
                    money(&project.spent),
                    money(&project.balance),
                )),
                Span::styled(format!("{:>6.1}%", project.percent_used), percent_style),
            ]))
        })
        .collect();

    let projects_list = List::new(items)
        .block(Block::default().title("Projects by budget used").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(projects_list, chunks[1], &mut state.list_state);

    let categories: Vec<Spans> = state
        .overview
        .by_category
        .iter()
        .map(|(category, total)| Spans::from(format!("{:<10} {}", category.as_str(), money(total))))
        .collect();
    let categories = Paragraph::new(categories)
        .block(Block::default().title("By category").borders(Borders::ALL));
    frame.render_widget(categories, chunks[2]);

    let buttons_text = if state.selected_project_id().is_some() {
        "<N> New Project | <L> New Entry | <I> Import Statement | <M> Materials | <Enter> View Project | <Q> Quit"
    } else {
        "<N> New Project | <I> Import Statement | <M> Materials | <Q> Quit"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);

    if let Some(path) = &state.import_path {
        render_input(frame, size, "Import Statement", "Path to the statement (.xlsx or .csv):", path);
    }
    if let Some(error) = &state.error {
        render_error(frame, size, error);
    }
}

pub fn handle_input(state: &mut HomeState) -> Result<Option<HomeAction>> {
    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };

    if state.error.take().is_some() {
        return Ok(None);
    }

    if let Some(path) = &mut state.import_path {
        match key.code {
            KeyCode::Esc => state.import_path = None,
            KeyCode::Enter => {
                let path = path.trim().to_string();
                state.import_path = None;
                if !path.is_empty() {
                    return Ok(Some(HomeAction::Import(path)));
                }
            }
            KeyCode::Backspace => {
                path.pop();
            }
            KeyCode::Char(c) => path.push(c),
            _ => {}
        }
        return Ok(None);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(HomeAction::Quit)),
        KeyCode::Char('n') => return Ok(Some(HomeAction::NewProject)),
        KeyCode::Char('l') => {
            if state.selected_project_id().is_some() {
                return Ok(Some(HomeAction::NewEntry(state.selected_project_id())));
            }
        }
        KeyCode::Char('m') => return Ok(Some(HomeAction::Materials)),
        KeyCode::Char('i') => {
            state.status = None;
            state.import_path = Some(String::new());
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Enter => {
            if let Some(id) = state.selected_project_id() {
                return Ok(Some(HomeAction::ViewProject(id)));
            }
        }
        _ => {}
    }

    Ok(None)
}
