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

use crate::models::{Category, Entry, Project};
use crate::reports::{money, project_report, ProjectReport};
use crate::ui::components::date_input::DISPLAY_FORMAT;

pub enum ProjectViewAction {
    Back,
    NewEntry,
}

// Detail screen for one project and its entries
pub struct ProjectViewState {
    entries: Vec<Entry>,
    /// None shows every category.
    filter: Option<Category>,
    report: ProjectReport,
    list_state: ListState,
}

impl ProjectViewState {
    pub fn new(project: Project, entries: Vec<Entry>) -> Self {
        let report = project_report(&project, &entries, &[]);
        let mut state = Self {
            entries,
            filter: None,
            report,
            list_state: ListState::default(),
        };
        state.reset_selection();
        state
    }

    pub fn project_id(&self) -> i32 {
        self.report.project.id
    }

    fn reset_selection(&mut self) {
        self.list_state
            .select(if self.report.entries.is_empty() { None } else { Some(0) });
    }

    /// Cycles All -> Deposit -> Labor -> Material -> Other -> All.
    pub fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(Category::Deposit),
            Some(Category::Other) => None,
            Some(category) => Some(category.next()),
        };

        let categories: Vec<Category> = self.filter.into_iter().collect();
        self.report = project_report(&self.report.project, &self.entries, &categories);
        self.reset_selection();
    }

    pub fn next(&mut self) {
        let len = self.report.entries.len();
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
        let len = self.report.entries.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }
}

fn describe(entry: &Entry) -> String {
    let mut line = format!(
        "{}  {:<9} {:>14}  {}",
        entry.date.format(DISPLAY_FORMAT),
        entry.category.as_str(),
        money(&entry.amount),
        entry.description
    );
    if let Some(detail) = &entry.detail {
        line.push_str(&format!("  ({})", detail));
    }
    if let Some(items) = &entry.items {
        line.push_str(&format!("  [{} items]", items.len()));
    } else if let Some(quantity) = &entry.quantity {
        line.push_str(&format!("  qty {}", quantity));
    }
    line
}

pub fn render_project_view<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(5),
            Constraint::Length(3),
        ].as_ref())
        .split(frame.size());

    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(chunks[0]);

    let report = &state.report;
    let project = &report.project;
    let label = Style::default().fg(Color::Yellow);
    let details = Paragraph::new(vec![
        Spans::from(vec![Span::styled("Address: ", label), Span::raw(project.address.clone())]),
        Spans::from(vec![
            Span::styled("Client: ", label),
            Span::raw(format!("{} ({})", project.client_name, project.client_tax_id)),
        ]),
        Spans::from(vec![
            Span::styled("Period: ", label),
            Span::raw(format!(
                "{} to {}",
                project.start_date.format(DISPLAY_FORMAT),
                project.end_date.format(DISPLAY_FORMAT)
            )),
        ]),
        Spans::from(vec![
            Span::styled("Budget: ", label),
            Span::raw(money(&project.budget)),
            Span::styled("  Spent: ", label),
            Span::raw(format!("{} ({:.1}%)", money(&report.spent), report.percent_used)),
        ]),
        Spans::from(vec![
            Span::styled("Balance: ", label),
            Span::raw(money(&report.balance)),
            Span::styled("  Received: ", label),
            Span::raw(money(&report.received)),
        ]),
    ])
    .block(Block::default().title(project.name.clone()).borders(Borders::ALL));
    frame.render_widget(details, header_chunks[0]);

    let categories: Vec<Spans> = report
        .by_category
        .iter()
        .map(|(category, total)| Spans::from(format!("{:<10} {}", category.as_str(), money(total))))
        .collect();
    let categories = Paragraph::new(categories)
        .block(Block::default().title("By category").borders(Borders::ALL));
    frame.render_widget(categories, header_chunks[1]);

    let items: Vec<ListItem> = report.entries.iter().map(|e| ListItem::new(describe(e))).collect();
    let filter = state.filter.map(|c| c.as_str()).unwrap_or("All");
    let entries = List::new(items)
        .block(
            Block::default()
                .title(format!("Entries ({}): {}", filter, report.entries.len()))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(entries, chunks[1], &mut state.list_state);

    let buttons = Paragraph::new("<L> New Entry | <F> Filter Category | <Up/Down> Scroll | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut ProjectViewState) -> Result<Option<ProjectViewAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(ProjectViewAction::Back)),
            KeyCode::Char('l') => return Ok(Some(ProjectViewAction::NewEntry)),
            KeyCode::Char('f') => state.cycle_filter(),
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            _ => {}
        }
    }
    Ok(None)
}
