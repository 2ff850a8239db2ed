use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Entry, Project};
use crate::reports::{material_report, money, MaterialReport};
use crate::ui::components::date_input::DISPLAY_FORMAT;

pub enum MaterialsAction {
    Back,
}

// Purchase history of itemized materials, one subcategory at a time
pub struct MaterialsState {
    projects: Vec<Project>,
    entries: Vec<Entry>,
    subcategories: Vec<String>,
    index: usize,
    report: MaterialReport,
}

impl MaterialsState {
    pub fn new(projects: Vec<Project>, entries: Vec<Entry>, subcategories: Vec<String>) -> Self {
        let first = subcategories.first().cloned().unwrap_or_default();
        let report = material_report(&projects, &entries, &first);
        Self {
            projects,
            entries,
            subcategories,
            index: 0,
            report,
        }
    }

    fn select(&mut self, index: usize) {
        if self.subcategories.is_empty() {
            return;
        }
        self.index = index % self.subcategories.len();
        self.report = material_report(&self.projects, &self.entries, &self.subcategories[self.index]);
    }

    pub fn next_subcategory(&mut self) {
        self.select(self.index + 1);
    }

    pub fn previous_subcategory(&mut self) {
        let len = self.subcategories.len().max(1);
        self.select(self.index + len - 1);
    }
}

pub fn render_materials<B: Backend>(frame: &mut Frame<B>, state: &mut MaterialsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(3),
        ].as_ref())
        .split(frame.size());

    let report = &state.report;
    let label = Style::default().fg(Color::Yellow);
    let average = report
        .average_value
        .as_ref()
        .map(money)
        .unwrap_or_else(|| "-".to_string());
    let summary = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled("Purchases: ", label),
            Span::raw(report.purchases.len().to_string()),
            Span::styled("   Total quantity: ", label),
            Span::raw(report.total_quantity.to_string()),
        ]),
        Spans::from(vec![
            Span::styled("Total spent: ", label),
            Span::raw(money(&report.total_spent)),
            Span::styled("   Average per purchase: ", label),
            Span::raw(average),
        ]),
    ])
    .block(
        Block::default()
            .title(format!("< {} >", report.subcategory))
            .borders(Borders::ALL),
    );
    frame.render_widget(summary, chunks[0]);

    let per_project: Vec<Spans> = report
        .by_project
        .iter()
        .map(|(name, quantity, value)| Spans::from(format!("{:<24} qty {:>10}  {}", name, quantity, money(value))))
        .collect();
    let per_project = Paragraph::new(per_project)
        .block(Block::default().title("By project").borders(Borders::ALL));
    frame.render_widget(per_project, chunks[1]);

    let history: Vec<ListItem> = report
        .purchases
        .iter()
        .map(|p| {
            let unit = p.unit_price().map(|u| money(&u)).unwrap_or_else(|| "-".to_string());
            ListItem::new(format!(
                "{}  {:<16} {:<24} qty {:>8}  {:>14}  unit {}",
                p.date.format(DISPLAY_FORMAT),
                p.project,
                p.item,
                p.quantity,
                money(&p.value),
                unit
            ))
        })
        .collect();
    let history = List::new(history).block(Block::default().title("History").borders(Borders::ALL));
    frame.render_widget(history, chunks[2]);

    let buttons = Paragraph::new("<Left/Right> Subcategory | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);
}

pub fn handle_input(state: &mut MaterialsState) -> Result<Option<MaterialsAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(MaterialsAction::Back)),
            KeyCode::Right | KeyCode::Tab => state.next_subcategory(),
            KeyCode::Left => state.previous_subcategory(),
            _ => {}
        }
    }
    Ok(None)
}
