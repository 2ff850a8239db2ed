use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ledger::ManualEntryForm;
use crate::models::{Category, Project};
use crate::ui::components::date_input::{DateInputState, DISPLAY_FORMAT};
use crate::ui::components::item_grid::{render_item_grid, total_line, ItemGridState};
use crate::ui::components::popup::render_error;

// Represents a field in the entry form
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EntryField {
    Project,
    Category,
    Date,
    Description,
    Amount,
    Items,
}

pub enum EntryWizardAction {
    Cancel,
    Save(ManualEntryForm),
}

pub struct EntryWizardState {
    projects: Vec<Project>,
    project_index: usize,
    category: Category,
    date_state: DateInputState,
    description: String,
    amount: String,
    items: ItemGridState,
    current_field: EntryField,
    editing: bool,
    pub error: Option<String>,
}

impl EntryWizardState {
    pub fn new(projects: Vec<Project>, selected: Option<i32>, today: NaiveDate, subcategories: Vec<String>) -> Self {
        let project_index = selected
            .and_then(|id| projects.iter().position(|p| p.id == id))
            .unwrap_or(0);

        Self {
            projects,
            project_index,
            category: Category::Labor,
            date_state: DateInputState::new(today),
            description: String::new(),
            amount: String::new(),
            items: ItemGridState::new(subcategories),
            current_field: EntryField::Project,
            editing: false,
            error: None,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        self.projects.get(self.project_index)
    }

    /// Materials take their amount from the item table.
    fn fields(&self) -> Vec<EntryField> {
        let mut fields = vec![
            EntryField::Project,
            EntryField::Category,
            EntryField::Date,
            EntryField::Description,
        ];
        if self.category == Category::Material {
            fields.push(EntryField::Items);
        } else {
            fields.push(EntryField::Amount);
        }
        fields
    }

    pub fn next_field(&mut self) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = fields[(pos + 1) % fields.len()];
    }

    pub fn previous_field(&mut self) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.current_field == EntryField::Date {
            self.date_state.editing = false;
            if self.editing {
                self.date_state.toggle_editing();
            }
        }
        if !self.editing {
            self.items.cancel_editing();
        }
    }

    fn cycle(&mut self, forward: bool) {
        match self.current_field {
            EntryField::Project if !self.projects.is_empty() => {
                let len = self.projects.len();
                self.project_index = if forward {
                    (self.project_index + 1) % len
                } else {
                    (self.project_index + len - 1) % len
                };
            }
            EntryField::Category => {
                self.category = if forward { self.category.next() } else { self.category.previous() };
            }
            _ => {}
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            EntryField::Project | EntryField::Category => match key {
                KeyCode::Right | KeyCode::Char(' ') => self.cycle(true),
                KeyCode::Left => self.cycle(false),
                _ => {}
            },
            EntryField::Date => self.date_state.handle_input(key),
            EntryField::Description => match key {
                KeyCode::Char(c) => self.description.push(c),
                KeyCode::Backspace => {
                    self.description.pop();
                }
                _ => {}
            },
            EntryField::Amount => match key {
                KeyCode::Char(c) if c.is_ascii_digit() || c == ',' || c == '.' => self.amount.push(c),
                KeyCode::Backspace => {
                    self.amount.pop();
                }
                _ => {}
            },
            EntryField::Items => {
                if self.items.is_editing() {
                    match key {
                        KeyCode::Tab => self.items.next_field_in_row(),
                        _ => self.items.handle_key(key),
                    }
                } else {
                    match key {
                        KeyCode::Char('a') => self.items.add_row(),
                        KeyCode::Char('e') => self.items.edit_selected(),
                        KeyCode::Char('d') => self.items.delete_selected(),
                        KeyCode::Up => self.items.previous(),
                        KeyCode::Down => self.items.next(),
                        _ => {}
                    }
                }
            }
        }
    }

    pub fn to_form(&self) -> crate::error::Result<ManualEntryForm> {
        let project = self
            .project()
            .ok_or_else(|| crate::error::ObrasError::validation("Register a project first."))?;

        let mut form = ManualEntryForm::new(project.id, self.category, self.date_state.date);
        form.description = self.description.clone();
        form.amount = self.amount.clone();
        if self.category == Category::Material {
            form.items = self.items.to_items()?;
        }
        Ok(form)
    }
}

pub fn render_entry_wizard<B: Backend>(frame: &mut Frame<B>, state: &mut EntryWizardState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    let title = Paragraph::new("New Ledger Entry")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    render_form(frame, state, chunks[1]);

    let help_text = match (state.editing, state.current_field) {
        (false, _) => "Enter - Edit field | Up/Down - Navigate fields | S - Save entry | Esc - Cancel",
        (true, EntryField::Project | EntryField::Category) => "Left/Right - Choose | Enter - Done",
        (true, EntryField::Date) => "Enter - Save field | Left/Right - Switch date part | Esc - Cancel editing",
        (true, EntryField::Items) => state.items.help_text(),
        (true, _) => "Enter - Save field | Esc - Cancel editing",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[2]);

    if let Some(error) = &state.error {
        render_error(frame, size, error);
    }
}

fn field_style(state: &EntryWizardState, field: EntryField) -> Style {
    if state.current_field == field {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_form<B: Backend>(frame: &mut Frame<B>, state: &mut EntryWizardState, area: Rect) {
    let form_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
            ]
            .as_ref(),
        )
        .split(area);

    let editing = |field: EntryField| state.editing && state.current_field == field;

    let project = state.project().map(|p| p.name.clone()).unwrap_or_else(|| "(no projects)".to_string());
    let date = if editing(EntryField::Date) {
        state.date_state.get_display_string()
    } else {
        state.date_state.date.format(DISPLAY_FORMAT).to_string()
    };
    let description = if editing(EntryField::Description) {
        format!("{}|", state.description)
    } else {
        state.description.clone()
    };

    let rows = [
        ("Project: ", format!("< {} >", project), EntryField::Project),
        ("Category: ", format!("< {} >", state.category), EntryField::Category),
        ("Date: ", date, EntryField::Date),
        ("Description: ", description, EntryField::Description),
    ];
    for (i, (label, value, field)) in rows.into_iter().enumerate() {
        let paragraph = Paragraph::new(Spans::from(vec![
            Span::styled(label, field_style(state, field)),
            Span::raw(value),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, form_chunks[i]);
    }

    if state.category == Category::Material {
        let items_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
            .split(form_chunks[4]);

        let focused = state.current_field == EntryField::Items;
        render_item_grid(frame, &mut state.items, items_chunks[0], "Items", focused);
        frame.render_widget(Paragraph::new(total_line(&state.items, None)), items_chunks[1]);
    } else {
        let amount = if editing(EntryField::Amount) {
            format!("{}|", state.amount)
        } else {
            state.amount.clone()
        };
        let paragraph = Paragraph::new(Spans::from(vec![
            Span::styled("Amount (R$): ", field_style(state, EntryField::Amount)),
            Span::raw(amount),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, form_chunks[4]);
    }
}

pub fn handle_input(state: &mut EntryWizardState) -> Result<Option<EntryWizardAction>> {
    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };

    if state.error.take().is_some() {
        return Ok(None);
    }

    let in_item_row = state.editing && state.current_field == EntryField::Items && state.items.is_editing();

    match key.code {
        KeyCode::Esc if in_item_row => state.items.cancel_editing(),
        KeyCode::Enter if in_item_row => state.items.next_field_in_row(),
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Ok(Some(EntryWizardAction::Cancel));
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down | KeyCode::Tab if !state.editing => state.next_field(),
        KeyCode::Char('s') | KeyCode::Char('S') if !state.editing => match state.to_form() {
            Ok(form) => return Ok(Some(EntryWizardAction::Save(form))),
            Err(err) => state.error = Some(err.to_string()),
        },
        _ if state.editing => state.edit_current_field(key.code),
        _ => {}
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;

    fn project(id: i32, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            address: "Rua".to_string(),
            client_name: "Ana".to_string(),
            client_tax_id: "12345678901".to_string(),
            budget: BigDecimal::from(1000),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        }
    }

    #[test]
    fn material_swaps_amount_for_items() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut state = EntryWizardState::new(vec![project(1, "A"), project(2, "B")], Some(2), today, vec![]);
        assert_eq!(state.project().map(|p| p.id), Some(2));

        state.current_field = EntryField::Category;
        state.toggle_editing();
        state.edit_current_field(KeyCode::Right);
        state.toggle_editing();
        assert_eq!(state.category, Category::Material);

        state.current_field = EntryField::Description;
        state.next_field();
        assert_eq!(state.current_field, EntryField::Items);
    }

    #[test]
    fn form_requires_a_project() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let state = EntryWizardState::new(vec![], None, today, vec![]);
        assert!(state.to_form().is_err());
    }
}
