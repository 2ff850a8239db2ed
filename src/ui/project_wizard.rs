use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::ProjectForm;
use crate::ui::components::date_input::{DateInputState, DISPLAY_FORMAT};
use crate::ui::components::popup::render_error;

pub enum ProjectWizardAction {
    Cancel,
    Save(ProjectForm),
}

#[derive(Clone, PartialEq, Copy)]
pub enum ProjectField {
    Name,
    Address,
    ClientName,
    ClientTaxId,
    Budget,
    StartDate,
    EndDate,
}

const FIELDS: [ProjectField; 7] = [
    ProjectField::Name,
    ProjectField::Address,
    ProjectField::ClientName,
    ProjectField::ClientTaxId,
    ProjectField::Budget,
    ProjectField::StartDate,
    ProjectField::EndDate,
];

pub struct ProjectWizardState {
    pub form: ProjectForm,
    pub current_field: ProjectField,
    pub editing: bool,
    pub start_date_state: DateInputState,
    pub end_date_state: DateInputState,
    /// Onboarding fixes the name to the one found in the statement.
    name_locked: bool,
    /// Shown above the form during onboarding, e.g. "Project 1 of 2".
    subtitle: Option<String>,
    pub error: Option<String>,
}

impl ProjectWizardState {
    pub fn new(form: ProjectForm) -> Self {
        Self {
            start_date_state: DateInputState::new(form.start_date),
            end_date_state: DateInputState::new(form.end_date),
            form,
            current_field: ProjectField::Name,
            editing: false,
            name_locked: false,
            subtitle: None,
            error: None,
        }
    }

    pub fn for_onboarding(form: ProjectForm, subtitle: String) -> Self {
        let mut state = Self::new(form);
        state.name_locked = true;
        state.current_field = ProjectField::Address;
        state.subtitle = Some(subtitle);
        state
    }

    pub fn name(&self) -> &str {
        &self.form.name
    }

    pub fn toggle_editing(&mut self) {
        if !self.editing && self.current_field == ProjectField::Name && self.name_locked {
            return;
        }

        self.editing = !self.editing;
        if self.editing {
            match self.current_field {
                ProjectField::StartDate => self.start_date_state.toggle_editing(),
                ProjectField::EndDate => self.end_date_state.toggle_editing(),
                _ => {}
            }
        } else {
            self.start_date_state.editing = false;
            self.end_date_state.editing = false;
        }
    }

    fn field_index(&self) -> usize {
        FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.field_index() + 1) % FIELDS.len()];
        if self.name_locked && self.current_field == ProjectField::Name {
            self.next_field();
        }
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.field_index() + FIELDS.len() - 1) % FIELDS.len()];
        if self.name_locked && self.current_field == ProjectField::Name {
            self.previous_field();
        }
    }

    fn text_field(&mut self) -> Option<&mut String> {
        match self.current_field {
            ProjectField::Name => Some(&mut self.form.name),
            ProjectField::Address => Some(&mut self.form.address),
            ProjectField::ClientName => Some(&mut self.form.client_name),
            ProjectField::ClientTaxId => Some(&mut self.form.client_tax_id),
            ProjectField::Budget => Some(&mut self.form.budget),
            ProjectField::StartDate | ProjectField::EndDate => None,
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ProjectField::StartDate => {
                self.start_date_state.handle_input(key);
                self.form.start_date = self.start_date_state.date;
            }
            ProjectField::EndDate => {
                self.end_date_state.handle_input(key);
                self.form.end_date = self.end_date_state.date;
            }
            field => {
                let accepts = |c: char| match field {
                    ProjectField::ClientTaxId => c.is_ascii_digit(),
                    ProjectField::Budget => c.is_ascii_digit() || c == ',' || c == '.',
                    _ => true,
                };
                if let Some(value) = self.text_field() {
                    match key {
                        KeyCode::Char(c) if accepts(c) => {
                            value.push(c);
                        }
                        KeyCode::Backspace => {
                            value.pop();
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

pub fn render_project_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ProjectWizardState) {
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
        .split(f.size());

    let title_text = match &state.subtitle {
        Some(subtitle) => format!("New project found in the statement ({})", subtitle),
        None => "Project Registration".to_string(),
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = if state.editing {
        match state.current_field {
            ProjectField::StartDate | ProjectField::EndDate => {
                "Enter - Save field | Left/Right - Switch date part | Esc - Cancel editing"
            }
            _ => "Enter - Save field | Esc - Cancel editing",
        }
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save project | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if let Some(error) = &state.error {
        let size = f.size();
        render_error(f, size, error);
    }
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ProjectWizardState, area: Rect) {
    let field_names = [
        "Name",
        "Address",
        "Client",
        "Client Tax Id (11 digits)",
        "Budget (R$)",
        "Start Date",
        "End Date",
    ];

    let field_values = [
        state.form.name.clone(),
        state.form.address.clone(),
        state.form.client_name.clone(),
        state.form.client_tax_id.clone(),
        state.form.budget.clone(),
        state.form.start_date.format(DISPLAY_FORMAT).to_string(),
        state.form.end_date.format(DISPLAY_FORMAT).to_string(),
    ];

    let current = state.field_index();
    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let locked = i == 0 && state.name_locked;
            let content = if i == current && state.editing {
                let displayed_value = match FIELDS[i] {
                    ProjectField::StartDate => state.start_date_state.get_display_string(),
                    ProjectField::EndDate => state.end_date_state.get_display_string(),
                    _ => format!("{}|", value),
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), Style::default().fg(Color::Yellow)),
                    Span::styled(displayed_value, Style::default().add_modifier(Modifier::BOLD)),
                ])
            } else {
                let style = if i == current {
                    Style::default().fg(Color::Yellow)
                } else if locked {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), style),
                    Span::raw(value.clone()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Project Details"))
        .highlight_style(Style::default().fg(Color::Yellow));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ProjectWizardState) -> Result<Option<ProjectWizardAction>> {
    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };

    if state.error.take().is_some() {
        return Ok(None);
    }

    match key.code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Ok(Some(ProjectWizardAction::Cancel));
            }
        }
        KeyCode::Enter => {
            state.toggle_editing();
        }
        KeyCode::Up if !state.editing => {
            state.previous_field();
        }
        KeyCode::Down | KeyCode::Tab if !state.editing => {
            state.next_field();
        }
        KeyCode::Char('s') | KeyCode::Char('S') if !state.editing => {
            return Ok(Some(ProjectWizardAction::Save(state.form.clone())));
        }
        _ if state.editing => {
            state.edit_current_field(key.code);
        }
        _ => {}
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn onboarding_keeps_the_name_read_only() {
        let mut state = ProjectWizardState::for_onboarding(ProjectForm::for_name("PITUBA", today()), "1 of 1".to_string());
        assert!(state.current_field == ProjectField::Address);

        state.previous_field();
        assert!(state.current_field == ProjectField::EndDate);

        state.next_field();
        assert!(state.current_field == ProjectField::Address);
    }

    #[test]
    fn tax_id_accepts_digits_only() {
        let mut state = ProjectWizardState::new(ProjectForm::new(today()));
        state.current_field = ProjectField::ClientTaxId;
        state.toggle_editing();
        for c in "123.ab4".chars() {
            state.edit_current_field(KeyCode::Char(c));
        }
        assert_eq!(state.form.client_tax_id, "1234");
    }
}
