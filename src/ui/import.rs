use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::import::{ImportSession, ImportStep};
use crate::ledger::parse_decimal;
use crate::models::{Category, Item, ProjectForm};
use crate::reports::money;
use crate::ui::components::date_input::DISPLAY_FORMAT;
use crate::ui::components::item_grid::{render_item_grid, total_line, ItemGridState};
use crate::ui::components::popup::{render_error, render_message};
use crate::ui::project_wizard::{
    self, render_project_wizard, ProjectWizardAction, ProjectWizardState,
};

pub enum ImportAction {
    Submit,
    ProceedOnboarding,
    Cancel,
    SubmitProject(ProjectForm),
    ConfirmSelection,
    SubmitItems(Vec<Item>),
    Close,
}

// Columns of the classification grid the user fills in
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GridColumn {
    Project,
    Category,
    Description,
}

impl GridColumn {
    fn next(self) -> Self {
        match self {
            GridColumn::Project => GridColumn::Category,
            GridColumn::Category => GridColumn::Description,
            GridColumn::Description => GridColumn::Project,
        }
    }

    fn previous(self) -> Self {
        match self {
            GridColumn::Project => GridColumn::Description,
            GridColumn::Category => GridColumn::Project,
            GridColumn::Description => GridColumn::Category,
        }
    }
}

/// UI state wrapped around one statement import.
pub struct ImportState {
    pub session: ImportSession,
    source: String,
    today: NaiveDate,
    row: usize,
    column: GridColumn,
    /// Text being typed into the current cell or quantity.
    input: Option<String>,
    confirm_cancel: bool,
    project_wizard: Option<ProjectWizardState>,
    item_grid: ItemGridState,
    detail_remaining: usize,
    pub error: Option<String>,
}

impl ImportState {
    pub fn new(session: ImportSession, source: String, today: NaiveDate) -> Self {
        let item_grid = ItemGridState::new(session.subcategories().to_vec());
        Self {
            session,
            source,
            today,
            row: 0,
            column: GridColumn::Project,
            input: None,
            confirm_cancel: false,
            project_wizard: None,
            item_grid,
            detail_remaining: 0,
            error: None,
        }
    }

    pub fn step(&self) -> ImportStep {
        self.session.step()
    }

    /// Shows a workflow error where the user is looking.
    pub fn show_error(&mut self, message: String) {
        match (&mut self.project_wizard, self.session.step()) {
            (Some(wizard), ImportStep::Onboarding) => wizard.error = Some(message),
            _ => self.error = Some(message),
        }
    }

    /// Rebuilds the per-step UI pieces after the session moved.
    pub fn sync(&mut self) {
        self.input = None;
        self.confirm_cancel = false;

        match self.session.step() {
            ImportStep::Onboarding => {
                let Some(flow) = self.session.onboarding() else {
                    return;
                };
                let current = flow.current().map(str::to_string);
                let stale = match (&self.project_wizard, &current) {
                    (Some(wizard), Some(name)) => wizard.name() != name,
                    (None, Some(_)) => true,
                    _ => false,
                };
                if stale {
                    let position = flow.created().len() + 1;
                    let total = flow.created().len() + flow.pending().count();
                    if let Some(form) = self.session.onboarding_form(self.today) {
                        self.project_wizard = Some(ProjectWizardState::for_onboarding(
                            form,
                            format!("{} of {}", position, total),
                        ));
                    }
                }
            }
            ImportStep::SelectMaterial => {
                self.project_wizard = None;
                self.row = 0;
            }
            ImportStep::DetailMaterial => {
                self.project_wizard = None;
                let remaining = self.session.detailing().map(|f| f.remaining()).unwrap_or(0);
                if remaining != self.detail_remaining {
                    self.detail_remaining = remaining;
                    self.item_grid = ItemGridState::new(self.session.subcategories().to_vec());
                }
            }
            _ => {
                self.project_wizard = None;
            }
        }
    }

    fn row_count(&self) -> usize {
        match self.session.step() {
            ImportStep::SelectMaterial => self.session.detailing().map(|f| f.selection().len()).unwrap_or(0),
            _ => self.session.grid().len(),
        }
    }

    fn next_row(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.row = (self.row + 1) % len;
        }
    }

    fn previous_row(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.row = (self.row + len - 1) % len;
        }
    }

    fn cycle_category(&mut self, forward: bool) {
        let current = self.session.grid().rows().get(self.row).and_then(|r| r.category);
        let next = match (current, forward) {
            (None, true) => Some(Category::Deposit),
            (None, false) => Some(Category::Other),
            (Some(Category::Other), true) | (Some(Category::Deposit), false) => None,
            (Some(category), true) => Some(category.next()),
            (Some(category), false) => Some(category.previous()),
        };
        self.session.grid_mut().set_category(self.row, next);
    }

    fn start_cell_edit(&mut self) {
        let Some(row) = self.session.grid().rows().get(self.row) else {
            return;
        };
        self.input = match self.column {
            GridColumn::Project => Some(row.project.clone()),
            GridColumn::Description => Some(row.description.clone()),
            GridColumn::Category => None,
        };
    }

    fn commit_cell_edit(&mut self) {
        if let Some(value) = self.input.take() {
            let grid = self.session.grid_mut();
            match self.column {
                GridColumn::Project => grid.set_project(self.row, &value),
                GridColumn::Description => grid.set_description(self.row, &value),
                GridColumn::Category => {}
            }
        }
    }

    fn commit_quantity(&mut self) {
        let Some(value) = self.input.take() else {
            return;
        };
        let quantity = if value.trim().is_empty() {
            None
        } else {
            match parse_decimal(&value) {
                Some(quantity) => Some(quantity),
                None => {
                    self.error = Some(format!("Invalid quantity: '{}'", value.trim()));
                    return;
                }
            }
        };
        if let Some(flow) = self.session.detailing_mut() {
            flow.set_quantity(self.row, quantity);
        }
    }
}

pub fn render_import<B: Backend>(frame: &mut Frame<B>, state: &mut ImportState) {
    let size = frame.size();

    if state.step() == ImportStep::Onboarding {
        if let Some(wizard) = &mut state.project_wizard {
            render_project_wizard(frame, wizard);
            return;
        }
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let title = match state.step() {
        ImportStep::Classify | ImportStep::ConfirmOnboarding => "Classify statement rows",
        ImportStep::Onboarding => "Register new projects",
        ImportStep::SelectMaterial => "Material entries: detail now or save with a quantity",
        ImportStep::DetailMaterial => "Material items",
        ImportStep::Finished => "Import finished",
        ImportStep::Cancelled => "Import cancelled",
    };
    let header = Paragraph::new(Spans::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan)),
        Span::raw(format!("  ({})", state.source)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    match state.step() {
        ImportStep::SelectMaterial => render_selection(frame, state, chunks[1]),
        ImportStep::DetailMaterial => render_detail(frame, state, chunks[1]),
        _ => render_grid(frame, state, chunks[1]),
    }

    let help_text = match state.step() {
        ImportStep::Classify if state.input.is_some() => "Enter - Save cell | Esc - Discard",
        ImportStep::Classify => {
            "Up/Down - Row | Left/Right - Column | Enter - Edit | Space - Category | S - Submit | Esc - Cancel import"
        }
        ImportStep::SelectMaterial if state.input.is_some() => "Enter - Save quantity | Esc - Discard",
        ImportStep::SelectMaterial => {
            "Up/Down - Row | Space - Detail now | Enter - Quantity | S - Confirm | Esc - Cancel import"
        }
        ImportStep::DetailMaterial if state.item_grid.is_editing() => state.item_grid.help_text(),
        ImportStep::DetailMaterial => {
            "A - Add item | E - Edit | D - Delete | S - Save items | Esc - Cancel import"
        }
        _ => "",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[2]);

    match state.step() {
        ImportStep::ConfirmOnboarding => {
            let names: Vec<String> = state
                .session
                .onboarding()
                .map(|flow| flow.pending().map(str::to_string).collect())
                .unwrap_or_default();
            let mut lines = vec![
                Spans::from(""),
                Spans::from("These projects are not registered yet:"),
            ];
            lines.extend(names.into_iter().map(|name| Spans::from(format!("  - {}", name))));
            lines.push(Spans::from(""));
            lines.push(Spans::from("Nothing was saved. Register them now and continue?"));
            lines.push(Spans::from(""));
            lines.push(Spans::from("<Y> Register  <N> Cancel import"));
            render_message(frame, size, "Unknown projects", lines);
        }
        ImportStep::Finished | ImportStep::Cancelled => {
            let mut lines = vec![Spans::from("")];
            if state.step() == ImportStep::Cancelled {
                lines.push(Spans::from("Rows not saved yet were discarded."));
            }
            lines.extend(
                state
                    .session
                    .reports()
                    .iter()
                    .map(|report| Spans::from(report.message())),
            );
            lines.push(Spans::from(format!("New entries in total: {}", state.session.total_inserted())));
            lines.push(Spans::from(""));
            lines.push(Spans::from("Press any key to return"));
            render_message(frame, size, title, lines);
        }
        _ => {}
    }

    if state.confirm_cancel {
        render_message(
            frame,
            size,
            "Cancel import",
            vec![
                Spans::from(""),
                Spans::from("Discard the rows that were not saved yet?"),
                Spans::from(""),
                Spans::from("<Y> Yes  <N> No"),
            ],
        );
    }
    if let Some(error) = &state.error {
        render_error(frame, size, error);
    }
}

fn render_grid<B: Backend>(frame: &mut Frame<B>, state: &mut ImportState, area: Rect) {
    let selected = Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD);

    let rows: Vec<Row> = state
        .session
        .grid()
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut project = row.project.clone();
            let mut description = row.description.clone();
            if i == state.row {
                if let Some(input) = &state.input {
                    match state.column {
                        GridColumn::Project => project = format!("{}|", input),
                        GridColumn::Description => description = format!("{}|", input),
                        GridColumn::Category => {}
                    }
                }
            }
            let category = row.category.map(|c| c.as_str()).unwrap_or("-").to_string();

            let cell = |text: String, column: GridColumn| {
                if i == state.row && column == state.column {
                    Cell::from(text).style(selected)
                } else {
                    Cell::from(text)
                }
            };

            let style = if row.is_complete() {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(row.date.format(DISPLAY_FORMAT).to_string()),
                Cell::from(row.detail.clone()),
                Cell::from(money(&row.amount)),
                cell(project, GridColumn::Project),
                cell(category, GridColumn::Category),
                cell(description, GridColumn::Description),
            ])
            .style(style)
        })
        .collect();

    let complete = state.session.grid().rows().iter().filter(|r| r.is_complete()).count();
    let table = Table::new(rows)
        .header(
            Row::new(vec!["Date", "Detail", "Amount", "Project", "Category", "Description"])
                .style(Style::default().fg(Color::Yellow)),
        )
        .block(
            Block::default()
                .title(format!("Rows: {} ({} ready to submit)", state.session.grid().len(), complete))
                .borders(Borders::ALL),
        )
        .widths(&[
            Constraint::Length(10),
            Constraint::Percentage(25),
            Constraint::Length(14),
            Constraint::Percentage(18),
            Constraint::Length(9),
            Constraint::Percentage(30),
        ]);

    let mut table_state = TableState::default();
    if !state.session.grid().is_empty() {
        table_state.select(Some(state.row));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_selection<B: Backend>(frame: &mut Frame<B>, state: &mut ImportState, area: Rect) {
    let Some(flow) = state.session.detailing() else {
        return;
    };

    let rows: Vec<Row> = flow
        .selection()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let quantity = match (&state.input, i == state.row) {
                (Some(input), true) => format!("{}|", input),
                _ => row.quantity.as_ref().map(|q| q.to_string()).unwrap_or_else(|| "-".to_string()),
            };
            Row::new(vec![
                Cell::from(if row.detail_now { "[x]" } else { "[ ]" }),
                Cell::from(row.material.date.format(DISPLAY_FORMAT).to_string()),
                Cell::from(row.material.detail.clone()),
                Cell::from(row.material.project_name.clone()),
                Cell::from(money(&row.material.amount)),
                Cell::from(quantity),
            ])
        })
        .collect();

    let table = Table::new(rows)
        .header(
            Row::new(vec!["Detail", "Date", "Statement", "Project", "Amount", "Quantity"])
                .style(Style::default().fg(Color::Yellow)),
        )
        .block(
            Block::default()
                .title("Mark the entries to itemize; the others need a quantity")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .widths(&[
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Percentage(35),
            Constraint::Percentage(20),
            Constraint::Length(14),
            Constraint::Length(10),
        ]);

    let mut table_state = TableState::default();
    table_state.select(Some(state.row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_detail<B: Backend>(frame: &mut Frame<B>, state: &mut ImportState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(area);

    let Some(current) = state.session.detailing().and_then(|f| f.current()).cloned() else {
        return;
    };

    let label = Style::default().fg(Color::Yellow);
    let info = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled("Entry: ", label),
            Span::raw(format!("{} ({})", current.detail, current.date.format(DISPLAY_FORMAT))),
            Span::styled("  Project: ", label),
            Span::raw(current.project_name.clone()),
        ]),
        Spans::from(vec![
            Span::styled("Total: ", label),
            Span::raw(money(&current.amount)),
            Span::styled("  Remaining entries: ", label),
            Span::raw(state.detail_remaining.to_string()),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(info, chunks[0]);

    render_item_grid(frame, &mut state.item_grid, chunks[1], "Items", true);
    frame.render_widget(Paragraph::new(total_line(&state.item_grid, Some(&current.amount))), chunks[2]);
}

pub fn handle_input(state: &mut ImportState) -> Result<Option<ImportAction>> {
    if state.step() == ImportStep::Onboarding {
        if let Some(wizard) = &mut state.project_wizard {
            return Ok(match project_wizard::handle_input(wizard)? {
                Some(ProjectWizardAction::Save(form)) => Some(ImportAction::SubmitProject(form)),
                Some(ProjectWizardAction::Cancel) => Some(ImportAction::Cancel),
                None => None,
            });
        }
    }

    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };

    if state.error.take().is_some() {
        return Ok(None);
    }

    if state.confirm_cancel {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                state.confirm_cancel = false;
                return Ok(Some(ImportAction::Cancel));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.confirm_cancel = false,
            _ => {}
        }
        return Ok(None);
    }

    let action = match state.step() {
        ImportStep::Classify => handle_classify(state, key.code),
        ImportStep::ConfirmOnboarding => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(ImportAction::ProceedOnboarding),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(ImportAction::Cancel),
            _ => None,
        },
        ImportStep::Onboarding => None,
        ImportStep::SelectMaterial => handle_selection(state, key.code),
        ImportStep::DetailMaterial => handle_detail(state, key.code),
        ImportStep::Finished | ImportStep::Cancelled => Some(ImportAction::Close),
    };

    Ok(action)
}

fn handle_classify(state: &mut ImportState, key: KeyCode) -> Option<ImportAction> {
    if let Some(input) = &mut state.input {
        match key {
            KeyCode::Enter => state.commit_cell_edit(),
            KeyCode::Esc => state.input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('s') | KeyCode::Char('S') => {
            if state.session.has_submittable_rows() {
                return Some(ImportAction::Submit);
            }
            state.error = Some("Fill in project, category and description for at least one row.".to_string());
        }
        KeyCode::Esc => state.confirm_cancel = true,
        KeyCode::Down => state.next_row(),
        KeyCode::Up => state.previous_row(),
        KeyCode::Right | KeyCode::Tab => state.column = state.column.next(),
        KeyCode::Left | KeyCode::BackTab => state.column = state.column.previous(),
        KeyCode::Char(' ') if state.column == GridColumn::Category => state.cycle_category(true),
        KeyCode::Char('-') if state.column == GridColumn::Category => state.cycle_category(false),
        KeyCode::Backspace | KeyCode::Delete if state.column == GridColumn::Category => {
            let row = state.row;
            state.session.grid_mut().set_category(row, None);
        }
        KeyCode::Enter => state.start_cell_edit(),
        _ => {}
    }
    None
}

fn handle_selection(state: &mut ImportState, key: KeyCode) -> Option<ImportAction> {
    if let Some(input) = &mut state.input {
        match key {
            KeyCode::Enter => state.commit_quantity(),
            KeyCode::Esc => state.input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == ',' || c == '.' => input.push(c),
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('s') | KeyCode::Char('S') => return Some(ImportAction::ConfirmSelection),
        KeyCode::Esc => state.confirm_cancel = true,
        KeyCode::Down => state.next_row(),
        KeyCode::Up => state.previous_row(),
        KeyCode::Char(' ') => {
            let row = state.row;
            if let Some(flow) = state.session.detailing_mut() {
                flow.toggle(row);
            }
        }
        KeyCode::Enter => {
            let current = state
                .session
                .detailing()
                .and_then(|f| f.selection().get(state.row))
                .map(|r| r.quantity.as_ref().map(|q| q.to_string()).unwrap_or_default());
            state.input = current;
        }
        _ => {}
    }
    None
}

fn handle_detail(state: &mut ImportState, key: KeyCode) -> Option<ImportAction> {
    let grid = &mut state.item_grid;
    if grid.is_editing() {
        match key {
            KeyCode::Enter | KeyCode::Tab => grid.next_field_in_row(),
            KeyCode::Esc => grid.cancel_editing(),
            _ => grid.handle_key(key),
        }
        return None;
    }

    match key {
        KeyCode::Char('a') => grid.add_row(),
        KeyCode::Char('e') => grid.edit_selected(),
        KeyCode::Char('d') => grid.delete_selected(),
        KeyCode::Up => grid.previous(),
        KeyCode::Down => grid.next(),
        KeyCode::Char('s') | KeyCode::Char('S') => match grid.to_items() {
            Ok(items) => return Some(ImportAction::SubmitItems(items)),
            Err(err) => state.error = Some(err.to_string()),
        },
        KeyCode::Esc => state.confirm_cancel = true,
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::models::CandidateRow;

    fn state() -> ImportState {
        let row = CandidateRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            detail: "PIX LOJA".to_string(),
            amount: BigDecimal::from(50),
            project: String::new(),
            category: None,
            description: String::new(),
        };
        let session = ImportSession::new(vec![row], &[], vec!["General".to_string()]);
        ImportState::new(session, "extrato.csv".to_string(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn cells_are_edited_in_place() {
        let mut state = state();

        handle_classify(&mut state, KeyCode::Enter);
        for c in "pituba".chars() {
            handle_classify(&mut state, KeyCode::Char(c));
        }
        handle_classify(&mut state, KeyCode::Enter);

        handle_classify(&mut state, KeyCode::Right);
        handle_classify(&mut state, KeyCode::Char(' '));
        handle_classify(&mut state, KeyCode::Char(' '));

        handle_classify(&mut state, KeyCode::Right);
        handle_classify(&mut state, KeyCode::Enter);
        for c in "pedreiro".chars() {
            handle_classify(&mut state, KeyCode::Char(c));
        }
        handle_classify(&mut state, KeyCode::Enter);

        let row = &state.session.grid().rows()[0];
        assert_eq!(row.project, "pituba");
        assert_eq!(row.category, Some(Category::Labor));
        assert_eq!(row.description, "pedreiro");
        assert!(state.session.has_submittable_rows());
    }

    #[test]
    fn submit_needs_a_complete_row() {
        let mut state = state();
        assert!(handle_classify(&mut state, KeyCode::Char('s')).is_none());
        assert!(state.error.is_some());
    }

    #[test]
    fn category_cycle_wraps_to_unset() {
        let mut state = state();
        state.column = GridColumn::Category;
        state.cycle_category(false);
        assert_eq!(state.session.grid().rows()[0].category, Some(Category::Other));
        state.cycle_category(true);
        assert_eq!(state.session.grid().rows()[0].category, None);
    }
}
