use bigdecimal::BigDecimal;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::error::{ObrasError, Result};
use crate::ledger::parse_decimal;
use crate::models::{Item, items_total};
use crate::reports::money;

// Represents a field being edited in an item row
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ItemField {
    Name,
    Subcategory,
    Quantity,
    Value,
}

/// An item row as typed, before its numbers are parsed.
#[derive(Clone, Debug, Default)]
pub struct ItemDraft {
    pub name: String,
    pub subcategory: String,
    pub quantity: String,
    pub value: String,
}

impl ItemDraft {
    fn to_item(&self, row: usize) -> Result<Item> {
        let quantity = parse_decimal(&self.quantity)
            .ok_or_else(|| ObrasError::validation(format!("Item {}: invalid quantity '{}'", row, self.quantity)))?;
        let value = parse_decimal(&self.value)
            .ok_or_else(|| ObrasError::validation(format!("Item {}: invalid value '{}'", row, self.value)))?;

        Ok(Item {
            name: self.name.trim().to_string(),
            subcategory: self.subcategory.clone(),
            quantity,
            value,
        })
    }
}

/// Editable item table shared by manual material entries and statement detailing.
pub struct ItemGridState {
    pub rows: Vec<ItemDraft>,
    pub list_state: ListState,
    /// (index, field, current value)
    pub editing: Option<(usize, ItemField, String)>,
    subcategories: Vec<String>,
}

impl ItemGridState {
    pub fn new(subcategories: Vec<String>) -> Self {
        Self {
            rows: Vec::new(),
            list_state: ListState::default(),
            editing: None,
            subcategories,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn add_row(&mut self) {
        let subcategory = self.subcategories.first().cloned().unwrap_or_default();
        self.rows.push(ItemDraft {
            subcategory,
            ..ItemDraft::default()
        });
        let idx = self.rows.len() - 1;
        self.list_state.select(Some(idx));
        self.editing = Some((idx, ItemField::Name, String::new()));
    }

    pub fn edit_selected(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            if let Some(row) = self.rows.get(selected) {
                self.editing = Some((selected, ItemField::Name, row.name.clone()));
            }
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            if selected < self.rows.len() {
                self.rows.remove(selected);

                if self.rows.is_empty() {
                    self.list_state.select(None);
                } else {
                    self.list_state.select(Some(selected.min(self.rows.len() - 1)));
                }
                self.editing = None;
            }
        }
    }

    pub fn next(&mut self) {
        let len = self.rows.len();
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
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Stores the field being edited and moves to the next one.
    pub fn next_field_in_row(&mut self) {
        let Some((idx, field, value)) = self.editing.take() else {
            return;
        };
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };

        self.editing = match field {
            ItemField::Name => {
                row.name = value;
                Some((idx, ItemField::Subcategory, row.subcategory.clone()))
            }
            ItemField::Subcategory => {
                row.subcategory = value;
                Some((idx, ItemField::Quantity, row.quantity.clone()))
            }
            ItemField::Quantity => {
                row.quantity = value;
                Some((idx, ItemField::Value, row.value.clone()))
            }
            ItemField::Value => {
                row.value = value;
                None
            }
        };
    }

    pub fn cancel_editing(&mut self) {
        self.editing = None;
    }

    /// Keys for the field being edited. Subcategories are picked from the list, not typed.
    pub fn handle_key(&mut self, key: KeyCode) {
        let subcategories = &self.subcategories;
        let Some((_, field, value)) = &mut self.editing else {
            return;
        };

        match (*field, key) {
            (ItemField::Subcategory, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                if subcategories.is_empty() {
                    return;
                }
                let pos = subcategories.iter().position(|s| s == value).unwrap_or(0);
                let next = if key == KeyCode::Left {
                    (pos + subcategories.len() - 1) % subcategories.len()
                } else {
                    (pos + 1) % subcategories.len()
                };
                *value = subcategories[next].clone();
            }
            (ItemField::Subcategory, _) => {}
            (ItemField::Quantity | ItemField::Value, KeyCode::Char(c)) if c.is_ascii_digit() || c == ',' || c == '.' => {
                value.push(c);
            }
            (ItemField::Name, KeyCode::Char(c)) => {
                value.push(c);
            }
            (_, KeyCode::Backspace) => {
                value.pop();
            }
            _ => {}
        }
    }

    /// Sum of the values typed so far; unparsable values count as zero.
    pub fn running_total(&self) -> BigDecimal {
        self.rows
            .iter()
            .filter_map(|row| parse_decimal(&row.value))
            .fold(BigDecimal::from(0), |acc, value| acc + value)
    }

    pub fn to_items(&self) -> Result<Vec<Item>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| row.to_item(i + 1))
            .collect()
    }

    pub fn help_text(&self) -> &'static str {
        match self.editing {
            Some((_, ItemField::Subcategory, _)) => "Left/Right - Choose subcategory | Enter - Next field | Esc - Stop editing",
            Some(_) => "Enter/Tab - Next field | Esc - Stop editing",
            None => "A - Add item | E - Edit selected | D - Delete selected | Up/Down - Select",
        }
    }
}

pub fn render_item_grid<B: Backend>(
    frame: &mut Frame<B>,
    state: &mut ItemGridState,
    area: Rect,
    title: &str,
    focused: bool,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });

    if let Some((idx, field, value)) = &state.editing {
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let edit_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(inner);

        let row = state.rows.get(*idx).cloned().unwrap_or_default();
        let fields = [
            (ItemField::Name, "Item", row.name),
            (ItemField::Subcategory, "Subcategory", row.subcategory),
            (ItemField::Quantity, "Quantity", row.quantity),
            (ItemField::Value, "Value (R$)", row.value),
        ];

        for (i, (kind, label, stored)) in fields.into_iter().enumerate() {
            let (shown, style) = if kind == *field {
                (
                    format!("{}|", value),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )
            } else {
                (stored, Style::default())
            };
            let paragraph = Paragraph::new(Spans::from(vec![
                Span::raw(format!("{}: ", label)),
                Span::styled(shown, style),
            ]))
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(paragraph, edit_chunks[i]);
        }
        return;
    }

    let mut items: Vec<ListItem> = state
        .rows
        .iter()
        .map(|row| {
            ListItem::new(format!(
                "{} [{}] qty {} = R$ {}",
                row.name, row.subcategory, row.quantity, row.value
            ))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No items added yet"));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));

    frame.render_stateful_widget(list, area, &mut state.list_state);
}

/// "Items R$ x of R$ y" line for a declared total.
pub fn total_line(state: &ItemGridState, declared: Option<&BigDecimal>) -> Spans<'static> {
    let total = match state.to_items() {
        Ok(items) => items_total(&items),
        Err(_) => state.running_total(),
    };

    match declared {
        Some(declared) => {
            let style = if &total == declared {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            Spans::from(vec![
                Span::raw("Items: "),
                Span::styled(money(&total), style),
                Span::raw(format!(" of {}", money(declared))),
            ])
        }
        None => Spans::from(format!("Items total: {}", money(&total))),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn type_text(grid: &mut ItemGridState, text: &str) {
        for c in text.chars() {
            grid.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn rows_are_entered_field_by_field() {
        let mut grid = ItemGridState::new(vec!["General".to_string(), "Painting".to_string()]);
        grid.add_row();
        type_text(&mut grid, "Tinta");
        grid.next_field_in_row();
        grid.handle_key(KeyCode::Right);
        grid.next_field_in_row();
        type_text(&mut grid, "2x");
        grid.next_field_in_row();
        type_text(&mut grid, "80,50");
        grid.next_field_in_row();

        assert!(!grid.is_editing());
        let items = grid.to_items().unwrap();
        assert_eq!(items[0].name, "Tinta");
        assert_eq!(items[0].subcategory, "Painting");
        assert_eq!(items[0].quantity, BigDecimal::from(2));
        assert_eq!(items[0].value, BigDecimal::from_str("80.50").unwrap());
    }

    #[test]
    fn unparsable_numbers_are_reported() {
        let mut grid = ItemGridState::new(vec!["General".to_string()]);
        grid.add_row();
        grid.cancel_editing();

        assert!(matches!(grid.to_items(), Err(ObrasError::Validation(_))));
        assert_eq!(grid.running_total(), BigDecimal::from(0));
    }

    #[test]
    fn deleting_keeps_a_valid_selection() {
        let mut grid = ItemGridState::new(vec![]);
        grid.add_row();
        grid.cancel_editing();
        grid.add_row();
        grid.cancel_editing();

        grid.delete_selected();
        assert_eq!(grid.list_state.selected(), Some(0));
        grid.delete_selected();
        assert_eq!(grid.list_state.selected(), None);
    }
}
