use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

/// Dates are shown and typed day first.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Day,
    Month,
    Year,
}

pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Day,
            current_date_input: String::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Day;
            self.current_date_input.clear();
        }
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Day => DatePart::Month,
            DatePart::Month => DatePart::Year,
            DatePart::Year => DatePart::Day,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Day => DatePart::Year,
            DatePart::Month => DatePart::Day,
            DatePart::Year => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.current_date_input.push(c);
                let wanted = match self.date_part {
                    DatePart::Year => 4,
                    DatePart::Day | DatePart::Month => 2,
                };
                if self.current_date_input.len() < wanted {
                    return;
                }

                if let Ok(value) = self.current_date_input.parse::<u32>() {
                    let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
                    let candidate = match self.date_part {
                        DatePart::Day => NaiveDate::from_ymd_opt(year, month, value),
                        DatePart::Month => NaiveDate::from_ymd_opt(year, value, day.min(days_in_month(year, value))),
                        DatePart::Year if (1900..=2100).contains(&value) => {
                            let year = value as i32;
                            NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
                        }
                        DatePart::Year => None,
                    };
                    if let Some(date) = candidate {
                        self.date = date;
                        self.next_date_part();
                    }
                }
                self.current_date_input.clear();
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    pub fn get_display_string(&self) -> String {
        let day = format!("{:02}", self.date.day());
        let month = format!("{:02}", self.date.month());
        let year = format!("{:04}", self.date.year());

        if !self.editing {
            return format!("{}/{}/{}", day, month, year);
        }

        let current_input = if self.current_date_input.is_empty() {
            match self.date_part {
                DatePart::Day => "[DD]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Year => "[YYYY]".to_string(),
            }
        } else {
            format!("[{}]", self.current_date_input)
        };

        match self.date_part {
            DatePart::Day => format!("{}{}/{}/{}", day, current_input, month, year),
            DatePart::Month => format!("{}/{}{}/{}", day, month, current_input, year),
            DatePart::Year => format!("{}/{}/{}{}", day, month, year, current_input),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_moves_through_day_month_year() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        state.toggle_editing();

        type_digits(&mut state, "31");
        type_digits(&mut state, "03");
        type_digits(&mut state, "2025");

        assert_eq!(state.date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[test]
    fn month_change_clamps_the_day() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        state.toggle_editing();
        state.next_date_part();

        type_digits(&mut state, "02");
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn invalid_day_is_ignored() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
        state.toggle_editing();

        type_digits(&mut state, "31");
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
        assert_eq!(state.date_part, DatePart::Day);
        assert_eq!(state.get_display_string(), "10[DD]/04/2024");
    }
}
