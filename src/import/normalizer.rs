//! Turns an exported bank statement into candidate rows.
//!
//! Statements come as the bank's `.xlsx`/`.xls` workbook (first sheet) or as
//! delimited text. Expected header (any case, extra columns ignored):
//!   Data;Detalhes;Valor
//!   02/01/2024;PIX RECEBIDO CLIENTE;15.000,00
//!   03/01/2024;BOLETO MATERIAIS;-1.234,56

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{ObrasError, Result};
use crate::models::{CandidateRow, Category};

const DATE_COLUMNS: [&str; 2] = ["date", "data"];
const DETAIL_COLUMNS: [&str; 3] = ["detail", "details", "detalhes"];
const AMOUNT_COLUMNS: [&str; 2] = ["amount", "valor"];

struct Columns {
    date: usize,
    detail: usize,
    amount: usize,
}

/// A statement line as text cells, with its 1-based line number.
struct RawRecord {
    line: u64,
    cells: Vec<String>,
}

/// Opens a statement file, picking the reader from its extension.
pub fn read_statement(path: &Path) -> Result<Vec<CandidateRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => parse_workbook(path),
        "csv" | "txt" => parse_statement(File::open(path)?),
        other => Err(ObrasError::format(format!(
            "unsupported file type '.{other}'; use .xlsx or .csv"
        ))),
    }
}

/// Reads the first sheet of a workbook.
pub fn parse_workbook(path: &Path) -> Result<Vec<CandidateRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ObrasError::format(format!("could not open the workbook: {e}")))?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ObrasError::format("the workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| ObrasError::format(format!("could not read sheet '{first_sheet}': {e}")))?;

    let first_line = range.start().map(|(row, _)| u64::from(row) + 1).unwrap_or(1);
    let mut rows = range.rows().zip(first_line..).map(|(row, line)| RawRecord {
        line,
        cells: row.iter().map(cell_text).collect(),
    });

    let headers = rows.next().map(|r| r.cells).unwrap_or_default();
    normalize(&headers, rows)
}

/// Cell contents in the same textual form a delimited export would carry.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => value.format("%d/%m/%Y").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(iso) => iso.split('T').next().unwrap_or_default().to_string(),
        // the amount parser reads dots as thousand separators
        Data::Float(value) => value.to_string().replace('.', ","),
        other => other.to_string(),
    }
}

/// Reads a delimited statement; `;` or `,` is picked from the header line.
pub fn parse_statement<R: Read>(mut reader: R) -> Result<Vec<CandidateRow>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let text = text.trim_start_matches('\u{feff}');

    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record?;
        records.push(RawRecord {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            cells: record.iter().map(str::to_string).collect(),
        });
    }

    normalize(&headers, records.into_iter())
}

fn normalize(headers: &[String], records: impl Iterator<Item = RawRecord>) -> Result<Vec<CandidateRow>> {
    let columns = locate_columns(headers)?;

    let mut rows = Vec::new();
    for record in records {
        let line = record.line;
        let cell = |i: usize| record.cells.get(i).map(String::as_str).unwrap_or_default();

        let detail = cell(columns.detail);
        if detail.trim().is_empty() {
            // separator rows
            continue;
        }

        let raw_date = cell(columns.date);
        let date = parse_date(raw_date).ok_or_else(|| {
            ObrasError::format(format!("line {line}: invalid date '{}'", raw_date.trim()))
        })?;

        let raw_amount = cell(columns.amount);
        let signed = parse_amount(raw_amount).ok_or_else(|| {
            ObrasError::format(format!("line {line}: invalid amount '{}'", raw_amount.trim()))
        })?;

        let category = if signed > BigDecimal::from(0) {
            Some(Category::Deposit)
        } else {
            None
        };

        rows.push(CandidateRow {
            date,
            detail: detail.trim().to_string(),
            amount: signed.abs(),
            project: String::new(),
            category,
            description: String::new(),
        });
    }

    debug!(rows = rows.len(), "Statement normalized");

    Ok(rows)
}

fn locate_columns(headers: &[String]) -> Result<Columns> {
    let find = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
    };

    match (find(&DATE_COLUMNS), find(&DETAIL_COLUMNS), find(&AMOUNT_COLUMNS)) {
        (Some(date), Some(detail), Some(amount)) => Ok(Columns {
            date,
            detail,
            amount,
        }),
        _ => Err(ObrasError::format(format!(
            "the file needs the columns Date, Detail and Amount; found {headers:?}"
        ))),
    }
}

/// Parses `1.234,56` style amounts: dots group thousands, the comma is the decimal mark.
/// Amounts with more than two decimal places are rejected.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned)
        .ok()
        .filter(|value| value.with_scale(2) == *value)
}

/// Day-first dates (`31/01/2024`, `31-01-24`); ISO dates are accepted as well.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return None;
    }

    if parts[0].len() == 4 {
        let year = parts[0].parse().ok()?;
        let month = parts[1].parse().ok()?;
        let day = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let day = parts[0].parse().ok()?;
    let month = parts[1].parse().ok()?;
    let year: i32 = match parts[2].len() {
        2 => 2000 + parts[2].parse::<i32>().ok()?,
        4 => parts[2].parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
