use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A single spreadsheet cell. The source workbooks are human-edited and
/// loosely typed, so every cell carries its own shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Cell::Date(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Best-effort `YYYY-MM-DD` rendering of a cell. Returns `None` when the
/// cell holds no recognizable date; callers fall back to the raw display
/// string, so a failed reformat is never fatal.
pub fn format_iso_date(cell: &Cell) -> Option<String> {
    let date = match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Text(s) => {
            let trimmed = s.trim();
            parse_naive_date(trimmed).or_else(|| parse_naive_datetime(trimmed).map(|dt| dt.date()))
        }
        _ => None,
    }?;
    Some(date.format("%Y-%m-%d").to_string())
}
