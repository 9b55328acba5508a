//! Workbook loading behind a small trait seam.
//!
//! [`SheetReader`] is the boundary between the cache and actual
//! spreadsheet parsing; [`XlsxReader`] is the calamine-backed
//! production implementation. Tests substitute an in-memory reader to
//! exercise cache behavior without real workbook files.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::data::{Cell, parse_naive_date, parse_naive_datetime};
use crate::table::Table;

pub trait SheetReader: Send + Sync {
    /// Names of every sheet in the workbook, in workbook order.
    fn sheet_names(&self, path: &Path) -> Result<Vec<String>>;

    /// Loads one sheet as a table; `None` selects the first sheet.
    /// The first row becomes the column headers.
    fn read_sheet(&self, path: &Path, sheet: Option<&str>) -> Result<Table>;
}

/// Reads `.xls*` workbooks via calamine, auto-detecting the format.
pub struct XlsxReader;

impl SheetReader for XlsxReader {
    fn sheet_names(&self, path: &Path) -> Result<Vec<String>> {
        let workbook =
            open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
        Ok(workbook.sheet_names().to_vec())
    }

    fn read_sheet(&self, path: &Path, sheet: Option<&str>) -> Result<Table> {
        let mut workbook =
            open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
        let name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("Workbook {path:?} has no sheets"))?,
        };
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Reading sheet '{name}' from {path:?}"))?;
        Ok(range_to_table(&range))
    }
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Table::default();
    };
    let columns: Vec<String> = header_row.iter().map(|c| convert_cell(c).as_display()).collect();
    let width = columns.len();

    let rows = rows_iter
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(width).map(convert_cell).collect();
            cells.resize(width, Cell::Empty);
            cells
        })
        .collect();

    Table::new(columns, rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // Serial values outside chrono's range keep their raw number
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_naive_datetime(s)
            .or_else(|| parse_naive_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#ERR({e:?})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_cell_maps_scalar_shapes() {
        assert_eq!(convert_cell(&Data::Empty), Cell::Empty);
        assert_eq!(
            convert_cell(&Data::String("Acme".to_string())),
            Cell::Text("Acme".to_string())
        );
        assert_eq!(convert_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(convert_cell(&Data::Float(1.25)), Cell::Number(1.25));
        assert_eq!(convert_cell(&Data::Bool(true)), Cell::Text("true".to_string()));
    }

    #[test]
    fn convert_cell_parses_iso_datetime_strings() {
        let cell = convert_cell(&Data::DateTimeIso("2024-05-06T14:30:00".to_string()));
        match cell {
            Cell::Date(dt) => assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-05-06 14:30"),
            other => panic!("Expected date cell, got {other:?}"),
        }
        assert_eq!(
            convert_cell(&Data::DateTimeIso("garbage".to_string())),
            Cell::Text("garbage".to_string())
        );
    }
}
