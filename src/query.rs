//! Query façade over the dataset cache.
//!
//! Every query triggers a lazy [`DatasetCache::load_all`] and then
//! filters or extracts from the loaded tables. An unmatched client
//! name and an unavailable dataset both come back as an empty
//! collection; callers decide how to surface that.

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;

use crate::cache::{DatasetCache, HISTORICAL, PREDICTIONS};
use crate::data::{Cell, format_iso_date};
use crate::extract::{self, ClientRecord};
use crate::table::Table;

/// One output row: column name to display string, missing cells as "".
pub type Record = BTreeMap<String, String>;

// "sammury" is kept verbatim: real reporting workbooks carry the
// misspelled sheet name, and correcting it would change which sheet
// gets selected.
const SUMMARY_KEY_HINTS: &[&str] = &["sammury", "summary", "client"];

const PREDICTION_KEY_HINTS: &[&str] = &["prediction", "prédiction", "pred"];

const CLIENT_COLUMN_CANDIDATES: &[&str] = &["Client", "client", "Nom_Client", "Name"];

const REPORTING_PREFIX: &str = "reporting::";

/// Distinct clients, preferring a reporting summary sheet and falling
/// back to the historical dataset. Empty when neither carries a
/// recognizable identity column — never an error for missing data.
pub fn list_clients(cache: &DatasetCache) -> Result<Vec<ClientRecord>> {
    let frames = cache.load_all()?;

    for (key, table) in &frames {
        if !key.starts_with(REPORTING_PREFIX) {
            continue;
        }
        let lowered = key.to_lowercase();
        if !SUMMARY_KEY_HINTS.iter().any(|hint| lowered.contains(hint)) {
            continue;
        }
        if !extract::find_identity_columns(table).is_empty() {
            return Ok(extract::extract_clients(table));
        }
    }

    if let Some(historical) = frames.get(HISTORICAL) {
        let clients = extract::extract_clients(historical);
        if !clients.is_empty() {
            debug!("Client list extracted from the historical dataset");
        }
        return Ok(clients);
    }

    Ok(Vec::new())
}

/// Historical rows for one client, matched on the exact-case `Client`
/// column with trimmed case-insensitive name equality. `Date_Mois`
/// values are reformatted to `YYYY-MM-DD` where they parse as dates.
pub fn client_history(cache: &DatasetCache, client_name: &str) -> Result<Vec<Record>> {
    let frames = cache.load_all()?;
    let Some(historical) = frames.get(HISTORICAL) else {
        return Ok(Vec::new());
    };
    let Some(client_idx) = historical.column_index("Client") else {
        return Ok(Vec::new());
    };

    let date_idx = historical.column_index("Date_Mois");
    Ok(filter_rows(historical, client_idx, client_name, date_idx))
}

/// Prediction rows for one client. The client column is located by
/// trying `Client`, `client`, `Nom_Client`, `Name` in that order; when
/// none is present the result is empty, not an error.
pub fn client_predictions(cache: &DatasetCache, client_name: &str) -> Result<Vec<Record>> {
    let frames = cache.load_all()?;
    let Some(predictions) = frames.get(PREDICTIONS) else {
        return Ok(Vec::new());
    };
    let Some(client_idx) = CLIENT_COLUMN_CANDIDATES
        .iter()
        .find_map(|name| predictions.column_index(name))
    else {
        debug!("Predictions table has no recognizable client column");
        return Ok(Vec::new());
    };

    Ok(filter_rows(predictions, client_idx, client_name, None))
}

/// The full predictions table as records; when the dedicated dataset is
/// absent, the first reporting sheet whose key looks prediction-related
/// stands in.
pub fn list_predictions(cache: &DatasetCache) -> Result<Vec<Record>> {
    let frames = cache.load_all()?;

    if let Some(predictions) = frames.get(PREDICTIONS) {
        if !predictions.is_empty() {
            return Ok(all_records(predictions));
        }
    }

    for (key, table) in &frames {
        if !key.starts_with(REPORTING_PREFIX) {
            continue;
        }
        let lowered = key.to_lowercase();
        if PREDICTION_KEY_HINTS.iter().any(|hint| lowered.contains(hint)) {
            debug!("Predictions served from reporting sheet '{key}'");
            return Ok(all_records(table));
        }
    }

    Ok(Vec::new())
}

fn filter_rows(
    table: &Table,
    client_idx: usize,
    client_name: &str,
    date_idx: Option<usize>,
) -> Vec<Record> {
    let needle = client_name.trim().to_lowercase();
    table
        .rows
        .iter()
        .filter(|row| {
            row.get(client_idx)
                .map(|cell| cell.as_display().trim().to_lowercase() == needle)
                .unwrap_or(false)
        })
        .map(|row| to_record(table, row, date_idx))
        .collect()
}

fn all_records(table: &Table) -> Vec<Record> {
    table
        .rows
        .iter()
        .map(|row| to_record(table, row, None))
        .collect()
}

fn to_record(table: &Table, row: &[Cell], date_idx: Option<usize>) -> Record {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let cell = row.get(idx);
            let value = match cell {
                Some(cell) if Some(idx) == date_idx => {
                    format_iso_date(cell).unwrap_or_else(|| cell.as_display())
                }
                Some(cell) => cell.as_display(),
                None => String::new(),
            };
            (column.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::data::Cell;
    use crate::workbook::testing::MemoryReader;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> Cell {
        Cell::Date(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn historical_table() -> Table {
        Table::new(
            vec![
                "Client".to_string(),
                "Date_Mois".to_string(),
                "Montant".to_string(),
            ],
            vec![
                vec![text(" Acme "), date(2023, 1, 1), Cell::Number(120.0)],
                vec![text("Acme"), text("2023-02-01 00:00:00"), Cell::Empty],
                vec![text("Globex"), text("Q1 2023"), Cell::Number(7.5)],
            ],
        )
    }

    fn cache_for(dir: &TempDir, reader: MemoryReader) -> DatasetCache {
        DatasetCache::with_reader(dir.path(), Box::new(reader))
    }

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), b"").expect("touch file");
    }

    #[test]
    fn history_matches_trimmed_case_insensitive_and_formats_dates() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "DATA_Prêt_Années_Combiner.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet("DATA_Prêt_Années_Combiner.xlsx", "Feuil1", historical_table());
        let cache = cache_for(&dir, reader);

        let rows = client_history(&cache, "acme").expect("history");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Date_Mois"], "2023-01-01");
        assert_eq!(rows[0]["Montant"], "120");
        assert_eq!(rows[1]["Date_Mois"], "2023-02-01");
        // missing cell comes back as empty string
        assert_eq!(rows[1]["Montant"], "");
    }

    #[test]
    fn history_falls_back_to_raw_text_when_date_does_not_parse() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "DATA_Prêt_Années_Combiner.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet("DATA_Prêt_Années_Combiner.xlsx", "Feuil1", historical_table());
        let cache = cache_for(&dir, reader);

        let rows = client_history(&cache, "  GLOBEX ").expect("history");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Date_Mois"], "Q1 2023");
    }

    #[test]
    fn history_without_exact_client_column_is_empty() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "DATA_Prêt_Années_Combiner.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet(
            "DATA_Prêt_Années_Combiner.xlsx",
            "Feuil1",
            Table::new(
                vec!["client".to_string(), "Montant".to_string()],
                vec![vec![text("Acme"), Cell::Number(1.0)]],
            ),
        );
        let cache = cache_for(&dir, reader);

        // lowercase "client" does not satisfy the exact-case requirement
        let rows = client_history(&cache, "Acme").expect("history");
        assert!(rows.is_empty());
    }

    #[test]
    fn history_with_no_dataset_is_empty_not_an_error() {
        let dir = tempdir().expect("temp dir");
        let cache = cache_for(&dir, MemoryReader::new());
        assert!(client_history(&cache, "Acme").expect("history").is_empty());
    }

    #[test]
    fn predictions_without_recognizable_client_column_are_empty() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "Predictions_2mois_R.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet(
            "Predictions_2mois_R.xlsx",
            "Feuil1",
            Table::new(
                vec!["Societe".to_string(), "Prevision".to_string()],
                vec![vec![text("Acme"), Cell::Number(9.0)]],
            ),
        );
        let cache = cache_for(&dir, reader);

        assert!(client_predictions(&cache, "Acme").expect("predictions").is_empty());
    }

    #[test]
    fn predictions_try_client_column_candidates_in_order() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "Predictions_2mois_R.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet(
            "Predictions_2mois_R.xlsx",
            "Feuil1",
            Table::new(
                vec!["Nom_Client".to_string(), "Prevision".to_string()],
                vec![
                    vec![text("Acme"), Cell::Number(9.0)],
                    vec![text("Globex"), Cell::Number(4.0)],
                ],
            ),
        );
        let cache = cache_for(&dir, reader);

        let rows = client_predictions(&cache, "acme").expect("predictions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Prevision"], "9");
    }

    #[test]
    fn clients_prefer_reporting_summary_sheets() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "DATA_Prêt_Années_Combiner.xlsx");
        touch(&dir, "Reporting_Visualisation.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet("DATA_Prêt_Années_Combiner.xlsx", "Feuil1", historical_table());
        // the misspelled sheet name found in real workbooks
        reader.insert_sheet(
            "Reporting_Visualisation.xlsx",
            "Client_Sammury",
            Table::new(
                vec!["Client_ID".to_string(), "Client".to_string()],
                vec![vec![text("C9"), text("Initech")]],
            ),
        );
        let cache = cache_for(&dir, reader);

        let clients = list_clients(&cache).expect("clients");
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].client_id.as_deref(), Some("C9"));
        assert_eq!(clients[0].client_name.as_deref(), Some("Initech"));
    }

    #[test]
    fn clients_fall_back_to_historical_dataset() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "DATA_Prêt_Années_Combiner.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet("DATA_Prêt_Années_Combiner.xlsx", "Feuil1", historical_table());
        let cache = cache_for(&dir, reader);

        let clients = list_clients(&cache).expect("clients");
        let names: Vec<_> = clients
            .iter()
            .filter_map(|c| c.client_name.as_deref())
            .collect();
        assert!(names.contains(&"Acme"));
        assert!(names.contains(&"Globex"));
    }

    #[test]
    fn clients_with_nothing_loaded_are_empty_not_an_error() {
        let dir = tempdir().expect("temp dir");
        let cache = cache_for(&dir, MemoryReader::new());
        assert!(list_clients(&cache).expect("clients").is_empty());
    }

    #[test]
    fn list_predictions_falls_back_to_reporting_sheet() {
        let dir = tempdir().expect("temp dir");
        touch(&dir, "Reporting_Visualisation.xlsx");
        let mut reader = MemoryReader::new();
        reader.insert_sheet(
            "Reporting_Visualisation.xlsx",
            "Predictions_T1",
            Table::new(
                vec!["Client".to_string(), "Prevision".to_string()],
                vec![vec![text("Acme"), Cell::Number(3.0)]],
            ),
        );
        let cache = cache_for(&dir, reader);

        let rows = list_predictions(&cache).expect("predictions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Client"], "Acme");
    }
}
