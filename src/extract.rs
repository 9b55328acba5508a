//! Client identity extraction from loosely structured tables.
//!
//! Workbook schemas are outside this tool's control; columns holding
//! client identity are found by substring heuristics and absent
//! matches degrade to an empty result rather than an error.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Substrings that mark a column as client-identity-bearing, compared
/// case-insensitively against column names.
pub const IDENTITY_HINTS: &[&str] = &["client", "customer", "id", "code"];

const ID_ALIASES: &[&str] = &["client_id", "Client_ID", "ID"];
const NAME_ALIASES: &[&str] = &["client_name", "Client", "Nom_Client", "Name"];

/// A de-duplicated client, derived on the fly from whichever table
/// currently carries identity columns. Either field may be absent when
/// the source schema lacks a recognizable alias column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientRecord {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
}

/// Column names whose lowercased form contains any identity hint, in
/// table order.
pub fn find_identity_columns(table: &Table) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            IDENTITY_HINTS.iter().any(|hint| lowered.contains(hint))
        })
        .cloned()
        .collect()
}

/// Projects the identity columns, drops rows empty across all of them,
/// de-duplicates the remainder by full projected-row equality, and maps
/// each surviving row to a [`ClientRecord`].
pub fn extract_clients(table: &Table) -> Vec<ClientRecord> {
    let columns = find_identity_columns(table);
    if columns.is_empty() {
        return Vec::new();
    }
    let indices: Vec<usize> = columns
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();

    table
        .rows
        .iter()
        .filter(|row| {
            indices
                .iter()
                .any(|&idx| row.get(idx).is_some_and(|cell| !cell.is_empty()))
        })
        .map(|row| {
            indices
                .iter()
                .map(|&idx| row.get(idx).map(|c| c.as_display()).unwrap_or_default())
                .collect::<Vec<String>>()
        })
        .unique()
        .map(|cells| client_record(&columns, &cells))
        .collect()
}

fn client_record(columns: &[String], cells: &[String]) -> ClientRecord {
    let trimmed = |idx: usize| cells.get(idx).map(|v| v.trim());
    let value_of = |name: &str| {
        columns
            .iter()
            .position(|col| col == name)
            .and_then(|idx| trimmed(idx))
    };
    let has_alias = |aliases: &[&str]| {
        aliases
            .iter()
            .any(|alias| columns.iter().any(|col| col == alias))
    };
    let first_non_empty = |aliases: &[&str]| {
        aliases
            .iter()
            .filter_map(|alias| value_of(alias))
            .find(|value| !value.is_empty())
    };

    // The fallback to the first identity column supplies a value, but
    // only the presence of a real alias column makes the field non-null.
    let client_id = has_alias(ID_ALIASES).then(|| {
        first_non_empty(ID_ALIASES)
            .or_else(|| trimmed(0))
            .unwrap_or("")
            .to_string()
    });
    let client_name =
        has_alias(NAME_ALIASES).then(|| first_non_empty(NAME_ALIASES).unwrap_or("").to_string());

    ClientRecord {
        client_id,
        client_name,
    }
}
