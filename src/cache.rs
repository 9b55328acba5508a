//! Load-once cache over the expected spreadsheet datasets.
//!
//! The cache maps a logical dataset key (or `reporting::<sheet>` for
//! the multi-sheet reporting workbook) to a loaded [`Table`]. Entries
//! are added lazily by [`DatasetCache::load_all`] and removed only by
//! [`DatasetCache::clear`]; disk I/O and parsing happen on cache miss
//! only. Every cache instance is independent — no process-global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::resolve;
use crate::table::Table;
use crate::workbook::{SheetReader, XlsxReader};

pub const HISTORICAL: &str = "historical";
pub const REPORTING: &str = "reporting";
pub const PREDICTIONS: &str = "predictions";

/// A logical dataset and the filename it is expected to arrive under.
/// The set is fixed at compile time; actual files on disk may be
/// renamed variants, which resolution tolerates.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    pub key: &'static str,
    pub expected_filename: &'static str,
}

pub const EXPECTED_DATASETS: &[DatasetSpec] = &[
    DatasetSpec {
        key: HISTORICAL,
        expected_filename: "DATA_Prêt_Années_Combiner.xlsx",
    },
    DatasetSpec {
        key: REPORTING,
        expected_filename: "Reporting_Visualisation.xlsx",
    },
    DatasetSpec {
        key: PREDICTIONS,
        expected_filename: "Predictions_2mois_R.xlsx",
    },
];

/// Snapshot of loaded tables, keyed by cache key.
pub type Frames = BTreeMap<String, Arc<Table>>;

pub struct DatasetCache {
    data_dir: PathBuf,
    reader: Box<dyn SheetReader>,
    frames: Mutex<Frames>,
}

impl DatasetCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_reader(data_dir, Box::new(XlsxReader))
    }

    pub fn with_reader(data_dir: impl Into<PathBuf>, reader: Box<dyn SheetReader>) -> Self {
        DatasetCache {
            data_dir: data_dir.into(),
            reader,
            frames: Mutex::new(Frames::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The static `(key, expected filename)` configuration.
    pub fn datasets(&self) -> &'static [DatasetSpec] {
        EXPECTED_DATASETS
    }

    /// Resolves the on-disk file for a dataset key. Resolution runs
    /// fresh on every call; only loaded tables are cached.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        let spec = EXPECTED_DATASETS.iter().find(|spec| spec.key == key)?;
        resolve::resolve(spec.expected_filename, &self.data_dir)
    }

    /// Loads every expected dataset not already cached and returns a
    /// snapshot of all cached tables.
    ///
    /// Unresolvable datasets are skipped without error. The reporting
    /// workbook loads one table per sheet under `reporting::<sheet>`,
    /// falling back to the default sheet under `reporting::default`
    /// when sheet enumeration fails; a parse failure in a single-sheet
    /// dataset aborts the call. Presence is checked on the plain
    /// dataset key only, so the reporting workbook — which stores only
    /// sheet-qualified keys — is re-read on every call.
    pub fn load_all(&self) -> Result<Frames> {
        let mut frames = self.lock();
        for spec in EXPECTED_DATASETS {
            if frames.contains_key(spec.key) {
                continue;
            }
            let Some(path) = resolve::resolve(spec.expected_filename, &self.data_dir) else {
                debug!(
                    "No file matching '{}' for dataset '{}' in {:?}",
                    spec.expected_filename, spec.key, self.data_dir
                );
                continue;
            };
            if spec.key == REPORTING {
                self.load_reporting(&mut frames, &path)?;
            } else {
                let table = self
                    .reader
                    .read_sheet(&path, None)
                    .with_context(|| format!("Loading dataset '{}' from {path:?}", spec.key))?;
                info!(
                    "Loaded dataset '{}' ({} row(s), {} column(s))",
                    spec.key,
                    table.row_count(),
                    table.column_count()
                );
                frames.insert(spec.key.to_string(), Arc::new(table));
            }
        }
        Ok(frames.clone())
    }

    /// Empties the cache. The next [`DatasetCache::load_all`] call
    /// re-resolves from disk, so renamed or replaced files are picked up.
    pub fn clear(&self) {
        let mut frames = self.lock();
        frames.clear();
        info!("Dataset cache cleared");
    }

    // All sheets are collected before any entry is inserted, so a reader
    // never observes a partially populated multi-sheet load. A failing
    // default-sheet fallback is fatal, like any single-sheet load.
    fn load_reporting(&self, frames: &mut Frames, path: &Path) -> Result<()> {
        match self.read_all_sheets(path) {
            Ok(sheets) => {
                info!("Loaded {} reporting sheet(s) from {path:?}", sheets.len());
                for (sheet, table) in sheets {
                    frames.insert(format!("{REPORTING}::{sheet}"), Arc::new(table));
                }
            }
            Err(err) => {
                warn!("Failed to enumerate reporting sheets in {path:?}: {err:#}");
                let table = self
                    .reader
                    .read_sheet(path, None)
                    .with_context(|| format!("Loading default reporting sheet from {path:?}"))?;
                frames.insert(format!("{REPORTING}::default"), Arc::new(table));
            }
        }
        Ok(())
    }

    fn read_all_sheets(&self, path: &Path) -> Result<Vec<(String, Table)>> {
        let names = self.reader.sheet_names(path)?;
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let table = self
                .reader
                .read_sheet(path, Some(&name))
                .with_context(|| format!("Loading reporting sheet '{name}'"))?;
            sheets.push((name, table));
        }
        Ok(sheets)
    }

    // A poisoned lock only means another thread panicked mid-update;
    // the map itself stays usable (last writer wins, no crash).
    fn lock(&self) -> std::sync::MutexGuard<'_, Frames> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
