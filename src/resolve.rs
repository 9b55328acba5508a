//! Locates the spreadsheet file backing a logical dataset.
//!
//! Files arrive renamed by hand, so resolution tolerates case changes,
//! accent and separator differences, and extra words or version tags.
//! A name that resolves to nothing is not an error; callers treat it as
//! "dataset unavailable" and skip it.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::names::{normalize, tokenize};

/// A single filename-matching strategy. Strategies are tried in
/// [`STRATEGIES`] order across all candidate files, so a stricter match
/// always beats a looser one regardless of directory iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Candidate equals the expected name ignoring case.
    CaseInsensitive,
    /// Candidate and expected name share the same normalized key
    /// (accent-, case-, and separator-insensitive equality).
    Normalized,
    /// Every significant token of the expected name appears as a
    /// substring of the candidate's normalized key. Tolerates
    /// reordering, version suffixes, and renamed-with-extra-words
    /// files. Two unrelated files sharing all tokens produce a false
    /// positive; the first candidate in directory order wins, which is
    /// an accepted limitation.
    TokenContainment,
}

pub const STRATEGIES: &[MatchStrategy] = &[
    MatchStrategy::CaseInsensitive,
    MatchStrategy::Normalized,
    MatchStrategy::TokenContainment,
];

impl MatchStrategy {
    pub fn matches(self, expected: &str, candidate: &str) -> bool {
        match self {
            MatchStrategy::CaseInsensitive => candidate.to_lowercase() == expected.to_lowercase(),
            MatchStrategy::Normalized => normalize(candidate) == normalize(expected),
            MatchStrategy::TokenContainment => {
                let candidate_key = normalize(candidate);
                tokenize(expected)
                    .iter()
                    .all(|token| candidate_key.contains(token.as_str()))
            }
        }
    }
}

/// Whether a path carries a spreadsheet extension (`.xls`, `.xlsx`,
/// `.xlsm`, ... — anything starting with `xls`, compared case-insensitively).
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase().starts_with("xls"))
        .unwrap_or(false)
}

/// Finds the best match for `expected_filename` inside `dir`.
///
/// An exact path hit returns immediately; otherwise spreadsheet files in
/// `dir` are compared against each strategy in turn, first hit wins.
pub fn resolve(expected_filename: &str, dir: &Path) -> Option<PathBuf> {
    let direct = dir.join(expected_filename);
    if direct.exists() {
        return Some(direct);
    }

    let candidates = spreadsheet_files(dir);
    for strategy in STRATEGIES {
        for path in &candidates {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if strategy.matches(expected_filename, name) {
                debug!("Matched '{name}' to '{expected_filename}' via {strategy:?}");
                return Some(path.clone());
            }
        }
    }
    None
}

fn spreadsheet_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_spreadsheet(path))
        .collect()
}
