//! Filename and column-name normalization.
//!
//! The spreadsheet files this tool ingests carry human-edited names:
//! accents, inconsistent casing, stray separators, trailing version
//! tags. [`normalize()`] collapses a name to its accent-free lowercase
//! alphanumeric core so two spellings of the same name compare equal;
//! [`tokenize()`] splits a name into the significant word fragments the
//! containment matcher works with.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Minimum token length considered significant for matching.
const MIN_TOKEN_LEN: usize = 3;

fn strip_accents(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonical comparison key: accent-stripped, lowercased, with every
/// character outside ASCII `[a-z0-9]` removed.
pub fn normalize(name: &str) -> String {
    strip_accents(name)
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Maximal ASCII alphanumeric runs of the accent-stripped, lowercased
/// name, keeping only runs of [`MIN_TOKEN_LEN`] or more characters.
/// Order and duplicates are preserved.
pub fn tokenize(name: &str) -> Vec<String> {
    strip_accents(name)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_deterministic_and_idempotent() {
        let key = normalize("DATA_Prêt_Années_Combiner.xlsx");
        assert_eq!(key, normalize("DATA_Prêt_Années_Combiner.xlsx"));
        assert_eq!(key, normalize(&key));
    }

    #[test]
    fn normalize_is_invariant_under_accent_substitution() {
        assert_eq!(normalize("Prêt"), normalize("Pret"));
        assert_eq!(normalize("Années"), normalize("annees"));
        assert_eq!(
            normalize("DATA_Prêt_Années_Combiner.xlsx"),
            "datapretanneescombinerxlsx"
        );
    }

    #[test]
    fn normalize_drops_separators_and_punctuation() {
        assert_eq!(
            normalize("Reporting_Visualisation.xlsx"),
            normalize("reporting visualisation xlsx")
        );
        assert_eq!(normalize("!!??"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn tokenize_keeps_order_and_drops_short_runs() {
        assert_eq!(
            tokenize("DATA_Prêt_Années_Combiner.xlsx"),
            vec!["data", "pret", "annees", "combiner", "xlsx"]
        );
        // "2mois" survives the length threshold, "R" does not
        assert_eq!(
            tokenize("Predictions_2mois_R.xlsx"),
            vec!["predictions", "2mois", "xlsx"]
        );
        assert!(tokenize("a_b_c").is_empty());
    }

    #[test]
    fn tokenize_preserves_duplicates() {
        assert_eq!(tokenize("foo_bar_foo"), vec!["foo", "bar", "foo"]);
    }
}
