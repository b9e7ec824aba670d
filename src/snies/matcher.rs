//! Fuzzy program-name matching.
//!
//! Maps a free-text program name to the set of catalog entries treated
//! as "the same program" for statistical purposes. A candidate is
//! accepted when its tokenized name has Jaccard similarity >= 0.5 with
//! the query AND contains every query token. The subset requirement is
//! directional: query tokens must appear in the candidate, not the other
//! way around, so "Doctorado Matemáticas" accepts "Doctorado en
//! Matemáticas Aplicadas" but never "Doctorado en Física".

use std::collections::{BTreeSet, HashSet};

const JACCARD_THRESHOLD: f64 = 0.5;

/// Lower-case and split on whitespace; duplicates collapse.
pub fn tokenize(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two token sets. An empty union yields 0.0
/// rather than dividing by zero.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Acceptance rule for one candidate token set against the query's.
pub fn accept(query: &BTreeSet<String>, candidate: &BTreeSet<String>) -> bool {
    if query.is_empty() {
        return false;
    }
    jaccard(query, candidate) >= JACCARD_THRESHOLD && query.is_subset(candidate)
}

/// Returns the catalog names judged equivalent to the query, in
/// first-seen order. Duplicate catalog entries are compared only once.
/// An empty result is not an error; the caller reports it via the
/// bundle's `matched` flag.
pub fn match_catalog<'a, I>(query: &str, names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_tokens = tokenize(query);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut accepted = Vec::new();

    for name in names {
        if !seen.insert(name) {
            continue;
        }
        if accept(&query_tokens, &tokenize(name)) {
            accepted.push(name.to_string());
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctorado_matematicas_scenario() {
        let catalog = [
            "Doctorado en Matemáticas Aplicadas",
            "Doctorado en Física",
            "Maestría en Matemáticas",
        ];
        let accepted = match_catalog("Doctorado Matemáticas", catalog);
        assert_eq!(accepted, vec!["Doctorado en Matemáticas Aplicadas"]);
    }

    #[test]
    fn test_missing_query_token_never_matches() {
        // Jaccard alone would accept this short candidate; the subset
        // condition must reject it.
        let query = tokenize("doctorado matemáticas");
        let candidate = tokenize("doctorado");
        assert!(jaccard(&query, &candidate) >= 0.5);
        assert!(!accept(&query, &candidate));
    }

    #[test]
    fn test_subset_check_is_directional() {
        let short = tokenize("doctorado matemáticas");
        let long = tokenize("doctorado en matemáticas aplicadas");
        // query ⊆ candidate holds in one direction only
        assert!(accept(&short, &long));
        assert!(!accept(&long, &short));
    }

    #[test]
    fn test_jaccard_binds_for_long_candidates() {
        // All query tokens present, but the candidate is so long that
        // the similarity drops below the threshold.
        let query = tokenize("doctorado matemáticas");
        let candidate =
            tokenize("doctorado en ciencias exactas con énfasis en matemáticas puras y aplicadas");
        assert!(query.is_subset(&candidate));
        assert!(!accept(&query, &candidate));
    }

    #[test]
    fn test_empty_inputs_do_not_divide_by_zero() {
        let empty = tokenize("");
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert!(!accept(&empty, &empty));
        assert!(!accept(&empty, &tokenize("doctorado")));
        assert!(!accept(&tokenize("doctorado"), &empty));
    }

    #[test]
    fn test_self_match_guarantee() {
        let catalog = ["Maestría en Ingeniería de Sistemas"];
        let accepted = match_catalog("Maestría en Ingeniería de Sistemas", catalog);
        assert_eq!(accepted, vec!["Maestría en Ingeniería de Sistemas"]);
    }

    #[test]
    fn test_case_and_duplicates_collapse() {
        let catalog = [
            "DOCTORADO EN MATEMÁTICAS",
            "Doctorado en Matemáticas",
            "DOCTORADO EN MATEMÁTICAS",
        ];
        let accepted = match_catalog("doctorado matemáticas", catalog);
        // Both distinct spellings match; the literal duplicate is
        // compared once.
        assert_eq!(
            accepted,
            vec!["DOCTORADO EN MATEMÁTICAS", "Doctorado en Matemáticas"]
        );
    }

    #[test]
    fn test_no_match_returns_empty_not_error() {
        let accepted = match_catalog("Doctorado Astrofísica", ["Maestría en Historia"]);
        assert!(accepted.is_empty());
    }
}
