//! Relationship-type normalizer (§4.3): maps a free-form LLM label onto the
//! canonical vocabulary, or signals "accept as new".

use rust_stemmers::{Algorithm, Stemmer};

use crate::domain::{RelationshipCategory, VocabType};
use crate::error::{EngineError, EngineResult};

const FUZZY_MATCH_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub canonical_type: String,
    pub category: RelationshipCategory,
    pub similarity_score: f64,
}

/// `^[A-Z][A-Z0-9_]{0,99}$` (§3, §6).
pub fn validate_relationship_type(label: &str) -> EngineResult<()> {
    let mut chars = label.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    let rest_ok = label.len() <= 100
        && label[1..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "relationship type `{label}` does not match ^[A-Z][A-Z0-9_]{{0,99}}$"
        )))
    }
}

/// Staged matching, first hit wins (§4.3). `canonical` is the active
/// vocabulary to match against.
pub fn normalize(label: &str, canonical: &[VocabType]) -> Option<NormalizeOutcome> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    // Stage 1: exact match.
    if let Some(vt) = canonical.iter().find(|vt| vt.name == label) {
        return Some(NormalizeOutcome {
            canonical_type: vt.name.clone(),
            category: vt.category,
            similarity_score: 1.0,
        });
    }

    // Stage 2: reject reverse-direction inverses.
    if label.ends_with("_BY") {
        return None;
    }

    // Stage 3: prefix match — canonical type starts with label, pick shortest.
    let mut prefix_hits: Vec<&VocabType> =
        canonical.iter().filter(|vt| vt.name.starts_with(label)).collect();
    prefix_hits.sort_by_key(|vt| vt.name.len());
    if let Some(vt) = prefix_hits.first() {
        return Some(NormalizeOutcome {
            canonical_type: vt.name.clone(),
            category: vt.category,
            similarity_score: 0.95,
        });
    }

    // Stage 4: containment match — label starts with canonical type, pick longest.
    let mut containment_hits: Vec<&VocabType> =
        canonical.iter().filter(|vt| label.starts_with(vt.name.as_str())).collect();
    containment_hits.sort_by_key(|vt| std::cmp::Reverse(vt.name.len()));
    if let Some(vt) = containment_hits.first() {
        return Some(NormalizeOutcome {
            canonical_type: vt.name.clone(),
            category: vt.category,
            similarity_score: 0.9,
        });
    }

    // Stage 5: Porter stem match.
    let stemmer = Stemmer::create(Algorithm::English);
    let label_stem = stem_words(&stemmer, label);
    if let Some(vt) = canonical.iter().find(|vt| stem_words(&stemmer, &vt.name) == label_stem) {
        return Some(NormalizeOutcome {
            canonical_type: vt.name.clone(),
            category: vt.category,
            similarity_score: 0.85,
        });
    }

    // Stage 6: fuzzy sequence-ratio match, typos only.
    let mut best: Option<(&VocabType, f64)> = None;
    for vt in canonical {
        let ratio = sequence_ratio(label, &vt.name);
        if ratio >= FUZZY_MATCH_THRESHOLD && best.as_ref().is_none_or(|(_, b)| ratio > *b) {
            best = Some((vt, ratio));
        }
    }
    best.map(|(vt, ratio)| NormalizeOutcome {
        canonical_type: vt.name.clone(),
        category: vt.category,
        similarity_score: ratio,
    })
}

fn stem_words(stemmer: &Stemmer, label: &str) -> Vec<String> {
    label
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| stemmer.stem(&w.to_lowercase()).to_string())
        .collect()
}

/// Matching-blocks ratio in the spirit of Python's `difflib.SequenceMatcher.ratio()`:
/// `2 * M / T` where `M` is the total length of matching blocks found by
/// repeatedly extracting the longest common substring, and `T` is the
/// combined length of both strings. No crate in the dependency stack exposes
/// this exact algorithm, so it is hand-ported here (§4.3 stage 6).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_block_length(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

fn matching_block_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (start_a, start_b, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    let left = matching_block_length(&a[..start_a], &b[..start_b]);
    let right = matching_block_length(&a[start_a + len..], &b[start_b + len..]);
    len + left + right
}

fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    let mut best = (0usize, 0usize, 0usize);
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                dp[i][j] = dp[i - 1][j - 1] + 1;
                if dp[i][j] > best.2 {
                    best = (i - dp[i][j], j - dp[i][j], dp[i][j]);
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DirectionSemantics;

    fn vocab(name: &str, category: RelationshipCategory) -> VocabType {
        VocabType::new_builtin(name, category, DirectionSemantics::Outward)
    }

    #[test]
    fn validates_uppercase_underscore_pattern() {
        assert!(validate_relationship_type("CAUSES").is_ok());
        assert!(validate_relationship_type("causes").is_err());
        assert!(validate_relationship_type("1CAUSES").is_err());
    }

    #[test]
    fn exact_match_scores_one() {
        let canonical = vec![vocab("CAUSES", RelationshipCategory::Causal)];
        let outcome = normalize("CAUSES", &canonical).unwrap();
        assert_eq!(outcome.similarity_score, 1.0);
    }

    #[test]
    fn by_suffix_is_rejected_outright() {
        let canonical = vec![vocab("CAUSED_BY", RelationshipCategory::Causal)];
        assert!(normalize("TRIGGERED_BY", &canonical).is_none());
    }

    #[test]
    fn prefix_match_picks_shortest() {
        let canonical = vec![
            vocab("CONTRASTS_WITH", RelationshipCategory::Comparative),
            vocab("CONTRASTS_WITH_STRONGLY", RelationshipCategory::Comparative),
        ];
        let outcome = normalize("CONTRASTS", &canonical).unwrap();
        assert_eq!(outcome.canonical_type, "CONTRASTS_WITH");
    }

    #[test]
    fn containment_match_picks_longest() {
        let canonical = vec![
            vocab("CONTRADICTS", RelationshipCategory::LogicalTruth),
            vocab("CONTRADICTS_WITH", RelationshipCategory::LogicalTruth),
        ];
        let outcome = normalize("CONTRADICTS_WITH_EVIDENCE", &canonical).unwrap();
        assert_eq!(outcome.canonical_type, "CONTRADICTS_WITH");
    }

    #[test]
    fn stem_match_collapses_inflections() {
        let canonical = vec![vocab("CAUSES", RelationshipCategory::Causal)];
        let outcome = normalize("CAUSING", &canonical).unwrap();
        assert_eq!(outcome.canonical_type, "CAUSES");
    }

    #[test]
    fn fuzzy_match_catches_typos_above_threshold() {
        let canonical = vec![vocab("SUPPORTS", RelationshipCategory::Evidential)];
        let outcome = normalize("SUPORTS", &canonical);
        assert!(outcome.is_some());
    }

    #[test]
    fn unrelated_label_yields_none() {
        let canonical = vec![vocab("SUPPORTS", RelationshipCategory::Evidential)];
        assert!(normalize("COMPLETELY_DIFFERENT_THING", &canonical).is_none());
    }

    #[test]
    fn sequence_ratio_identical_strings_is_one() {
        assert_eq!(sequence_ratio("CAUSES", "CAUSES"), 1.0);
    }
}
