//! Vocabulary value scoring (§4.4): ranks relationship types by how much
//! structural and navigational value they contribute, so pruning targets the
//! least useful types first.

use serde::{Deserialize, Serialize};

use crate::domain::VocabTypeName;

/// Named weight constants, matching the reference `VocabularyScorer.WEIGHT_*`
/// class constants exactly — not re-derived or re-tuned.
pub const WEIGHT_EDGE_COUNT: f64 = 1.0;
pub const WEIGHT_TRAVERSAL: f64 = 0.5;
pub const WEIGHT_BRIDGE: f64 = 0.3;
pub const WEIGHT_TREND: f64 = 0.2;

/// access_count below this on the source concept of an edge qualifies it as
/// a structural-bridge candidate.
pub const BRIDGE_SOURCE_THRESHOLD: u64 = 10;
/// access_count above this on the destination concept completes the bridge.
pub const BRIDGE_DEST_THRESHOLD: u64 = 100;

/// Per-edge access counts used to compute bridge and traversal statistics,
/// gathered from the endpoints' `Concept.access_count`.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAccessSample {
    pub source_access_count: u64,
    pub dest_access_count: u64,
}

/// Computed-not-persisted scoring view of a VocabType (§3 supplemented entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeTypeScore {
    pub relationship_type: VocabTypeName,
    pub edge_count: u64,
    pub avg_traversal: f64,
    pub bridge_count: u64,
    pub trend: f64,
    pub value_score: f64,
    pub is_builtin: bool,
}

fn bridge_count(samples: &[EdgeAccessSample]) -> u64 {
    samples
        .iter()
        .filter(|s| s.source_access_count < BRIDGE_SOURCE_THRESHOLD && s.dest_access_count > BRIDGE_DEST_THRESHOLD)
        .count() as u64
}

fn trend(samples: &[EdgeAccessSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let usages: Vec<f64> = samples
        .iter()
        .map(|s| (s.source_access_count + s.dest_access_count) as f64 / 2.0)
        .collect();
    let avg_usage = usages.iter().sum::<f64>() / usages.len() as f64;
    let variance = usages.iter().map(|u| (u - avg_usage).powi(2)).sum::<f64>() / usages.len() as f64;
    let stddev = variance.sqrt();
    (avg_usage / 10.0) * (1.0 + stddev / 100.0)
}

/// `value = edge_count·W_EDGE + (avg_traversal/100)·W_TRAVERSAL +
/// (bridge_count/10)·W_BRIDGE + max(0,trend)·W_TREND`, optionally plus a
/// grounding-contribution term (§4.4).
pub fn score_vocab_type(
    relationship_type: &str,
    is_builtin: bool,
    samples: &[EdgeAccessSample],
    avg_traversal: f64,
    grounding_contribution: Option<f64>,
) -> EdgeTypeScore {
    let edge_count = samples.len() as u64;
    let bridges = bridge_count(samples);
    let tr = trend(samples);

    let mut value_score = edge_count as f64 * WEIGHT_EDGE_COUNT
        + (avg_traversal / 100.0) * WEIGHT_TRAVERSAL
        + (bridges as f64 / 10.0) * WEIGHT_BRIDGE
        + tr.max(0.0) * WEIGHT_TREND;

    if let Some(g) = grounding_contribution {
        value_score += g;
    }

    EdgeTypeScore {
        relationship_type: relationship_type.to_string(),
        edge_count,
        avg_traversal,
        bridge_count: bridges,
        trend: tr,
        value_score,
        is_builtin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_edge_type_scores_zero() {
        let score = score_vocab_type("UNUSED_TYPE", false, &[], 0.0, None);
        assert_eq!(score.value_score, 0.0);
        assert_eq!(score.edge_count, 0);
    }

    #[test]
    fn bridge_edges_are_counted() {
        let samples = vec![
            EdgeAccessSample { source_access_count: 2, dest_access_count: 150 },
            EdgeAccessSample { source_access_count: 50, dest_access_count: 150 },
        ];
        let score = score_vocab_type("LINKS", false, &samples, 0.0, None);
        assert_eq!(score.bridge_count, 1);
    }

    #[test]
    fn grounding_contribution_adds_to_value() {
        let without = score_vocab_type("SUPPORTS", true, &[], 10.0, None);
        let with = score_vocab_type("SUPPORTS", true, &[], 10.0, Some(0.4));
        assert!((with.value_score - without.value_score - 0.4).abs() < 1e-9);
    }
}
