//! Dynamic vocabulary management (§4.4): scoring, pruning, and the AITL
//! consolidation loop that keeps the relationship vocabulary bounded.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{PruningMode, VocabularyConfig};
use crate::domain::{MergeDecidedBy, MergeHistoryEntry, VocabType};
use crate::embedding::{EmbeddingKind, Embedder};
use crate::error::{EngineError, EngineResult};
use crate::llm::LlmCapability;
use crate::storage::GraphStore;

use super::aggressiveness::{calculate_aggressiveness, AggressivenessThresholds, VocabularyZone};
use super::scoring::{score_vocab_type, EdgeAccessSample, EdgeTypeScore};
use super::synonym::{find_synonym_candidates, SynonymBand, SynonymCandidate};

/// Outcome of one AITL consolidation step, reported back to the caller
/// (e.g. a job worker) for progress tracking.
#[derive(Debug, Clone)]
pub enum ConsolidationStep {
    Merged { deprecated: String, target: String, edges_rewritten: u64 },
    Skipped { deprecated: String, reason: String },
}

pub struct ConsolidationReport {
    pub steps: Vec<ConsolidationStep>,
    pub final_size: usize,
}

pub struct VocabularyManager {
    store: Arc<dyn GraphStore>,
    llm: Arc<dyn LlmCapability>,
    embedder: Arc<dyn Embedder>,
    config: VocabularyConfig,
}

impl VocabularyManager {
    pub fn new(
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LlmCapability>,
        embedder: Arc<dyn Embedder>,
        config: VocabularyConfig,
    ) -> Self {
        Self { store, llm, embedder, config }
    }

    pub fn aggressiveness(&self, vocab_size: usize) -> (f64, VocabularyZone) {
        let thresholds = AggressivenessThresholds {
            vocab_min: self.config.vocab_min,
            vocab_max: self.config.vocab_max,
            vocab_emergency: self.config.vocab_emergency,
        };
        calculate_aggressiveness(vocab_size, &thresholds, self.config.aggressiveness_profile)
    }

    pub fn score_all(&self) -> EngineResult<Vec<EdgeTypeScore>> {
        let vocab_types = self.store.list_vocab_types(true)?;
        let mut scores = Vec::with_capacity(vocab_types.len());
        for vt in &vocab_types {
            let samples = self.edge_access_samples(&vt.name)?;
            let avg_traversal = if samples.is_empty() {
                0.0
            } else {
                samples.iter().map(|s| (s.source_access_count + s.dest_access_count) as f64 / 2.0).sum::<f64>()
                    / samples.len() as f64
            };
            scores.push(score_vocab_type(&vt.name, vt.is_builtin, &samples, avg_traversal, None));
        }
        Ok(scores)
    }

    fn edge_access_samples(&self, relationship_type: &str) -> EngineResult<Vec<EdgeAccessSample>> {
        let edges = self.store.find_relationships(&crate::storage::EdgeFilter {
            relationship_type: Some(relationship_type.to_string()),
            ..Default::default()
        })?;
        let mut samples = Vec::with_capacity(edges.len());
        for edge in edges {
            let from = self.store.load_concept(&edge.from_concept)?;
            let to = self.store.load_concept(&edge.to_concept)?;
            if let (Some(from), Some(to)) = (from, to) {
                samples.push(EdgeAccessSample {
                    source_access_count: from.access_count,
                    dest_access_count: to.access_count,
                });
            }
        }
        Ok(samples)
    }

    /// §4.4 three pruning modes: applies the mode's policy to zero-edge
    /// types, returning the types deprecated.
    pub fn prune_zero_edge_types(&self, mode: PruningMode) -> EngineResult<Vec<String>> {
        let scores = self.score_all()?;
        let mut deprecated = Vec::new();
        for score in scores {
            if score.is_builtin || score.edge_count > 0 {
                continue;
            }
            match mode {
                PruningMode::Naive | PruningMode::Aitl => {
                    self.deprecate(&score.relationship_type)?;
                    deprecated.push(score.relationship_type);
                }
                PruningMode::Hitl => {
                    // Needs human review; no automatic action.
                }
            }
        }
        Ok(deprecated)
    }

    fn deprecate(&self, type_name: &str) -> EngineResult<()> {
        if let Some(mut vt) = self.store.load_vocab_type(type_name)? {
            vt.is_active = false;
            self.store.save_vocab_type(&vt)?;
        }
        Ok(())
    }

    /// Restore a deprecated (not hard-deleted) VocabType. Does not pull back
    /// edges already rewritten to a merge target (§4.4 step 5/"Restoration").
    pub fn restore(&self, type_name: &str) -> EngineResult<()> {
        let mut vt = self
            .store
            .load_vocab_type(type_name)?
            .ok_or_else(|| EngineError::NotFound(format!("vocabulary type not found: {type_name}")))?;
        vt.is_active = true;
        self.store.save_vocab_type(&vt)?;
        Ok(())
    }

    fn synonym_candidates(&self) -> EngineResult<Vec<SynonymCandidate>> {
        let active = self.store.list_vocab_types(false)?;
        Ok(find_synonym_candidates(&active))
    }

    fn priority(candidate: &SynonymCandidate, edge_counts: &std::collections::HashMap<String, u64>) -> f64 {
        let min_edges = edge_counts.get(&candidate.a).copied().unwrap_or(0).min(
            edge_counts.get(&candidate.b).copied().unwrap_or(0),
        );
        candidate.similarity as f64 * 2.0 - (min_edges as f64 / 100.0)
    }

    /// The AITL consolidation loop (§4.4): iteratively merge synonym pairs
    /// with LLM judgment until the vocabulary shrinks to `vocab_max` or the
    /// iteration cap is hit.
    pub async fn consolidate(&self) -> EngineResult<ConsolidationReport> {
        let mut steps = Vec::new();
        let mut processed: HashSet<(String, String)> = HashSet::new();
        let initial_size = self.store.list_vocab_types(false)?.len();
        let iteration_cap = (initial_size / 2).max(10);

        for _ in 0..iteration_cap {
            let active = self.store.list_vocab_types(false)?;
            if active.len() <= self.config.vocab_max {
                break;
            }

            let edge_counts: std::collections::HashMap<String, u64> = {
                let scores = self.score_all()?;
                scores.into_iter().map(|s| (s.relationship_type, s.edge_count)).collect()
            };

            let mut candidates: Vec<SynonymCandidate> = self
                .synonym_candidates()?
                .into_iter()
                .filter(|c| !matches!(c.band, SynonymBand::Distinct))
                .filter(|c| {
                    let key = normalize_pair(&c.a, &c.b);
                    !processed.contains(&key)
                })
                .collect();
            candidates.sort_by(|a, b| {
                Self::priority(b, &edge_counts)
                    .partial_cmp(&Self::priority(a, &edge_counts))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let Some(candidate) = candidates.into_iter().next() else {
                break;
            };
            processed.insert(normalize_pair(&candidate.a, &candidate.b));

            let judgment = if self.llm.is_available().await {
                self.llm.judge_merge(&candidate.a, &candidate.b, candidate.similarity).await.ok()
            } else {
                None
            };

            let (should_merge, target_name) = match judgment {
                Some(j) if j.should_merge => (true, j.blended_name.unwrap_or_else(|| candidate.a.clone())),
                Some(_) => (false, String::new()),
                None => {
                    // Heuristic fallback when LLM unavailable (§4.4).
                    if candidate.similarity >= 0.80 {
                        (true, candidate.a.clone())
                    } else {
                        (false, String::new())
                    }
                }
            };

            if !should_merge {
                steps.push(ConsolidationStep::Skipped {
                    deprecated: candidate.b.clone(),
                    reason: "llm declined merge".to_string(),
                });
                continue;
            }

            let (deprecated, target) = if target_name == candidate.a {
                (candidate.b.clone(), candidate.a.clone())
            } else {
                (candidate.a.clone(), target_name.clone())
            };

            let edges_rewritten = self.execute_merge(&deprecated, &target, candidate.similarity).await?;
            steps.push(ConsolidationStep::Merged {
                deprecated,
                target,
                edges_rewritten,
            });
        }

        let final_size = self.store.list_vocab_types(false)?.len();
        Ok(ConsolidationReport { steps, final_size })
    }

    /// Transactional merge (§4.4 step 5): rewrite edges, bump usage, deprecate
    /// the source type, append an audit record.
    async fn execute_merge(&self, deprecated: &str, target: &str, similarity: f32) -> EngineResult<u64> {
        let edges_rewritten = self.store.rewrite_relationship_type(deprecated, target)?;

        if let Some(mut target_vt) = self.store.load_vocab_type(target)? {
            target_vt.usage_count += edges_rewritten;
            self.store.save_vocab_type(&target_vt)?;
        }
        self.deprecate(deprecated)?;

        self.store.append_merge_history(&MergeHistoryEntry {
            deprecated_type: deprecated.to_string(),
            target_type: target.to_string(),
            similarity,
            edges_rewritten,
            decided_by: MergeDecidedBy::Llm,
            timestamp: chrono::Utc::now(),
        })?;

        Ok(edges_rewritten)
    }

    /// Generate and persist an embedding for a newly-registered vocabulary
    /// type (§4.2 step 6: "generate its embedding synchronously").
    pub fn embed_vocab_type(&self, vocab_type: &mut VocabType) -> EngineResult<()> {
        let text = match &vocab_type.description {
            Some(desc) => format!("{} {}", vocab_type.name, desc),
            None => vocab_type.name.clone(),
        };
        let embedding = self
            .embedder
            .embed_one(EmbeddingKind::VocabularyType, &text)
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;
        vocab_type.embedding = Some(embedding);
        self.store.save_vocab_type(vocab_type)?;
        Ok(())
    }
}

fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DirectionSemantics, RelationshipCategory};
    use crate::embedding::MockEmbedder;
    use crate::llm::{MergeJudgment, MockLlm};
    use crate::storage::{OpenStore, SqliteStore};

    fn manager_with(store: Arc<dyn GraphStore>, llm: MockLlm) -> VocabularyManager {
        VocabularyManager::new(store, Arc::new(llm), Arc::new(MockEmbedder::default()), VocabularyConfig {
            vocab_max: 1,
            ..VocabularyConfig::default()
        })
    }

    #[test]
    fn prune_zero_edge_types_deprecates_under_naive() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let vt = VocabType::new_llm_generated("UNUSED_TYPE", DirectionSemantics::Outward);
        store.save_vocab_type(&vt).unwrap();
        let manager = manager_with(store.clone(), MockLlm::available());
        let deprecated = manager.prune_zero_edge_types(PruningMode::Naive).unwrap();
        assert_eq!(deprecated, vec!["UNUSED_TYPE"]);
        assert!(!store.load_vocab_type("UNUSED_TYPE").unwrap().unwrap().is_active);
    }

    #[test]
    fn hitl_mode_never_auto_deprecates() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let vt = VocabType::new_llm_generated("NEEDS_REVIEW", DirectionSemantics::Outward);
        store.save_vocab_type(&vt).unwrap();
        let manager = manager_with(store.clone(), MockLlm::available());
        let deprecated = manager.prune_zero_edge_types(PruningMode::Hitl).unwrap();
        assert!(deprecated.is_empty());
        assert!(store.load_vocab_type("NEEDS_REVIEW").unwrap().unwrap().is_active);
    }

    #[test]
    fn builtin_types_are_never_pruned() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let vt = VocabType::new_builtin("CAUSES", RelationshipCategory::Causal, DirectionSemantics::Outward);
        store.save_vocab_type(&vt).unwrap();
        let manager = manager_with(store.clone(), MockLlm::available());
        let deprecated = manager.prune_zero_edge_types(PruningMode::Naive).unwrap();
        assert!(deprecated.is_empty());
    }

    #[test]
    fn restore_reactivates_a_deprecated_type() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut vt = VocabType::new_llm_generated("MERGED_AWAY", DirectionSemantics::Outward);
        vt.is_active = false;
        store.save_vocab_type(&vt).unwrap();
        let manager = manager_with(store.clone(), MockLlm::available());
        manager.restore("MERGED_AWAY").unwrap();
        assert!(store.load_vocab_type("MERGED_AWAY").unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn consolidate_merges_strong_synonyms_and_records_history() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut a = VocabType::new_llm_generated("CAUSES", DirectionSemantics::Outward);
        a.embedding = Some(vec![1.0, 0.0, 0.0]);
        let mut b = VocabType::new_llm_generated("TRIGGERS", DirectionSemantics::Outward);
        b.embedding = Some(vec![1.0, 0.0, 0.0]);
        store.save_vocab_type(&a).unwrap();
        store.save_vocab_type(&b).unwrap();

        let llm = MockLlm::available().with_merge_judgment(
            "CAUSES",
            "TRIGGERS",
            MergeJudgment { should_merge: true, blended_name: Some("CAUSES".to_string()), rationale: "synonyms".to_string() },
        );
        let manager = manager_with(store.clone(), llm);
        let report = manager.consolidate().await.unwrap();
        assert_eq!(report.final_size, 1);
        let history = store.list_merge_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].target_type, "CAUSES");
    }
}
