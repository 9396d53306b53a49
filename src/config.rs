//! Typed engine configuration (§6, §9 "singletons → explicit services").
//!
//! Loaded from an optional TOML file and overlaid with environment
//! variables prefixed `GNOSIS_`. Never requires a live LLM or network
//! call to construct — every field has a safe default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vocabulary::aggressiveness::AggressivenessProfileName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Ollama,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruningMode {
    Naive,
    Hitl,
    Aitl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub ai_provider: AiProvider,
    /// Executable spawned for non-mock providers and driven over MCP stdio.
    pub command: String,
    pub extraction_model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
    /// Optional nucleus-sampling parameter, forwarded only if the provider supports it.
    pub top_p: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::Mock,
            command: "llm-orc".to_string(),
            extraction_model: "mock-extractor".to_string(),
            embedding_model: "mock-embedder".to_string(),
            timeout_seconds: 60,
            top_p: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub vocab_min: usize,
    pub vocab_max: usize,
    pub vocab_emergency: usize,
    pub pruning_mode: PruningMode,
    pub aggressiveness_profile: AggressivenessProfileName,
    pub synonym_threshold_strong: f32,
    pub synonym_threshold_moderate: f32,
    pub consolidation_similarity_threshold: f32,
    pub fuzzy_match_threshold: f64,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            vocab_min: 30,
            vocab_max: 90,
            vocab_emergency: 200,
            pruning_mode: PruningMode::Aitl,
            aggressiveness_profile: AggressivenessProfileName::Aggressive,
            synonym_threshold_strong: 0.90,
            synonym_threshold_moderate: 0.70,
            consolidation_similarity_threshold: 0.90,
            fuzzy_match_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_words: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub translation_parallelism: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_words: 500,
            min_words: 100,
            max_words: 800,
            translation_parallelism: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub carry_over_chunks: usize,
    pub concept_link_threshold: f32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            carry_over_chunks: 3,
            concept_link_threshold: 0.85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub blob_root: PathBuf,
    pub inline_artifact_threshold_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            blob_root: PathBuf::from("./data/blobs"),
            inline_artifact_threshold_bytes: 10 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub max_concurrent_jobs_per_type: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs_per_type: 4,
        }
    }
}

/// Top-level typed configuration. Construction is infallible and offline;
/// [`EngineConfig::load`] layers a TOML file and environment overrides on top.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub llm: LlmConfig,
    pub vocabulary: VocabularyConfig,
    pub chunking: ChunkingConfig,
    pub ingestion: IngestionConfig,
    pub storage: StorageConfig,
    pub jobs: JobConfig,
}

impl EngineConfig {
    /// Load from an optional TOML file, then apply `GNOSIS_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, crate::error::EngineError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                toml::from_str(&text).map_err(|e| {
                    crate::error::EngineError::InvalidInput(format!(
                        "malformed config at {}: {e}",
                        p.display()
                    ))
                })?
            }
            _ => EngineConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GNOSIS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GNOSIS_BLOB_ROOT") {
            self.storage.blob_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GNOSIS_AI_PROVIDER") {
            self.llm.ai_provider = match v.as_str() {
                "openai" => AiProvider::OpenAi,
                "anthropic" => AiProvider::Anthropic,
                "ollama" => AiProvider::Ollama,
                _ => AiProvider::Mock,
            };
        }
    }
}
