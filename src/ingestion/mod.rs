//! Chunked ingestion pipeline (§4.2): turns an ordered list of semantic
//! chunks into Sources, Concepts, Instances and Relationships.
//!
//! Chunks MUST be processed strictly in document order — each chunk may link
//! to concepts an earlier chunk in the same document created, which is a
//! correctness property, not an optimization.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::IngestionConfig;
use crate::domain::{
    cosine_similarity, Concept, ConceptId, CreationMethod, DirectionSemantics, DocumentMeta,
    Instance, OntologyId, Relationship, RelationshipCategory, RelationshipSource, Source,
    VocabType,
};
use crate::embedding::{EmbeddingKind, Embedder};
use crate::error::{EngineError, EngineResult};
use crate::llm::LlmCapability;
use crate::preprocess::SemanticChunk;
use crate::storage::{FilesystemBlobStore, GraphStore};
use crate::vocabulary::{normalize, validate_relationship_type, VocabularyManager};

const MOST_ACCESSED_CONTEXT_SIZE: usize = 3;

/// Per-document ingestion totals (§4.2 contract).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct IngestionStats {
    pub chunks_processed: usize,
    pub sources_created: usize,
    pub concepts_created: usize,
    pub concepts_linked: usize,
    pub instances_created: usize,
    pub relationships_created: usize,
    /// Populated only by a token-accounting LLM provider; 0 otherwise.
    pub extraction_tokens: u64,
    /// Populated only by a token-accounting embedding provider; 0 otherwise.
    pub embedding_tokens: u64,
}

impl IngestionStats {
    fn merge(&mut self, other: &IngestionStats) {
        self.chunks_processed += other.chunks_processed;
        self.sources_created += other.sources_created;
        self.concepts_created += other.concepts_created;
        self.concepts_linked += other.concepts_linked;
        self.instances_created += other.instances_created;
        self.relationships_created += other.relationships_created;
        self.extraction_tokens += other.extraction_tokens;
        self.embedding_tokens += other.embedding_tokens;
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn GraphStore>,
    llm: Arc<dyn LlmCapability>,
    embedder: Arc<dyn Embedder>,
    vocabulary: Arc<VocabularyManager>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LlmCapability>,
        embedder: Arc<dyn Embedder>,
        vocabulary: Arc<VocabularyManager>,
        config: IngestionConfig,
    ) -> Self {
        Self { store, llm, embedder, vocabulary, config }
    }

    /// Ingest every chunk of one document, strictly in order, updating
    /// `document.source_ids` as Sources are materialized.
    pub async fn ingest_document(
        &self,
        ontology: &OntologyId,
        document: &mut DocumentMeta,
        chunks: &[SemanticChunk],
    ) -> EngineResult<IngestionStats> {
        let mut stats = IngestionStats::default();
        let mut carry_over: VecDeque<Vec<(String, ConceptId)>> = VecDeque::new();

        for chunk in chunks {
            let chunk_stats = self.ingest_chunk(ontology, document, chunk, &mut carry_over).await?;
            stats.merge(&chunk_stats);
        }

        self.store.save_document_meta(document)?;
        Ok(stats)
    }

    async fn ingest_chunk(
        &self,
        ontology: &OntologyId,
        document: &mut DocumentMeta,
        chunk: &SemanticChunk,
        carry_over: &mut VecDeque<Vec<(String, ConceptId)>>,
    ) -> EngineResult<IngestionStats> {
        let mut stats = IngestionStats::default();

        // Step 1: deterministic Source materialization (idempotent re-ingest).
        let source_id = Source::deterministic_id(&document.filename, chunk.chunk_number);
        let content_hash = FilesystemBlobStore::content_key(chunk.text.as_bytes());
        if self.store.load_source(&source_id)?.is_none() {
            let source = Source {
                source_id: source_id.clone(),
                document: ontology.clone(),
                document_id: document.document_id.clone(),
                paragraph: chunk.chunk_number,
                full_text: chunk.text.clone(),
                content_type: crate::domain::ContentType::Text,
                storage_key: None,
                start_position: chunk.start_position,
                end_position: chunk.end_position,
                content_hash,
            };
            self.store.save_source(&source)?;
            stats.sources_created += 1;
            document.source_ids.push(source_id.clone());
        }

        // Step 2: recent + most-accessed concept context.
        let context_labels = self.context_labels(ontology, carry_over)?;

        // Step 3: LLM extraction.
        let extraction = self
            .llm
            .extract_concepts(&chunk.text, &context_labels)
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("extraction failed: {e}")))?;

        // Step 4: per-concept embed + link-or-create.
        let mut llm_id_map: std::collections::HashMap<String, ConceptId> = std::collections::HashMap::new();
        let attempted = extraction.concepts.len();
        let mut chunk_concepts: Vec<(String, ConceptId)> = Vec::new();

        for extracted in &extraction.concepts {
            match self.link_or_create_concept(ontology, &source_id, extracted, &mut stats) {
                Ok(concept_id) => {
                    llm_id_map.insert(extracted.llm_id.clone(), concept_id.clone());
                    chunk_concepts.push((extracted.label.clone(), concept_id));
                }
                Err(_) => continue,
            }
        }
        if attempted > 0 && llm_id_map.is_empty() {
            return Err(EngineError::Fatal(format!(
                "all {attempted} concepts failed in chunk {} (likely an embedding outage)",
                chunk.chunk_number
            )));
        }

        // Step 5: instances.
        for extracted in &extraction.instances {
            let Some(concept_id) = llm_id_map.get(&extracted.concept_llm_id) else {
                continue;
            };
            let instance = Instance::new(concept_id.clone(), source_id.clone(), extracted.quote.clone());
            self.store.save_instance(&instance)?;
            stats.instances_created += 1;
        }

        // Step 6: relationships, normalized onto the canonical vocabulary.
        for extracted in &extraction.relationships {
            let (Some(from), Some(to)) =
                (llm_id_map.get(&extracted.from_llm_id), llm_id_map.get(&extracted.to_llm_id))
            else {
                continue;
            };
            if self.materialize_relationship(from, to, extracted).is_ok() {
                stats.relationships_created += 1;
            }
        }

        carry_over.push_back(chunk_concepts);
        while carry_over.len() > self.config.carry_over_chunks {
            carry_over.pop_front();
        }

        stats.chunks_processed += 1;
        Ok(stats)
    }

    fn context_labels(
        &self,
        ontology: &OntologyId,
        carry_over: &VecDeque<Vec<(String, ConceptId)>>,
    ) -> EngineResult<Vec<String>> {
        let mut labels: Vec<String> = carry_over.iter().flatten().map(|(label, _)| label.clone()).collect();

        let mut existing = self.store.concepts_in_ontology(ontology)?;
        existing.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        for concept in existing.into_iter().take(MOST_ACCESSED_CONTEXT_SIZE) {
            if !labels.contains(&concept.label) {
                labels.push(concept.label);
            }
        }
        Ok(labels)
    }

    fn link_or_create_concept(
        &self,
        ontology: &OntologyId,
        source_id: &crate::domain::SourceId,
        extracted: &crate::llm::ExtractedConcept,
        stats: &mut IngestionStats,
    ) -> EngineResult<ConceptId> {
        let embedding = self
            .embedder
            .embed_one(EmbeddingKind::Concept, &extracted.label)
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        if let Some(existing_id) = self.best_match(ontology, &embedding)? {
            stats.concepts_linked += 1;
            return Ok(existing_id);
        }

        let mut concept = Concept::new(ontology.clone(), extracted.label.clone(), CreationMethod::LlmExtraction);
        concept.concept_id = Concept::generated_id(source_id);
        concept.search_terms = extracted.search_terms.iter().cloned().collect();
        concept.embedding = embedding;
        self.store.save_concept(&concept)?;
        stats.concepts_created += 1;
        Ok(concept.concept_id)
    }

    fn best_match(&self, ontology: &OntologyId, embedding: &[f32]) -> EngineResult<Option<ConceptId>> {
        let existing = self.store.concepts_in_ontology(ontology)?;
        let mut best: Option<(ConceptId, f32)> = None;
        for candidate in existing {
            if candidate.embedding.is_empty() {
                continue;
            }
            let similarity = cosine_similarity(embedding, &candidate.embedding);
            let better = best.as_ref().map(|(_, b)| similarity > *b).unwrap_or(true);
            if better {
                best = Some((candidate.concept_id, similarity));
            }
        }
        Ok(best
            .filter(|(_, similarity)| *similarity >= self.config.concept_link_threshold)
            .map(|(id, _)| id))
    }

    fn materialize_relationship(
        &self,
        from: &ConceptId,
        to: &ConceptId,
        extracted: &crate::llm::ExtractedRelationship,
    ) -> EngineResult<()> {
        let canonical = self.store.list_vocab_types(false)?;
        let (relationship_type, category) = match normalize(&extracted.relationship_type, &canonical) {
            Some(outcome) => (outcome.canonical_type, outcome.category),
            None => {
                validate_relationship_type(&extracted.relationship_type)?;
                let direction = parse_direction(&extracted.direction_semantics);
                let mut vocab_type = VocabType::new_llm_generated(extracted.relationship_type.clone(), direction);
                self.vocabulary.embed_vocab_type(&mut vocab_type)?;
                (vocab_type.name, RelationshipCategory::LlmGenerated)
            }
        };

        let direction = parse_direction(&extracted.direction_semantics);
        let relationship = Relationship::new(
            from.clone(),
            to.clone(),
            relationship_type,
            category,
            extracted.confidence,
            RelationshipSource::LlmExtraction,
            "ingestion-pipeline",
            direction,
        );
        self.store.save_relationship(&relationship)?;
        Ok(())
    }
}

fn parse_direction(raw: &str) -> DirectionSemantics {
    match raw.to_ascii_lowercase().as_str() {
        "inward" => DirectionSemantics::Inward,
        "bidirectional" => DirectionSemantics::Bidirectional,
        _ => DirectionSemantics::Outward,
    }
}
