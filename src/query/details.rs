//! Concept details (§4.6): one concept's full evidentiary picture — its
//! instances with document provenance, its outbound relationships annotated
//! with vocabulary category and epistemic status, and optional grounding
//! and diversity enrichment.

use crate::domain::{
    Concept, ConceptId, DocumentMeta, EpistemicStatus, Instance, Relationship, RelationshipCategory,
};
use crate::embedding::Embedder;
use crate::error::{EngineError, EngineResult};
use crate::storage::GraphStore;

use super::common::concept_grounding_strength;
use super::diversity::{analyze_diversity, DiversityResult};

#[derive(Debug, Clone, serde::Serialize)]
pub struct InstanceWithProvenance {
    pub instance: Instance,
    pub document: Option<DocumentMeta>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelationshipView {
    pub relationship: Relationship,
    pub category: RelationshipCategory,
    pub epistemic_status: EpistemicStatus,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConceptDetails {
    pub concept: Concept,
    pub instances: Vec<InstanceWithProvenance>,
    pub outbound: Vec<RelationshipView>,
    pub grounding_strength: Option<f32>,
    pub diversity: Option<DiversityResult>,
}

#[derive(Debug, Clone)]
pub struct ConceptDetailsOptions {
    pub include_grounding: bool,
    pub include_diversity: bool,
    pub diversity_max_hops: usize,
    pub diversity_limit: usize,
}

impl Default for ConceptDetailsOptions {
    fn default() -> Self {
        Self { include_grounding: false, include_diversity: false, diversity_max_hops: 1, diversity_limit: 20 }
    }
}

pub fn get_concept_details(
    store: &dyn GraphStore,
    embedder: &dyn Embedder,
    concept_id: &ConceptId,
    options: &ConceptDetailsOptions,
) -> EngineResult<ConceptDetails> {
    let _ = embedder; // reserved: future enrichment paths may need re-embedding
    let concept = store
        .load_concept(concept_id)?
        .ok_or_else(|| EngineError::NotFound(format!("concept {}", concept_id.as_str())))?;

    let mut instances_raw = store.instances_for_concept(concept_id)?;
    instances_raw.sort_by(|a, b| source_sort_key(store, a).cmp(&source_sort_key(store, b)));

    let mut instances = Vec::with_capacity(instances_raw.len());
    for instance in instances_raw {
        let document = document_for_instance(store, &instance)?;
        instances.push(InstanceWithProvenance { instance, document });
    }

    let mut outbound = Vec::new();
    for relationship in store.edges_from(concept_id)? {
        let vocab = store.load_vocab_type(&relationship.relationship_type)?;
        let (category, epistemic_status) = vocab
            .map(|v| (v.category, v.epistemic_status))
            .unwrap_or((relationship.category, EpistemicStatus::Unclassified));
        outbound.push(RelationshipView { relationship, category, epistemic_status });
    }

    let grounding_strength = if options.include_grounding {
        concept_grounding_strength(store, concept_id)?
    } else {
        None
    };

    let diversity = if options.include_diversity {
        analyze_diversity(store, concept_id, options.diversity_max_hops, options.diversity_limit, grounding_strength)?
    } else {
        None
    };

    Ok(ConceptDetails { concept, instances, outbound, grounding_strength, diversity })
}

/// `(filename, paragraph)` ordering key, matching the "ordered by
/// document/paragraph" contract; missing sources sort last.
fn source_sort_key(store: &dyn GraphStore, instance: &Instance) -> (String, usize) {
    match store.load_source(&instance.source_id) {
        Ok(Some(source)) => {
            let filename = store
                .load_document_meta(&source.document_id)
                .ok()
                .flatten()
                .map(|d| d.filename)
                .unwrap_or_default();
            (filename, source.paragraph)
        }
        _ => (String::from('\u{10FFFF}'), usize::MAX),
    }
}

fn document_for_instance(store: &dyn GraphStore, instance: &Instance) -> EngineResult<Option<DocumentMeta>> {
    let Some(source) = store.load_source(&instance.source_id)? else {
        return Ok(None);
    };
    Ok(store.load_document_meta(&source.document_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ContentType, CreationMethod, DirectionSemantics, DocumentSourceType, Ontology, OntologyId,
        RelationshipSource, Source, VocabType,
    };
    use crate::embedding::MockEmbedder;
    use crate::storage::{OpenStore, SqliteStore};

    fn setup() -> (SqliteStore, OntologyId) {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        store.save_ontology(&Ontology::new("o")).unwrap();
        (store, ontology)
    }

    #[test]
    fn details_include_instances_with_document_provenance() {
        let (store, ontology) = setup();
        let document = DocumentMeta {
            document_id: crate::domain::DocumentId::new(),
            filename: "paper.md".to_string(),
            source_type: DocumentSourceType::File,
            hostname: None,
            file_path: None,
            ingested_by: "tester".to_string(),
            created_at: chrono::Utc::now(),
            job_id: None,
            source_ids: Vec::new(),
        };
        store.save_document_meta(&document).unwrap();

        let concept = Concept::new(ontology.clone(), "Neural Networks", CreationMethod::Api);
        store.save_concept(&concept).unwrap();

        let source = Source {
            source_id: crate::domain::SourceId::from_string("paper.md_chunk1"),
            document: ontology.clone(),
            document_id: document.document_id.clone(),
            paragraph: 1,
            full_text: "Neural networks are a technique.".to_string(),
            content_type: ContentType::Text,
            storage_key: None,
            start_position: 0,
            end_position: 10,
            content_hash: "abc".to_string(),
        };
        store.save_source(&source).unwrap();

        let instance = Instance::new(concept.concept_id.clone(), source.source_id.clone(), "quote");
        store.save_instance(&instance).unwrap();

        let embedder = MockEmbedder::default();
        let details =
            get_concept_details(&store, &embedder, &concept.concept_id, &ConceptDetailsOptions::default()).unwrap();

        assert_eq!(details.instances.len(), 1);
        assert_eq!(details.instances[0].document.as_ref().unwrap().filename, "paper.md");
    }

    #[test]
    fn outbound_relationships_carry_vocab_category_and_epistemic_status() {
        let (store, ontology) = setup();
        let from = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        let to = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        store.save_concept(&from).unwrap();
        store.save_concept(&to).unwrap();

        let mut vocab = VocabType::new_builtin("CAUSES", RelationshipCategory::Causal, DirectionSemantics::Outward);
        vocab.epistemic_status = EpistemicStatus::Affirmative;
        store.save_vocab_type(&vocab).unwrap();

        let relationship = Relationship::new(
            from.concept_id.clone(),
            to.concept_id.clone(),
            "CAUSES",
            RelationshipCategory::Causal,
            0.8,
            RelationshipSource::HumanCuration,
            "tester",
            DirectionSemantics::Outward,
        );
        store.save_relationship(&relationship).unwrap();

        let embedder = MockEmbedder::default();
        let details =
            get_concept_details(&store, &embedder, &from.concept_id, &ConceptDetailsOptions::default()).unwrap();

        assert_eq!(details.outbound.len(), 1);
        assert_eq!(details.outbound[0].epistemic_status, EpistemicStatus::Affirmative);
    }

    #[test]
    fn unknown_concept_is_not_found() {
        let (store, _ontology) = setup();
        let embedder = MockEmbedder::default();
        let result = get_concept_details(
            &store,
            &embedder,
            &ConceptId::from_string("missing"),
            &ConceptDetailsOptions::default(),
        );
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
