//! Raw query pass-through (§4.6): a thin, deliberately small surface over
//! `GraphStore::find_relationships`. Any relationship-type literal is
//! validated against the §3 identifier grammar before it reaches storage,
//! closing the injection path named in §9.

use std::collections::HashSet;
use std::time::Instant;

use crate::domain::{Concept, ConceptId, Relationship};
use crate::error::EngineResult;
use crate::storage::{EdgeFilter, GraphStore};
use crate::vocabulary::validate_relationship_type;

#[derive(Debug, Clone, serde::Serialize)]
pub struct RawQueryResult {
    pub nodes: Vec<Concept>,
    pub relationships: Vec<Relationship>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

pub fn execute_raw_query(
    store: &dyn GraphStore,
    relationship_type: Option<&str>,
    min_confidence: Option<f32>,
    limit: Option<usize>,
) -> EngineResult<RawQueryResult> {
    if let Some(rt) = relationship_type {
        validate_relationship_type(rt)?;
    }
    let started = Instant::now();

    let filter = EdgeFilter { relationship_type: relationship_type.map(String::from), min_confidence, limit };
    let relationships = store.find_relationships(&filter)?;

    let mut node_ids: HashSet<ConceptId> = HashSet::new();
    for r in &relationships {
        node_ids.insert(r.from_concept.clone());
        node_ids.insert(r.to_concept.clone());
    }
    let mut nodes = Vec::new();
    for id in node_ids {
        if let Some(concept) = store.load_concept(&id)? {
            nodes.push(concept);
        }
    }

    let row_count = relationships.len();
    let execution_time_ms = started.elapsed().as_millis() as u64;
    Ok(RawQueryResult { nodes, relationships, row_count, execution_time_ms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreationMethod, DirectionSemantics, OntologyId, RelationshipCategory, RelationshipSource};
    use crate::error::EngineError;
    use crate::storage::{OpenStore, SqliteStore};

    #[test]
    fn rejects_malformed_relationship_type_literal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = execute_raw_query(&store, Some("causes; DROP TABLE"), None, None);
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn filters_by_relationship_type_and_reports_row_count() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let a = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        let b = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        let relationship = Relationship::new(
            a.concept_id.clone(),
            b.concept_id.clone(),
            "CAUSES",
            RelationshipCategory::Causal,
            0.9,
            RelationshipSource::HumanCuration,
            "tester",
            DirectionSemantics::Outward,
        );
        store.save_relationship(&relationship).unwrap();

        let result = execute_raw_query(&store, Some("CAUSES"), None, None).unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.nodes.len(), 2);
    }
}
