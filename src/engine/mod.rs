//! The central `Engine`: an in-memory concept cache over a `GraphStore`,
//! kept coherent across engine instances via a `data_version` counter
//! (§5 ambient note), mirroring the teacher's `PlexusEngine`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::{Concept, ConceptId, Ontology, OntologyId};
use crate::error::{EngineError, EngineResult};
use crate::storage::GraphStore;

/// In-memory concept cache backed by a `GraphStore`, refreshed on-demand via
/// [`Engine::reload_if_changed`] rather than eagerly kept in lockstep.
pub struct Engine {
    store: Arc<dyn GraphStore>,
    concepts: DashMap<ConceptId, Concept>,
    ontologies: DashMap<OntologyId, Ontology>,
    last_data_version: AtomicU64,
}

impl Engine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            concepts: DashMap::new(),
            ontologies: DashMap::new(),
            last_data_version: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Hydrate the in-memory cache from storage. Call once on startup.
    pub fn load_all(&self) -> EngineResult<usize> {
        let ontologies = self.store.list_ontologies()?;
        let mut loaded = 0;
        for ontology in ontologies {
            for concept in self.store.concepts_in_ontology(&ontology.id)? {
                self.concepts.insert(concept.concept_id.clone(), concept);
                loaded += 1;
            }
            self.ontologies.insert(ontology.id.clone(), ontology);
        }
        if let Ok(v) = self.store.data_version() {
            self.last_data_version.store(v, Ordering::Release);
        }
        Ok(loaded)
    }

    /// Check `data_version` and reload the cache if storage changed under
    /// us (e.g. another process wrote through the same database).
    pub fn reload_if_changed(&self) -> EngineResult<bool> {
        let current = self.store.data_version()?;
        let last = self.last_data_version.load(Ordering::Acquire);
        if current == last {
            return Ok(false);
        }

        let ontologies = self.store.list_ontologies()?;
        let mut live_concepts: HashSet<ConceptId> = HashSet::new();
        for ontology in &ontologies {
            for concept in self.store.concepts_in_ontology(&ontology.id)? {
                live_concepts.insert(concept.concept_id.clone());
                self.concepts.insert(concept.concept_id.clone(), concept);
            }
        }
        self.concepts.retain(|id, _| live_concepts.contains(id));

        let live_ontologies: HashSet<OntologyId> = ontologies.iter().map(|o| o.id.clone()).collect();
        self.ontologies.retain(|id, _| live_ontologies.contains(id));
        for ontology in ontologies {
            self.ontologies.insert(ontology.id.clone(), ontology);
        }

        self.last_data_version.store(current, Ordering::Release);
        Ok(true)
    }

    pub fn cached_concept(&self, id: &ConceptId) -> Option<Concept> {
        self.concepts.get(id).map(|c| c.clone())
    }

    pub fn cached_ontology(&self, id: &OntologyId) -> Option<Ontology> {
        self.ontologies.get(id).map(|o| o.clone())
    }

    /// Create a new concept, requiring the owning ontology to exist and not
    /// be frozen (§3 lifecycle).
    pub fn create_concept(&self, mut concept: Concept) -> EngineResult<Concept> {
        let ontology = self
            .store
            .load_ontology(&concept.ontology)?
            .ok_or_else(|| EngineError::NotFound(format!("ontology not found: {}", concept.ontology)))?;
        if ontology.is_frozen() {
            return Err(EngineError::Conflict(format!("ontology {} is frozen", ontology.id)));
        }
        concept.access_count = 0;
        self.store.save_concept(&concept)?;
        self.concepts.insert(concept.concept_id.clone(), concept.clone());
        Ok(concept)
    }

    pub fn touch_concept(&self, id: &ConceptId) -> EngineResult<()> {
        self.store.increment_access_count(id)?;
        if let Some(mut entry) = self.concepts.get_mut(id) {
            entry.access_count += 1;
        }
        Ok(())
    }

    pub fn ensure_ontology(&self, name: &str) -> EngineResult<Ontology> {
        let sanitized = crate::domain::sanitize_identifier(name);
        let id = OntologyId::from_string(sanitized);
        if let Some(existing) = self.store.load_ontology(&id)? {
            return Ok(existing);
        }
        let ontology = Ontology::new(name);
        self.store.save_ontology(&ontology)?;
        self.ontologies.insert(ontology.id.clone(), ontology.clone());
        Ok(ontology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreationMethod;
    use crate::storage::{OpenStore, SqliteStore};

    #[test]
    fn create_concept_populates_cache() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = Engine::new(store);
        let ontology = engine.ensure_ontology("ai-research").unwrap();
        let concept = Concept::new(ontology.id.clone(), "Neural Networks", CreationMethod::LlmExtraction);
        let created = engine.create_concept(concept).unwrap();
        assert!(engine.cached_concept(&created.concept_id).is_some());
    }

    #[test]
    fn create_concept_rejected_in_frozen_ontology() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = Engine::new(store.clone());
        let mut ontology = engine.ensure_ontology("frozen-set").unwrap();
        ontology.state = crate::domain::OntologyState::Frozen;
        store.save_ontology(&ontology).unwrap();
        let concept = Concept::new(ontology.id.clone(), "X", CreationMethod::Api);
        assert!(engine.create_concept(concept).is_err());
    }

    #[test]
    fn reload_if_changed_picks_up_external_write() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = Engine::new(store.clone());
        let ontology = engine.ensure_ontology("ai-research").unwrap();
        engine.load_all().unwrap();

        let concept = Concept::new(ontology.id.clone(), "External Concept", CreationMethod::Api);
        store.save_concept(&concept).unwrap();

        assert!(engine.cached_concept(&concept.concept_id).is_none());
        let reloaded = engine.reload_if_changed().unwrap();
        assert!(reloaded);
        assert!(engine.cached_concept(&concept.concept_id).is_some());
    }

    #[test]
    fn reload_if_changed_is_noop_when_unchanged() {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = Engine::new(store);
        engine.load_all().unwrap();
        assert!(!engine.reload_if_changed().unwrap());
    }
}
