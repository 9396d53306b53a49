//! SqliteVecStore — persistent vector storage via sqlite-vec (§4.6, §4.7).
//!
//! Implements KNN similarity search over Concept and VocabType embeddings
//! using a sqlite-vec virtual table. Each ontology gets its own partition via
//! the `ontology TEXT PARTITION KEY` column; vectors are L2-normalized on
//! insert so that vec0's L2 distance converts to cosine similarity:
//! `sim = 1 - dist² / 2`.
//!
//! Uses its own database connection (WAL mode) to avoid contention with the
//! main `SqliteStore` connection.

#[cfg(feature = "embeddings")]
mod inner {
    use rusqlite::Connection;
    use sqlite_vec::sqlite3_vec_init;
    use std::path::Path;
    use std::sync::Mutex;

    /// nomic-embed-text-v1.5 produces 768-dim vectors (matches the default
    /// fastembed model in §4.7).
    pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EmbeddedKind {
        Concept,
        VocabularyType,
    }

    impl EmbeddedKind {
        fn as_str(self) -> &'static str {
            match self {
                EmbeddedKind::Concept => "concept",
                EmbeddedKind::VocabularyType => "vocabulary_type",
            }
        }
    }

    /// Persistent vector store backed by sqlite-vec, scoped by ontology and
    /// by entity kind (§4.7: `kind ∈ {concept, vocabulary_type}`).
    pub struct SqliteVecStore {
        conn: Mutex<Connection>,
        dimensions: usize,
    }

    fn register_vec_extension() {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite3_vec_init as *const (),
            )));
        });
    }

    impl SqliteVecStore {
        pub fn open(path: &Path, dimensions: usize) -> Result<Self, String> {
            register_vec_extension();
            let conn = Connection::open(path).map_err(|e| e.to_string())?;
            Self::init_connection(conn, dimensions)
        }

        pub fn open_in_memory(dimensions: usize) -> Result<Self, String> {
            register_vec_extension();
            let conn = Connection::open_in_memory().map_err(|e| e.to_string())?;
            Self::init_connection(conn, dimensions)
        }

        fn init_connection(conn: Connection, dimensions: usize) -> Result<Self, String> {
            conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(|e| e.to_string())?;
            let create_sql = format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vec_embeddings USING vec0(\
                     ontology TEXT PARTITION KEY,\
                     entity_id TEXT,\
                     kind TEXT,\
                     embedding float[{dimensions}]\
                 )"
            );
            conn.execute_batch(&create_sql).map_err(|e| e.to_string())?;
            Ok(Self { conn: Mutex::new(conn), dimensions })
        }

        pub fn dimensions(&self) -> usize {
            self.dimensions
        }

        /// Store the (already-computed) embedding for an entity, L2-normalized.
        pub fn store(&self, ontology: &str, kind: EmbeddedKind, entity_id: &str, vector: Vec<f32>) {
            let mut normalized = vector;
            l2_normalize(&mut normalized);
            let conn = self.conn.lock().unwrap();
            let bytes = f32_slice_as_bytes(&normalized);
            conn.execute(
                "DELETE FROM vec_embeddings WHERE ontology = ?1 AND entity_id = ?2 AND kind = ?3",
                rusqlite::params![ontology, entity_id, kind.as_str()],
            )
            .expect("vec_embeddings DELETE-before-insert failed");
            conn.execute(
                "INSERT INTO vec_embeddings(ontology, entity_id, kind, embedding) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![ontology, entity_id, kind.as_str(), bytes],
            )
            .expect("vec_embeddings INSERT failed");
        }

        pub fn has(&self, ontology: &str, kind: EmbeddedKind, entity_id: &str) -> bool {
            let conn = self.conn.lock().unwrap();
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM vec_embeddings WHERE ontology = ?1 AND entity_id = ?2 AND kind = ?3",
                    rusqlite::params![ontology, entity_id, kind.as_str()],
                    |row| row.get(0),
                )
                .unwrap_or(0);
            count > 0
        }

        /// Cosine-similarity KNN search within `ontology` and `kind`, at or
        /// above `threshold`, limited to `limit` results.
        pub fn find_similar(
            &self,
            ontology: &str,
            kind: EmbeddedKind,
            query: &[f32],
            threshold: f32,
            limit: usize,
        ) -> Vec<(String, f32)> {
            let mut normalized_query = query.to_vec();
            l2_normalize(&mut normalized_query);
            let conn = self.conn.lock().unwrap();
            let bytes = f32_slice_as_bytes(&normalized_query);

            let mut stmt = conn
                .prepare(
                    "SELECT entity_id, kind, distance FROM vec_embeddings \
                     WHERE embedding MATCH ?1 AND ontology = ?2 AND k = ?3",
                )
                .expect("vec_embeddings KNN prepare failed");

            stmt.query_map(
                rusqlite::params![bytes, ontology, (limit * 4).max(limit) as i64],
                |row| {
                    let entity_id: String = row.get(0)?;
                    let row_kind: String = row.get(1)?;
                    let distance: f32 = row.get(2)?;
                    Ok((entity_id, row_kind, distance))
                },
            )
            .expect("vec_embeddings KNN query failed")
            .filter_map(|r| r.ok())
            .filter(|(_, row_kind, _)| row_kind == kind.as_str())
            .filter_map(|(entity_id, _, distance)| {
                let similarity = 1.0 - (distance * distance) / 2.0;
                if similarity >= threshold {
                    Some((entity_id, similarity))
                } else {
                    None
                }
            })
            .take(limit)
            .collect()
        }

        pub fn delete(&self, ontology: &str, kind: EmbeddedKind, entity_id: &str) {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM vec_embeddings WHERE ontology = ?1 AND entity_id = ?2 AND kind = ?3",
                rusqlite::params![ontology, entity_id, kind.as_str()],
            )
            .expect("vec_embeddings DELETE failed");
        }
    }

    /// # Safety
    /// f32 has no padding and a fixed layout; this is a trivial reinterpretation.
    fn f32_slice_as_bytes(slice: &[f32]) -> &[u8] {
        unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len() * 4) }
    }

    fn l2_normalize(v: &mut [f32]) {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn store_and_has_round_trip() {
            let store = SqliteVecStore::open_in_memory(3).expect("should open in-memory store");
            assert!(!store.has("ai-research", EmbeddedKind::Concept, "travel"));
            store.store("ai-research", EmbeddedKind::Concept, "travel", vec![0.9, 0.3, 0.1]);
            assert!(store.has("ai-research", EmbeddedKind::Concept, "travel"));
        }

        #[test]
        fn find_similar_above_threshold() {
            let store = SqliteVecStore::open_in_memory(3).expect("should open in-memory store");
            store.store("ai-research", EmbeddedKind::Concept, "travel", vec![0.9, 0.3, 0.1]);
            store.store("ai-research", EmbeddedKind::Concept, "journey", vec![0.85, 0.35, 0.15]);
            store.store("ai-research", EmbeddedKind::Concept, "democracy", vec![0.1, 0.2, 0.95]);

            let results = store.find_similar("ai-research", EmbeddedKind::Concept, &[0.9, 0.3, 0.1], 0.9, 10);

            assert!(results.iter().any(|(id, _)| id == "travel"));
            assert!(results.iter().any(|(id, _)| id == "journey"));
            assert!(!results.iter().any(|(id, _)| id == "democracy"));
        }

        #[test]
        fn find_similar_below_threshold_returns_nothing() {
            let store = SqliteVecStore::open_in_memory(3).expect("should open in-memory store");
            store.store("ai-research", EmbeddedKind::Concept, "democracy", vec![0.1, 0.2, 0.95]);
            let results = store.find_similar("ai-research", EmbeddedKind::Concept, &[0.9, 0.3, 0.1], 0.9, 10);
            assert!(results.is_empty());
        }

        #[test]
        fn ontology_isolation() {
            let store = SqliteVecStore::open_in_memory(3).expect("should open in-memory store");
            store.store("ontology-a", EmbeddedKind::Concept, "travel", vec![0.9, 0.3, 0.1]);
            let results = store.find_similar("ontology-b", EmbeddedKind::Concept, &[0.9, 0.3, 0.1], 0.5, 10);
            assert!(results.is_empty());
            assert!(store.has("ontology-a", EmbeddedKind::Concept, "travel"));
            assert!(!store.has("ontology-b", EmbeddedKind::Concept, "travel"));
        }

        #[test]
        fn kind_partitions_concept_and_vocabulary_type() {
            let store = SqliteVecStore::open_in_memory(3).expect("should open in-memory store");
            store.store("ai-research", EmbeddedKind::Concept, "shared-id", vec![0.9, 0.3, 0.1]);
            store.store("ai-research", EmbeddedKind::VocabularyType, "shared-id", vec![0.1, 0.3, 0.9]);
            let concept_hits = store.find_similar("ai-research", EmbeddedKind::Concept, &[0.9, 0.3, 0.1], 0.9, 10);
            assert_eq!(concept_hits.len(), 1);
        }
    }
}

#[cfg(feature = "embeddings")]
pub use inner::{EmbeddedKind, SqliteVecStore, DEFAULT_EMBEDDING_DIMENSIONS};
