//! SQLite storage backend.
//!
//! One connection guarded by a `Mutex`, matching the engine's single-writer
//! assumption (§5: multi-step writes run inside one transaction). Structured
//! fields (embeddings, search terms, JSON payloads) are stored as JSON text
//! columns; `data_version` is a single-row counter bumped by every mutating
//! statement so the engine cache knows when to reload.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::traits::{EdgeFilter, GraphStore, NodeFilter, OpenStore, StorageError, StorageResult};
use crate::domain::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO meta(key, value) VALUES ('data_version', 0);

            CREATE TABLE IF NOT EXISTS ontologies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sources (
                source_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                document_id TEXT NOT NULL DEFAULT '',
                paragraph INTEGER NOT NULL,
                full_text TEXT NOT NULL,
                content_type TEXT NOT NULL,
                storage_key TEXT,
                start_position INTEGER NOT NULL,
                end_position INTEGER NOT NULL,
                content_hash TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sources_document ON sources(document);

            CREATE TABLE IF NOT EXISTS document_meta (
                document_id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                source_type TEXT NOT NULL,
                hostname TEXT,
                file_path TEXT,
                ingested_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                job_id TEXT,
                source_ids_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS concepts (
                concept_id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                description TEXT,
                search_terms_json TEXT NOT NULL,
                embedding_json TEXT NOT NULL,
                ontology TEXT NOT NULL,
                creation_method TEXT NOT NULL,
                access_count INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_concepts_ontology ON concepts(ontology);
            CREATE INDEX IF NOT EXISTS idx_concepts_label ON concepts(ontology, label);

            CREATE TABLE IF NOT EXISTS instances (
                instance_id TEXT PRIMARY KEY,
                concept_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                quote TEXT NOT NULL,
                FOREIGN KEY (concept_id) REFERENCES concepts(concept_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_instances_concept ON instances(concept_id);
            CREATE INDEX IF NOT EXISTS idx_instances_source ON instances(source_id);

            CREATE TABLE IF NOT EXISTS relationships (
                relationship_id TEXT PRIMARY KEY,
                from_concept TEXT NOT NULL,
                to_concept TEXT NOT NULL,
                relationship_type TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                source TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                document_id TEXT,
                direction_semantics TEXT NOT NULL,
                FOREIGN KEY (from_concept) REFERENCES concepts(concept_id),
                FOREIGN KEY (to_concept) REFERENCES concepts(concept_id)
            );
            CREATE INDEX IF NOT EXISTS idx_rel_from ON relationships(from_concept);
            CREATE INDEX IF NOT EXISTS idx_rel_to ON relationships(to_concept);
            CREATE INDEX IF NOT EXISTS idx_rel_type ON relationships(relationship_type);

            CREATE TABLE IF NOT EXISTS vocab_types (
                name TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                description TEXT,
                embedding_json TEXT,
                is_builtin INTEGER NOT NULL,
                is_active INTEGER NOT NULL,
                usage_count INTEGER NOT NULL,
                epistemic_status TEXT NOT NULL,
                avg_grounding REAL NOT NULL,
                direction_semantics TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vocab_categories (
                name TEXT PRIMARY KEY,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS merge_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deprecated_type TEXT NOT NULL,
                target_type TEXT NOT NULL,
                similarity REAL NOT NULL,
                edges_rewritten INTEGER NOT NULL,
                decided_by TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                artifact_type TEXT NOT NULL,
                representation TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                graph_epoch INTEGER NOT NULL,
                parameters_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                ontology TEXT NOT NULL,
                concept_ids_json TEXT NOT NULL,
                inline_result TEXT,
                garage_key TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT,
                CHECK ((inline_result IS NULL) != (garage_key IS NULL))
            );
            CREATE INDEX IF NOT EXISTS idx_artifacts_owner ON artifacts(owner_id);
            CREATE INDEX IF NOT EXISTS idx_artifacts_expires ON artifacts(expires_at);

            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                job_type TEXT NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                payload_json TEXT NOT NULL DEFAULT 'null',
                progress_json TEXT NOT NULL,
                result_json TEXT,
                error TEXT,
                artifact_id TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            "#,
        )?;
        Ok(())
    }

    fn bump_data_version(conn: &Connection) -> StorageResult<()> {
        conn.execute("UPDATE meta SET value = value + 1 WHERE key = 'data_version'", [])?;
        Ok(())
    }

    fn row_to_ontology(row: &rusqlite::Row) -> rusqlite::Result<Ontology> {
        let state_str: String = row.get(2)?;
        Ok(Ontology {
            id: OntologyId::from_string(row.get::<_, String>(0)?),
            name: row.get(1)?,
            state: if state_str == "frozen" {
                OntologyState::Frozen
            } else {
                OntologyState::Active
            },
            created_at: parse_dt(row.get::<_, String>(3)?),
        })
    }

    fn row_to_concept(row: &rusqlite::Row) -> rusqlite::Result<Concept> {
        let search_terms_json: String = row.get(3)?;
        let embedding_json: String = row.get(4)?;
        let creation_method_str: String = row.get(6)?;
        Ok(Concept {
            concept_id: ConceptId::from_string(row.get::<_, String>(0)?),
            label: row.get(1)?,
            description: row.get(2)?,
            search_terms: serde_json::from_str(&search_terms_json).unwrap_or_default(),
            embedding: serde_json::from_str(&embedding_json).unwrap_or_default(),
            ontology: OntologyId::from_string(row.get::<_, String>(5)?),
            creation_method: creation_method_from_str(&creation_method_str),
            access_count: row.get::<_, i64>(7)? as u64,
            created_at: parse_dt(row.get::<_, String>(8)?),
        })
    }

    fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<Relationship> {
        let category: String = row.get(4)?;
        let source: String = row.get(6)?;
        let direction: String = row.get(10)?;
        Ok(Relationship {
            relationship_id: RelationshipId::from_string(row.get::<_, String>(0)?),
            from_concept: ConceptId::from_string(row.get::<_, String>(1)?),
            to_concept: ConceptId::from_string(row.get::<_, String>(2)?),
            relationship_type: row.get(3)?,
            category: category_from_str(&category),
            confidence: row.get(5)?,
            source: source_from_str(&source),
            created_by: row.get(7)?,
            created_at: parse_dt(row.get::<_, String>(8)?),
            document_id: row.get::<_, Option<String>>(9)?.map(DocumentId::from_string),
            direction_semantics: direction_from_str(&direction),
        })
    }

    fn row_to_vocab_type(row: &rusqlite::Row) -> rusqlite::Result<VocabType> {
        let category: String = row.get(1)?;
        let embedding_json: Option<String> = row.get(3)?;
        let epistemic: String = row.get(7)?;
        let direction: String = row.get(9)?;
        Ok(VocabType {
            name: row.get(0)?,
            category: category_from_str(&category),
            description: row.get(2)?,
            embedding: embedding_json.and_then(|s| serde_json::from_str(&s).ok()),
            is_builtin: row.get::<_, i64>(4)? != 0,
            is_active: row.get::<_, i64>(5)? != 0,
            usage_count: row.get::<_, i64>(6)? as u64,
            epistemic_status: epistemic_from_str(&epistemic),
            epistemic_stats: EpistemicStats {
                avg_grounding: row.get(8)?,
            },
            direction_semantics: direction_from_str(&direction),
        })
    }

    fn row_to_artifact(row: &rusqlite::Row) -> rusqlite::Result<Artifact> {
        let artifact_type: String = row.get(1)?;
        let representation: String = row.get(2)?;
        let parameters_json: String = row.get(5)?;
        let metadata_json: String = row.get(6)?;
        let concept_ids_json: String = row.get(8)?;
        let inline_result: Option<String> = row.get(9)?;
        let garage_key: Option<String> = row.get(10)?;
        let payload = match (inline_result, garage_key) {
            (Some(text), None) => {
                ArtifactPayload::Inline(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
            }
            (None, Some(key)) => ArtifactPayload::Blob { garage_key: key },
            _ => ArtifactPayload::Inline(serde_json::Value::Null),
        };
        Ok(Artifact {
            id: ArtifactId::from_string(row.get::<_, String>(0)?),
            artifact_type: artifact_type_from_str(&artifact_type),
            representation: representation_from_str(&representation),
            owner_id: row.get(3)?,
            graph_epoch: row.get::<_, i64>(4)? as u64,
            parameters: serde_json::from_str(&parameters_json).unwrap_or(serde_json::Value::Null),
            metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
            ontology: OntologyId::from_string(row.get::<_, String>(7)?),
            concept_ids: serde_json::from_str(&concept_ids_json).unwrap_or_default(),
            payload,
            created_at: parse_dt(row.get::<_, String>(11)?),
            expires_at: row.get::<_, Option<String>>(12)?.map(parse_dt),
        })
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let job_type: String = row.get(1)?;
        let status: String = row.get(3)?;
        let payload_json: String = row.get(4)?;
        let progress_json: String = row.get(5)?;
        let result_json: Option<String> = row.get(6)?;
        Ok(Job {
            job_id: JobId::from_string(row.get::<_, String>(0)?),
            job_type: job_type_from_str(&job_type),
            user_id: row.get(2)?,
            status: job_status_from_str(&status),
            payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
            progress: serde_json::from_str(&progress_json).unwrap_or(serde_json::Value::Null),
            result: result_json.and_then(|s| serde_json::from_str(&s).ok()),
            error: row.get(7)?,
            artifact_id: row.get::<_, Option<String>>(8)?.map(ArtifactId::from_string),
            created_at: parse_dt(row.get::<_, String>(9)?),
            started_at: row.get::<_, Option<String>>(10)?.map(parse_dt),
            completed_at: row.get::<_, Option<String>>(11)?.map(parse_dt),
        })
    }
}

fn parse_dt(s: String) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

macro_rules! str_enum_bridge {
    ($to_str:ident, $from_str:ident, $ty:ty, [$($variant:ident => $name:literal),+ $(,)?]) => {
        fn $to_str(v: $ty) -> &'static str {
            match v {
                $(<$ty>::$variant => $name,)+
            }
        }
        fn $from_str(s: &str) -> $ty {
            match s {
                $($name => <$ty>::$variant,)+
                _ => <$ty>::$variant, // unreachable in practice; first variant as a safe fallback
            }
        }
    };
}

str_enum_bridge!(ontology_state_to_str, _ontology_state_from_str, OntologyState, [Active => "active", Frozen => "frozen"]);
str_enum_bridge!(creation_method_to_str, creation_method_from_str, CreationMethod, [
    Api => "api", Cli => "cli", Mcp => "mcp", Workstation => "workstation", Import => "import", LlmExtraction => "llm_extraction",
]);
str_enum_bridge!(category_to_str, category_from_str, RelationshipCategory, [
    LogicalTruth => "logical_truth", Causal => "causal", Structural => "structural", Temporal => "temporal",
    Comparative => "comparative", Functional => "functional", Definitional => "definitional",
    Similarity => "similarity", Evidential => "evidential", LlmGenerated => "llm_generated",
]);
str_enum_bridge!(source_to_str, source_from_str, RelationshipSource, [
    LlmExtraction => "llm_extraction", ApiCreation => "api_creation", HumanCuration => "human_curation",
    Import => "import", Inference => "inference",
]);
str_enum_bridge!(direction_to_str, direction_from_str, DirectionSemantics, [
    Outward => "outward", Inward => "inward", Bidirectional => "bidirectional",
]);
str_enum_bridge!(epistemic_to_str, epistemic_from_str, EpistemicStatus, [
    Affirmative => "AFFIRMATIVE", Contested => "CONTESTED", Contradictory => "CONTRADICTORY",
    Historical => "HISTORICAL", InsufficientData => "INSUFFICIENT_DATA", Unclassified => "UNCLASSIFIED",
]);
str_enum_bridge!(artifact_type_to_str, artifact_type_from_str, ArtifactType, [
    PolarityAnalysis => "polarity_analysis", Projection => "projection", QueryResult => "query_result",
    IngestionReport => "ingestion_report", VocabularyPruningReport => "vocabulary_pruning_report",
]);
str_enum_bridge!(representation_to_str, representation_from_str, ArtifactRepresentation, [
    Cli => "cli", PolarityExplorer => "polarity_explorer", McpServer => "mcp_server", Api => "api",
]);
str_enum_bridge!(job_type_to_str, job_type_from_str, JobType, [
    Ingestion => "ingestion", EmbeddingRegeneration => "embedding_regeneration",
    VocabularyConsolidation => "vocabulary_consolidation", ArtifactCleanup => "artifact_cleanup",
]);
str_enum_bridge!(job_status_to_str, job_status_from_str, JobStatus, [
    Queued => "queued", Processing => "processing", Completed => "completed", Failed => "failed", Cancelled => "cancelled",
]);
str_enum_bridge!(decided_by_to_str, _decided_by_from_str, MergeDecidedBy, [
    Llm => "llm", Heuristic => "heuristic", Human => "human",
]);

impl GraphStore for SqliteStore {
    fn save_ontology(&self, ontology: &Ontology) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ontologies(id, name, state, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, state = excluded.state",
            params![
                ontology.id.as_str(),
                ontology.name,
                ontology_state_to_str(ontology.state),
                ontology.created_at.to_rfc3339(),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_ontology(&self, id: &OntologyId) -> StorageResult<Option<Ontology>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, state, created_at FROM ontologies WHERE id = ?1",
            params![id.as_str()],
            Self::row_to_ontology,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn delete_ontology(&self, id: &OntologyId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let concept_ids: Vec<String> = conn
            .prepare("SELECT concept_id FROM concepts WHERE ontology = ?1")?
            .query_map(params![id.as_str()], |r| r.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        for cid in &concept_ids {
            conn.execute("DELETE FROM relationships WHERE from_concept = ?1 OR to_concept = ?1", params![cid])?;
            conn.execute("DELETE FROM instances WHERE concept_id = ?1", params![cid])?;
        }
        conn.execute("DELETE FROM concepts WHERE ontology = ?1", params![id.as_str()])?;
        conn.execute("DELETE FROM sources WHERE document = ?1", params![id.as_str()])?;
        let deleted = conn.execute("DELETE FROM ontologies WHERE id = ?1", params![id.as_str()])?;
        Self::bump_data_version(&conn)?;
        Ok(deleted > 0)
    }

    fn list_ontologies(&self) -> StorageResult<Vec<Ontology>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name, state, created_at FROM ontologies")?;
        let rows = stmt.query_map([], Self::row_to_ontology)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn save_source(&self, source: &Source) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let content_type = match source.content_type {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Synthetic => "synthetic",
        };
        conn.execute(
            "INSERT INTO sources(source_id, document, document_id, paragraph, full_text, content_type, storage_key, start_position, end_position, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(source_id) DO UPDATE SET full_text = excluded.full_text, content_hash = excluded.content_hash",
            params![
                source.source_id.as_str(),
                source.document.as_str(),
                source.document_id.as_str(),
                source.paragraph as i64,
                source.full_text,
                content_type,
                source.storage_key,
                source.start_position as i64,
                source.end_position as i64,
                source.content_hash,
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_source(&self, id: &SourceId) -> StorageResult<Option<Source>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT source_id, document, document_id, paragraph, full_text, content_type, storage_key, start_position, end_position, content_hash
             FROM sources WHERE source_id = ?1",
            params![id.as_str()],
            |row| {
                let content_type: String = row.get(5)?;
                Ok(Source {
                    source_id: SourceId::from_string(row.get::<_, String>(0)?),
                    document: OntologyId::from_string(row.get::<_, String>(1)?),
                    document_id: DocumentId::from_string(row.get::<_, String>(2)?),
                    paragraph: row.get::<_, i64>(3)? as usize,
                    full_text: row.get(4)?,
                    content_type: match content_type.as_str() {
                        "image" => ContentType::Image,
                        "synthetic" => ContentType::Synthetic,
                        _ => ContentType::Text,
                    },
                    storage_key: row.get(6)?,
                    start_position: row.get::<_, i64>(7)? as usize,
                    end_position: row.get::<_, i64>(8)? as usize,
                    content_hash: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn save_document_meta(&self, doc: &DocumentMeta) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let source_type = match doc.source_type {
            DocumentSourceType::File => "file",
            DocumentSourceType::Stdin => "stdin",
            DocumentSourceType::Mcp => "mcp",
            DocumentSourceType::Api => "api",
            DocumentSourceType::Url => "url",
            DocumentSourceType::Synthetic => "synthetic",
        };
        conn.execute(
            "INSERT INTO document_meta(document_id, filename, source_type, hostname, file_path, ingested_by, created_at, job_id, source_ids_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(document_id) DO UPDATE SET source_ids_json = excluded.source_ids_json",
            params![
                doc.document_id.as_str(),
                doc.filename,
                source_type,
                doc.hostname,
                doc.file_path,
                doc.ingested_by,
                doc.created_at.to_rfc3339(),
                doc.job_id.as_ref().map(|j| j.as_str().to_string()),
                serde_json::to_string(&doc.source_ids)?,
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_document_meta(&self, id: &DocumentId) -> StorageResult<Option<DocumentMeta>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT document_id, filename, source_type, hostname, file_path, ingested_by, created_at, job_id, source_ids_json
             FROM document_meta WHERE document_id = ?1",
            params![id.as_str()],
            |row| {
                let source_type: String = row.get(2)?;
                let source_ids_json: String = row.get(8)?;
                Ok(DocumentMeta {
                    document_id: DocumentId::from_string(row.get::<_, String>(0)?),
                    filename: row.get(1)?,
                    source_type: match source_type.as_str() {
                        "stdin" => DocumentSourceType::Stdin,
                        "mcp" => DocumentSourceType::Mcp,
                        "api" => DocumentSourceType::Api,
                        "url" => DocumentSourceType::Url,
                        "synthetic" => DocumentSourceType::Synthetic,
                        _ => DocumentSourceType::File,
                    },
                    hostname: row.get(3)?,
                    file_path: row.get(4)?,
                    ingested_by: row.get(5)?,
                    created_at: parse_dt(row.get::<_, String>(6)?),
                    job_id: row.get::<_, Option<String>>(7)?.map(JobId::from_string),
                    source_ids: serde_json::from_str(&source_ids_json).unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn save_concept(&self, concept: &Concept) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO concepts(concept_id, label, description, search_terms_json, embedding_json, ontology, creation_method, access_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(concept_id) DO UPDATE SET
                label = excluded.label, description = excluded.description,
                search_terms_json = excluded.search_terms_json, embedding_json = excluded.embedding_json,
                access_count = excluded.access_count",
            params![
                concept.concept_id.as_str(),
                concept.label,
                concept.description,
                serde_json::to_string(&concept.search_terms)?,
                serde_json::to_string(&concept.embedding)?,
                concept.ontology.as_str(),
                creation_method_to_str(concept.creation_method),
                concept.access_count as i64,
                concept.created_at.to_rfc3339(),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_concept(&self, id: &ConceptId) -> StorageResult<Option<Concept>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT concept_id, label, description, search_terms_json, embedding_json, ontology, creation_method, access_count, created_at
             FROM concepts WHERE concept_id = ?1",
            params![id.as_str()],
            Self::row_to_concept,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn delete_concept(&self, id: &ConceptId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let referenced: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relationships WHERE from_concept = ?1 OR to_concept = ?1",
            params![id.as_str()],
            |r| r.get(0),
        )?;
        if referenced > 0 {
            return Err(StorageError::ReferentialIntegrity(format!(
                "concept {id} is referenced by {referenced} relationship(s)"
            )));
        }
        let instances: i64 = conn.query_row(
            "SELECT COUNT(*) FROM instances WHERE concept_id = ?1",
            params![id.as_str()],
            |r| r.get(0),
        )?;
        if instances > 0 {
            return Err(StorageError::ReferentialIntegrity(format!(
                "concept {id} is referenced by {instances} instance(s)"
            )));
        }
        let deleted = conn.execute("DELETE FROM concepts WHERE concept_id = ?1", params![id.as_str()])?;
        Self::bump_data_version(&conn)?;
        Ok(deleted > 0)
    }

    fn find_concepts(&self, filter: &NodeFilter) -> StorageResult<Vec<Concept>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = "SELECT concept_id, label, description, search_terms_json, embedding_json, ontology, creation_method, access_count, created_at FROM concepts WHERE 1=1".to_string();
        let mut binds: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(ontology) = &filter.ontology {
            sql.push_str(" AND ontology = ?");
            binds.push(Box::new(ontology.as_str().to_string()));
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_ref.as_slice(), Self::row_to_concept)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn concepts_in_ontology(&self, ontology: &OntologyId) -> StorageResult<Vec<Concept>> {
        self.find_concepts(&NodeFilter {
            ontology: Some(ontology.clone()),
            ..Default::default()
        })
    }

    fn increment_access_count(&self, id: &ConceptId) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE concepts SET access_count = access_count + 1 WHERE concept_id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn save_instance(&self, instance: &Instance) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO instances(instance_id, concept_id, source_id, quote) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(instance_id) DO UPDATE SET quote = excluded.quote",
            params![
                instance.instance_id.as_str(),
                instance.concept_id.as_str(),
                instance.source_id.as_str(),
                instance.quote,
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn instances_for_concept(&self, concept_id: &ConceptId) -> StorageResult<Vec<Instance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT instance_id, concept_id, source_id, quote FROM instances WHERE concept_id = ?1",
        )?;
        let rows = stmt.query_map(params![concept_id.as_str()], |row| {
            Ok(Instance {
                instance_id: InstanceId::from_string(row.get::<_, String>(0)?),
                concept_id: ConceptId::from_string(row.get::<_, String>(1)?),
                source_id: SourceId::from_string(row.get::<_, String>(2)?),
                quote: row.get(3)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn instances_for_source(&self, source_id: &SourceId) -> StorageResult<Vec<Instance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT instance_id, concept_id, source_id, quote FROM instances WHERE source_id = ?1",
        )?;
        let rows = stmt.query_map(params![source_id.as_str()], |row| {
            Ok(Instance {
                instance_id: InstanceId::from_string(row.get::<_, String>(0)?),
                concept_id: ConceptId::from_string(row.get::<_, String>(1)?),
                source_id: SourceId::from_string(row.get::<_, String>(2)?),
                quote: row.get(3)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn save_relationship(&self, relationship: &Relationship) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let exists_from: i64 = conn.query_row(
            "SELECT COUNT(*) FROM concepts WHERE concept_id = ?1",
            params![relationship.from_concept.as_str()],
            |r| r.get(0),
        )?;
        let exists_to: i64 = conn.query_row(
            "SELECT COUNT(*) FROM concepts WHERE concept_id = ?1",
            params![relationship.to_concept.as_str()],
            |r| r.get(0),
        )?;
        if exists_from == 0 || exists_to == 0 {
            return Err(StorageError::ReferentialIntegrity(
                "relationship endpoints must exist before the edge is created".to_string(),
            ));
        }
        conn.execute(
            "INSERT INTO relationships(relationship_id, from_concept, to_concept, relationship_type, category, confidence, source, created_by, created_at, document_id, direction_semantics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                relationship.relationship_id.as_str(),
                relationship.from_concept.as_str(),
                relationship.to_concept.as_str(),
                relationship.relationship_type,
                category_to_str(relationship.category),
                relationship.confidence,
                source_to_str(relationship.source),
                relationship.created_by,
                relationship.created_at.to_rfc3339(),
                relationship.document_id.as_ref().map(|d| d.as_str().to_string()),
                direction_to_str(relationship.direction_semantics),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_relationship(&self, id: &RelationshipId) -> StorageResult<Option<Relationship>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT relationship_id, from_concept, to_concept, relationship_type, category, confidence, source, created_by, created_at, document_id, direction_semantics
             FROM relationships WHERE relationship_id = ?1",
            params![id.as_str()],
            Self::row_to_relationship,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn edges_from(&self, concept_id: &ConceptId) -> StorageResult<Vec<Relationship>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT relationship_id, from_concept, to_concept, relationship_type, category, confidence, source, created_by, created_at, document_id, direction_semantics
             FROM relationships WHERE from_concept = ?1",
        )?;
        let rows = stmt.query_map(params![concept_id.as_str()], Self::row_to_relationship)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn edges_to(&self, concept_id: &ConceptId) -> StorageResult<Vec<Relationship>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT relationship_id, from_concept, to_concept, relationship_type, category, confidence, source, created_by, created_at, document_id, direction_semantics
             FROM relationships WHERE to_concept = ?1",
        )?;
        let rows = stmt.query_map(params![concept_id.as_str()], Self::row_to_relationship)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn find_relationships(&self, filter: &EdgeFilter) -> StorageResult<Vec<Relationship>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = "SELECT relationship_id, from_concept, to_concept, relationship_type, category, confidence, source, created_by, created_at, document_id, direction_semantics FROM relationships WHERE 1=1".to_string();
        let mut binds: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(rt) = &filter.relationship_type {
            sql.push_str(" AND relationship_type = ?");
            binds.push(Box::new(rt.clone()));
        }
        if let Some(min_conf) = filter.min_confidence {
            sql.push_str(" AND confidence >= ?");
            binds.push(Box::new(min_conf));
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_ref.as_slice(), Self::row_to_relationship)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn rewrite_relationship_type(&self, from_type: &str, to_type: &str) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let rewritten = tx.execute(
            "UPDATE relationships SET relationship_type = ?1 WHERE relationship_type = ?2",
            params![to_type, from_type],
        )?;
        tx.commit()?;
        Self::bump_data_version(&conn)?;
        Ok(rewritten as u64)
    }

    fn save_vocab_type(&self, vocab_type: &VocabType) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO vocab_types(name, category, description, embedding_json, is_builtin, is_active, usage_count, epistemic_status, avg_grounding, direction_semantics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(name) DO UPDATE SET
                embedding_json = excluded.embedding_json, is_active = excluded.is_active,
                usage_count = excluded.usage_count, epistemic_status = excluded.epistemic_status,
                avg_grounding = excluded.avg_grounding",
            params![
                vocab_type.name,
                category_to_str(vocab_type.category),
                vocab_type.description,
                vocab_type.embedding.as_ref().map(serde_json::to_string).transpose()?,
                vocab_type.is_builtin as i64,
                vocab_type.is_active as i64,
                vocab_type.usage_count as i64,
                epistemic_to_str(vocab_type.epistemic_status),
                vocab_type.epistemic_stats.avg_grounding,
                direction_to_str(vocab_type.direction_semantics),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_vocab_type(&self, name: &str) -> StorageResult<Option<VocabType>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT name, category, description, embedding_json, is_builtin, is_active, usage_count, epistemic_status, avg_grounding, direction_semantics
             FROM vocab_types WHERE name = ?1",
            params![name],
            Self::row_to_vocab_type,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn list_vocab_types(&self, include_inactive: bool) -> StorageResult<Vec<VocabType>> {
        let conn = self.conn.lock().unwrap();
        let sql = if include_inactive {
            "SELECT name, category, description, embedding_json, is_builtin, is_active, usage_count, epistemic_status, avg_grounding, direction_semantics FROM vocab_types"
        } else {
            "SELECT name, category, description, embedding_json, is_builtin, is_active, usage_count, epistemic_status, avg_grounding, direction_semantics FROM vocab_types WHERE is_active = 1"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], Self::row_to_vocab_type)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn save_vocab_category(&self, category: &VocabCategory) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO vocab_categories(name, description) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET description = excluded.description",
            params![category.name, category.description],
        )?;
        Ok(())
    }

    fn append_merge_history(&self, entry: &MergeHistoryEntry) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO merge_history(deprecated_type, target_type, similarity, edges_rewritten, decided_by, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.deprecated_type,
                entry.target_type,
                entry.similarity,
                entry.edges_rewritten as i64,
                decided_by_to_str(entry.decided_by),
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_merge_history(&self) -> StorageResult<Vec<MergeHistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT deprecated_type, target_type, similarity, edges_rewritten, decided_by, timestamp FROM merge_history ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let decided_by: String = row.get(4)?;
            Ok(MergeHistoryEntry {
                deprecated_type: row.get(0)?,
                target_type: row.get(1)?,
                similarity: row.get(2)?,
                edges_rewritten: row.get::<_, i64>(3)? as u64,
                decided_by: match decided_by.as_str() {
                    "human" => MergeDecidedBy::Human,
                    "heuristic" => MergeDecidedBy::Heuristic,
                    _ => MergeDecidedBy::Llm,
                },
                timestamp: parse_dt(row.get::<_, String>(5)?),
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn save_artifact(&self, artifact: &Artifact) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let (inline, blob) = match &artifact.payload {
            ArtifactPayload::Inline(v) => (Some(serde_json::to_string(v)?), None),
            ArtifactPayload::Blob { garage_key } => (None, Some(garage_key.clone())),
        };
        conn.execute(
            "INSERT INTO artifacts(id, artifact_type, representation, owner_id, graph_epoch, parameters_json, metadata_json, ontology, concept_ids_json, inline_result, garage_key, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                artifact.id.as_str(),
                artifact_type_to_str(artifact.artifact_type),
                representation_to_str(artifact.representation),
                artifact.owner_id,
                artifact.graph_epoch as i64,
                serde_json::to_string(&artifact.parameters)?,
                serde_json::to_string(&artifact.metadata)?,
                artifact.ontology.as_str(),
                serde_json::to_string(&artifact.concept_ids)?,
                inline,
                blob,
                artifact.created_at.to_rfc3339(),
                artifact.expires_at.map(|e| e.to_rfc3339()),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_artifact(&self, id: &ArtifactId) -> StorageResult<Option<Artifact>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, artifact_type, representation, owner_id, graph_epoch, parameters_json, metadata_json, ontology, concept_ids_json, inline_result, garage_key, created_at, expires_at
             FROM artifacts WHERE id = ?1",
            params![id.as_str()],
            Self::row_to_artifact,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn delete_artifact(&self, id: &ArtifactId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM artifacts WHERE id = ?1", params![id.as_str()])?;
        Self::bump_data_version(&conn)?;
        Ok(deleted > 0)
    }

    fn list_artifacts(&self, owner_id: &str) -> StorageResult<Vec<Artifact>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, artifact_type, representation, owner_id, graph_epoch, parameters_json, metadata_json, ontology, concept_ids_json, inline_result, garage_key, created_at, expires_at
             FROM artifacts WHERE owner_id = ?1",
        )?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_artifact)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn expired_artifacts(&self, now: chrono::DateTime<chrono::Utc>) -> StorageResult<Vec<Artifact>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, artifact_type, representation, owner_id, graph_epoch, parameters_json, metadata_json, ontology, concept_ids_json, inline_result, garage_key, created_at, expires_at
             FROM artifacts WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        )?;
        let rows = stmt.query_map(params![now.to_rfc3339()], Self::row_to_artifact)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn save_job(&self, job: &Job) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs(job_id, job_type, user_id, status, payload_json, progress_json, result_json, error, artifact_id, created_at, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(job_id) DO UPDATE SET
                status = excluded.status, progress_json = excluded.progress_json,
                result_json = excluded.result_json, error = excluded.error,
                artifact_id = excluded.artifact_id, started_at = excluded.started_at, completed_at = excluded.completed_at",
            params![
                job.job_id.as_str(),
                job_type_to_str(job.job_type),
                job.user_id,
                job_status_to_str(job.status),
                serde_json::to_string(&job.payload)?,
                serde_json::to_string(&job.progress)?,
                job.result.as_ref().map(serde_json::to_string).transpose()?,
                job.error,
                job.artifact_id.as_ref().map(|a| a.as_str().to_string()),
                job.created_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn load_job(&self, id: &JobId) -> StorageResult<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT job_id, job_type, user_id, status, payload_json, progress_json, result_json, error, artifact_id, created_at, started_at, completed_at
             FROM jobs WHERE job_id = ?1",
            params![id.as_str()],
            Self::row_to_job,
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn jobs_by_status(&self, status: JobStatus) -> StorageResult<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT job_id, job_type, user_id, status, payload_json, progress_json, result_json, error, artifact_id, created_at, started_at, completed_at
             FROM jobs WHERE status = ?1",
        )?;
        let rows = stmt.query_map(params![job_status_to_str(status)], Self::row_to_job)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn complete_job_with_artifact(&self, job: &Job, artifact: &Artifact) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let (inline, blob) = match &artifact.payload {
            ArtifactPayload::Inline(v) => (Some(serde_json::to_string(v)?), None),
            ArtifactPayload::Blob { garage_key } => (None, Some(garage_key.clone())),
        };
        tx.execute(
            "INSERT INTO artifacts(id, artifact_type, representation, owner_id, graph_epoch, parameters_json, metadata_json, ontology, concept_ids_json, inline_result, garage_key, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                artifact.id.as_str(),
                artifact_type_to_str(artifact.artifact_type),
                representation_to_str(artifact.representation),
                artifact.owner_id,
                artifact.graph_epoch as i64,
                serde_json::to_string(&artifact.parameters)?,
                serde_json::to_string(&artifact.metadata)?,
                artifact.ontology.as_str(),
                serde_json::to_string(&artifact.concept_ids)?,
                inline,
                blob,
                artifact.created_at.to_rfc3339(),
                artifact.expires_at.map(|e| e.to_rfc3339()),
            ],
        )?;
        tx.execute(
            "INSERT INTO jobs(job_id, job_type, user_id, status, payload_json, progress_json, result_json, error, artifact_id, created_at, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(job_id) DO UPDATE SET
                status = excluded.status, progress_json = excluded.progress_json,
                result_json = excluded.result_json, error = excluded.error,
                artifact_id = excluded.artifact_id, started_at = excluded.started_at, completed_at = excluded.completed_at",
            params![
                job.job_id.as_str(),
                job_type_to_str(job.job_type),
                job.user_id,
                job_status_to_str(job.status),
                serde_json::to_string(&job.payload)?,
                serde_json::to_string(&job.progress)?,
                job.result.as_ref().map(serde_json::to_string).transpose()?,
                job.error,
                job.artifact_id.as_ref().map(|a| a.as_str().to_string()),
                job.created_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        tx.commit()?;
        Self::bump_data_version(&conn)?;
        Ok(())
    }

    fn data_version(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let v: i64 = conn.query_row("SELECT value FROM meta WHERE key = 'data_version'", [], |r| r.get(0))?;
        Ok(v as u64)
    }

    fn is_system_initialized(&self) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let v: Option<i64> = conn
            .query_row("SELECT value FROM meta WHERE key = 'system_initialization_status'", [], |r| r.get(0))
            .optional()?;
        Ok(v == Some(1))
    }

    fn mark_system_initialized(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO meta(key, value) VALUES ('system_initialization_status', 1)
             ON CONFLICT(key) DO UPDATE SET value = 1",
            [],
        )?;
        Ok(())
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_concept(ontology: &OntologyId) -> Concept {
        let mut c = Concept::new(ontology.clone(), "Neural Networks", CreationMethod::LlmExtraction);
        c.embedding = vec![0.1, 0.2, 0.3];
        c
    }

    #[test]
    fn ontology_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = Ontology::new("ai-research");
        store.save_ontology(&ontology).unwrap();
        let loaded = store.load_ontology(&ontology.id).unwrap().unwrap();
        assert_eq!(loaded.name, "ai-research");
    }

    #[test]
    fn concept_round_trips_with_embedding() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = Ontology::new("ai-research");
        store.save_ontology(&ontology).unwrap();
        let concept = sample_concept(&ontology.id);
        store.save_concept(&concept).unwrap();
        let loaded = store.load_concept(&concept.concept_id).unwrap().unwrap();
        assert_eq!(loaded.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(loaded.label, "Neural Networks");
    }

    #[test]
    fn relationship_requires_existing_endpoints() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rel = Relationship::new(
            ConceptId::new(),
            ConceptId::new(),
            "CAUSES",
            RelationshipCategory::Causal,
            0.9,
            RelationshipSource::LlmExtraction,
            "tester",
            DirectionSemantics::Outward,
        );
        assert!(store.save_relationship(&rel).is_err());
    }

    #[test]
    fn delete_concept_refused_when_referenced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = Ontology::new("ai-research");
        store.save_ontology(&ontology).unwrap();
        let a = sample_concept(&ontology.id);
        let mut b = sample_concept(&ontology.id);
        b.label = "Machine Learning".to_string();
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        let rel = Relationship::new(
            a.concept_id.clone(),
            b.concept_id.clone(),
            "IS_TECHNIQUE_IN",
            RelationshipCategory::Structural,
            0.9,
            RelationshipSource::LlmExtraction,
            "tester",
            DirectionSemantics::Outward,
        );
        store.save_relationship(&rel).unwrap();
        assert!(store.delete_concept(&a.concept_id).is_err());
    }

    #[test]
    fn vocabulary_merge_rewrite_is_atomic_and_counted() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = Ontology::new("ai-research");
        store.save_ontology(&ontology).unwrap();
        let a = sample_concept(&ontology.id);
        let mut b = sample_concept(&ontology.id);
        b.label = "Backprop".to_string();
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        for _ in 0..3 {
            let rel = Relationship::new(
                a.concept_id.clone(),
                b.concept_id.clone(),
                "STATUS",
                RelationshipCategory::Structural,
                0.9,
                RelationshipSource::LlmExtraction,
                "tester",
                DirectionSemantics::Outward,
            );
            store.save_relationship(&rel).unwrap();
        }
        let rewritten = store.rewrite_relationship_type("STATUS", "HAS_STATUS").unwrap();
        assert_eq!(rewritten, 3);
        let remaining = store
            .find_relationships(&EdgeFilter { relationship_type: Some("STATUS".to_string()), ..Default::default() })
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn data_version_increments_on_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        let before = store.data_version().unwrap();
        store.save_ontology(&Ontology::new("x")).unwrap();
        let after = store.data_version().unwrap();
        assert!(after > before);
    }
}
