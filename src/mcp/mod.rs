//! MCP server (§6): exposes the query core, ingestion job submission,
//! artifact retrieval, and vocabulary administration via the Model Context
//! Protocol, mirroring the teacher's tool-router-per-domain shape.

pub mod params;

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use params::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};

use crate::config::EngineConfig;
use crate::domain::{ArtifactId, ArtifactPayload, ConceptId, Job, JobId, JobType, OntologyId};
use crate::embedding::Embedder;
use crate::jobs::{JobContext, WorkerPool};
use crate::query::{
    analyze_polarity_axis, execute_raw_query, find_connection, find_connection_by_search, get_concept_details,
    related_concepts, search_concepts, ConceptDetailsOptions, FindConnectionRequest, PolarityAxisRequest,
    RelatedConceptsRequest, SearchConceptsRequest,
};
use crate::storage::{BlobStore, GraphStore, OpenStore, SqliteStore};
use crate::vocabulary::VocabularyManager;

fn ok_json(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_else(|e| e.to_string()),
    )]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

// ---------------------------------------------------------------------------
// GnosisMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GnosisMcpServer {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    vocabulary: Arc<VocabularyManager>,
    blob_store: Arc<dyn BlobStore>,
    job_ctx: JobContext,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GnosisMcpServer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        vocabulary: Arc<VocabularyManager>,
        blob_store: Arc<dyn BlobStore>,
        job_ctx: JobContext,
    ) -> Self {
        Self { store, embedder, vocabulary, blob_store, job_ctx, tool_router: Self::tool_router() }
    }

    // ── Query core (§4.6) ───────────────────────────────────────────────

    #[tool(description = "Semantic search over concepts in an ontology")]
    fn search_concepts(
        &self,
        Parameters(p): Parameters<SearchConceptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = SearchConceptsRequest {
            ontology: OntologyId::from_string(p.ontology),
            query: p.query,
            limit: p.limit.unwrap_or(20),
            offset: p.offset.unwrap_or(0),
            min_similarity: p.min_similarity.unwrap_or(0.5),
            include_grounding: p.include_grounding.unwrap_or(false),
        };
        match search_concepts(self.store.as_ref(), self.embedder.as_ref(), &request) {
            Ok(result) => ok_json(serde_json::to_value(result).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Full evidentiary detail for one concept: instances, outbound edges, optional grounding/diversity")]
    fn concept_details(
        &self,
        Parameters(p): Parameters<ConceptDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        let concept_id = ConceptId::from_string(p.concept_id);
        let options = ConceptDetailsOptions {
            include_grounding: p.include_grounding.unwrap_or(false),
            include_diversity: p.include_diversity.unwrap_or(false),
            diversity_max_hops: p.diversity_max_hops.unwrap_or(1),
            ..ConceptDetailsOptions::default()
        };
        match get_concept_details(self.store.as_ref(), self.embedder.as_ref(), &concept_id, &options) {
            Ok(details) => ok_json(serde_json::to_value(details).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Outward BFS from a concept, annotated with hop distance and the relationship-type path taken")]
    fn related_concepts(
        &self,
        Parameters(p): Parameters<RelatedConceptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let concept_id = ConceptId::from_string(p.concept_id);
        let request = RelatedConceptsRequest {
            max_depth: p.max_depth.unwrap_or(2),
            relationship_types: p.relationship_types,
            include_epistemic: None,
            exclude_epistemic: None,
        };
        match related_concepts(self.store.as_ref(), &concept_id, &request) {
            Ok(results) => ok_json(serde_json::to_value(results).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Up to 5 shortest paths between two concepts")]
    fn find_connection(
        &self,
        Parameters(p): Parameters<FindConnectionParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = FindConnectionRequest {
            from: ConceptId::from_string(p.from_id),
            to: ConceptId::from_string(p.to_id),
            max_hops: p.max_hops.unwrap_or(5),
            relationship_types: p.relationship_types,
        };
        match find_connection(self.store.as_ref(), &request) {
            Ok(paths) => ok_json(serde_json::to_value(paths).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Resolve two free-text phrases to concepts, then find up to 5 shortest paths between them")]
    fn find_connection_by_search(
        &self,
        Parameters(p): Parameters<FindConnectionBySearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let ontology = OntologyId::from_string(p.ontology);
        match find_connection_by_search(
            self.store.as_ref(),
            self.embedder.as_ref(),
            &ontology,
            &p.from_query,
            &p.to_query,
            p.max_hops.unwrap_or(5),
            p.threshold.unwrap_or(0.5),
            p.relationship_types,
        ) {
            Ok(paths) => ok_json(serde_json::to_value(paths).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Project candidate concepts onto the axis spanned by two opposing pole concepts")]
    fn polarity_axis(
        &self,
        Parameters(p): Parameters<PolarityAxisParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = PolarityAxisRequest {
            positive_pole: ConceptId::from_string(p.positive_pole),
            negative_pole: ConceptId::from_string(p.negative_pole),
            candidates: p.candidates.map(|ids| ids.into_iter().map(ConceptId::from_string).collect()),
            max_candidates: p.max_candidates.unwrap_or(20),
            max_hops: p.max_hops.unwrap_or(1),
            ..PolarityAxisRequest::default()
        };
        match analyze_polarity_axis(self.store.as_ref(), &request) {
            Ok(result) => ok_json(serde_json::to_value(result).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Narrow raw-query pass-through: filter relationships by type and/or confidence")]
    fn execute_query(
        &self,
        Parameters(p): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        match execute_raw_query(self.store.as_ref(), p.relationship_type.as_deref(), p.min_confidence, p.limit) {
            Ok(result) => ok_json(serde_json::to_value(result).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Ingestion jobs (§4.7) ───────────────────────────────────────────

    #[tool(description = "Submit a document for background ingestion; returns the queued job id")]
    fn submit_ingest_job(
        &self,
        Parameters(p): Parameters<SubmitIngestJobParams>,
    ) -> Result<CallToolResult, McpError> {
        let ontology_id = OntologyId::from_string(p.ontology.clone());
        match self.store.load_ontology(&ontology_id) {
            Ok(None) => return err_text(format!("ontology not found: {}", p.ontology)),
            Err(e) => return err_text(e.to_string()),
            Ok(Some(_)) => {}
        }

        let payload = serde_json::json!({
            "ontology": p.ontology,
            "filename": p.filename,
            "content_b64": p.content_b64,
            "ingested_by": p.ingested_by,
        });
        let job = Job::with_payload(JobType::Ingestion, p.ingested_by.clone(), payload);
        match self.store.save_job(&job) {
            Ok(()) => ok_json(serde_json::json!({ "job_id": job.job_id.as_str() })),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Poll a job's current status, progress, result, and artifact linkage")]
    fn get_job(&self, Parameters(p): Parameters<JobIdParams>) -> Result<CallToolResult, McpError> {
        match self.store.load_job(&JobId::from_string(p.job_id.clone())) {
            Ok(Some(job)) => ok_json(serde_json::to_value(job).unwrap()),
            Ok(None) => err_text(format!("job not found: {}", p.job_id)),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Artifacts (§4.5) ────────────────────────────────────────────────

    #[tool(description = "List artifacts owned by a caller")]
    fn list_artifacts(&self, Parameters(p): Parameters<ListArtifactsParams>) -> Result<CallToolResult, McpError> {
        match self.store.list_artifacts(&p.owner_id) {
            Ok(artifacts) => ok_json(serde_json::to_value(artifacts).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Fetch an artifact, resolving a blob-routed payload to base64 bytes")]
    fn get_artifact(&self, Parameters(p): Parameters<ArtifactIdParams>) -> Result<CallToolResult, McpError> {
        let artifact = match self.store.load_artifact(&ArtifactId::from_string(p.artifact_id.clone())) {
            Ok(Some(a)) => a,
            Ok(None) => return err_text(format!("artifact not found: {}", p.artifact_id)),
            Err(e) => return err_text(e.to_string()),
        };

        let payload = match &artifact.payload {
            ArtifactPayload::Inline(value) => value.clone(),
            ArtifactPayload::Blob { garage_key } => match self.blob_store.get(garage_key) {
                Ok(Some(bytes)) => {
                    serde_json::json!({ "garage_key": garage_key, "content_b64": base64::engine::general_purpose::STANDARD.encode(bytes) })
                }
                Ok(None) => return err_text(format!("blob missing for key: {garage_key}")),
                Err(e) => return err_text(e.to_string()),
            },
        };

        ok_json(serde_json::json!({
            "id": artifact.id.as_str(),
            "artifact_type": artifact.artifact_type,
            "representation": artifact.representation,
            "owner_id": artifact.owner_id,
            "graph_epoch": artifact.graph_epoch,
            "ontology": artifact.ontology.as_str(),
            "created_at": artifact.created_at,
            "expires_at": artifact.expires_at,
            "payload": payload,
        }))
    }

    #[tool(description = "Delete an artifact by id")]
    fn delete_artifact(&self, Parameters(p): Parameters<ArtifactIdParams>) -> Result<CallToolResult, McpError> {
        match self.store.delete_artifact(&ArtifactId::from_string(p.artifact_id.clone())) {
            Ok(true) => ok_json(serde_json::json!({ "deleted": p.artifact_id })),
            Ok(false) => err_text(format!("artifact not found: {}", p.artifact_id)),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Vocabulary administration (§4.4) ────────────────────────────────

    #[tool(description = "Current vocabulary size, zone, and aggressiveness curve position")]
    fn vocabulary_status(&self) -> Result<CallToolResult, McpError> {
        let active = match self.store.list_vocab_types(false) {
            Ok(v) => v,
            Err(e) => return err_text(e.to_string()),
        };
        let (aggressiveness, zone) = self.vocabulary.aggressiveness(active.len());
        ok_json(serde_json::json!({
            "vocab_size": active.len(),
            "zone": format!("{zone:?}"),
            "aggressiveness": aggressiveness,
        }))
    }

    #[tool(description = "List vocabulary types with their scoring components")]
    fn vocabulary_list(&self, Parameters(p): Parameters<VocabularyListParams>) -> Result<CallToolResult, McpError> {
        let _ = p.include_inactive;
        match self.vocabulary.score_all() {
            Ok(scores) => ok_json(serde_json::to_value(scores).unwrap()),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Manually merge two vocabulary types, rewriting edges from the deprecated type onto the target")]
    fn vocabulary_merge(&self, Parameters(p): Parameters<VocabularyMergeParams>) -> Result<CallToolResult, McpError> {
        let edges_rewritten = match self.store.rewrite_relationship_type(&p.deprecated_type, &p.target_type) {
            Ok(n) => n,
            Err(e) => return err_text(e.to_string()),
        };
        if let Ok(Some(mut target)) = self.store.load_vocab_type(&p.target_type) {
            target.usage_count += edges_rewritten;
            let _ = self.store.save_vocab_type(&target);
        }
        if let Ok(Some(mut deprecated)) = self.store.load_vocab_type(&p.deprecated_type) {
            deprecated.is_active = false;
            let _ = self.store.save_vocab_type(&deprecated);
        }
        let entry = crate::domain::MergeHistoryEntry {
            deprecated_type: p.deprecated_type.clone(),
            target_type: p.target_type.clone(),
            similarity: 0.0,
            edges_rewritten,
            decided_by: crate::domain::MergeDecidedBy::Human,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.store.append_merge_history(&entry) {
            return err_text(e.to_string());
        }
        ok_json(serde_json::json!({ "edges_rewritten": edges_rewritten }))
    }

    #[tool(description = "Restore a deprecated vocabulary type (does not pull back edges already rewritten by a merge)")]
    fn vocabulary_restore(&self, Parameters(p): Parameters<VocabularyRestoreParams>) -> Result<CallToolResult, McpError> {
        match self.vocabulary.restore(&p.type_name) {
            Ok(()) => ok_json(serde_json::json!({ "restored": p.type_name })),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for GnosisMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Gnosis Graph MCP server — knowledge-graph query, ingestion, and vocabulary administration".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(feature = "embeddings")]
fn build_embedder() -> Result<Arc<dyn Embedder>, String> {
    crate::embedding::FastEmbedEmbedder::default_model()
        .map(|e| Arc::new(e) as Arc<dyn Embedder>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "embeddings"))]
fn build_embedder() -> Result<Arc<dyn Embedder>, String> {
    Ok(Arc::new(crate::embedding::MockEmbedder::default()))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(config: EngineConfig, db_path: Option<PathBuf>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {e}");
            return 1;
        }
    };

    rt.block_on(async {
        let path = db_path.unwrap_or_else(|| config.storage.data_dir.join("gnosis.db"));
        let store: Arc<dyn GraphStore> = match SqliteStore::open(&path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                eprintln!("failed to open database at {}: {e}", path.display());
                return 1;
            }
        };

        let llm: Arc<dyn crate::llm::LlmCapability> = match config.llm.ai_provider {
            crate::config::AiProvider::Mock => Arc::new(crate::llm::MockLlm::available()),
            _ => Arc::new(crate::llm::SubprocessLlm::new(
                config.llm.command.clone(),
                config.llm.extraction_model.clone(),
            )),
        };
        let embedder = match build_embedder() {
            Ok(e) => e,
            Err(e) => {
                eprintln!("failed to initialize embedder: {e}");
                return 1;
            }
        };
        let blob_store: Arc<dyn BlobStore> = Arc::new(crate::storage::FilesystemBlobStore::new(config.storage.blob_root.clone()));
        let vocabulary = Arc::new(VocabularyManager::new(
            store.clone(),
            llm.clone(),
            embedder.clone(),
            config.vocabulary.clone(),
        ));
        let job_ctx = JobContext::new(store.clone(), llm, embedder.clone(), vocabulary.clone(), blob_store.clone(), config);

        let pool = WorkerPool::new(job_ctx.clone());
        tokio::spawn(async move { pool.run().await });

        let server = GnosisMcpServer::new(store, embedder, vocabulary, blob_store, job_ctx);

        eprintln!("gnosis-graph mcp server starting on stdio...");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to start MCP server: {e}");
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            eprintln!("MCP server error: {e}");
            return 1;
        }

        0
    })
}
