//! Subprocess-backed LLM provider: spawns a local extraction/judgment
//! service and communicates over MCP JSON-RPC, mirroring the teacher's
//! `SubprocessClient` (lazy spawn, mutex-guarded peer, one in-flight call
//! at a time).

use async_trait::async_trait;
use rmcp::model::CallToolRequestParams;
use rmcp::service::Peer;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use std::borrow::Cow;
use tokio::sync::Mutex;

use super::{ExtractionResult, LlmCapability, LlmError, LlmResult, MergeJudgment};

pub struct SubprocessLlm {
    command: String,
    model: String,
    peer: Mutex<Option<Peer<RoleClient>>>,
}

impl SubprocessLlm {
    pub fn new(command: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: model.into(),
            peer: Mutex::new(None),
        }
    }

    async fn connected_peer(&self) -> LlmResult<Peer<RoleClient>> {
        let mut guard = self.peer.lock().await;
        if let Some(peer) = guard.as_ref() {
            return Ok(peer.clone());
        }
        let transport = TokioChildProcess::new(tokio::process::Command::new(&self.command))
            .map_err(|e| LlmError::Unavailable(format!("failed to spawn {}: {e}", self.command)))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| LlmError::Unavailable(format!("mcp handshake failed: {e}")))?;
        let peer = service.peer().clone();
        *guard = Some(peer.clone());
        Ok(peer)
    }

    async fn call_tool(&self, tool: &str, arguments: serde_json::Value) -> LlmResult<serde_json::Value> {
        let peer = self.connected_peer().await?;
        let arguments_map = match arguments {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        let result = peer
            .call_tool(CallToolRequestParams {
                name: Cow::Owned(tool.to_string()),
                arguments: arguments_map,
            })
            .await
            .map_err(|e| LlmError::InvocationFailed(e.to_string()))?;
        serde_json::to_value(result.content).map_err(|e| LlmError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl LlmCapability for SubprocessLlm {
    async fn is_available(&self) -> bool {
        self.connected_peer().await.is_ok()
    }

    async fn extract_concepts(
        &self,
        chunk_text: &str,
        context_labels: &[String],
    ) -> LlmResult<ExtractionResult> {
        let response = self
            .call_tool(
                "extract_concepts",
                serde_json::json!({ "model": self.model, "text": chunk_text, "context": context_labels }),
            )
            .await?;
        serde_json::from_value(response).map_err(|e| LlmError::ParseError(e.to_string()))
    }

    async fn translate_to_prose(&self, language: &str, block_text: &str) -> LlmResult<String> {
        let response = self
            .call_tool(
                "translate_to_prose",
                serde_json::json!({ "model": self.model, "language": language, "text": block_text }),
            )
            .await?;
        response
            .as_str()
            .map(str::to_string)
            .or_else(|| response.get("prose").and_then(|v| v.as_str()).map(str::to_string))
            .ok_or_else(|| LlmError::ParseError("expected a string or {prose} response".to_string()))
    }

    async fn judge_merge(&self, type_a: &str, type_b: &str, similarity: f32) -> LlmResult<MergeJudgment> {
        let response = self
            .call_tool(
                "judge_merge",
                serde_json::json!({ "model": self.model, "type_a": type_a, "type_b": type_b, "similarity": similarity }),
            )
            .await?;
        serde_json::from_value(response).map_err(|e| LlmError::ParseError(e.to_string()))
    }
}
