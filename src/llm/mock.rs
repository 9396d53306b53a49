//! Mock LLM provider: preconfigured responses keyed by input, matching the
//! teacher's `MockClient` pattern for deterministic tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{ExtractionResult, LlmCapability, LlmError, LlmResult, MergeJudgment};

pub struct MockLlm {
    available: bool,
    extractions: HashMap<String, ExtractionResult>,
    translations: HashMap<String, String>,
    merge_judgments: HashMap<(String, String), MergeJudgment>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::available()
    }
}

impl MockLlm {
    pub fn available() -> Self {
        Self {
            available: true,
            extractions: HashMap::new(),
            translations: HashMap::new(),
            merge_judgments: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    pub fn with_extraction(mut self, chunk_text: impl Into<String>, result: ExtractionResult) -> Self {
        self.extractions.insert(chunk_text.into(), result);
        self
    }

    pub fn with_translation(mut self, block_text: impl Into<String>, prose: impl Into<String>) -> Self {
        self.translations.insert(block_text.into(), prose.into());
        self
    }

    pub fn with_merge_judgment(
        mut self,
        type_a: impl Into<String>,
        type_b: impl Into<String>,
        judgment: MergeJudgment,
    ) -> Self {
        self.merge_judgments.insert((type_a.into(), type_b.into()), judgment);
        self
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl LlmCapability for MockLlm {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn extract_concepts(
        &self,
        chunk_text: &str,
        _context_labels: &[String],
    ) -> LlmResult<ExtractionResult> {
        self.calls.lock().await.push(format!("extract:{chunk_text}"));
        if !self.available {
            return Err(LlmError::Unavailable("mock configured as unavailable".to_string()));
        }
        Ok(self.extractions.get(chunk_text).cloned().unwrap_or_default())
    }

    async fn translate_to_prose(&self, _language: &str, block_text: &str) -> LlmResult<String> {
        self.calls.lock().await.push(format!("translate:{block_text}"));
        if !self.available {
            return Err(LlmError::Unavailable("mock configured as unavailable".to_string()));
        }
        self.translations
            .get(block_text)
            .cloned()
            .ok_or_else(|| LlmError::InvocationFailed(format!("no mock translation for block: {block_text}")))
    }

    async fn judge_merge(&self, type_a: &str, type_b: &str, _similarity: f32) -> LlmResult<MergeJudgment> {
        self.calls.lock().await.push(format!("judge_merge:{type_a}:{type_b}"));
        if !self.available {
            return Err(LlmError::Unavailable("mock configured as unavailable".to_string()));
        }
        self.merge_judgments
            .get(&(type_a.to_string(), type_b.to_string()))
            .cloned()
            .ok_or_else(|| LlmError::InvocationFailed(format!("no mock judgment for {type_a}/{type_b}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_mock_fails_every_call() {
        let mock = MockLlm::unavailable();
        assert!(!mock.is_available().await);
        assert!(mock.extract_concepts("text", &[]).await.is_err());
    }

    #[tokio::test]
    async fn configured_translation_is_returned() {
        let mock = MockLlm::available().with_translation("```rust\nfn f() {}\n```", "a function definition");
        let prose = mock.translate_to_prose("rust", "```rust\nfn f() {}\n```").await.unwrap();
        assert_eq!(prose, "a function definition");
    }

    #[tokio::test]
    async fn unconfigured_translation_errors() {
        let mock = MockLlm::available();
        assert!(mock.translate_to_prose("rust", "unseen").await.is_err());
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let mock = MockLlm::available();
        let _ = mock.extract_concepts("chunk one", &[]).await;
        assert_eq!(mock.call_count().await, 1);
    }
}
