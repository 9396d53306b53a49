//! Bounded-parallel code/diagram-to-prose translation (§4.1 step 2).
//!
//! Mirrors the teacher's `ExtractionCoordinator` bound: a `Semaphore` caps
//! in-flight LLM calls, joined through a `JoinSet` rather than fire-and-forget
//! spawns, since chunking below needs every translation to have landed.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{EngineError, EngineResult};
use crate::llm::LlmCapability;

use super::ast::AstNode;

const MIN_LINES_FOR_TRANSLATION: usize = 3;

pub(crate) async fn translate_blocks(
    nodes: &mut [AstNode],
    llm: &Arc<dyn LlmCapability>,
    parallelism: usize,
) -> EngineResult<()> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut set: JoinSet<(usize, Result<String, crate::llm::LlmError>)> = JoinSet::new();

    for (idx, node) in nodes.iter_mut().enumerate() {
        if !node.kind.needs_translation() {
            continue;
        }
        let lines = node.raw.lines().count();
        let language = node.kind.language_label();
        if lines < MIN_LINES_FOR_TRANSLATION {
            node.rendered = format!("[CODE BLOCK: {language} - {lines} lines]");
            continue;
        }

        let raw = node.raw.clone();
        let llm = Arc::clone(llm);
        let sem = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("translation semaphore closed");
            let outcome = llm.translate_to_prose(&language, &raw).await;
            (idx, outcome)
        });
    }

    while let Some(joined) = set.join_next().await {
        let (idx, outcome) =
            joined.map_err(|e| EngineError::Fatal(format!("translation task panicked: {e}")))?;
        nodes[idx].rendered = match outcome {
            Ok(prose) => post_filter_translation(&prose),
            Err(e) => format!("[Translation failed: {e}]"),
        };
    }

    Ok(())
}

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MATCH", "MERGE", "CREATE", "DROP", "WITH", "ALTER",
];

/// Strips fenced/inline code, query-keyword lines, symbol-dominated lines,
/// and dollar-quoted strings a translation might still have echoed verbatim.
pub(crate) fn post_filter_translation(text: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }

        let first_word = trimmed.split_whitespace().next().unwrap_or("").to_uppercase();
        if SQL_KEYWORDS.contains(&first_word.as_str()) {
            continue;
        }
        if trimmed.starts_with("$$") || (trimmed.starts_with('$') && trimmed.len() > 2 && trimmed.ends_with('$')) {
            continue;
        }

        let symbol_count = trimmed.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count();
        if symbol_count * 2 > trimmed.len() {
            continue;
        }

        out.push(strip_inline_code(trimmed));
    }

    out.join("\n").trim().to_string()
}

fn strip_inline_code(line: &str) -> String {
    let mut result = String::new();
    let mut in_code = false;
    for ch in line.chars() {
        if ch == '`' {
            in_code = !in_code;
            continue;
        }
        if !in_code {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::preprocess::ast::NodeKind;

    fn node(kind: NodeKind, raw: &str) -> AstNode {
        AstNode { kind, raw: raw.to_string(), rendered: String::new(), word_count: 0, start: 0, end: raw.len() }
    }

    #[tokio::test]
    async fn short_block_gets_placeholder_without_llm_call() {
        let mut nodes = vec![node(NodeKind::Mermaid, "graph TD;\nA-->B;")];
        let llm: Arc<dyn LlmCapability> = Arc::new(MockLlm::available());
        translate_blocks(&mut nodes, &llm, 3).await.unwrap();
        assert_eq!(nodes[0].rendered, "[CODE BLOCK: mermaid - 2 lines]");
    }

    #[tokio::test]
    async fn long_block_is_translated_and_filtered() {
        let raw = "graph TD;\nA-->B;\nB-->C;\nC-->D;";
        let mut nodes = vec![node(NodeKind::Mermaid, raw)];
        let llm: Arc<dyn LlmCapability> = Arc::new(
            MockLlm::available()
                .with_translation(raw, "```\nSELECT * FROM x\n```\nA flows into B, which flows into C."),
        );
        translate_blocks(&mut nodes, &llm, 3).await.unwrap();
        assert!(nodes[0].rendered.contains("A flows into B"));
        assert!(!nodes[0].rendered.contains("SELECT"));
    }

    #[tokio::test]
    async fn failed_translation_becomes_placeholder_not_abort() {
        let raw = "graph TD;\nA-->B;\nB-->C;\nC-->D;";
        let mut nodes = vec![node(NodeKind::Mermaid, raw)];
        let llm: Arc<dyn LlmCapability> = Arc::new(MockLlm::unavailable());
        translate_blocks(&mut nodes, &llm, 3).await.unwrap();
        assert!(nodes[0].rendered.starts_with("[Translation failed:"));
    }
}
