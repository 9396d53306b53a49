//! Grouping translated AST nodes into semantic chunks (§4.1 step 3).

use crate::config::ChunkingConfig;

use super::ast::{AstNode, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    Semantic,
    HardCut,
    EndOfDocument,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SemanticChunk {
    pub text: String,
    pub chunk_number: usize,
    pub word_count: usize,
    pub boundary_type: BoundaryType,
    pub start_position: usize,
    pub end_position: usize,
}

pub(crate) fn chunk_nodes(nodes: &[AstNode], config: &ChunkingConfig) -> Vec<SemanticChunk> {
    let mut chunks: Vec<SemanticChunk> = Vec::new();
    let mut buf: Vec<&AstNode> = Vec::new();
    let mut buf_words = 0usize;

    for node in nodes {
        if matches!(node.kind, NodeKind::Heading(_)) && buf_words >= config.target_words && !buf.is_empty() {
            finalize(&mut chunks, &mut buf, &mut buf_words, BoundaryType::Semantic);
        }

        if node.word_count > config.max_words {
            finalize(&mut chunks, &mut buf, &mut buf_words, BoundaryType::Semantic);
            for piece in hard_cut(&node.rendered, config.max_words) {
                let word_count = piece.split_whitespace().count();
                chunks.push(SemanticChunk {
                    text: piece,
                    chunk_number: chunks.len() + 1,
                    word_count,
                    boundary_type: BoundaryType::HardCut,
                    start_position: node.start,
                    end_position: node.end,
                });
            }
            continue;
        }

        if !buf.is_empty() && buf_words + node.word_count > config.max_words {
            finalize(&mut chunks, &mut buf, &mut buf_words, BoundaryType::Semantic);
        }

        buf.push(node);
        buf_words += node.word_count;
    }
    finalize(&mut chunks, &mut buf, &mut buf_words, BoundaryType::Semantic);

    if let Some(last) = chunks.last_mut() {
        last.boundary_type = BoundaryType::EndOfDocument;
    }

    chunks
}

fn finalize(
    chunks: &mut Vec<SemanticChunk>,
    buf: &mut Vec<&AstNode>,
    buf_words: &mut usize,
    boundary: BoundaryType,
) {
    if buf.is_empty() {
        return;
    }
    let text = buf.iter().map(|n| n.rendered.as_str()).collect::<Vec<_>>().join("\n\n");
    let start = buf.first().unwrap().start;
    let end = buf.last().unwrap().end;
    chunks.push(SemanticChunk {
        text,
        chunk_number: chunks.len() + 1,
        word_count: *buf_words,
        boundary_type: boundary,
        start_position: start,
        end_position: end,
    });
    buf.clear();
    *buf_words = 0;
}

/// Split `text` into pieces of at most `max_words` words, preferring a
/// sentence terminator within the last 20% of the window; falls back to a
/// hard cut at exactly `max_words` when none is found.
fn hard_cut(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut pieces = Vec::new();
    let mut remaining = &words[..];

    while !remaining.is_empty() {
        if remaining.len() <= max_words {
            pieces.push(remaining.join(" "));
            break;
        }

        let window_start = ((max_words as f64) * 0.8).floor() as usize;
        let window = &remaining[window_start..max_words];
        let mut cut = max_words;
        for (i, word) in window.iter().enumerate().rev() {
            if word.ends_with('.') || word.ends_with('!') || word.ends_with('?') {
                cut = window_start + i + 1;
                break;
            }
        }

        pieces.push(remaining[..cut].join(" "));
        remaining = &remaining[cut..];
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_node(text: &str, start: usize) -> AstNode {
        let word_count = text.split_whitespace().count();
        AstNode {
            kind: NodeKind::Text,
            raw: text.to_string(),
            rendered: text.to_string(),
            word_count,
            start,
            end: start + text.len(),
        }
    }

    fn heading_node(text: &str, start: usize) -> AstNode {
        AstNode {
            kind: NodeKind::Heading(1),
            raw: text.to_string(),
            rendered: text.to_string(),
            word_count: text.split_whitespace().count(),
            start,
            end: start + text.len(),
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|_| "word").collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn single_small_document_is_one_end_of_document_chunk() {
        let nodes = vec![heading_node("Title", 0), text_node("a short paragraph", 10)];
        let config = ChunkingConfig { target_words: 500, min_words: 100, max_words: 800, translation_parallelism: 3 };
        let chunks = chunk_nodes(&nodes, &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].boundary_type, BoundaryType::EndOfDocument);
    }

    #[test]
    fn heading_after_target_starts_new_chunk() {
        let body = words(60);
        let nodes = vec![
            heading_node("Intro", 0),
            text_node(&body, 10),
            heading_node("Next Section", 500),
            text_node("more content", 600),
        ];
        let config = ChunkingConfig { target_words: 50, min_words: 10, max_words: 800, translation_parallelism: 3 };
        let chunks = chunk_nodes(&nodes, &config);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].boundary_type, BoundaryType::Semantic);
        assert_eq!(chunks[1].boundary_type, BoundaryType::EndOfDocument);
    }

    #[test]
    fn oversized_single_node_hard_cuts_into_at_least_two_chunks() {
        let big = words(120);
        let nodes = vec![text_node(&big, 0)];
        let config = ChunkingConfig { target_words: 50, min_words: 10, max_words: 100, translation_parallelism: 3 };
        let chunks = chunk_nodes(&nodes, &config);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].boundary_type, BoundaryType::HardCut);
    }

    #[test]
    fn hard_cut_prefers_sentence_terminator_in_window() {
        // 100 words, max 100: window is words[80..100]; put a sentence end at word 90.
        let mut words_vec: Vec<String> = (0..150).map(|i| format!("w{i}")).collect();
        words_vec[89] = "w89.".to_string();
        let text = words_vec.join(" ");
        let pieces = hard_cut(&text, 100);
        assert_eq!(pieces[0].split_whitespace().count(), 90);
        assert!(pieces[0].ends_with("w89."));
    }

    #[test]
    fn hard_cut_falls_back_to_max_words_without_terminator() {
        let words_vec: Vec<String> = (0..150).map(|i| format!("w{i}")).collect();
        let text = words_vec.join(" ");
        let pieces = hard_cut(&text, 100);
        assert_eq!(pieces[0].split_whitespace().count(), 100);
    }
}
