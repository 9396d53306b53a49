//! Markdown AST parsing into typed nodes (§4.1 step 1).
//!
//! Block-level content is tracked via a generic nesting depth rather than
//! matching every `Tag`/`TagEnd` pair by hand: pulldown-cmark guarantees a
//! well-nested event stream, so a node is finalized exactly when depth
//! returns to zero, regardless of which tag opened it.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Heading(u8),
    Text,
    List { ordered: bool },
    Code { language: String },
    Mermaid,
    Json,
    Yaml,
    Other,
}

impl NodeKind {
    pub(crate) fn needs_translation(&self) -> bool {
        matches!(
            self,
            NodeKind::Code { .. } | NodeKind::Mermaid | NodeKind::Json | NodeKind::Yaml
        )
    }

    pub(crate) fn language_label(&self) -> String {
        match self {
            NodeKind::Code { language } if !language.is_empty() => language.clone(),
            NodeKind::Code { .. } => "text".to_string(),
            NodeKind::Mermaid => "mermaid".to_string(),
            NodeKind::Json => "json".to_string(),
            NodeKind::Yaml => "yaml".to_string(),
            _ => "text".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AstNode {
    pub kind: NodeKind,
    /// Original source text of the block (code verbatim, plain text for prose).
    pub raw: String,
    /// Prose form used for chunking and reserialization; empty for
    /// translation-pending blocks until `finalize_word_counts` runs.
    pub rendered: String,
    pub word_count: usize,
    pub start: usize,
    pub end: usize,
}

pub(crate) fn parse(markdown: &str) -> EngineResult<Vec<AstNode>> {
    let mut nodes = Vec::new();
    let mut depth: i32 = 0;
    let mut kind: Option<NodeKind> = None;
    let mut prose = String::new();
    let mut raw = String::new();
    let mut start = 0usize;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    kind = Some(classify(&tag));
                    start = range.start;
                    prose.clear();
                    raw.clear();
                }
                depth += 1;
            }
            Event::End(_) => {
                depth -= 1;
                if depth < 0 {
                    return Err(EngineError::Fatal("malformed input: unbalanced markdown blocks".to_string()));
                }
                if depth == 0 {
                    if let Some(k) = kind.take() {
                        push_node(&mut nodes, k, &prose, &raw, start, range.end);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                prose.push_str(&text);
                raw.push_str(&text);
            }
            Event::Html(text) => {
                if depth == 0 {
                    push_node(&mut nodes, NodeKind::Other, &text, &text, range.start, range.end);
                } else {
                    prose.push_str(&text);
                    raw.push_str(&text);
                }
            }
            Event::SoftBreak => {
                prose.push(' ');
                raw.push('\n');
            }
            Event::HardBreak => {
                prose.push('\n');
                raw.push('\n');
            }
            Event::Rule | Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }

    if depth != 0 {
        return Err(EngineError::Fatal("malformed input: unbalanced markdown blocks".to_string()));
    }

    Ok(nodes)
}

fn push_node(nodes: &mut Vec<AstNode>, kind: NodeKind, prose: &str, raw: &str, start: usize, end: usize) {
    let deferred = kind.needs_translation();
    let rendered = if deferred { String::new() } else { prose.trim().to_string() };
    let word_count = if deferred {
        raw.split_whitespace().count()
    } else {
        rendered.split_whitespace().count()
    };
    nodes.push(AstNode { kind, raw: raw.to_string(), rendered, word_count, start, end });
}

fn classify(tag: &Tag) -> NodeKind {
    match tag {
        Tag::Heading { level, .. } => NodeKind::Heading(heading_level_num(*level)),
        Tag::Paragraph => NodeKind::Text,
        Tag::List(first) => NodeKind::List { ordered: first.is_some() },
        Tag::CodeBlock(kind) => classify_code_block(kind),
        _ => NodeKind::Other,
    }
}

fn heading_level_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn classify_code_block(kind: &CodeBlockKind) -> NodeKind {
    let lang = match kind {
        CodeBlockKind::Fenced(info) => info.split(',').next().unwrap_or("").trim().to_lowercase(),
        CodeBlockKind::Indented => String::new(),
    };
    match lang.as_str() {
        "mermaid" => NodeKind::Mermaid,
        "json" => NodeKind::Json,
        "yaml" | "yml" => NodeKind::Yaml,
        _ => NodeKind::Code { language: lang },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heading_and_paragraph() {
        let nodes = parse("# Title\n\nSome body text here.\n").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, NodeKind::Heading(1));
        assert_eq!(nodes[1].kind, NodeKind::Text);
        assert_eq!(nodes[1].rendered, "Some body text here.");
    }

    #[test]
    fn classifies_mermaid_fence() {
        let nodes = parse("```mermaid\ngraph TD;\nA-->B;\nC-->D;\n```\n").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Mermaid);
        assert!(nodes[0].rendered.is_empty());
        assert!(nodes[0].raw.contains("graph TD"));
    }

    #[test]
    fn classifies_plain_code_by_language() {
        let nodes = parse("```rust\nfn main() {}\n```\n").unwrap();
        assert_eq!(nodes[0].kind, NodeKind::Code { language: "rust".to_string() });
    }

    #[test]
    fn list_node_is_ordered() {
        let nodes = parse("1. one\n2. two\n").unwrap();
        assert_eq!(nodes[0].kind, NodeKind::List { ordered: true });
    }
}
