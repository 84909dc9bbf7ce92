//! Embedding input construction
//!
//! Structural hints go first so a truncated payload still carries them.

use crate::chunk::{ChunkKind, CodeChunk};

/// Default cap on payload length, in characters
pub const DEFAULT_MAX_CHARS: usize = 6000;

const TRUNCATION_MARKER: &str = "\n... [content truncated]";

/// Build the text sent to the embedding provider for one chunk
pub fn build_embedding_input(chunk: &CodeChunk, max_chars: usize) -> String {
    let mut text = preamble(chunk);
    text.push_str("\n\n");
    text.push_str(&chunk.content);

    if let Some(tags) = chunk.metadata.jsx_elements.as_ref().filter(|t| !t.is_empty()) {
        text.push_str("\n\nJSX elements: ");
        text.push_str(&tags.join(", "));
    }
    if let Some(hooks) = chunk.metadata.hooks.as_ref().filter(|h| !h.is_empty()) {
        text.push_str("\n\nHooks used: ");
        text.push_str(&hooks.join(", "));
    }

    truncate(text, max_chars)
}

fn preamble(chunk: &CodeChunk) -> String {
    let name = chunk.name.as_deref().unwrap_or("anonymous");
    let props = chunk
        .metadata
        .props
        .as_ref()
        .filter(|p| !p.is_empty())
        .map(|p| format!(" with props: {}", p.join(", ")))
        .unwrap_or_default();
    let label = chunk.section_label.as_deref().unwrap_or("section");

    match chunk.kind {
        ChunkKind::Component => format!("React component `{}`{}.", name, props),
        ChunkKind::ComponentSummary => format!(
            "Summary of React component `{}`{}; markup sections are elided.",
            name, props
        ),
        ChunkKind::Hook => format!("React hook `{}`, reusable stateful logic.", name),
        ChunkKind::Function => format!("Function `{}`.", name),
        ChunkKind::FunctionSummary => {
            format!("Opening part of large function `{}`{}.", name, props)
        }
        ChunkKind::JsxFragment => format!("JSX-rendering function `{}`{}.", name, props),
        ChunkKind::JsxSection => format!("UI section `{}` extracted from `{}`.", label, name),
        ChunkKind::FunctionSection => {
            format!("Code section `{}` extracted from function `{}`.", label, name)
        }
    }
}

fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        // No room for content; the marker itself is cut to the cap
        return TRUNCATION_MARKER.chars().take(max_chars).collect();
    }

    let mut truncated: String = text.chars().take(max_chars - marker_len).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_id, ChunkMetadata};

    fn component() -> CodeChunk {
        let content = "function Card({ title }) {\n  const x = useMemo(() => 1, []);\n  return <div>{title}</div>;\n}".to_string();
        CodeChunk {
            id: chunk_id("Card.jsx", 1, &content),
            file_path: "Card.jsx".into(),
            start_line: 1,
            end_line: 4,
            start_column: 1,
            end_column: 2,
            kind: ChunkKind::Component,
            name: Some("Card".into()),
            content,
            metadata: ChunkMetadata {
                props: Some(vec!["title".into()]),
                hooks: Some(vec!["useMemo".into()]),
                jsx_elements: Some(vec!["div".into()]),
                ..ChunkMetadata::default()
            },
            parent_id: None,
            section_index: None,
            section_label: None,
            markup: None,
        }
    }

    #[test]
    fn test_hints_follow_fixed_order() {
        let text = build_embedding_input(&component(), DEFAULT_MAX_CHARS);

        assert!(text.starts_with("React component `Card` with props: title."));
        let code = text.find("function Card").unwrap();
        let tags = text.find("JSX elements: div").unwrap();
        let hooks = text.find("Hooks used: useMemo").unwrap();
        assert!(code < tags && tags < hooks);
    }

    #[test]
    fn test_section_preamble_names_parent() {
        let mut chunk = component();
        chunk.kind = ChunkKind::JsxSection;
        chunk.section_label = Some("stats-panel".into());
        let text = build_embedding_input(&chunk, DEFAULT_MAX_CHARS);
        assert!(text.starts_with("UI section `stats-panel` extracted from `Card`."));
    }

    #[test]
    fn test_long_input_is_truncated_with_marker() {
        let mut chunk = component();
        chunk.content = "x".repeat(10_000);
        let text = build_embedding_input(&chunk, 500);

        assert_eq!(text.chars().count(), 500);
        assert!(text.ends_with("[content truncated]"));
        assert!(text.starts_with("React component `Card`"));
    }

    #[test]
    fn test_tiny_cap_never_exceeds_limit() {
        let text = build_embedding_input(&component(), 10);
        assert_eq!(text.chars().count(), 10);
        assert_eq!(text, "\n... [cont");
        assert!(build_embedding_input(&component(), 0).is_empty());
    }
}
