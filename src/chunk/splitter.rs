//! Oversized chunk splitting
//!
//! Keeps every indexed chunk inside an embeddable line budget. Components that
//! return markup with several top-level children are split along that markup;
//! everything else falls back to overlapping line windows.

use tracing::debug;

use super::{chunk_id, ChunkKind, ChunkMetadata, CodeChunk, MarkupOutline, MarkupSection};

/// Overlap between consecutive line windows never exceeds this
const MAX_WINDOW_OVERLAP: usize = 10;

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub max_lines: usize,
    /// Sections shorter than this are dropped
    pub min_section_lines: usize,
    /// Split components along their returned markup
    pub structural: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_lines: 100,
            min_section_lines: 3,
            structural: true,
        }
    }
}

/// Split every chunk that exceeds the line budget
pub fn split_chunks(chunks: Vec<CodeChunk>, options: &SplitOptions) -> Vec<CodeChunk> {
    chunks
        .into_iter()
        .flat_map(|chunk| split_chunk(chunk, options))
        .collect()
}

/// Split one chunk into a summary plus ordered sections, or return it unchanged
pub fn split_chunk(mut chunk: CodeChunk, options: &SplitOptions) -> Vec<CodeChunk> {
    let max_lines = options.max_lines.max(1);
    if chunk.line_count() <= max_lines {
        chunk.markup = None;
        return vec![chunk];
    }

    let outline = chunk.markup.take();
    let pieces = match outline {
        Some(outline)
            if options.structural
                && chunk.kind == ChunkKind::Component
                && outline.sections.len() >= 2 =>
        {
            split_structural(&chunk, &outline)
        }
        _ => split_line_windows(&chunk, max_lines),
    };

    let total = pieces.len();
    let kept: Vec<CodeChunk> = pieces
        .into_iter()
        .filter(|piece| piece.parent_id.is_none() || piece.line_count() >= options.min_section_lines)
        .collect();

    debug!(
        "Split {} ({} lines) into {} pieces, dropped {}",
        chunk.name.as_deref().unwrap_or("<anonymous>"),
        chunk.line_count(),
        kept.len(),
        total - kept.len()
    );
    kept
}

fn split_structural(chunk: &CodeChunk, outline: &MarkupOutline) -> Vec<CodeChunk> {
    let lines: Vec<&str> = chunk.content.lines().collect();
    let upto = outline
        .return_line
        .saturating_sub(chunk.start_line)
        .min(lines.len().saturating_sub(1));

    let mut content = lines[..=upto].join("\n");
    content.push_str(&format!(
        "\n    {{/* ... {} sections elided ... */}}\n  );\n}}",
        outline.sections.len()
    ));

    let summary = CodeChunk {
        id: chunk_id(&chunk.file_path, chunk.start_line, &content),
        file_path: chunk.file_path.clone(),
        start_line: chunk.start_line,
        end_line: chunk.start_line + upto,
        start_column: chunk.start_column,
        end_column: lines.get(upto).map(|l| l.len() + 1).unwrap_or(1),
        kind: chunk.kind.summary_variant(),
        name: chunk.name.clone(),
        content,
        metadata: chunk.metadata.clone(),
        parent_id: None,
        section_index: None,
        section_label: None,
        markup: None,
    };

    let mut pieces = Vec::with_capacity(outline.sections.len() + 1);
    for (index, section) in outline.sections.iter().enumerate() {
        let metadata = ChunkMetadata {
            jsx_elements: (!section.jsx_elements.is_empty()).then(|| section.jsx_elements.clone()),
            ..chunk.metadata.export_only()
        };
        pieces.push(CodeChunk {
            id: chunk_id(&chunk.file_path, section.start_line, &section.content),
            file_path: chunk.file_path.clone(),
            start_line: section.start_line,
            end_line: section.end_line,
            start_column: section.start_column,
            end_column: section.end_column,
            kind: ChunkKind::JsxSection,
            name: chunk.name.clone(),
            content: section.content.clone(),
            metadata,
            parent_id: Some(summary.id.clone()),
            section_index: Some(index),
            section_label: Some(section_label(section, index)),
            markup: None,
        });
    }

    pieces.insert(0, summary);
    pieces
}

fn split_line_windows(chunk: &CodeChunk, max_lines: usize) -> Vec<CodeChunk> {
    let lines: Vec<&str> = chunk.content.lines().collect();
    let windows = line_windows(lines.len(), max_lines);

    let mut pieces: Vec<CodeChunk> = Vec::with_capacity(windows.len());
    let mut summary_id = String::new();

    for (position, (from, to)) in windows.into_iter().enumerate() {
        let content = lines[from..=to].join("\n");
        let start_line = chunk.start_line + from;
        let end_line = chunk.start_line + to;
        let id = chunk_id(&chunk.file_path, start_line, &content);
        let end_column = lines[to].len() + 1;

        if position == 0 {
            summary_id = id.clone();
            pieces.push(CodeChunk {
                id,
                file_path: chunk.file_path.clone(),
                start_line,
                end_line,
                start_column: chunk.start_column,
                end_column,
                kind: chunk.kind.summary_variant(),
                name: chunk.name.clone(),
                content,
                metadata: chunk.metadata.clone(),
                parent_id: None,
                section_index: None,
                section_label: None,
                markup: None,
            });
            continue;
        }

        pieces.push(CodeChunk {
            id,
            file_path: chunk.file_path.clone(),
            start_line,
            end_line,
            start_column: 1,
            end_column,
            kind: chunk.kind.section_variant(),
            name: chunk.name.clone(),
            content,
            metadata: chunk.metadata.export_only(),
            parent_id: Some(summary_id.clone()),
            section_index: Some(position - 1),
            section_label: Some(format!("lines-{}-{}", start_line, end_line)),
            markup: None,
        });
    }

    pieces
}

/// Zero-based inclusive `(from, to)` line windows over `total` lines
fn line_windows(total: usize, max_lines: usize) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    if total == 0 {
        return windows;
    }

    let size = max_lines.max(1);
    let overlap = MAX_WINDOW_OVERLAP.min(size / 5);
    let last = total - 1;
    let mut start = 0;

    loop {
        let end = (start + size - 1).min(last);
        windows.push((start, end));
        if end >= last {
            break;
        }
        // Overlap must never stall the window
        let next = (end + 1).saturating_sub(overlap);
        start = next.max(start + 1);
    }

    windows
}

/// Label priority: aria label, first semantic class, tag name, ordinal
fn section_label(section: &MarkupSection, index: usize) -> String {
    if let Some(label) = &section.aria_label {
        return label.clone();
    }
    if let Some(class) = section.class_tokens.iter().find(|t| !is_utility_class(t)) {
        return class.clone();
    }
    match &section.tag_name {
        Some(tag) => format!("{}-{}", tag, index),
        None => format!("section-{}", index),
    }
}

const UTILITY_CLASSES: &[&str] = &[
    "flex", "grid", "block", "inline", "inline-block", "inline-flex", "inline-grid", "hidden",
    "contents", "relative", "absolute", "fixed", "sticky", "static", "container", "truncate",
    "italic", "underline", "uppercase", "lowercase", "capitalize", "rounded", "border", "shadow",
    "grow", "shrink", "transition", "visible", "invisible", "sr-only", "antialiased",
];

const UTILITY_PREFIXES: &[&str] = &[
    "p-", "px-", "py-", "pt-", "pr-", "pb-", "pl-", "m-", "mx-", "my-", "mt-", "mr-", "mb-",
    "ml-", "w-", "h-", "min-w-", "min-h-", "max-w-", "max-h-", "size-", "gap-", "space-x-",
    "space-y-", "text-", "font-", "leading-", "tracking-", "bg-", "border-", "rounded-",
    "shadow-", "flex-", "grid-", "col-", "row-", "items-", "justify-", "content-", "self-",
    "place-", "overflow-", "z-", "top-", "right-", "bottom-", "left-", "inset-", "opacity-",
    "ring-", "divide-", "transition-", "duration-", "ease-", "delay-", "animate-", "cursor-",
    "select-", "order-", "basis-", "aspect-", "object-", "fill-", "stroke-", "translate-",
    "rotate-", "scale-", "from-", "to-", "via-", "outline-", "decoration-", "whitespace-",
    "break-", "line-clamp-", "backdrop-", "blur-",
];

/// Tailwind-style utility tokens carry no meaning as a section label
fn is_utility_class(token: &str) -> bool {
    if token.contains(':') || token.contains('[') || token.starts_with('-') {
        return true;
    }
    UTILITY_CLASSES.contains(&token) || UTILITY_PREFIXES.iter().any(|p| token.starts_with(p))
}
