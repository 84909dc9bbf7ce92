//! Semantic code chunks
//!
//! A chunk is one function-like unit (component, hook, helper, markup fragment)
//! carved out of a source file, or a summary/section piece of an oversized unit.

pub mod extractor;
pub mod splitter;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use extractor::{extract_chunks, ExtractOptions};
pub use splitter::{split_chunk, split_chunks, SplitOptions};

/// Classification of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkKind {
    Component,
    ComponentSummary,
    Hook,
    Function,
    FunctionSummary,
    FunctionSection,
    JsxFragment,
    JsxSection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Component => "component",
            ChunkKind::ComponentSummary => "component-summary",
            ChunkKind::Hook => "hook",
            ChunkKind::Function => "function",
            ChunkKind::FunctionSummary => "function-summary",
            ChunkKind::FunctionSection => "function-section",
            ChunkKind::JsxFragment => "jsx-fragment",
            ChunkKind::JsxSection => "jsx-section",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "component" => Some(ChunkKind::Component),
            "component-summary" => Some(ChunkKind::ComponentSummary),
            "hook" => Some(ChunkKind::Hook),
            "function" => Some(ChunkKind::Function),
            "function-summary" => Some(ChunkKind::FunctionSummary),
            "function-section" => Some(ChunkKind::FunctionSection),
            "jsx-fragment" => Some(ChunkKind::JsxFragment),
            "jsx-section" => Some(ChunkKind::JsxSection),
            _ => None,
        }
    }

    /// Kinds produced only by the splitter
    pub fn is_split_piece(&self) -> bool {
        matches!(
            self,
            ChunkKind::ComponentSummary
                | ChunkKind::FunctionSummary
                | ChunkKind::FunctionSection
                | ChunkKind::JsxSection
        )
    }

    pub fn summary_variant(&self) -> Self {
        match self {
            ChunkKind::Component | ChunkKind::ComponentSummary => ChunkKind::ComponentSummary,
            _ => ChunkKind::FunctionSummary,
        }
    }

    pub fn section_variant(&self) -> Self {
        match self {
            ChunkKind::Component
            | ChunkKind::ComponentSummary
            | ChunkKind::JsxFragment
            | ChunkKind::JsxSection => ChunkKind::JsxSection,
            _ => ChunkKind::FunctionSection,
        }
    }

    /// Human label used in findings
    pub fn label(&self) -> &'static str {
        match self {
            ChunkKind::Component => "Component",
            ChunkKind::ComponentSummary => "Component summary",
            ChunkKind::Hook => "Hook",
            ChunkKind::Function => "Function",
            ChunkKind::FunctionSummary => "Function summary",
            ChunkKind::FunctionSection => "Function section",
            ChunkKind::JsxFragment => "JSX fragment",
            ChunkKind::JsxSection => "JSX section",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural hints gathered while extracting a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub is_exported: bool,
    pub is_default_export: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsx_elements: Option<Vec<String>>,
}

impl ChunkMetadata {
    /// Copy carrying only export status
    pub fn export_only(&self) -> Self {
        Self {
            is_exported: self.is_exported,
            is_default_export: self.is_default_export,
            ..Self::default()
        }
    }
}

/// Outline of the markup a component returns, recorded during extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupOutline {
    /// Line holding the `return` (or the arrow body start)
    pub return_line: usize,
    pub sections: Vec<MarkupSection>,
}

/// One significant top-level child of the returned markup root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupSection {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
    /// Exact source text of the child
    pub content: String,
    pub tag_name: Option<String>,
    pub aria_label: Option<String>,
    pub class_tokens: Vec<String>,
    pub jsx_elements: Vec<String>,
}

/// The unit of indexing and comparison
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub kind: ChunkKind,
    pub name: Option<String>,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub parent_id: Option<String>,
    pub section_index: Option<usize>,
    pub section_label: Option<String>,
    /// Returned markup outline; only set on unsplit components
    pub markup: Option<MarkupOutline>,
}

impl CodeChunk {
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Persisted form (everything except content and the transient outline)
    pub fn to_record(&self) -> ChunkRecord {
        ChunkRecord {
            id: self.id.clone(),
            file_path: self.file_path.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
            start_column: self.start_column,
            end_column: self.end_column,
            kind: self.kind,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            parent_id: self.parent_id.clone(),
            section_index: self.section_index,
            section_label: self.section_label.clone(),
        }
    }
}

/// Chunk metadata as stored in `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    #[serde(default)]
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub start_column: usize,
    #[serde(default)]
    pub end_column: usize,
    pub kind: ChunkKind,
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: ChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_label: Option<String>,
}

impl ChunkRecord {
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// Deterministic content address of a chunk.
///
/// Depends on the start line, so moving an unchanged unit changes its id.
pub fn chunk_id(file_path: &str, start_line: usize, content: &str) -> String {
    let key = format!("chunk|{}|{}|{}", file_path, start_line, content);
    Uuid::new_v5(&Uuid::nil(), key.as_bytes()).to_string()
}

/// Whether a name follows the `useXxx` hook convention
pub fn is_hook_name(name: &str) -> bool {
    name.strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

/// Push a value once, keeping first-seen order
pub(crate) fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
