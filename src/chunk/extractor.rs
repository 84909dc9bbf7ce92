//! Chunk extraction
//!
//! Walks a parsed JS/TS syntax tree once and turns every declared function-like
//! unit into a [`CodeChunk`] with its structural metadata.

use std::collections::HashSet;

use tracing::{debug, warn};
use tree_sitter::{Node, Tree};

use super::{
    chunk_id, is_hook_name, push_unique, ChunkKind, ChunkMetadata, CodeChunk, MarkupOutline,
    MarkupSection,
};
use crate::core::parser::{end_line, node_text, start_line, CodeParser, Language};

/// Filters applied to extracted chunks before splitting
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub min_lines: usize,
    pub include_anonymous: bool,
    /// Allow-list of kinds; `None` keeps everything
    pub kinds: Option<Vec<ChunkKind>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_lines: 3,
            include_anonymous: false,
            kinds: None,
        }
    }
}

impl ExtractOptions {
    fn keeps(&self, chunk: &CodeChunk) -> bool {
        if chunk.line_count() < self.min_lines {
            return false;
        }
        if chunk.name.is_none() && !self.include_anonymous {
            return false;
        }
        match &self.kinds {
            Some(kinds) => kinds.contains(&chunk.kind),
            None => true,
        }
    }
}

/// Parse `source` and extract its chunks.
///
/// A file that fails to parse yields no chunks; the failure is logged, never returned.
pub fn extract_from_source(
    parser: &mut CodeParser,
    source: &str,
    language: Language,
    file_path: &str,
    options: &ExtractOptions,
) -> Vec<CodeChunk> {
    match parser.parse_source(source, language) {
        Ok(tree) => extract_chunks(&tree, source, file_path, options),
        Err(e) => {
            warn!("Skipping {}: {:#}", file_path, e);
            Vec::new()
        }
    }
}

/// Extract chunks from an already parsed tree
pub fn extract_chunks(
    tree: &Tree,
    source: &str,
    file_path: &str,
    options: &ExtractOptions,
) -> Vec<CodeChunk> {
    let root = tree.root_node();
    let exports = ExportTable::collect(root, source);

    let mut chunks = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(unit) = unit_at(node, source) {
            chunks.push(build_chunk(&unit, source, file_path, &exports));
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    let total = chunks.len();
    let kept: Vec<CodeChunk> = chunks.into_iter().filter(|c| options.keeps(c)).collect();
    debug!("{}: extracted {} units, kept {}", file_path, total, kept.len());
    kept
}

/// Named and default exports of one file
#[derive(Debug, Default)]
struct ExportTable {
    named: HashSet<String>,
    default: Option<String>,
}

impl ExportTable {
    fn collect(root: Node, source: &str) -> Self {
        let mut table = ExportTable::default();
        let mut cursor = root.walk();

        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "export_statement" {
                continue;
            }
            let is_default = has_default_keyword(statement);

            if let Some(declaration) = statement.child_by_field_name("declaration") {
                for name in declared_names(declaration, source) {
                    if is_default {
                        table.default = Some(name.clone());
                    }
                    table.named.insert(name);
                }
            }

            if let Some(value) = statement.child_by_field_name("value") {
                if is_default {
                    let name = match value.kind() {
                        "identifier" => Some(node_text(value, source).to_string()),
                        _ => value
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source).to_string()),
                    };
                    if let Some(name) = name {
                        table.default = Some(name);
                    }
                }
            }

            let mut inner = statement.walk();
            for clause in statement.named_children(&mut inner) {
                if clause.kind() != "export_clause" {
                    continue;
                }
                let mut specs = clause.walk();
                for spec in clause.named_children(&mut specs) {
                    let Some(local) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let local = node_text(local, source).to_string();
                    let alias = spec
                        .child_by_field_name("alias")
                        .map(|a| node_text(a, source));
                    if alias == Some("default") {
                        table.default = Some(local);
                    } else {
                        table.named.insert(local);
                    }
                }
            }
        }

        table
    }

    fn is_exported(&self, name: &str) -> bool {
        self.named.contains(name) || self.default.as_deref() == Some(name)
    }

    fn is_default(&self, name: &str) -> bool {
        self.default.as_deref() == Some(name)
    }
}

fn has_default_keyword(statement: Node) -> bool {
    let mut cursor = statement.walk();
    let found = statement.children(&mut cursor).any(|c| c.kind() == "default");
    found
}

fn declared_names(declaration: Node, source: &str) -> Vec<String> {
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            declaration
                .named_children(&mut cursor)
                .filter(|d| d.kind() == "variable_declarator")
                .filter_map(|d| d.child_by_field_name("name"))
                .filter(|n| n.kind() == "identifier")
                .map(|n| node_text(n, source).to_string())
                .collect()
        }
        _ => declaration
            .child_by_field_name("name")
            .map(|n| vec![node_text(n, source).to_string()])
            .unwrap_or_default(),
    }
}

/// A function-like unit located in the tree
struct Unit<'tree> {
    name: Option<String>,
    /// Node whose text becomes the chunk content
    span: Node<'tree>,
    /// The function node itself
    function: Node<'tree>,
    default_export: bool,
}

fn is_function_expression(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function" | "function_expression" | "generator_function"
    )
}

fn unit_at<'tree>(node: Node<'tree>, source: &str) -> Option<Unit<'tree>> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => Some(Unit {
            name: node
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string()),
            span: node,
            function: node,
            default_export: false,
        }),
        "variable_declarator" => {
            let name = node.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            let value = node.child_by_field_name("value")?;
            if !is_function_expression(value) {
                return None;
            }
            Some(Unit {
                name: Some(node_text(name, source).to_string()),
                span: declaration_span(node),
                function: value,
                default_export: false,
            })
        }
        "export_statement" if has_default_keyword(node) => {
            let value = node.child_by_field_name("value")?;
            if !is_function_expression(value) {
                return None;
            }
            Some(Unit {
                name: value
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string()),
                span: value,
                function: value,
                default_export: true,
            })
        }
        _ => None,
    }
}

/// Single-declarator statements are chunked whole so `const` is part of the text
fn declaration_span(declarator: Node) -> Node {
    match declarator.parent() {
        Some(parent)
            if matches!(parent.kind(), "lexical_declaration" | "variable_declaration")
                && parent.named_child_count() == 1 =>
        {
            parent
        }
        _ => declarator,
    }
}

fn build_chunk(unit: &Unit, source: &str, file_path: &str, exports: &ExportTable) -> CodeChunk {
    let body = unit
        .function
        .child_by_field_name("body")
        .unwrap_or(unit.function);
    let scan = scan_body(body, source);

    let kind = classify(unit.name.as_deref(), scan.has_markup);

    let (is_exported, is_default_export) = match unit.name.as_deref() {
        Some(name) => (
            unit.default_export || exports.is_exported(name),
            unit.default_export || exports.is_default(name),
        ),
        None => (unit.default_export, unit.default_export),
    };

    let props = first_parameter_fields(unit.function, source);

    let metadata = ChunkMetadata {
        is_exported,
        is_default_export,
        props: (!props.is_empty()).then_some(props),
        hooks: (!scan.hooks.is_empty()).then_some(scan.hooks),
        jsx_elements: (!scan.jsx_elements.is_empty()).then_some(scan.jsx_elements),
    };

    let markup = if kind == ChunkKind::Component {
        markup_outline(body, source)
    } else {
        None
    };

    let content = node_text(unit.span, source).to_string();
    let start = start_line(unit.span);

    CodeChunk {
        id: chunk_id(file_path, start, &content),
        file_path: file_path.to_string(),
        start_line: start,
        end_line: end_line(unit.span),
        start_column: unit.span.start_position().column + 1,
        end_column: unit.span.end_position().column + 1,
        kind,
        name: unit.name.clone(),
        content,
        metadata,
        parent_id: None,
        section_index: None,
        section_label: None,
        markup,
    }
}

fn classify(name: Option<&str>, has_markup: bool) -> ChunkKind {
    let capitalized = name
        .and_then(|n| n.chars().next())
        .map(|c| c.is_uppercase())
        .unwrap_or(false);

    match name {
        Some(n) if is_hook_name(n) => ChunkKind::Hook,
        _ if capitalized && has_markup => ChunkKind::Component,
        _ if has_markup => ChunkKind::JsxFragment,
        _ => ChunkKind::Function,
    }
}

#[derive(Debug, Default)]
struct BodyScan {
    has_markup: bool,
    hooks: Vec<String>,
    jsx_elements: Vec<String>,
}

fn is_markup(node: Node) -> bool {
    matches!(
        node.kind(),
        "jsx_element" | "jsx_self_closing_element" | "jsx_fragment"
    )
}

fn scan_body(body: Node, source: &str) -> BodyScan {
    let mut scan = BodyScan::default();
    let mut stack = vec![body];

    while let Some(node) = stack.pop() {
        if is_markup(node) {
            scan.has_markup = true;
        }
        match node.kind() {
            "jsx_opening_element" | "jsx_self_closing_element" => {
                if let Some(name) = node.child_by_field_name("name") {
                    push_unique(&mut scan.jsx_elements, node_text(name, source));
                }
            }
            "call_expression" => {
                if let Some(callee) = hook_callee(node, source) {
                    push_unique(&mut scan.hooks, callee);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    scan
}

fn hook_callee<'a>(call: Node, source: &'a str) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    let name = match function.kind() {
        "identifier" => node_text(function, source),
        "member_expression" => node_text(function.child_by_field_name("property")?, source),
        _ => return None,
    };
    is_hook_name(name).then_some(name)
}

/// Field names of the first parameter when it is a destructuring pattern
fn first_parameter_fields(function: Node, source: &str) -> Vec<String> {
    let first = match function.child_by_field_name("parameters") {
        Some(params) => {
            let mut cursor = params.walk();
            let first = params.named_children(&mut cursor).find(|p| p.kind() != "comment");
            first
        }
        None => function.child_by_field_name("parameter"),
    };

    let Some(mut param) = first else {
        return Vec::new();
    };

    // Unwrap TS parameter wrappers and default values down to the pattern
    loop {
        let next = match param.kind() {
            "required_parameter" | "optional_parameter" => param.child_by_field_name("pattern"),
            "assignment_pattern" => param.child_by_field_name("left"),
            _ => None,
        };
        match next {
            Some(inner) => param = inner,
            None => break,
        }
    }

    if param.kind() != "object_pattern" {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut cursor = param.walk();
    for entry in param.named_children(&mut cursor) {
        let key = match entry.kind() {
            "shorthand_property_identifier_pattern" | "shorthand_property_identifier" => {
                Some(entry)
            }
            "pair_pattern" => entry.child_by_field_name("key"),
            "object_assignment_pattern" => entry.child_by_field_name("left"),
            _ => None,
        };
        if let Some(key) = key {
            push_unique(&mut fields, node_text(key, source));
        }
    }
    fields
}

fn unwrap_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Locate the markup a component returns and outline its top-level children
fn markup_outline(body: Node, source: &str) -> Option<MarkupOutline> {
    let (return_line, root) = if body.kind() == "statement_block" {
        let mut cursor = body.walk();
        let found = body
            .named_children(&mut cursor)
            .filter(|s| s.kind() == "return_statement")
            .filter_map(|s| {
                let value = unwrap_parens(s.named_child(0)?);
                is_markup(value).then(|| (start_line(s), value))
            })
            .last();
        found?
    } else {
        let value = unwrap_parens(body);
        if !is_markup(value) {
            return None;
        }
        (start_line(body), value)
    };

    let mut sections = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if is_significant_child(child, source) {
            sections.push(outline_section(child, source));
        }
    }

    Some(MarkupOutline {
        return_line,
        sections,
    })
}

fn is_significant_child(child: Node, source: &str) -> bool {
    match child.kind() {
        "jsx_opening_element" | "jsx_closing_element" | "comment" => false,
        "jsx_text" | "html_character_reference" => !node_text(child, source).trim().is_empty(),
        "jsx_expression" => {
            let mut cursor = child.walk();
            let has_content = child
                .named_children(&mut cursor)
                .any(|c| c.kind() != "comment");
            has_content
        }
        _ => true,
    }
}

fn outline_section(child: Node, source: &str) -> MarkupSection {
    let opening = match child.kind() {
        "jsx_element" => child
            .child_by_field_name("open_tag")
            .or_else(|| child.named_child(0).filter(|n| n.kind() == "jsx_opening_element")),
        "jsx_self_closing_element" => Some(child),
        _ => None,
    };

    let mut section = MarkupSection {
        start_line: start_line(child),
        end_line: end_line(child),
        start_column: child.start_position().column + 1,
        end_column: child.end_position().column + 1,
        content: node_text(child, source).to_string(),
        ..MarkupSection::default()
    };

    if let Some(opening) = opening {
        section.tag_name = opening
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string());

        let mut cursor = opening.walk();
        for attribute in opening.named_children(&mut cursor) {
            if attribute.kind() != "jsx_attribute" {
                continue;
            }
            let Some((name, value)) = attribute_pair(attribute, source) else {
                continue;
            };
            match name {
                "aria-label" | "aria-labelledby" if section.aria_label.is_none() => {
                    if !value.trim().is_empty() {
                        section.aria_label = Some(value.trim().to_string());
                    }
                }
                "className" | "class" => {
                    section
                        .class_tokens
                        .extend(value.split_whitespace().map(str::to_string));
                }
                _ => {}
            }
        }
    }

    section.jsx_elements = scan_body(child, source).jsx_elements;
    section
}

/// Attribute name and its literal string value, if it has one
fn attribute_pair<'a>(attribute: Node, source: &'a str) -> Option<(&'a str, &'a str)> {
    let name = attribute.named_child(0)?;
    let mut value = attribute.named_child(1)?;

    if value.kind() == "jsx_expression" {
        value = value.named_child(0)?;
    }
    let text = match value.kind() {
        "string" | "template_string" => node_text(value, source),
        _ => return None,
    };
    let text = text
        .trim_start_matches(['"', '\'', '`'])
        .trim_end_matches(['"', '\'', '`']);
    Some((node_text(name, source), text))
}
