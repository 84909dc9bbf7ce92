//! Code parsing using tree-sitter
//!
//! Parses JavaScript, TypeScript and TSX sources into syntax trees for chunk extraction.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Tsx,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Tsx => "TSX",
            Language::Unknown => "Unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != Language::Unknown
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Code parser using tree-sitter
pub struct CodeParser {
    javascript_parser: Parser,
    typescript_parser: Parser,
    tsx_parser: Parser,
}

impl CodeParser {
    /// Create a new code parser with all supported languages
    pub fn new() -> Result<Self> {
        let mut javascript_parser = Parser::new();
        javascript_parser.set_language(tree_sitter_javascript::language())
            .context("Failed to set JavaScript language")?;

        let mut typescript_parser = Parser::new();
        typescript_parser.set_language(tree_sitter_typescript::language_typescript())
            .context("Failed to set TypeScript language")?;

        let mut tsx_parser = Parser::new();
        tsx_parser.set_language(tree_sitter_typescript::language_tsx())
            .context("Failed to set TSX language")?;

        Ok(Self {
            javascript_parser,
            typescript_parser,
            tsx_parser,
        })
    }

    /// Read and parse a file
    pub fn parse_file(&mut self, path: &Path) -> Result<ParsedFile> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let language = Language::from_path(path);
        let tree = self.parse_source(&content, language)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language,
            line_count: tree.root_node().end_position().row + 1,
            content,
            tree,
        })
    }

    /// Parse source text with the appropriate language parser.
    ///
    /// A tree containing syntax errors is rejected rather than chunked.
    pub fn parse_source(&mut self, content: &str, language: Language) -> Result<Tree> {
        let parser = match language {
            Language::JavaScript => &mut self.javascript_parser,
            Language::TypeScript => &mut self.typescript_parser,
            Language::Tsx => &mut self.tsx_parser,
            Language::Unknown => {
                anyhow::bail!("Unsupported language");
            }
        };

        let tree = parser.parse(content, None)
            .context("Tree-sitter parsing failed")?;

        if tree.root_node().has_error() {
            let line = first_error_line(tree.root_node()).unwrap_or(1);
            anyhow::bail!("Syntax error near line {}", line);
        }

        Ok(tree)
    }
}

/// Parsed source file with its syntax tree
pub struct ParsedFile {
    pub path: PathBuf,
    pub language: Language,
    pub content: String,
    pub tree: Tree,
    pub line_count: usize,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("line_count", &self.line_count)
            .finish()
    }
}

/// Text of a node
pub fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    content.get(node.byte_range()).unwrap_or("")
}

/// 1-based line a node starts on
pub fn start_line(node: Node) -> usize {
    node.start_position().row + 1
}

/// 1-based line a node ends on
pub fn end_line(node: Node) -> usize {
    node.end_position().row + 1
}

fn first_error_line(root: Node) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(start_line(node));
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("tsx"), Language::Tsx);
        assert_eq!(Language::from_extension("rs"), Language::Unknown);
        assert!(!Language::from_path(Path::new("README.md")).is_supported());
    }

    #[test]
    fn test_parse_tsx_file() {
        let mut parser = CodeParser::new().unwrap();
        let code = r#"
export function Card({ title }: { title: string }) {
  return <div className="card">{title}</div>;
}
"#;
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("Card.tsx");
        std::fs::write(&file_path, code).unwrap();

        let parsed = parser.parse_file(&file_path).unwrap();

        assert_eq!(parsed.language, Language::Tsx);
        assert!(!parsed.tree.root_node().has_error());
        assert!(parsed.line_count >= 4);
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        let mut parser = CodeParser::new().unwrap();
        let result = parser.parse_source("function broken( {\n  return 1;\n", Language::JavaScript);
        assert!(result.is_err());
    }
}
