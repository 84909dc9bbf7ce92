//! Configuration management for NEXUS duplicate detection

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::chunk::{ChunkKind, ExtractOptions, SplitOptions};
use crate::index::DEFAULT_INDEX_DIR;
use crate::lint::CheckOptions;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub lint: LintConfig,
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index location, relative to the project root
    pub index_dir: String,
    pub min_lines: usize,
    pub max_lines: usize,
    pub min_section_lines: usize,
    pub structural_split: bool,
    pub include_anonymous: bool,
    /// Chunk kinds to index; empty means all
    pub kinds: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size_mb: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    /// Overrides `OLLAMA_EMBED_MODEL`
    pub model: Option<String>,
    /// Overrides `OLLAMA_HOST`
    pub endpoint: Option<String>,
    pub max_chars: usize,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub threshold: f64,
    pub min_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            lint: LintConfig::default(),
            verbose: false,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            min_lines: 3,
            max_lines: 100,
            min_section_lines: 3,
            structural_split: true,
            include_anonymous: false,
            kinds: Vec::new(),
            exclude_patterns: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "dist".to_string(),
                "build".to_string(),
                "coverage".to_string(),
                "*.min.js".to_string(),
                "*.d.ts".to_string(),
            ],
            max_file_size_mb: 1,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            endpoint: None,
            max_chars: crate::embed::DEFAULT_MAX_CHARS,
            concurrency: 4,
            timeout_secs: 60,
        }
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            min_lines: 3,
        }
    }
}

impl Config {
    pub fn extract_options(&self) -> ExtractOptions {
        let kinds: Vec<ChunkKind> = self
            .index
            .kinds
            .iter()
            .filter_map(|k| {
                let kind = ChunkKind::parse(k);
                if kind.is_none() {
                    warn!("Ignoring unknown chunk kind in config: {}", k);
                }
                kind
            })
            .collect();

        ExtractOptions {
            min_lines: self.index.min_lines,
            include_anonymous: self.index.include_anonymous,
            kinds: (!kinds.is_empty()).then_some(kinds),
        }
    }

    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            max_lines: self.index.max_lines,
            min_section_lines: self.index.min_section_lines,
            structural: self.index.structural_split,
        }
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            threshold: self.lint.threshold as f32,
            min_lines: self.lint.min_lines,
        }
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs.max(1))
    }
}

/// Get the configuration file path
fn config_path() -> Result<PathBuf> {
    let config_dir = directories::ProjectDirs::from("com", "nexus", "dupes")
        .context("Failed to determine config directory")?
        .config_dir()
        .to_path_buf();

    Ok(config_dir.join("config.toml"))
}

/// Load configuration from file or use defaults
pub fn load_config(custom_path: Option<&str>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        PathBuf::from(p)
    } else {
        config_path()?
    };

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Initialize configuration file with defaults
pub fn init_config(custom_path: Option<&str>) -> Result<PathBuf> {
    let path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => config_path()?,
    };

    if path.exists() {
        println!("Configuration file already exists at {:?}", path);
        return Ok(path);
    }

    // Create directory if needed
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let content = toml::to_string_pretty(&Config::default())
        .context("Failed to serialize default config")?;

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config to {:?}", path))?;

    println!("Configuration initialized at {:?}", path);
    Ok(path)
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    println!("{}", content);
    Ok(())
}
