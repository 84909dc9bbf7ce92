//! On-disk vector index
//!
//! Layout of an index directory:
//!
//! - `manifest.json`  presence means "an index exists"; content is informational
//! - `metadata.json`  chunk id -> chunk record (flat, or wrapped in `{ "entries": ... }`)
//! - `ids.json`       chunk ids in row order of `embeddings.bin`
//! - `embeddings.bin` `u32 dimension, u32 count` (little endian), then `count * dimension` f32 LE
//!
//! The file -> chunk ids map is derived at load time and never persisted.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunk::ChunkRecord;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const IDS_FILE: &str = "ids.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";

pub const INDEX_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No duplicate index at {0}")]
    Missing(PathBuf),
    #[error("Corrupt duplicate index: {0}")]
    Corrupt(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Vector for {id} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

/// Informational header written last on every indexing pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub version: u32,
    pub created_at: String,
    pub model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub vector_count: usize,
    pub file_count: usize,
}

/// Both accepted shapes of `metadata.json`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MetadataFile {
    Wrapped { entries: BTreeMap<String, ChunkRecord> },
    Flat(BTreeMap<String, ChunkRecord>),
}

impl MetadataFile {
    fn into_entries(self) -> BTreeMap<String, ChunkRecord> {
        match self {
            MetadataFile::Wrapped { entries } | MetadataFile::Flat(entries) => entries,
        }
    }
}

/// Chunk vectors, chunk metadata and the derived file map, loaded as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    /// Row order of `vectors`
    ids: Vec<String>,
    /// Row-major arena of `ids.len() * dimension` floats
    vectors: Vec<f32>,
    rows: HashMap<String, usize>,
    metadata: HashMap<String, ChunkRecord>,
    files: HashMap<String, Vec<String>>,
}

impl VectorIndex {
    /// Build an index from chunk records and `(id, vector)` rows.
    ///
    /// Records without a vector are kept as metadata only. All vectors must share one dimension.
    pub fn build(
        records: Vec<ChunkRecord>,
        rows: Vec<(String, Vec<f32>)>,
    ) -> Result<Self, StoreError> {
        let dimension = rows.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut ids = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len() * dimension);

        for (id, vector) in rows {
            if vector.len() != dimension {
                return Err(StoreError::DimensionMismatch {
                    id,
                    expected: dimension,
                    found: vector.len(),
                });
            }
            vectors.extend_from_slice(&vector);
            ids.push(id);
        }

        let metadata = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Ok(Self::from_parts(dimension, ids, vectors, metadata))
    }

    fn from_parts(
        dimension: usize,
        ids: Vec<String>,
        vectors: Vec<f32>,
        metadata: HashMap<String, ChunkRecord>,
    ) -> Self {
        let rows = ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), row))
            .collect();

        let mut files: HashMap<String, Vec<String>> = HashMap::new();
        let mut ordered: Vec<&ChunkRecord> = metadata.values().collect();
        ordered.sort_by(|a, b| (a.start_line, &a.id).cmp(&(b.start_line, &b.id)));
        for record in ordered {
            files
                .entry(record.file_path.clone())
                .or_default()
                .push(record.id.clone());
        }

        Self {
            dimension,
            ids,
            vectors,
            rows,
            metadata,
            files,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.metadata.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        let row = *self.rows.get(id)?;
        self.row(row)
    }

    fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row * self.dimension;
        self.vectors.get(start..start + self.dimension)
    }

    /// Stored vectors in row order
    pub fn iter_vectors(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter_map(move |(row, id)| self.row(row).map(|v| (id.as_str(), v)))
    }

    pub fn record(&self, id: &str) -> Option<&ChunkRecord> {
        self.metadata.get(id)
    }

    /// Chunk ids of one project-relative file, ordered by start line
    pub fn chunks_for_file(&self, file_path: &str) -> &[String] {
        self.files.get(file_path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Write all index artifacts into `dir`, replacing any previous index
pub fn write_index(dir: &Path, index: &VectorIndex, model: &str) -> Result<Manifest, StoreError> {
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

    // Readers treat a missing manifest as "no index" while the rest is rewritten
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path).map_err(|source| io_error(&manifest_path, source))?;
    }

    let entries: BTreeMap<&String, &ChunkRecord> = index.metadata.iter().collect();
    write_json(&dir.join(METADATA_FILE), &entries)?;
    write_json(&dir.join(IDS_FILE), &index.ids)?;
    write_atomic(
        &dir.join(EMBEDDINGS_FILE),
        &encode_vectors(index.dimension, index.ids.len(), &index.vectors),
    )?;

    let manifest = Manifest {
        version: INDEX_FORMAT_VERSION,
        created_at: chrono::Utc::now().to_rfc3339(),
        model: model.to_string(),
        dimension: index.dimension,
        chunk_count: index.chunk_count(),
        vector_count: index.len(),
        file_count: index.file_count(),
    };
    write_json(&manifest_path, &manifest)?;

    debug!(
        "Wrote index to {} ({} chunks, {} vectors)",
        dir.display(),
        manifest.chunk_count,
        manifest.vector_count
    );
    Ok(manifest)
}

/// Load all index artifacts from `dir`
pub fn load_index(dir: &Path) -> Result<VectorIndex, StoreError> {
    if !dir.join(MANIFEST_FILE).exists() {
        return Err(StoreError::Missing(dir.to_path_buf()));
    }

    let ids: Vec<String> = read_json(&dir.join(IDS_FILE))?;

    let bin_path = dir.join(EMBEDDINGS_FILE);
    let buffer = read_artifact(&bin_path)?;
    let (dimension, vectors) = decode_vectors(&buffer, ids.len())?;

    let entries = read_json::<MetadataFile>(&dir.join(METADATA_FILE))?.into_entries();
    let metadata = entries
        .into_iter()
        .map(|(id, mut record)| {
            if record.id.is_empty() {
                record.id = id.clone();
            }
            (id, record)
        })
        .collect();

    Ok(VectorIndex::from_parts(dimension, ids, vectors, metadata))
}

/// Load the index, mapping every failure to "no index".
///
/// A missing index is a normal state; a corrupt one is logged.
pub fn open_index(dir: &Path) -> Option<VectorIndex> {
    match load_index(dir) {
        Ok(index) => Some(index),
        Err(StoreError::Missing(path)) => {
            debug!("No duplicate index at {}", path.display());
            None
        }
        Err(e) => {
            warn!("Ignoring duplicate index at {}: {}", dir.display(), e);
            None
        }
    }
}

/// Read the manifest alone
pub fn read_manifest(dir: &Path) -> Result<Manifest, StoreError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(StoreError::Missing(dir.to_path_buf()));
    }
    read_json(&path)
}

fn encode_vectors(dimension: usize, count: usize, vectors: &[f32]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    buffer.extend_from_slice(&(dimension as u32).to_le_bytes());
    buffer.extend_from_slice(&(count as u32).to_le_bytes());
    for value in vectors {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    buffer
}

/// Decode `embeddings.bin`; anything shorter than the header declares is corrupt
fn decode_vectors(buffer: &[u8], expected_rows: usize) -> Result<(usize, Vec<f32>), StoreError> {
    if buffer.len() < HEADER_LEN {
        return Err(StoreError::Corrupt(format!(
            "{} is {} bytes, shorter than its header",
            EMBEDDINGS_FILE,
            buffer.len()
        )));
    }

    let dimension = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    let count = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]) as usize;

    if count != expected_rows {
        return Err(StoreError::Corrupt(format!(
            "{} declares {} vectors but {} lists {} ids",
            EMBEDDINGS_FILE, count, IDS_FILE, expected_rows
        )));
    }
    if dimension == 0 && count > 0 {
        return Err(StoreError::Corrupt(format!(
            "{} declares {} vectors of dimension 0",
            EMBEDDINGS_FILE, count
        )));
    }

    let floats = count
        .checked_mul(dimension)
        .ok_or_else(|| StoreError::Corrupt("vector count overflows".to_string()))?;
    let needed = floats
        .checked_mul(4)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| StoreError::Corrupt("vector count overflows".to_string()))?;

    if buffer.len() < needed {
        return Err(StoreError::Corrupt(format!(
            "{} declares {} x {} floats ({} bytes) but holds {} bytes",
            EMBEDDINGS_FILE,
            count,
            dimension,
            needed,
            buffer.len()
        )));
    }
    if buffer.len() > needed {
        debug!(
            "Ignoring {} trailing bytes in {}",
            buffer.len() - needed,
            EMBEDDINGS_FILE
        );
    }

    let vectors = buffer[HEADER_LEN..needed]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((dimension, vectors))
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::Corrupt(format!("{} is missing", path.display()))
        } else {
            io_error(path, source)
        }
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StoreError> {
    let bytes = read_artifact(path)?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes)
}

/// Write through a sibling temp file and rename into place
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&tmp, bytes).map_err(|source| io_error(&tmp, source))?;
    fs::rename(&tmp, path).map_err(|source| io_error(path, source))
}
