//! # Catalog Adapters
//!
//! The catalog collaborator: `load_catalog(source, fields) -> raw entries`.
//!
//! - `FileCatalog`: one JSON array of raw entries per source, stored as
//!   `<catalog_dir>/<source>.json`
//! - `MemoryCatalog`: fixed in-process entries, used by tests and demos

use async_trait::async_trait;
use class_pages_core::{ClassPagesError, RawEntry};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Maximum size of one catalog file (64 MB).
const MAX_CATALOG_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// A source of raw catalog entries.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch one source's index, projected to `fields`.
    ///
    /// `Ok(None)` means the source is not registered.
    async fn load_catalog(
        &self,
        source: &str,
        fields: &[String],
    ) -> Result<Option<Vec<RawEntry>>, ClassPagesError>;

    /// Keys of every registered source, sorted.
    async fn available_sources(&self) -> Result<Vec<String>, ClassPagesError>;
}

// =============================================================================
// FILE CATALOG
// =============================================================================

/// Directory-backed catalog.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a source key to its file, rejecting keys that could escape
    /// the catalog directory.
    fn source_path(&self, source: &str) -> Result<PathBuf, ClassPagesError> {
        let invalid = source.is_empty()
            || source.contains(['/', '\\'])
            || source.starts_with('.')
            || source.contains("..");
        if invalid {
            return Err(ClassPagesError::CatalogError(format!(
                "invalid source key '{}'",
                source
            )));
        }
        Ok(self.dir.join(format!("{}.json", source)))
    }
}

#[async_trait]
impl Catalog for FileCatalog {
    async fn load_catalog(
        &self,
        source: &str,
        fields: &[String],
    ) -> Result<Option<Vec<RawEntry>>, ClassPagesError> {
        let path = self.source_path(source)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClassPagesError::CatalogError(format!(
                    "{}: {}",
                    path.display(),
                    e
                )));
            }
        };
        if metadata.len() > MAX_CATALOG_FILE_SIZE {
            return Err(ClassPagesError::CatalogError(format!(
                "{}: size {} bytes exceeds maximum {} bytes",
                path.display(),
                metadata.len(),
                MAX_CATALOG_FILE_SIZE
            )));
        }

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| ClassPagesError::CatalogError(format!("{}: {}", path.display(), e)))?;
        let entries: Vec<RawEntry> = serde_json::from_slice(&data)
            .map_err(|e| ClassPagesError::CatalogError(format!("{}: {}", path.display(), e)))?;

        Ok(Some(entries.iter().map(|e| e.project(fields)).collect()))
    }

    async fn available_sources(&self) -> Result<Vec<String>, ClassPagesError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ClassPagesError::IoError(e.to_string())),
        };

        let mut sources = BTreeSet::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ClassPagesError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sources.insert(stem.to_string());
            }
        }
        Ok(sources.into_iter().collect())
    }
}

// =============================================================================
// MEMORY CATALOG
// =============================================================================

/// In-process catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    sources: BTreeMap<String, Vec<RawEntry>>,
    failing: BTreeSet<String>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, entries: Vec<RawEntry>) -> Self {
        self.sources.insert(source.into(), entries);
        self
    }

    /// Register a source whose every load fails.
    #[must_use]
    pub fn with_failing_source(mut self, source: impl Into<String>) -> Self {
        self.failing.insert(source.into());
        self
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn load_catalog(
        &self,
        source: &str,
        fields: &[String],
    ) -> Result<Option<Vec<RawEntry>>, ClassPagesError> {
        if self.failing.contains(source) {
            return Err(ClassPagesError::CatalogError(format!(
                "source '{}' is unreachable",
                source
            )));
        }
        Ok(self
            .sources
            .get(source)
            .map(|entries| entries.iter().map(|e| e.project(fields)).collect()))
    }

    async fn available_sources(&self) -> Result<Vec<String>, ClassPagesError> {
        Ok(self
            .sources
            .keys()
            .chain(self.failing.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }
}
