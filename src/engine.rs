use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheStats, DEFAULT_CAPACITY, MemoCache};
use crate::hierarchy::{self, HierarchyError};
use crate::query::{self, QueryError, QueryKey, QueryOutput, QueryParams};
use crate::table::{ParseError, Table};

/// Fatal dataset configuration errors, surfaced at load time.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum LoadError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("File {path} does not end with a valid extension")]
    UnsupportedExtension { path: String },
    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
    #[error("{path}: {source}")]
    Hierarchy {
        path: String,
        #[source]
        source: HierarchyError,
    },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EngineError {
    /// The identifier resolves to no known source (the caller's
    /// 404-equivalent, distinct from a bad query).
    #[error("Dataset {dataset:?} not found")]
    NotFound { dataset: String },
    #[error(transparent)]
    Load(#[from] LoadError),
    /// A recoverable client error (the caller's 400-equivalent).
    #[error("Invalid query on {dataset:?}: {source}")]
    Query {
        dataset: String,
        #[source]
        source: QueryError,
    },
}

/// The query engine: a data directory plus the two process-scoped caches.
///
/// Datasets resolve to `<id>.tsv` (tab-separated, header row, hierarchy
/// augmentation when `name` and `parent` columns are both present) or
/// `<id>.txt` (newline-delimited list). Loaded tables and query outputs are
/// memoized; both caches are safe to share across threads.
pub struct Engine {
    data_dir: PathBuf,
    tables: MemoCache<String, Table, LoadError>,
    queries: MemoCache<QueryKey, QueryOutput, EngineError>,
}

impl Engine {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tables: MemoCache::new(DEFAULT_CAPACITY),
            queries: MemoCache::new(DEFAULT_CAPACITY),
        }
    }

    /// Load (or fetch the memoized) augmented table for a dataset.
    pub fn load(&self, dataset: &str) -> Result<Arc<Table>, EngineError> {
        let path = self.resolve(dataset)?;
        self.tables
            .get_or_compute(dataset.to_string(), || load_table(&path))
            .map_err(EngineError::Load)
    }

    /// Run (or fetch the memoized result of) a filtered query.
    ///
    /// Set-equal parameter lists hit the same cache entry regardless of the
    /// order parents and filters were supplied in.
    pub fn query(
        &self,
        dataset: &str,
        params: &QueryParams,
    ) -> Result<Arc<QueryOutput>, EngineError> {
        let key = params.cache_key(dataset);
        self.queries.get_or_compute(key, || {
            let table = self.load(dataset)?;
            query::run(&table, params).map_err(|source| EngineError::Query {
                dataset: dataset.to_string(),
                source,
            })
        })
    }

    /// The dataset identifiers available under the data directory, sorted.
    ///
    /// A file with an extension other than `.tsv`/`.txt` is a configuration
    /// error naming the offender, not something to skip silently.
    pub fn datasets(&self) -> Result<Vec<String>, LoadError> {
        let dir = fs::read_dir(&self.data_dir).map_err(|e| LoadError::Io {
            path: self.data_dir.display().to_string(),
            message: e.to_string(),
        })?;
        let mut ids = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| LoadError::Io {
                path: self.data_dir.display().to_string(),
                message: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match name.strip_suffix(".tsv").or_else(|| name.strip_suffix(".txt")) {
                Some(id) => ids.push(id.to_string()),
                None => return Err(LoadError::UnsupportedExtension { path: name }),
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn table_cache_stats(&self) -> CacheStats {
        self.tables.stats()
    }

    pub fn query_cache_stats(&self) -> CacheStats {
        self.queries.stats()
    }

    fn resolve(&self, dataset: &str) -> Result<PathBuf, EngineError> {
        for ext in ["tsv", "txt"] {
            let path = self.data_dir.join(format!("{dataset}.{ext}"));
            if path.is_file() {
                return Ok(path);
            }
        }
        Err(EngineError::NotFound {
            dataset: dataset.to_string(),
        })
    }
}

/// Read, parse, and (for tabular sources) augment one dataset file.
fn load_table(path: &Path) -> Result<Table, LoadError> {
    let display = path.display().to_string();
    let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => {
            let table = Table::parse_tsv(&source).map_err(|source| LoadError::Parse {
                path: display.clone(),
                source,
            })?;
            hierarchy::augment(table).map_err(|source| LoadError::Hierarchy {
                path: display,
                source,
            })
        }
        Some("txt") => Ok(Table::parse_list(&source)),
        _ => Err(LoadError::UnsupportedExtension { path: display }),
    }
}
