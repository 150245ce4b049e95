//! # Legal Data
//!
//! Read-only access to per-country legal documents.
//!
//! A [`LegalDocumentSource`] yields the raw JSON for a canonical ISO code;
//! [`LegalDataService`] resolves code aliases and caches every lookup,
//! including misses, until [`LegalDataService::clear_cache`] is called.
//!
//! # Examples
//!
//! ```ignore
//! use eor_quote_engine::infrastructure::legal_data::{FileLegalDocumentSource, LegalDataService};
//! use std::sync::Arc;
//!
//! let service = LegalDataService::new(Arc::new(FileLegalDocumentSource::new("data/legal")));
//! let doc = service.get_country_data("uk").await?; // reads GB.json
//! ```

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::domain::entities::LegalDocument;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Non-standard country codes and their ISO 3166-1 alpha-2 equivalents.
const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("UK", "GB"),
    ("EN", "GB"),
    ("EL", "GR"),
    ("UAE", "AE"),
    ("USA", "US"),
];

/// Normalizes a caller-supplied country code to its canonical form.
///
/// Trims, upper-cases and resolves aliases.
#[must_use]
pub fn canonical_country_code(code: &str) -> String {
    let upper = code.trim().to_uppercase();
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, iso)| (*iso).to_string())
        .unwrap_or(upper)
}

/// Source of raw legal documents keyed by canonical country code.
#[async_trait]
pub trait LegalDocumentSource: Send + Sync + fmt::Debug {
    /// Loads the raw document for `country_code`.
    ///
    /// Returns `Ok(None)` when the country has no document.
    ///
    /// # Errors
    ///
    /// Returns `EnhancementError::LegalData` if a document exists but
    /// cannot be read or parsed.
    async fn load(&self, country_code: &str) -> EnhancementResult<Option<Value>>;
}

/// Reads `<CODE>.json` files from a directory.
#[derive(Debug, Clone)]
pub struct FileLegalDocumentSource {
    root: PathBuf,
}

impl FileLegalDocumentSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the data directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, country_code: &str) -> Option<PathBuf> {
        let valid = !country_code.is_empty() && country_code.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| self.root.join(format!("{country_code}.json")))
    }
}

#[async_trait]
impl LegalDocumentSource for FileLegalDocumentSource {
    async fn load(&self, country_code: &str) -> EnhancementResult<Option<Value>> {
        let Some(path) = self.path_for(country_code) else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EnhancementError::legal_data(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            EnhancementError::legal_data(format!("malformed legal document {}: {e}", path.display()))
        })
    }
}

/// Serves documents from memory. Useful for tests and embedded data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegalDocumentSource {
    documents: HashMap<String, Value>,
}

impl InMemoryLegalDocumentSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document under `country_code`.
    #[must_use]
    pub fn with_document(mut self, country_code: &str, document: Value) -> Self {
        self.documents.insert(canonical_country_code(country_code), document);
        self
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no documents are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl LegalDocumentSource for InMemoryLegalDocumentSource {
    async fn load(&self, country_code: &str) -> EnhancementResult<Option<Value>> {
        Ok(self.documents.get(country_code).cloned())
    }
}

/// Alias-aware, caching front for a [`LegalDocumentSource`].
#[derive(Debug)]
pub struct LegalDataService {
    source: Arc<dyn LegalDocumentSource>,
    cache: DashMap<String, Option<Arc<LegalDocument>>>,
}

impl LegalDataService {
    /// Creates a service over `source` with an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn LegalDocumentSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
        }
    }

    /// Returns the legal document for `country_code`, or `None` if the
    /// country has no data.
    ///
    /// # Errors
    ///
    /// Returns `EnhancementError::LegalData` if the document exists but is
    /// malformed. Failures are not cached.
    pub async fn get_country_data(&self, country_code: &str) -> EnhancementResult<Option<Arc<LegalDocument>>> {
        let code = canonical_country_code(country_code);

        if let Some(cached) = self.cache.get(&code) {
            debug!(country = %code, found = cached.is_some(), "legal document cache hit");
            return Ok(cached.clone());
        }

        let document = match self.source.load(&code).await? {
            Some(raw) => {
                let doc = LegalDocument::new(code.clone(), raw)
                    .map_err(|e| EnhancementError::legal_data(e.to_string()))?;
                Some(Arc::new(doc))
            }
            None => {
                warn!(country = %code, "no legal document for country");
                None
            }
        };

        self.cache.insert(code, document.clone());
        Ok(document)
    }

    /// Returns the number of cached lookups, including misses.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached document.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingSource {
        inner: InMemoryLegalDocumentSource,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LegalDocumentSource for CountingSource {
        async fn load(&self, country_code: &str) -> EnhancementResult<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.load(country_code).await
        }
    }

    fn portugal() -> Value {
        json!({"results": [{"data": {"country_name": "Portugal"}}]})
    }

    mod aliases {
        use super::*;

        #[test]
        fn resolves_known_aliases() {
            assert_eq!(canonical_country_code("uk"), "GB");
            assert_eq!(canonical_country_code(" UAE "), "AE");
            assert_eq!(canonical_country_code("el"), "GR");
            assert_eq!(canonical_country_code("pt"), "PT");
        }
    }

    mod service {
        use super::*;

        #[tokio::test]
        async fn caches_hits_and_misses() {
            let source = Arc::new(CountingSource {
                inner: InMemoryLegalDocumentSource::new().with_document("PT", portugal()),
                calls: AtomicUsize::new(0),
            });
            let service = LegalDataService::new(source.clone());

            let doc = service.get_country_data("pt").await.unwrap().unwrap();
            assert_eq!(doc.country_name(), Some("Portugal"));
            service.get_country_data("PT").await.unwrap();
            assert!(service.get_country_data("XX").await.unwrap().is_none());
            assert!(service.get_country_data("xx").await.unwrap().is_none());

            assert_eq!(source.calls.load(Ordering::SeqCst), 2);
            assert_eq!(service.cached_len(), 2);

            service.clear_cache();
            service.get_country_data("PT").await.unwrap();
            assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn empty_results_is_legal_data_error() {
            let source = InMemoryLegalDocumentSource::new().with_document("PT", json!({"results": []}));
            let service = LegalDataService::new(Arc::new(source));

            let err = service.get_country_data("PT").await.unwrap_err();
            assert!(matches!(err, EnhancementError::LegalData(_)));
        }
    }

    mod file_source {
        use super::*;

        #[tokio::test]
        async fn reads_alias_file() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("GB.json"), portugal().to_string()).unwrap();
            let service = LegalDataService::new(Arc::new(FileLegalDocumentSource::new(dir.path())));

            let doc = service.get_country_data("uk").await.unwrap().unwrap();
            assert_eq!(doc.country_code(), "GB");
        }

        #[tokio::test]
        async fn missing_file_is_none() {
            let dir = tempfile::tempdir().unwrap();
            let source = FileLegalDocumentSource::new(dir.path());
            assert!(source.load("DE").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn malformed_json_is_error() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("BR.json"), "{ not json").unwrap();
            let source = FileLegalDocumentSource::new(dir.path());

            let err = source.load("BR").await.unwrap_err();
            assert!(matches!(err, EnhancementError::LegalData(_)));
        }

        #[tokio::test]
        async fn path_like_codes_are_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let source = FileLegalDocumentSource::new(dir.path());
            assert!(source.load("../etc").await.unwrap().is_none());
        }
    }
}
