//! Schema cache
//!
//! Memoizes compiled validators by the canonical path of their schema file.
//! The cache is an ordinary value owned by the caller; share it behind an
//! `Arc` when several threads validate against the same schemas.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ValidatorConfig;
use crate::engine::Validator;
use crate::error::{Result, SchemaError};
use crate::schema::Schema;

/// Validators keyed by schema path
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<PathBuf, Arc<Validator>>>,
    config: ValidatorConfig,
}

impl SchemaCache {
    /// Create an empty cache whose validators use the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache whose validators use `config`
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Return the validator for a schema file, loading it on first use
    pub fn get_or_load(&self, path: impl AsRef<Path>) -> Result<Arc<Validator>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SchemaError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let key = fs::canonicalize(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(validator) = self.lookup(&key)? {
            tracing::trace!(path = %key.display(), "Schema cache hit");
            return Ok(validator);
        }

        // compiled without the lock held; the first entry inserted wins
        let schema = Schema::from_path(&key)?;
        let loaded = Arc::new(Validator::with_config(schema, self.config));

        let mut entries = self
            .entries
            .write()
            .map_err(|e| SchemaError::CacheLock(e.to_string()))?;
        let validator = Arc::clone(entries.entry(key.clone()).or_insert(loaded));

        tracing::debug!(path = %key.display(), cached = entries.len(), "Schema cached");

        Ok(validator)
    }

    /// Return a cached validator without loading
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Option<Arc<Validator>>> {
        self.lookup(&cache_key(path.as_ref()))
    }

    /// Drop a cached validator. Returns whether an entry was removed.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> Result<bool> {
        let key = cache_key(path.as_ref());
        let mut entries = self
            .entries
            .write()
            .map_err(|e| SchemaError::CacheLock(e.to_string()))?;
        Ok(entries.remove(&key).is_some())
    }

    /// Drop every cached validator
    pub fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| SchemaError::CacheLock(e.to_string()))?
            .clear();
        Ok(())
    }

    /// Number of cached validators
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &Path) -> Result<Option<Arc<Validator>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| SchemaError::CacheLock(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }
}

/// Canonical form of a path, or the path itself when it no longer exists
fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn schema_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const POS: &str = r#"{"types": {"Pos": {"x": "+int", "y": "+int"}}, "root": "Pos"}"#;

    #[test]
    fn test_get_or_load_memoizes() {
        let file = schema_file(POS);
        let cache = SchemaCache::new();
        assert!(cache.is_empty());

        let first = cache.get_or_load(file.path()).unwrap();
        let second = cache.get_or_load(file.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(first.validate(r#"{"x": 1, "y": 2}"#).ok);
    }

    #[test]
    fn test_get_does_not_load() {
        let file = schema_file(POS);
        let cache = SchemaCache::new();

        assert!(cache.get(file.path()).unwrap().is_none());
        cache.get_or_load(file.path()).unwrap();
        assert!(cache.get(file.path()).unwrap().is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let a = schema_file(POS);
        let b = schema_file(r#"{"types": {}, "root": "int"}"#);
        let cache = SchemaCache::new();

        cache.get_or_load(a.path()).unwrap();
        cache.get_or_load(b.path()).unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate(a.path()).unwrap());
        assert!(!cache.invalidate(a.path()).unwrap());
        assert_eq!(cache.len(), 1);

        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let cache = SchemaCache::new();
        let err = cache.get_or_load("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.to_string(), "Path '/definitely/not/here.json' is not a file.");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_broken_schema_is_not_cached() {
        let file = schema_file(r#"{"types": {"A": "B"}, "root": "A"}"#);
        let cache = SchemaCache::new();

        let err = cache.get_or_load(file.path()).unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedType { ref name } if name == "B"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_config_is_passed_to_validators() {
        let file = schema_file(POS);
        let cache = SchemaCache::with_config(ValidatorConfig::new().with_max_depth(3));
        let validator = cache.get_or_load(file.path()).unwrap();
        assert_eq!(validator.config().max_depth, 3);
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let file = schema_file(POS);
        let cache = Arc::new(SchemaCache::new());
        cache.get_or_load(file.path()).unwrap();

        let poisoner = Arc::clone(&cache);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the cache lock");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        assert!(matches!(cache.get(file.path()), Err(SchemaError::CacheLock(_))));
    }

    #[test]
    fn test_shared_across_threads() {
        let file = schema_file(POS);
        let cache = Arc::new(SchemaCache::new());
        let start = Arc::new(std::sync::Barrier::new(4));

        // racing loads compile separately and converge on one entry
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let start = Arc::clone(&start);
                let path = file.path().to_path_buf();
                std::thread::spawn(move || {
                    start.wait();
                    cache.get_or_load(&path).unwrap()
                })
            })
            .collect();

        let validators: Vec<Arc<Validator>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        assert!(validators.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
