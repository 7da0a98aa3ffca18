use cfgdiff_common::{Blake3Hash, CacheKey, CfgDiffError};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

const CACHE_FILE_NAME: &str = "hash_cache.bin";

/// Memoised whole-file BLAKE3 hashes, optionally backed by a file on disk.
///
/// Entries are keyed by path, size and modification time, so a file that
/// changes between runs is simply hashed again.
pub struct HashCache {
    cache_dir: Option<PathBuf>,
    memory_cache: RwLock<HashMap<CacheKey, Blake3Hash>>,
}

impl HashCache {
    /// A cache that lives for the current process only
    pub fn in_memory() -> Self {
        Self {
            cache_dir: None,
            memory_cache: RwLock::new(HashMap::new()),
        }
    }

    /// A cache loaded from (and later persisted to) `cache_dir`
    pub fn persistent(cache_dir: PathBuf) -> Result<Self, CfgDiffError> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let mut memory_cache = HashMap::new();

        let cache_file = cache_dir.join(CACHE_FILE_NAME);
        if cache_file.exists() {
            match fs::read(&cache_file) {
                Ok(data) => {
                    match bincode::deserialize::<HashMap<CacheKey, Blake3Hash>>(&data) {
                        Ok(cached) => {
                            memory_cache = cached;
                            debug!("Loaded {} entries from cache", memory_cache.len());
                        }
                        Err(e) => warn!("Ignoring unreadable cache file {:?}: {}", cache_file, e),
                    }
                }
                Err(e) => {
                    warn!("Failed to load cache file: {}", e);
                }
            }
        }

        Ok(Self {
            cache_dir: Some(cache_dir),
            memory_cache: RwLock::new(memory_cache),
        })
    }

    /// Get cached hash for a file
    pub fn get(&self, key: &CacheKey) -> Option<Blake3Hash> {
        self.memory_cache.read().ok()?.get(key).copied()
    }

    /// Store hash in cache
    pub fn put(&self, key: CacheKey, hash: Blake3Hash) {
        if let Ok(mut cache) = self.memory_cache.write() {
            cache.insert(key, hash);
        }
    }

    /// Hash a file, consulting the cache first
    pub fn hash_file(&self, path: &Path) -> Result<Blake3Hash, CfgDiffError> {
        let read_error = |source| CfgDiffError::Read {
            path: path.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(path).map_err(read_error)?;
        let key = CacheKey {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        };

        if let Some(hash) = self.get(&key) {
            debug!("Cache hit for {:?}", path);
            return Ok(hash);
        }

        let mut file = fs::File::open(path).map_err(read_error)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0; 64 * 1024]; // 64KB buffer

        loop {
            let n = file.read(&mut buffer).map_err(read_error)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let hash: Blake3Hash = hasher.finalize().into();
        debug!("Hashed {:?}: {}", path, hash.to_hex());
        self.put(key, hash);

        Ok(hash)
    }

    /// Whether two files have identical content. A size mismatch answers
    /// without reading either file.
    pub fn files_equal(&self, left: &Path, right: &Path) -> Result<bool, CfgDiffError> {
        let left_len = fs::metadata(left)
            .map_err(|source| CfgDiffError::Read {
                path: left.to_path_buf(),
                source,
            })?
            .len();
        let right_len = fs::metadata(right)
            .map_err(|source| CfgDiffError::Read {
                path: right.to_path_buf(),
                source,
            })?
            .len();
        if left_len != right_len {
            return Ok(false);
        }

        Ok(self.hash_file(left)? == self.hash_file(right)?)
    }

    /// Persist cache to disk atomically. A no-op for in-memory caches.
    pub fn persist(&self) -> Result<(), CfgDiffError> {
        let Some(cache_dir) = &self.cache_dir else {
            return Ok(());
        };
        let cache_file = cache_dir.join(CACHE_FILE_NAME);
        let temp_file = cache_dir.join(format!("{}.tmp", CACHE_FILE_NAME));

        let cache = self
            .memory_cache
            .read()
            .map_err(|e| CfgDiffError::Cache(format!("Lock error: {}", e)))?;

        let data = bincode::serialize(&*cache)
            .map_err(|e| CfgDiffError::Serialization(e.to_string()))?;

        fs::write(&temp_file, data)?;
        fs::rename(&temp_file, &cache_file)?;

        debug!("Persisted {} cache entries to disk (atomic)", cache.len());

        Ok(())
    }

    /// Get the number of cached entries
    pub fn len(&self) -> usize {
        self.memory_cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_is_memoised() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.conf");
        fs::write(&path, "[db]\nuser=a\n").unwrap();

        let cache = HashCache::in_memory();
        let first = cache.hash_file(&path).unwrap();
        assert_eq!(cache.len(), 1);
        let second = cache.hash_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_files_equal() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let c = temp.path().join("c");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        fs::write(&c, "diff").unwrap();

        let cache = HashCache::in_memory();
        assert!(cache.files_equal(&a, &b).unwrap());
        assert!(!cache.files_equal(&a, &c).unwrap());
        assert!(cache.files_equal(&a, &temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let cache = HashCache::in_memory();
        let err = cache.hash_file(Path::new("/nonexistent/cfgdiff/file")).unwrap_err();
        assert!(matches!(err, CfgDiffError::Read { .. }));
    }

    #[test]
    fn test_hash_cache_persistence() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data.yaml");
        fs::write(&data, "a: 1\n").unwrap();
        let cache_dir = temp.path().join("cache");

        let hash = {
            let cache = HashCache::persistent(cache_dir.clone()).unwrap();
            let hash = cache.hash_file(&data).unwrap();
            cache.persist().unwrap();
            hash
        };

        let cache = HashCache::persistent(cache_dir).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hash_file(&data).unwrap(), hash);
    }

    #[test]
    fn test_persist_in_memory_is_noop() {
        assert!(HashCache::in_memory().persist().is_ok());
    }
}
