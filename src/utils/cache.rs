//! Disk-backed cache of fetched result pages.
//!
//! The cache is what makes a long crawl resumable: every page that was fetched
//! and judged valid is kept indefinitely, and a re-run reads it back instead of
//! going to the network. There is no expiry and no eviction.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/citegraph/
//!   pages/
//!     %2Fscholar%3Fstart%3D0%26num%3D20%26cites%3D123
//!     <md5 of key>        (keys whose encoded form is too long for a file name)
//! ```
//!
//! Each file holds the page text exactly as fetched.

use crate::config::{default_cache_dir, CacheConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest encoded key used verbatim as a file name
const MAX_FILE_NAME: usize = 200;

/// Canonical identity of a request: its URL with the scheme and host prefix removed.
///
/// Two URLs that differ only in that prefix share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `url`, stripping `prefix` when present
    pub fn from_url(url: &str, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let key = if prefix.is_empty() {
            url
        } else {
            url.strip_prefix(prefix).unwrap_or(url)
        };
        Self(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name the page is stored under
    pub fn file_name(&self) -> String {
        let encoded = urlencoding::encode(&self.0);
        if encoded.is_empty() || encoded.len() > MAX_FILE_NAME || encoded == "." || encoded == ".." {
            format!("{:x}", md5::compute(self.0.as_bytes()))
        } else {
            encoded.into_owned()
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<T> {
    /// Item was found
    Hit(T),

    /// Item was not found
    Miss,
}

/// Page store keyed by [`CacheKey`], one file per key
#[derive(Debug, Clone)]
pub struct ResponseCache {
    /// Base cache directory
    base_dir: PathBuf,

    /// Directory holding the page files
    page_dir: PathBuf,

    enabled: bool,
}

impl ResponseCache {
    /// Create a cache from the given config
    pub fn from_config(config: &CacheConfig) -> Self {
        let base_dir = config.directory.clone().unwrap_or_else(default_cache_dir);
        let mut cache = Self::at(base_dir);
        cache.enabled = config.enabled;
        cache
    }

    /// Create an enabled cache rooted at `base_dir`
    pub fn at(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let page_dir = base_dir.join("pages");
        Self {
            base_dir,
            page_dir,
            enabled: true,
        }
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        let mut cache = Self::at(PathBuf::new());
        cache.enabled = false;
        cache
    }

    /// Initialize the cache directories
    pub fn initialize(&self) -> std::io::Result<()> {
        if self.enabled {
            fs::create_dir_all(&self.page_dir)?;
            tracing::info!("Cache initialized at: {}", self.base_dir.display());
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.page_dir.join(key.file_name())
    }

    /// Read a cached page
    pub fn get(&self, key: &CacheKey) -> CacheResult<String> {
        if !self.enabled {
            return CacheResult::Miss;
        }

        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => {
                tracing::debug!(key = %key, "Cache HIT");
                CacheResult::Hit(text)
            }
            Err(_) => {
                tracing::debug!(key = %key, "Cache MISS");
                CacheResult::Miss
            }
        }
    }

    /// Store a page. Existing content for the key is replaced.
    pub fn put(&self, key: &CacheKey, text: &str) -> std::io::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        fs::create_dir_all(&self.page_dir)?;
        fs::write(self.path_for(key), text)?;
        tracing::debug!(key = %key, bytes = text.len(), "Cached page");
        Ok(())
    }

    /// Whether a page is stored for the key
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.enabled && self.path_for(key).is_file()
    }

    /// Remove every cached page
    pub fn clear(&self) -> std::io::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.page_dir.exists() {
            fs::remove_dir_all(&self.page_dir)?;
        }
        fs::create_dir_all(&self.page_dir)?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.enabled {
            return CacheStats::disabled();
        }

        let mut entries = 0;
        let mut size = 0;
        if let Ok(dir) = self.page_dir.read_dir() {
            for entry in dir.flatten() {
                if let Ok(meta) = entry.metadata() {
                    if meta.is_file() {
                        entries += 1;
                        size += meta.len();
                    }
                }
            }
        }

        CacheStats {
            enabled: true,
            cache_dir: self.base_dir.clone(),
            entries,
            size_kb: size / 1024,
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,

    /// Cache directory path
    pub cache_dir: PathBuf,

    /// Number of cached pages
    pub entries: usize,

    /// Total size in KB
    pub size_kb: u64,
}

impl CacheStats {
    /// Return stats indicating cache is disabled
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            entries: 0,
            size_kb: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PREFIX: &str = "https://scholar.google.com";

    #[test]
    fn test_key_strips_prefix() {
        let a = CacheKey::from_url("https://scholar.google.com/scholar?start=0&num=20&cites=1", PREFIX);
        let b = CacheKey::from_url("/scholar?start=0&num=20&cites=1", PREFIX);

        assert_eq!(a.as_str(), "/scholar?start=0&num=20&cites=1");
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "%2Fscholar%3Fstart%3D0%26num%3D20%26cites%3D1");
    }

    #[test]
    fn test_long_key_is_hashed() {
        let long = format!("/scholar?q={}", "x".repeat(400));
        let key = CacheKey::from_url(&long, PREFIX);

        let name = key.file_name();
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_roundtrip_is_byte_exact() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::at(temp_dir.path());
        cache.initialize().unwrap();

        let key = CacheKey::from_url("/scholar?cites=42", PREFIX);
        let text = "<html>\r\n  Ünïcödé – “quotes” \u{a0}\ttabs\n</html>";

        assert_eq!(cache.get(&key), CacheResult::Miss);
        cache.put(&key, text).unwrap();
        assert!(cache.contains(&key));
        assert_eq!(cache.get(&key), CacheResult::Hit(text.to_string()));

        let stats = cache.stats();
        assert!(stats.enabled);
        assert_eq!(stats.entries, 1);

        cache.clear().unwrap();
        assert_eq!(cache.get(&key), CacheResult::Miss);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            enabled: false,
            directory: Some(temp_dir.path().to_path_buf()),
        };

        let cache = ResponseCache::from_config(&config);
        let key = CacheKey::from_url("/scholar?q=a", PREFIX);

        cache.put(&key, "page").unwrap();
        assert_eq!(cache.get(&key), CacheResult::Miss);
        assert!(!cache.stats().enabled);
        assert!(!temp_dir.path().join("pages").exists());
    }
}
