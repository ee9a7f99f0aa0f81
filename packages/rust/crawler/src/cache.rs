//! Content-addressed page cache.
//!
//! Each fetched page is stored as one file named by the hex SHA-256 digest of
//! its absolute URL. Entries are written once and never expire.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tracing::debug;

use bandgraph_shared::{BandGraphError, Result};

/// Suffix of in-flight writes; such files are never served as entries.
const TMP_SUFFIX: &str = "tmp";

/// Disambiguates temp files written concurrently by the same process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Compute the cache key (hex SHA-256) of an absolute URL.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A directory of cached page bodies.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Open the cache at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| BandGraphError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Path of the entry for an absolute URL (whether or not it exists).
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    /// Read the cached body for `url`, if any.
    pub async fn get(&self, url: &str) -> Result<Option<String>> {
        let path = self.path_for(url);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BandGraphError::io(path, e)),
        }
    }

    /// Store `body` for `url` unless an entry already exists.
    ///
    /// The body goes to a temp file first and is hard-linked into place, so
    /// readers never observe a half-written entry and the first writer wins.
    pub async fn put(&self, url: &str, body: &str) -> Result<()> {
        let path = self.path_for(url);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| BandGraphError::io(&path, e))?
        {
            debug!(?path, "cache entry already present");
            return Ok(());
        }

        let tmp = path.with_extension(format!(
            "{}.{}.{TMP_SUFFIX}",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| BandGraphError::io(&tmp, e))?;

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let removed = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(?path, "cache entry stored concurrently, keeping it");
            }
            Err(e) => return Err(BandGraphError::io(&path, e)),
        }
        removed.map_err(|e| BandGraphError::io(&tmp, e))
    }

    /// Number of complete entries in the cache directory.
    pub fn entry_count(&self) -> Result<usize> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| BandGraphError::io(&self.dir, e))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| BandGraphError::io(&self.dir, e))?;
            if is_entry_name(&entry.file_name().to_string_lossy()) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn is_entry_name(name: &str) -> bool {
    name.len() == 64 && name.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        let key = cache_key("hello world");
        assert_eq!(key.len(), 64);
        assert_eq!(
            key,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_key_depends_on_full_url() {
        let a = cache_key("https://en.wikipedia.org/wiki/Category:Queen_(band)_members");
        let b = cache_key("https://en.wikipedia.org/wiki/Category:Queen_(band)_members");
        let c = cache_key("http://en.wikipedia.org/wiki/Category:Queen_(band)_members");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::open(dir.path().join("pages")).unwrap();
        let url = "https://en.wikipedia.org/wiki/Brian_May";

        assert_eq!(cache.get(url).await.unwrap(), None);

        cache.put(url, "<html>May</html>").await.unwrap();
        assert_eq!(cache.get(url).await.unwrap().as_deref(), Some("<html>May</html>"));
        assert!(cache.path_for(url).ends_with(cache_key(url)));
        assert_eq!(cache.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::open(dir.path()).unwrap();
        let url = "https://en.wikipedia.org/wiki/Roger_Taylor";

        cache.put(url, "first").await.unwrap();
        cache.put(url, "second").await.unwrap();

        assert_eq!(cache.get(url).await.unwrap().as_deref(), Some("first"));
        assert_eq!(cache.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_puts_keep_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::open(dir.path()).unwrap();
        let url = "https://en.wikipedia.org/wiki/John_Deacon";

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.put(url, &format!("body {i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let body = cache.get(url).await.unwrap().unwrap();
        assert!(body.starts_with("body "));

        // No temp files are left behind.
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
        assert_eq!(cache.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_entry_names() {
        assert!(is_entry_name(&cache_key("x")));
        assert!(!is_entry_name("abc.123.0.tmp"));
        assert!(!is_entry_name("bands.csv"));
    }
}
