//! ImageCache - disk cache for downloaded tag images.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Disk cache keyed by a hash of the image URL.
#[derive(Debug, Clone)]
pub struct ImageCache {
    cache_dir: PathBuf,
}

impl ImageCache {
    /// Create a cache rooted at `cache_dir`. The directory is created on
    /// first store.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Cache under ~/.cache/vap-bridge/images/ (platform equivalent).
    pub fn with_default_dir() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("vap-bridge")
            .join("images");
        Self::new(cache_dir)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cached bytes for `url`, if present and readable.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(url)).ok()
    }

    /// Store bytes for `url`, returning the cached file path.
    pub fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let path = self.path_for(url);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove every cached image. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, std::io::Error> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "img") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.img", Self::hash_url(url)))
    }

    /// 32-character hex key (first 16 bytes of SHA-256).
    pub fn hash_url(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_url_is_stable_and_short() {
        let a = ImageCache::hash_url("https://x/a.png");
        assert_eq!(a, ImageCache::hash_url("https://x/a.png"));
        assert_ne!(a, ImageCache::hash_url("https://x/b.png"));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_store_then_get() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ImageCache::new(temp_dir.path().join("images"));
        assert_eq!(cache.get("https://x/a.png"), None);

        let path = cache.store("https://x/a.png", b"GIF89a").unwrap();
        assert!(path.starts_with(cache.cache_dir()));
        assert_eq!(cache.get("https://x/a.png"), Some(b"GIF89a".to_vec()));
    }

    #[test]
    fn test_clear_removes_cached_images_only() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ImageCache::new(temp_dir.path().to_path_buf());
        cache.store("https://x/a.png", b"a").unwrap();
        cache.store("https://x/b.png", b"b").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(temp_dir.path().join("notes.txt").exists());
        assert_eq!(cache.get("https://x/a.png"), None);
    }

    #[test]
    fn test_clear_missing_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ImageCache::new(temp_dir.path().join("never-created"));
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
