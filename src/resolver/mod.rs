//! Resolution of tag content into text and image bytes for the playback
//! engine.
//!
//! The engine asks for resources by tag (or by URL) through the two-function
//! [`ResourceProvider`] capability. [`ContentResolver`] answers from the
//! peer's own tag map, dispatching on the content type.

mod cache;
mod fetch;
mod decode;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::content::Content;

pub use cache::ImageCache;
pub use fetch::{ImageFetcher, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use decode::{decode_image_format, ImageFormat};

/// Default cap on animation file size (100 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Shared tag→content map owned by one peer.
pub type TagStore = Arc<Mutex<HashMap<String, Content>>>;

/// Capability handed to the playback engine for filling tag slots.
pub trait ResourceProvider: Send + Sync {
    /// Text for a tag, if the tag holds text content.
    fn resolve_text(&self, tag: &str) -> Option<String>;

    /// Encoded image bytes for a tag or URL, if one can be produced.
    fn resolve_image<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Option<Vec<u8>>>;
}

/// Where resources live and how they are fetched.
#[derive(Debug, Clone)]
pub struct ResourceSettings {
    /// Base for relative file paths.
    pub storage_dir: PathBuf,
    /// Base for bundled assets.
    pub asset_root: PathBuf,
    /// Largest animation file accepted for playback.
    pub max_file_bytes: u64,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Disk cache for downloaded images; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            storage_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vap-bridge"),
            asset_root: PathBuf::from("."),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            cache_dir: None,
        }
    }
}

/// Errors resolving a single piece of content.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{source_name} is not a recognized image: {source}")]
    NotAnImage {
        source_name: String,
        source: image::ImageError,
    },
}

/// Strip a `data:image/...;base64,` or `base64:` prefix.
pub fn strip_base64_prefix(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some(idx) = value.find(";base64,") {
            return &value[idx + ";base64,".len()..];
        }
        if let Some(idx) = value.find(',') {
            return &value[idx + 1..];
        }
    }
    value.strip_prefix("base64:").unwrap_or(value)
}

/// Decode base64 image data, accepting standard or URL-safe alphabets and
/// embedded whitespace.
pub fn decode_base64(value: &str) -> Result<Vec<u8>, ResolveError> {
    let data: String = strip_base64_prefix(value)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match STANDARD.decode(&data) {
        Ok(bytes) => Ok(bytes),
        Err(err) => URL_SAFE.decode(&data).map_err(|_| ResolveError::Base64(err)),
    }
}

/// Resolve an absolute, `file://`, or storage-relative path.
pub fn resolve_file_path(value: &str, storage_dir: &Path) -> PathBuf {
    let raw = value.strip_prefix("file://").unwrap_or(value);
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        storage_dir.join(path)
    }
}

/// Resolve a bundle-relative asset path.
pub fn resolve_asset_path(value: &str, asset_root: &Path) -> PathBuf {
    asset_root.join(value.trim_start_matches('/'))
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Resolver over one peer's tag map.
pub struct ContentResolver {
    contents: TagStore,
    settings: ResourceSettings,
    fetcher: ImageFetcher,
}

impl ContentResolver {
    pub fn new(contents: TagStore, settings: ResourceSettings) -> Result<Self, ResolveError> {
        let cache = settings.cache_dir.clone().map(ImageCache::new);
        let fetcher = ImageFetcher::new(settings.timeout, settings.connect_timeout, cache)?;
        Ok(Self {
            contents,
            settings,
            fetcher,
        })
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    fn lookup(&self, tag: &str) -> Option<Content> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned()
    }

    /// Produce image bytes for `content`. Text yields `None`.
    pub async fn resolve_content(&self, content: &Content) -> Result<Option<Vec<u8>>, ResolveError> {
        let (bytes, source) = match content {
            Content::Text(_) => return Ok(None),
            Content::ImageBase64(value) => (decode_base64(value)?, "base64 data".to_string()),
            Content::ImageFile(value) => {
                let path = resolve_file_path(value, &self.settings.storage_dir);
                (read_file(&path).await?, path.display().to_string())
            }
            Content::ImageAsset(value) => {
                let path = resolve_asset_path(value, &self.settings.asset_root);
                (read_file(&path).await?, path.display().to_string())
            }
            Content::ImageUrl(url) => (self.fetcher.fetch(url).await?, url.clone()),
        };
        if let Err(err) = decode_image_format(&bytes) {
            return Err(ResolveError::NotAnImage {
                source_name: source,
                source: err,
            });
        }
        Ok(Some(bytes))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ResolveError> {
    tokio::fs::read(path).await.map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ResourceProvider for ContentResolver {
    fn resolve_text(&self, tag: &str) -> Option<String> {
        match self.lookup(tag)? {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    fn resolve_image<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Option<Vec<u8>>> {
        async move {
            let content = match self.lookup(tag) {
                Some(content) => content,
                None if is_http_url(tag) => Content::ImageUrl(tag.to_string()),
                None => {
                    log::debug!("No content for tag '{}'", tag);
                    return None;
                }
            };
            match self.resolve_content(&content).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("Failed to resolve image for tag '{}': {}", tag, err);
                    None
                }
            }
        }
        .boxed()
    }
}
