//! ImageFetcher - downloads URL tag images.

use std::time::Duration;

use super::{decode_image_format, ImageCache, ResolveError};

/// Default timeout for image requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP GET client for `image_url` content, with an optional disk cache.
/// Failures are returned as-is; nothing here retries.
pub struct ImageFetcher {
    http_client: reqwest::Client,
    cache: Option<ImageCache>,
}

impl ImageFetcher {
    pub fn new(
        timeout: Duration,
        connect_timeout: Duration,
        cache: Option<ImageCache>,
    ) -> Result<Self, ResolveError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { http_client, cache })
    }

    /// Download `url`, serving from and filling the cache when enabled.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
        if let Some(bytes) = self.cache.as_ref().and_then(|c| c.get(url)) {
            log::debug!("Image cache hit: {}", url);
            return Ok(bytes);
        }

        log::debug!("Downloading image: {}", url);
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?.to_vec();

        // Only bytes that decode are worth keeping.
        let cacheable = self.cache.as_ref().filter(|_| decode_image_format(&bytes).is_ok());
        if let Some(cache) = cacheable {
            if let Err(err) = cache.store(url, &bytes) {
                log::warn!("Failed to cache image {}: {}", url, err);
            }
        }
        Ok(bytes)
    }
}
