//! Image Localization
//!
//! Downloads remote images referenced by a document into an `attachments`
//! directory next to its Markdown file and rewrites the references.
//!
//! ## Naming
//!
//! Every remote image gets a 1-based index in document order before any
//! request is sent, so `<name>_001.png` always refers to the first image no
//! matter which download finishes first. A failed download keeps its index
//! (and its remote `src`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};
use url::Url;

use super::dom::{Markup, NodeRef};
use crate::config::ImageConfig;
use crate::constants::images::{ATTACHMENTS_DIR, BASE_DELAY_MS, INDEX_WIDTH, MAX_DELAY_SECS};
use crate::types::{LakeError, Result, SanitizedName};

/// Response body and declared media type of a fetched image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of image bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

// =============================================================================
// HTTP Fetcher
// =============================================================================

/// reqwest-backed fetcher with per-request timeout and backoff on
/// transient failures
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_retries: usize,
}

impl std::fmt::Debug for HttpImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageFetcher")
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl HttpImageFetcher {
    pub fn new(config: &ImageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| LakeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedImage> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                LakeError::image(url, e.to_string())
            } else {
                LakeError::image_transient(url, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!("HTTP {}", status);
            return Err(if is_transient_status(status) {
                LakeError::image_transient(url, reason)
            } else {
                LakeError::image(url, reason)
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LakeError::image_transient(url, e.to_string()))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(BASE_DELAY_MS))
            .with_max_delay(Duration::from_secs(MAX_DELAY_SECS))
            .with_max_times(self.max_retries);

        (|| self.fetch_once(url))
            .retry(backoff)
            .when(LakeError::is_transient)
            .notify(|err: &LakeError, delay: Duration| {
                debug!(delay_ms = delay.as_millis() as u64, "Retrying image: {}", err);
            })
            .await
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// File extension for a declared media type; parameters are ignored and
/// unknown types yield `""`
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mt| mt.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type.as_str() {
        "image/gif" => ".gif",
        "image/jpeg" => ".jpg",
        "image/svg+xml" => ".svg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        _ => "",
    }
}

fn is_remote(src: &str) -> bool {
    Url::parse(src).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

// =============================================================================
// Localizer
// =============================================================================

/// Counts for one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub localized: usize,
    pub failed: usize,
}

struct Target {
    index: usize,
    node: NodeRef,
    src: String,
}

pub struct ImageLocalizer {
    fetcher: Arc<dyn ImageFetcher>,
    concurrency: usize,
}

impl ImageLocalizer {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Localizer backed by [`HttpImageFetcher`]
    pub fn from_config(config: &ImageConfig) -> Result<Self> {
        let fetcher = HttpImageFetcher::new(config)?;
        Ok(Self::new(Arc::new(fetcher), config.concurrency))
    }

    /// Download every remote image of `markup` into `<dir>/attachments`.
    ///
    /// Failures never abort the document: every image that cannot be fetched
    /// or stored keeps its remote `src` and is counted as failed.
    pub async fn localize(
        &self,
        markup: &Markup,
        name: &SanitizedName,
        dir: &Path,
    ) -> ImageStats {
        let targets: Vec<Target> = markup
            .elements("img")
            .into_iter()
            .filter_map(|node| {
                let src = node.attr("src")?;
                is_remote(&src).then_some((node, src))
            })
            .enumerate()
            .map(|(i, (node, src))| Target {
                index: i + 1,
                node,
                src,
            })
            .collect();

        if targets.is_empty() {
            return ImageStats::default();
        }

        let attachments = dir.join(ATTACHMENTS_DIR);
        if let Err(e) = std::fs::create_dir_all(&attachments) {
            warn!(
                "Keeping {} remote images for {}: cannot create {}: {}",
                targets.len(),
                name,
                attachments.display(),
                e
            );
            return ImageStats {
                localized: 0,
                failed: targets.len(),
            };
        }

        let mut results: HashMap<usize, Result<FetchedImage>> = futures::stream::iter(
            targets.iter().map(|target| {
                let fetcher = Arc::clone(&self.fetcher);
                let index = target.index;
                let src = target.src.clone();
                async move {
                    info!("Download {}", src);
                    (index, fetcher.fetch(&src).await)
                }
            }),
        )
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut stats = ImageStats::default();
        for target in &targets {
            let fetched = results
                .remove(&target.index)
                .unwrap_or_else(|| Err(LakeError::image(&target.src, "no response")));

            let image = match fetched {
                Ok(image) => image,
                Err(e) => {
                    warn!("Keeping remote image {}: {}", target.src, e);
                    stats.failed += 1;
                    continue;
                }
            };

            let file_name = format!(
                "{}_{:0width$}{}",
                name,
                target.index,
                extension_for(image.content_type.as_deref()),
                width = INDEX_WIDTH
            );
            if let Err(e) = std::fs::write(attachments.join(&file_name), &image.bytes) {
                warn!("Keeping remote image {}: failed to write {}: {}", target.src, file_name, e);
                stats.failed += 1;
                continue;
            }

            target
                .node
                .set_attr("src", &format!("./{}/{}", ATTACHMENTS_DIR, file_name));
            stats.localized += 1;
        }

        debug!(
            localized = stats.localized,
            failed = stats.failed,
            "Localized images for {}",
            name
        );
        stats
    }
}
