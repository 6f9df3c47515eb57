//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{images, markdown};
use crate::types::{LakeError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image localization settings
    pub images: ImageConfig,

    /// Output naming settings
    pub naming: NamingConfig,

    /// Markdown rendering settings
    pub markdown: MarkdownConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `LakeError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.images.concurrency == 0 {
            return Err(LakeError::Config(
                "images.concurrency must be greater than 0".to_string(),
            ));
        }

        if self.images.timeout_secs == 0 {
            return Err(LakeError::Config(
                "images.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let fence = self.markdown.code_fence.as_str();
        let fence_char = fence.chars().next();
        if fence.len() < 3
            || !matches!(fence_char, Some('`') | Some('~'))
            || !fence.chars().all(|c| Some(c) == fence_char)
        {
            return Err(LakeError::Config(format!(
                "markdown.code_fence must be three or more backticks or tildes, got '{}'",
                fence
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Image Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Download remote images into `attachments/`
    pub download: bool,

    /// Concurrent downloads per document
    pub concurrency: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries for transient failures (network errors, 5xx, 429)
    pub max_retries: usize,

    /// User-Agent header sent with image requests
    pub user_agent: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            download: false,
            concurrency: images::DEFAULT_CONCURRENCY,
            timeout_secs: images::DEFAULT_TIMEOUT_SECS,
            max_retries: images::DEFAULT_MAX_RETRIES,
            user_agent: concat!("lakedown/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// =============================================================================
// Naming Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// How sibling name collisions are disambiguated
    pub collision: CollisionStrategy,
}

/// Deterministic disambiguation strategy for colliding sibling names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionStrategy {
    /// `name_2`, `name_3`, ...
    #[default]
    Counter,
    /// `name_<sha256(url)[..8]>`, falling back to the counter
    UrlHash,
}

impl std::fmt::Display for CollisionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionStrategy::Counter => write!(f, "counter"),
            CollisionStrategy::UrlHash => write!(f, "url-hash"),
        }
    }
}

impl std::str::FromStr for CollisionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counter" => Ok(CollisionStrategy::Counter),
            "url-hash" | "url_hash" => Ok(CollisionStrategy::UrlHash),
            _ => Err(format!(
                "Unknown collision strategy: {}. Valid values: counter, url-hash",
                s
            )),
        }
    }
}

// =============================================================================
// Markdown Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Escape `*` and `_` in text
    pub escape_emphasis: bool,

    /// Fence used for code blocks (backticks or tildes)
    pub code_fence: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            escape_emphasis: true,
            code_fence: markdown::DEFAULT_CODE_FENCE.to_string(),
        }
    }
}
