//! Global Constants
//!
//! Centralized constants for the lakebook format and conversion tuning.
//! All magic numbers and format markers should be defined here with documentation.

/// Lakebook archive layout
pub mod archive {
    /// Metadata file at the root of the repository directory
    pub const META_FILE: &str = "$meta.json";

    /// Extension of per-document payload files (`<url>.json`)
    pub const DOCUMENT_EXTENSION: &str = "json";

    /// gzip magic bytes, used to detect compressed lakebooks
    pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

    /// Prefix of the temporary extraction directory
    pub const TEMP_DIR_PREFIX: &str = "lakebook_";
}

/// Document payload constants
pub mod document {
    /// Published bodies starting with this marker are lakesheet spreadsheets,
    /// which cannot be converted to Markdown.
    pub const COMPLEX_TABLE_MARKER: &str = r#"{"format":"lakesheet""#;

    /// Extension of written Markdown files
    pub const MARKDOWN_EXTENSION: &str = "md";
}

/// Output naming constants
pub mod naming {
    /// Characters replaced by `REPLACEMENT` when sanitizing titles
    pub const UNSAFE_CHARS: [char; 10] = ['/', '\\', ' ', '?', '*', '<', '>', '|', '"', ':'];

    /// Replacement for unsafe characters
    pub const REPLACEMENT: char = '_';

    /// Maximum disambiguation attempts before failing with a naming conflict
    pub const MAX_DISAMBIGUATION_ATTEMPTS: usize = 1000;

    /// First counter suffix tried for a colliding name (`name_2`)
    pub const FIRST_COUNTER_SUFFIX: usize = 2;

    /// Hex characters of the url digest used by the `url-hash` strategy
    pub const URL_HASH_LEN: usize = 8;
}

/// Image localization constants
pub mod images {
    /// Attachments directory created next to a document's Markdown file
    pub const ATTACHMENTS_DIR: &str = "attachments";

    /// Default number of concurrent downloads per document
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// Default per-request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default retries for transient fetch failures
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 10;

    /// Zero-padding width of the per-document image counter
    pub const INDEX_WIDTH: usize = 3;
}

/// Markdown output constants
pub mod markdown {
    /// Iteration cap for the blank-line collapsing pass
    pub const MAX_COLLAPSE_ITERATIONS: usize = 50;

    /// Default code fence
    pub const DEFAULT_CODE_FENCE: &str = "```";

    /// Highlight marker wrapped around background-coloured spans
    pub const HIGHLIGHT_MARKER: &str = "==";
}
