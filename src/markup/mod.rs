//! Markup transformation pipeline
//!
//! Raw document HTML goes through, in order:
//!
//! 1. [`images`]: optional localization of remote images
//! 2. [`normalize`]: highlight, alert and checkbox rewrites
//! 3. [`render`]: HTML to Markdown, with [`language`] inference for code
//! 4. [`postprocess`]: whitespace tidying

pub mod dom;
pub mod images;
pub mod language;
pub mod normalize;
pub mod postprocess;
pub mod render;

pub use dom::{Markup, NodeKind, NodeRef};
pub use images::{FetchedImage, HttpImageFetcher, ImageFetcher, ImageLocalizer, ImageStats};
pub use language::{CodeBlock, infer_language};
pub use normalize::{NormalizeStats, normalize};
pub use postprocess::tidy_markdown;
pub use render::{MarkdownOptions, MarkdownRenderer};
