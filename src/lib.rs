//! lakedown - Yuque lakebook to Markdown converter
//!
//! Turns a `.lakebook` export into a directory tree of Markdown files that
//! mirrors the book's table of contents.
//!
//! ## Core Features
//!
//! - **Hierarchy Reconstruction**: nested directories from the flat, leveled TOC
//! - **Deterministic Naming**: sibling collisions resolved the same way on every run
//! - **Markup Normalization**: callouts, task lists, highlights and code languages
//! - **Image Localization**: optional concurrent download into `attachments/`
//!
//! ## Quick Start
//!
//! ```ignore
//! use lakedown::{Config, Exporter, Lakebook};
//!
//! let book = Lakebook::open(Path::new("notes.lakebook"))?;
//! let report = Exporter::new(Config::default())?.export(&book, Path::new("out"))?;
//! println!("{} files written", report.written.len());
//! ```
//!
//! ## Modules
//!
//! - [`archive`]: lakebook extraction, TOC and payload loading
//! - [`hierarchy`]: TOC walk and output placement
//! - [`markup`]: HTML normalization, rendering and image localization
//! - [`export`]: per-document orchestration
//! - [`config`]: layered configuration

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod export;
pub mod hierarchy;
pub mod markup;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{CollisionStrategy, Config, ConfigLoader};

// Error Types
pub use types::error::{LakeError, Result, ResultExt};

// Domain
pub use archive::Lakebook;
pub use export::{ExportReport, Exporter, SkipReason, SkippedDocument};
pub use hierarchy::{HierarchyBuilder, Placement};
pub use types::{Document, EntryKind, SanitizedName, TocEntry};
