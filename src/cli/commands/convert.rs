//! Convert Command
//!
//! Usage:
//!   lakedown <ARCHIVE> <OUTPUT> [--download-image] [--collision STRATEGY] [--config FILE]

use std::path::PathBuf;

use tracing::debug;

use crate::archive::Lakebook;
use crate::cli::ui::output::Output;
use crate::config::{CollisionStrategy, ConfigLoader};
use crate::export::{ExportReport, Exporter, SkipReason};
use crate::types::Result;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub archive: PathBuf,
    pub output: PathBuf,
    /// Forces `images.download` on
    pub download_image: bool,
    /// Overrides `naming.collision`
    pub collision: Option<CollisionStrategy>,
    pub config: Option<PathBuf>,
    pub quiet: bool,
}

/// Convert a lakebook and print a summary
pub fn run(options: ConvertOptions) -> Result<ExportReport> {
    let mut config = ConfigLoader::load(options.config.as_deref())?;
    if options.download_image {
        config.images.download = true;
    }
    if let Some(strategy) = options.collision {
        config.naming.collision = strategy;
    }
    debug!(?config, "Effective configuration");
    debug!("Resolving name collisions with the {} strategy", config.naming.collision);

    let book = Lakebook::open(&options.archive)?;
    let report = Exporter::new(config)?.export(&book, &options.output)?;

    print_summary(&Output::new(options.quiet), &report, &options);
    Ok(report)
}

fn print_summary(out: &Output, report: &ExportReport, options: &ConvertOptions) {
    out.section("Summary");
    out.success(&format!(
        "Wrote {} Markdown files from {} TOC entries",
        report.written.len(),
        report.entries
    ));
    out.detail("Output:", &options.output);

    if report.images_localized > 0 {
        out.info(&format!("Downloaded {} images", report.images_localized));
    }
    if report.image_failures > 0 {
        out.warning(&format!(
            "{} images could not be downloaded and still point to their remote URL",
            report.image_failures
        ));
    }
    if report.draft_mismatches > 0 {
        out.warning(&format!(
            "{} documents have unpublished drafts; the published version was converted",
            report.draft_mismatches
        ));
    }

    for skipped in &report.skipped {
        let message = match &skipped.reason {
            SkipReason::ComplexTable => format!(
                "Skipped '{}' ({}): lakesheet tables must be handled manually",
                skipped.title, skipped.url
            ),
            reason => format!("Skipped '{}' ({}): {}", skipped.title, skipped.url, reason),
        };
        out.warning(&message);
    }

    if report.has_warnings() {
        out.warning("Completed with warnings, review the messages above");
    } else {
        out.success("Completed without warnings");
    }
}
