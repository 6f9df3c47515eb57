//! Export orchestration
//!
//! Walks the TOC in order and, for every document entry: resolves its
//! placement, loads the payload, optionally localizes images, normalizes
//! the markup, renders Markdown, tidies it and writes the file.
//!
//! Only run-level failures (unreadable TOC, naming conflict exhaustion,
//! output root creation) abort the export. Anything that goes wrong with a
//! single document is logged and recorded in the [`ExportReport`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::Lakebook;
use crate::config::Config;
use crate::hierarchy::{HierarchyBuilder, Placement};
use crate::markup::{
    ImageLocalizer, ImageStats, Markup, MarkdownOptions, MarkdownRenderer, normalize,
    tidy_markdown,
};
use crate::types::{Result, ResultExt, TocEntry};

/// Why a document produced no file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Lakesheet spreadsheet, must be handled manually
    ComplexTable,
    /// Payload or output error
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ComplexTable => write!(f, "lakesheet table"),
            SkipReason::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub title: String,
    pub url: String,
    pub reason: SkipReason,
}

/// Outcome of one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// TOC entries read from the metadata
    pub entries: usize,
    /// Markdown files written, in TOC order
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedDocument>,
    /// Documents whose draft differs from the published body
    pub draft_mismatches: usize,
    pub images_localized: usize,
    pub image_failures: usize,
}

impl ExportReport {
    pub fn has_warnings(&self) -> bool {
        !self.skipped.is_empty() || self.draft_mismatches > 0 || self.image_failures > 0
    }
}

enum Outcome {
    Written(ImageStats),
    ComplexTable,
}

pub struct Exporter {
    config: Config,
    renderer: MarkdownRenderer,
    localizer: Option<ImageLocalizer>,
    runtime: tokio::runtime::Runtime,
}

impl Exporter {
    /// Build an exporter; image localization is enabled by
    /// `images.download`
    pub fn new(config: Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let localizer = if config.images.download {
            Some(ImageLocalizer::from_config(&config.images)?)
        } else {
            None
        };

        Ok(Self {
            renderer: MarkdownRenderer::new(MarkdownOptions::from(&config.markdown)),
            config,
            localizer,
            runtime,
        })
    }

    /// Replace the image localizer (enables localization)
    pub fn with_localizer(mut self, localizer: ImageLocalizer) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Convert every document of `book` into `output`
    pub fn export(&self, book: &Lakebook, output: &Path) -> Result<ExportReport> {
        let toc = book.read_toc()?;
        info!("Total {} files", toc.len());

        std::fs::create_dir_all(output)?;

        let mut hierarchy = HierarchyBuilder::new(output, self.config.naming.collision);
        let mut report = ExportReport {
            entries: toc.len(),
            ..Default::default()
        };

        for entry in &toc {
            let Some(placement) = hierarchy.advance(entry)? else {
                continue;
            };
            let Some(file) = placement.file.as_deref() else {
                continue;
            };

            match self.export_document(book, entry, &placement, file, &mut report) {
                Ok(Outcome::Written(images)) => {
                    debug!("Wrote {}", file.display());
                    report.written.push(file.to_path_buf());
                    report.images_localized += images.localized;
                    report.image_failures += images.failed;
                }
                Ok(Outcome::ComplexTable) => {
                    hierarchy.release(&placement);
                    report.skipped.push(SkippedDocument {
                        title: entry.title.clone(),
                        url: entry.url.clone(),
                        reason: SkipReason::ComplexTable,
                    });
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(title = %entry.title, url = %entry.url, "Skipping document: {}", e);
                    report.skipped.push(SkippedDocument {
                        title: entry.title.clone(),
                        url: entry.url.clone(),
                        reason: SkipReason::Failed(e.to_string()),
                    });
                }
            }
        }

        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "Export finished"
        );
        Ok(report)
    }

    fn export_document(
        &self,
        book: &Lakebook,
        entry: &TocEntry,
        placement: &Placement,
        file: &Path,
        report: &mut ExportReport,
    ) -> Result<Outcome> {
        let document = book.load_document(&entry.url)?;

        if document.has_unpublished_draft() {
            warn!(
                title = %entry.title,
                url = %entry.url,
                "Draft differs from the published version, check whether it was published"
            );
            report.draft_mismatches += 1;
        }

        if document.is_complex_table() {
            warn!(
                title = %entry.title,
                url = %entry.url,
                "Lakesheet table cannot be converted, handle it manually"
            );
            return Ok(Outcome::ComplexTable);
        }

        placement.materialize().for_document(&entry.url)?;

        let markup = Markup::parse(&document.published);
        let images = match &self.localizer {
            Some(localizer) => self
                .runtime
                .block_on(localizer.localize(&markup, &placement.name, &placement.dir)),
            None => ImageStats::default(),
        };

        normalize(&markup);
        let text = tidy_markdown(&self.renderer.render(&markup));
        std::fs::write(file, text).for_document(&entry.url)?;

        Ok(Outcome::Written(images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionStrategy;
    use crate::constants::archive::META_FILE;
    use crate::constants::images::ATTACHMENTS_DIR;
    use crate::markup::{FetchedImage, ImageFetcher};
    use crate::types::LakeError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// In-memory log sink for a scoped subscriber
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Extracted repository written straight to disk
    struct Repo {
        dir: TempDir,
    }

    impl Repo {
        fn new(toc_yml: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let inner = serde_json::json!({ "book": { "tocYml": toc_yml } }).to_string();
            let meta = serde_json::json!({ "meta": inner }).to_string();
            std::fs::write(dir.path().join(META_FILE), meta).unwrap();
            Self { dir }
        }

        fn doc(self, url: &str, body: &str) -> Self {
            let payload = serde_json::json!({ "doc": { "body": body, "body_draft": body } });
            std::fs::write(self.dir.path().join(format!("{}.json", url)), payload.to_string())
                .unwrap();
            self
        }

        fn raw(self, url: &str, payload: &str) -> Self {
            std::fs::write(self.dir.path().join(format!("{}.json", url)), payload).unwrap();
            self
        }

        fn book(&self) -> Lakebook {
            Lakebook::from_dir(self.dir.path()).unwrap()
        }
    }

    fn export(repo: &Repo, config: Config) -> (TempDir, ExportReport) {
        let out = TempDir::new().unwrap();
        let report = Exporter::new(config)
            .unwrap()
            .export(&repo.book(), out.path())
            .unwrap();
        (out, report)
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    const TWO_DOCS: &str = "- type: DOC\n  level: 0\n  title: A\n  url: u1\n- type: DOC\n  level: 0\n  title: B\n  url: u2\n";

    #[test]
    fn test_sibling_documents() {
        let repo = Repo::new(TWO_DOCS)
            .doc("u1", "<p>alpha</p>")
            .doc("u2", "<p>beta</p>");
        let (out, report) = export(&repo, Config::default());

        assert_eq!(read(out.path().join("A.md")), "alpha\n");
        assert_eq!(read(out.path().join("B.md")), "beta\n");
        assert!(!out.path().join(ATTACHMENTS_DIR).exists());
        assert_eq!(report.entries, 2);
        assert_eq!(report.written.len(), 2);
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_colliding_titles() {
        let repo = Repo::new(
            "- type: DOC\n  level: 0\n  title: X\n  url: u1\n- type: DOC\n  level: 0\n  title: X\n  url: u2\n",
        )
        .doc("u1", "<p>first</p>")
        .doc("u2", "<p>second</p>");
        let (out, report) = export(&repo, Config::default());

        assert_eq!(read(out.path().join("X.md")), "first\n");
        assert_eq!(read(out.path().join("X_2.md")), "second\n");
        assert_eq!(report.written.len(), 2);
    }

    #[test]
    fn test_complex_table_skipped() {
        let repo = Repo::new(TWO_DOCS)
            .doc("u1", r#"{"format":"lakesheet","version":"3.0"}"#)
            .doc("u2", "<p>beta</p>");
        let (out, report) = export(&repo, Config::default());

        assert!(!out.path().join("A.md").exists());
        assert_eq!(read(out.path().join("B.md")), "beta\n");
        assert_eq!(
            report.skipped,
            vec![SkippedDocument {
                title: "A".into(),
                url: "u1".into(),
                reason: SkipReason::ComplexTable,
            }]
        );
    }

    #[test]
    fn test_complex_table_releases_its_name() {
        let repo = Repo::new(
            "- type: DOC\n  level: 0\n  title: X\n  url: u1\n- type: DOC\n  level: 0\n  title: X\n  url: u2\n",
        )
        .doc("u1", r#"{"format":"lakesheet","version":"3.0"}"#)
        .doc("u2", "<p>second</p>");
        let (out, report) = export(&repo, Config::default());

        assert_eq!(read(out.path().join("X.md")), "second\n");
        assert!(!out.path().join("X_2.md").exists());
        assert_eq!(report.written, vec![out.path().join("X.md")]);
    }

    #[test]
    fn test_complex_table_keeps_child_depth() {
        let repo = Repo::new(
            "- type: DOC\n  level: 0\n  title: Sheet\n  url: u1\n- type: DOC\n  level: 1\n  title: Child\n  url: u2\n- type: DOC\n  level: 0\n  title: After\n  url: u3\n",
        )
        .doc("u1", r#"{"format":"lakesheet","version":"3.0"}"#)
        .doc("u2", "<p>child</p>")
        .doc("u3", "<p>after</p>");
        let (out, _) = export(&repo, Config::default());

        assert!(!out.path().join("Sheet.md").exists());
        assert_eq!(read(out.path().join("Sheet").join("Child.md")), "child\n");
        assert_eq!(read(out.path().join("After.md")), "after\n");
    }

    #[test]
    fn test_complex_table_logs_warning() {
        let repo = Repo::new(TWO_DOCS)
            .doc("u1", r#"{"format":"lakesheet","version":"3.0"}"#)
            .doc("u2", "<p>beta</p>");
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let (_out, report) =
            tracing::subscriber::with_default(subscriber, || export(&repo, Config::default()));

        let text = logs.text();
        assert!(text.contains("WARN"), "{}", text);
        assert!(text.contains("Lakesheet table cannot be converted"), "{}", text);
        assert!(text.contains("u1"), "{}", text);
        assert!(report.has_warnings());
    }

    #[test]
    fn test_unwritable_output_skips_document() {
        let repo = Repo::new(TWO_DOCS)
            .doc("u1", "<p>alpha</p>")
            .doc("u2", "<p>beta</p>");
        let out = TempDir::new().unwrap();
        std::fs::create_dir(out.path().join("A.md")).unwrap();

        let report = Exporter::new(Config::default())
            .unwrap()
            .export(&repo.book(), out.path())
            .unwrap();

        assert!(out.path().join("A.md").is_dir());
        assert_eq!(read(out.path().join("B.md")), "beta\n");
        assert_eq!(report.written, vec![out.path().join("B.md")]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].url, "u1");
        assert!(matches!(report.skipped[0].reason, SkipReason::Failed(_)));
    }

    #[test]
    fn test_broken_payload_skipped() {
        let repo = Repo::new(TWO_DOCS)
            .raw("u1", "{broken")
            .doc("u2", "<p>beta</p>");
        let (out, report) = export(&repo, Config::default());

        assert!(!out.path().join("A.md").exists());
        assert!(out.path().join("B.md").exists());
        assert!(matches!(report.skipped[0].reason, SkipReason::Failed(_)));
    }

    #[test]
    fn test_draft_mismatch_counted() {
        let repo = Repo::new(TWO_DOCS)
            .raw("u1", r#"{"doc":{"body":"<p>live</p>","body_draft":"<p>newer</p>"}}"#)
            .raw("u2", r#"{"doc":{"body":null,"body_asl":"<p>asl</p>"}}"#);
        let (out, report) = export(&repo, Config::default());

        assert_eq!(read(out.path().join("A.md")), "live\n");
        assert_eq!(read(out.path().join("B.md")), "asl\n");
        assert_eq!(report.draft_mismatches, 1);
    }

    #[test]
    fn test_nested_output_and_conversion() {
        let toc = concat!(
            "- type: TITLE\n  level: 0\n  title: Guide\n  url: ''\n",
            "- type: DOC\n  level: 1\n  title: 'Set up: basics'\n  url: u1\n",
        );
        let body = concat!(
            "<h2>Install</h2>",
            r#"<div class="ne-alert" data-type="tips"><p>Use <b>stable</b></p></div>"#,
            r#"<ul class="ne-tl"><li><input type="checkbox" checked><span class="ne-text">Done</span></li></ul>"#,
            r#"<p>Run <span style="background-color: #FBDE28">this</span></p>"#,
            r#"<pre data-language="shell"><code>cargo install</code></pre>"#,
        );
        let repo = Repo::new(toc).doc("u1", body);
        let (out, _) = export(&repo, Config::default());

        let text = read(out.path().join("Guide").join("Set_up__basics.md"));
        assert_eq!(
            text,
            "## Install\n\n> [!TIP]\n> Usestable\n\n- [x] Done\n-\n\nRun ==this==\n\n```shell\ncargo install\n```\n"
        );
    }

    #[test]
    fn test_same_names_across_runs() {
        let repo = Repo::new(
            "- type: DOC\n  level: 0\n  title: X\n  url: u1\n- type: DOC\n  level: 0\n  title: X\n  url: u2\n",
        )
        .doc("u1", "<p>1</p>")
        .doc("u2", "<p>2</p>");
        let mut config = Config::default();
        config.naming.collision = CollisionStrategy::UrlHash;

        let out = TempDir::new().unwrap();
        let exporter = Exporter::new(config).unwrap();
        let first = exporter.export(&repo.book(), out.path()).unwrap();
        let second = exporter.export(&repo.book(), out.path()).unwrap();
        assert_eq!(first.written, second.written);
    }

    #[test]
    fn test_missing_metadata_is_fatal() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let err = Exporter::new(Config::default())
            .unwrap()
            .export(&Lakebook::from_dir(dir.path()).unwrap(), out.path())
            .unwrap_err();
        assert!(matches!(err, LakeError::Metadata(_)));
    }

    struct OneImage;

    #[async_trait]
    impl ImageFetcher for OneImage {
        async fn fetch(&self, url: &str) -> Result<FetchedImage> {
            if url.ends_with("ok.png") {
                Ok(FetchedImage {
                    bytes: vec![1, 2, 3],
                    content_type: Some("image/png".into()),
                })
            } else {
                Err(LakeError::image(url, "HTTP 404 Not Found"))
            }
        }
    }

    #[test]
    fn test_images_localized_next_to_document() {
        let repo = Repo::new(TWO_DOCS)
            .doc(
                "u1",
                r#"<p><img src="https://cdn.example.com/ok.png" alt="a"><img src="https://cdn.example.com/gone.png"></p>"#,
            )
            .doc("u2", "<p>no images</p>");

        let out = TempDir::new().unwrap();
        let report = Exporter::new(Config::default())
            .unwrap()
            .with_localizer(ImageLocalizer::new(Arc::new(OneImage), 2))
            .export(&repo.book(), out.path())
            .unwrap();

        assert_eq!(
            read(out.path().join("A.md")),
            "![a](./attachments/A_001.png)![](https://cdn.example.com/gone.png)\n"
        );
        assert_eq!(
            std::fs::read(out.path().join(ATTACHMENTS_DIR).join("A_001.png")).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(report.images_localized, 1);
        assert_eq!(report.image_failures, 1);
        assert!(report.has_warnings());
    }
}
