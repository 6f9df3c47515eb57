//! Lakebook archive access
//!
//! A `.lakebook` file is a tar archive (optionally gzip-compressed) holding
//! exactly one repository directory:
//!
//! ```text
//! <repo>/
//! ├── $meta.json      {"meta": "<json with book.tocYml>"}
//! ├── <url>.json      {"doc": {"body": ..., "body_draft": ..., "body_asl": ...}}
//! └── ...
//! ```
//!
//! The archive is unpacked into a temporary directory that is removed when
//! the [`Lakebook`] is dropped.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tempfile::TempDir;
use tracing::debug;

use crate::constants::archive::{DOCUMENT_EXTENSION, GZIP_MAGIC, META_FILE, TEMP_DIR_PREFIX};
use crate::types::{Document, DocumentPayload, LakeError, Result, ResultExt, TocEntry, parse_toc};

#[derive(Debug, Deserialize)]
struct MetaFile {
    meta: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BookMeta {
    book: BookInfo,
}

#[derive(Debug, Deserialize)]
struct BookInfo {
    #[serde(rename = "tocYml", default)]
    toc_yml: Option<String>,
}

/// An opened lakebook repository
#[derive(Debug)]
pub struct Lakebook {
    // Keeps the extraction directory alive
    _extracted: Option<TempDir>,
    root: PathBuf,
}

impl Lakebook {
    /// Unpack a lakebook archive into a temporary directory
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LakeError::ArchiveNotFound(path.to_path_buf()));
        }

        let extracted = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()?;
        unpack(path, extracted.path())?;

        let root = single_directory(extracted.path())?;
        debug!("Extracted {} to {}", path.display(), root.display());

        Ok(Self {
            _extracted: Some(extracted),
            root,
        })
    }

    /// Use an already extracted repository directory
    pub fn from_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let root = dir.into();
        if !root.is_dir() {
            return Err(LakeError::ArchiveNotFound(root));
        }
        Ok(Self {
            _extracted: None,
            root,
        })
    }

    /// Repository directory holding `$meta.json` and the payloads
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the ordered TOC from the metadata file
    pub fn read_toc(&self) -> Result<Vec<TocEntry>> {
        let raw = std::fs::read_to_string(self.root.join(META_FILE))
            .with_metadata_context(format!("cannot read {}", META_FILE))?;
        let outer: MetaFile = serde_json::from_str(&raw)
            .with_metadata_context(format!("invalid {}", META_FILE))?;

        // `meta` is normally a JSON document serialized into a string
        let book: BookMeta = match outer.meta {
            serde_json::Value::String(inner) => {
                serde_json::from_str(&inner).with_metadata_context("invalid embedded meta")?
            }
            value => serde_json::from_value(value).with_metadata_context("invalid embedded meta")?,
        };

        let toc_yml = book
            .book
            .toc_yml
            .ok_or_else(|| LakeError::Metadata("book.tocYml is missing".to_string()))?;
        parse_toc(&toc_yml).with_metadata_context("invalid tocYml")
    }

    /// Load the payload of the document `url`
    pub fn load_document(&self, url: &str) -> Result<Document> {
        if url.is_empty() || url.contains(['/', '\\']) || url == ".." {
            return Err(LakeError::document(url, "invalid document url"));
        }

        let path = self.root.join(format!("{}.{}", url, DOCUMENT_EXTENSION));
        let bytes = std::fs::read(&path).for_document(url)?;
        let text = String::from_utf8(bytes).for_document(url)?;
        let payload: DocumentPayload = serde_json::from_str(&text).for_document(url)?;
        Ok(Document::from(payload))
    }
}

fn unpack(path: &Path, dest: &Path) -> Result<()> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let read = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    let reader: Box<dyn Read> = if read == magic.len() && magic == GZIP_MAGIC {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    tar::Archive::new(reader)
        .unpack(dest)
        .map_err(|e| LakeError::InvalidArchive(format!("{}: {}", path.display(), e)))
}

fn single_directory(dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }

    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        n => Err(LakeError::InvalidArchive(format!(
            "expected exactly one directory in the archive, found {}",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    const TOC_YML: &str = "- type: META\n  count: 2\n- type: TITLE\n  title: Group\n  level: 0\n  url: ''\n- type: DOC\n  title: First\n  level: 1\n  url: abc\n";

    fn meta_json(toc_yml: &str) -> String {
        let inner = serde_json::json!({ "book": { "tocYml": toc_yml } }).to_string();
        serde_json::json!({ "meta": inner }).to_string()
    }

    fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }

    fn build_archive(dir: &Path, files: &[(&str, String)], gzip: bool) -> PathBuf {
        let path = dir.join("book.lakebook");
        let file = File::create(&path).unwrap();
        if gzip {
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            for (name, data) in files {
                append_file(&mut builder, name, data.as_bytes());
            }
            builder.into_inner().unwrap().finish().unwrap();
        } else {
            let mut builder = tar::Builder::new(file);
            for (name, data) in files {
                append_file(&mut builder, name, data.as_bytes());
            }
            builder.finish().unwrap();
        }
        path
    }

    fn sample_files() -> Vec<(&'static str, String)> {
        vec![
            ("repo/$meta.json", meta_json(TOC_YML)),
            (
                "repo/abc.json",
                r#"{"doc":{"body":"<p>hello</p>","body_draft":null}}"#.to_string(),
            ),
        ]
    }

    #[test]
    fn test_open_tar_and_read_toc() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &sample_files(), false);

        let book = Lakebook::open(&archive).unwrap();
        let toc = book.read_toc().unwrap();

        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0].kind, EntryKind::Other);
        assert_eq!(toc[1], TocEntry::title(0, "Group"));
        assert_eq!(toc[2], TocEntry::doc(1, "First", "abc"));

        let doc = book.load_document("abc").unwrap();
        assert_eq!(doc.published, "<p>hello</p>");
    }

    #[test]
    fn test_open_gzip_archive() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &sample_files(), true);

        let book = Lakebook::open(&archive).unwrap();
        assert_eq!(book.read_toc().unwrap().len(), 3);
    }

    #[test]
    fn test_extraction_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &sample_files(), false);

        let book = Lakebook::open(&archive).unwrap();
        let root = book.root().to_path_buf();
        assert!(root.join(META_FILE).is_file());

        drop(book);
        assert!(!root.exists());
    }

    #[test]
    fn test_missing_archive() {
        let err = Lakebook::open(Path::new("/definitely/not/here.lakebook")).unwrap_err();
        assert!(matches!(err, LakeError::ArchiveNotFound(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rejects_zero_or_many_directories() {
        let temp = TempDir::new().unwrap();
        let flat = build_archive(temp.path(), &[("$meta.json", meta_json(""))], false);
        assert!(matches!(
            Lakebook::open(&flat).unwrap_err(),
            LakeError::InvalidArchive(_)
        ));

        let temp = TempDir::new().unwrap();
        let two = build_archive(
            temp.path(),
            &[
                ("a/$meta.json", meta_json("")),
                ("b/$meta.json", meta_json("")),
            ],
            false,
        );
        assert!(matches!(
            Lakebook::open(&two).unwrap_err(),
            LakeError::InvalidArchive(_)
        ));
    }

    #[test]
    fn test_metadata_errors() {
        let temp = TempDir::new().unwrap();
        let book = Lakebook::from_dir(temp.path()).unwrap();
        assert!(matches!(book.read_toc().unwrap_err(), LakeError::Metadata(_)));

        std::fs::write(temp.path().join(META_FILE), r#"{"meta":"{\"book\":{}}"}"#).unwrap();
        assert!(matches!(book.read_toc().unwrap_err(), LakeError::Metadata(_)));

        std::fs::write(temp.path().join(META_FILE), meta_json("- [unclosed")).unwrap();
        assert!(matches!(book.read_toc().unwrap_err(), LakeError::Metadata(_)));
    }

    #[test]
    fn test_meta_as_object() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(META_FILE),
            r#"{"meta":{"book":{"tocYml":"- type: DOC\n  title: A\n  level: 0\n  url: u1\n"}}}"#,
        )
        .unwrap();
        let book = Lakebook::from_dir(temp.path()).unwrap();
        assert_eq!(book.read_toc().unwrap(), vec![TocEntry::doc(0, "A", "u1")]);
    }

    #[test]
    fn test_document_errors_are_per_document() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.json"), "{not json").unwrap();
        std::fs::write(temp.path().join("latin.json"), [0xff, 0xfe, 0x00]).unwrap();
        let book = Lakebook::from_dir(temp.path()).unwrap();

        for url in ["missing", "bad", "latin", "../escape", ""] {
            let err = book.load_document(url).unwrap_err();
            assert!(matches!(err, LakeError::Document { .. }), "url {:?}", url);
            assert!(!err.is_fatal());
        }
    }
}
