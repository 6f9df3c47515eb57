//! Hierarchy Builder
//!
//! Rebuilds the nested output layout from the flat, leveled TOC. The walk
//! is a small state machine fed one entry at a time in TOC order:
//!
//! - a deeper level enters the subtree of the previous entry
//! - a shallower level leaves `last_level - level` subtrees
//! - sibling names are made unique per parent directory
//!
//! Name claims live in memory, so the same archive always produces the same
//! names regardless of what the output directory already holds.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CollisionStrategy;
use crate::constants::document::MARKDOWN_EXTENSION;
use crate::constants::naming::{FIRST_COUNTER_SUFFIX, MAX_DISAMBIGUATION_ATTEMPTS, URL_HASH_LEN};
use crate::types::{LakeError, Result, SanitizedName, TocEntry};

/// Where an entry lands in the output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Unique name among the siblings in `dir`
    pub name: SanitizedName,
    /// Directory holding the entry
    pub dir: PathBuf,
    /// `<dir>/<name>.md` for documents, `None` for grouping entries
    pub file: Option<PathBuf>,
}

impl Placement {
    /// Create the placement's directory (idempotent)
    pub fn materialize(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct HierarchyBuilder {
    root: PathBuf,
    strategy: CollisionStrategy,
    stack: Vec<SanitizedName>,
    last_level: u32,
    last_name: SanitizedName,
    claimed: HashMap<PathBuf, HashSet<String>>,
}

impl HierarchyBuilder {
    pub fn new(root: impl Into<PathBuf>, strategy: CollisionStrategy) -> Self {
        Self {
            root: root.into(),
            strategy,
            stack: Vec::new(),
            last_level: 0,
            last_name: SanitizedName::sanitize(""),
            claimed: HashMap::new(),
        }
    }

    /// Current path-stack depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Feed the next TOC entry.
    ///
    /// Entries with an empty title are ignored and return `Ok(None)`; they
    /// leave the walk state untouched.
    pub fn advance(&mut self, entry: &TocEntry) -> Result<Option<Placement>> {
        if entry.title.is_empty() {
            debug!(url = %entry.url, "Skipping untitled TOC entry");
            return Ok(None);
        }

        if entry.level > self.last_level {
            self.stack.push(self.last_name.clone());
        } else if entry.level < self.last_level {
            let pops = ((self.last_level - entry.level) as usize).min(self.stack.len());
            self.stack.truncate(self.stack.len() - pops);
        }

        let dir = self.current_dir();
        let name = self.claim(&dir, SanitizedName::sanitize(&entry.title), &entry.url)?;

        self.last_level = entry.level;
        self.last_name = name.clone();

        let file = entry
            .is_doc()
            .then(|| dir.join(format!("{}.{}", name, MARKDOWN_EXTENSION)));

        Ok(Some(Placement { name, dir, file }))
    }

    /// Give back the name claimed for `placement`.
    ///
    /// Used when an entry is dropped after placement; the level bookkeeping
    /// stays, so the following entries keep their depth.
    pub fn release(&mut self, placement: &Placement) {
        if let Some(taken) = self.claimed.get_mut(&placement.dir) {
            taken.remove(placement.name.as_str());
        }
    }

    fn current_dir(&self) -> PathBuf {
        self.stack
            .iter()
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    fn claim(&mut self, dir: &Path, name: SanitizedName, url: &str) -> Result<SanitizedName> {
        let taken = self.claimed.entry(dir.to_path_buf()).or_default();
        if taken.insert(name.as_str().to_string()) {
            return Ok(name);
        }

        let hashed = match self.strategy {
            CollisionStrategy::UrlHash => Some(name.with_suffix(url_digest(url))),
            CollisionStrategy::Counter => None,
        };
        let candidates = hashed
            .into_iter()
            .chain((FIRST_COUNTER_SUFFIX..).map(|n| name.with_suffix(n)))
            .take(MAX_DISAMBIGUATION_ATTEMPTS);

        for candidate in candidates {
            if taken.insert(candidate.as_str().to_string()) {
                debug!(
                    "Name '{}' already used in {}, renamed to '{}'",
                    name,
                    dir.display(),
                    candidate
                );
                return Ok(candidate);
            }
        }

        Err(LakeError::NamingConflict {
            name: name.into_inner(),
            attempts: MAX_DISAMBIGUATION_ATTEMPTS,
        })
    }
}

/// Leading hex digits of the SHA-256 of a document url
fn url_digest(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    digest[..URL_HASH_LEN].to_string()
}
