pub mod document;
pub mod error;
pub mod toc;

pub use document::{Document, DocumentBodies, DocumentPayload};
pub use error::{LakeError, Result, ResultExt};
pub use toc::{EntryKind, TocEntry, parse_toc};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

use crate::constants::naming::{REPLACEMENT, UNSAFE_CHARS};

/// Filesystem-safe form of a TOC title
///
/// Every character in [`UNSAFE_CHARS`] is replaced by `_`. A title made only
/// of dots (`.`, `..`) would name the current or parent directory, so each dot
/// becomes `_` too. Uniqueness within a parent directory is enforced by the
/// hierarchy builder, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn sanitize(title: &str) -> Self {
        let name: String = title
            .chars()
            .map(|c| if UNSAFE_CHARS.contains(&c) { REPLACEMENT } else { c })
            .collect();

        if !name.is_empty() && name.chars().all(|c| c == '.') {
            return Self(name.chars().map(|_| REPLACEMENT).collect());
        }
        Self(name)
    }

    /// Append a disambiguating suffix (`name_suffix`)
    pub fn with_suffix(&self, suffix: impl fmt::Display) -> Self {
        Self(format!("{}{}{}", self.0, REPLACEMENT, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<std::path::Path> for SanitizedName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
