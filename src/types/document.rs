//! Per-document payloads (`<url>.json`).

use serde::Deserialize;

use crate::constants::document::COMPLEX_TABLE_MARKER;

/// Raw payload shape: `{"doc": {"body": ..., "body_draft": ..., "body_asl": ...}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub doc: DocumentBodies,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentBodies {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_draft: Option<String>,
    #[serde(default)]
    pub body_asl: Option<String>,
}

/// A document resolved for conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Authoritative markup
    pub published: String,
    /// Draft markup, only compared against `published`
    pub draft: Option<String>,
}

impl From<DocumentPayload> for Document {
    fn from(payload: DocumentPayload) -> Self {
        let DocumentBodies {
            body,
            body_draft,
            body_asl,
        } = payload.doc;

        let published = body
            .filter(|b| !b.is_empty())
            .or(body_asl)
            .unwrap_or_default();

        Self {
            published,
            draft: body_draft,
        }
    }
}

impl Document {
    /// The draft exists and differs from the published body
    pub fn has_unpublished_draft(&self) -> bool {
        self.draft
            .as_deref()
            .is_some_and(|draft| draft != self.published)
    }

    /// Lakesheet spreadsheets cannot be converted
    pub fn is_complex_table(&self) -> bool {
        self.published.starts_with(COMPLEX_TABLE_MARKER)
    }
}
