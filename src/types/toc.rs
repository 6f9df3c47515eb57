//! Table-of-contents entries as stored in the lakebook `tocYml`.

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of a TOC node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    /// Pure grouping label, no document
    Title,
    /// References a document payload by url
    Doc,
    /// Anything else (`META`, `LINK`, ...)
    #[default]
    #[serde(other)]
    Other,
}

/// One node of the flattened TOC tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    #[serde(rename = "type", default)]
    pub kind: EntryKind,

    #[serde(default)]
    pub level: u32,

    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
}

impl TocEntry {
    pub fn doc(level: u32, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Doc,
            level,
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn title(level: u32, title: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Title,
            level,
            title: title.into(),
            url: String::new(),
        }
    }

    pub fn is_doc(&self) -> bool {
        self.kind == EntryKind::Doc
    }
}

/// Parse the `tocYml` document into entries.
pub fn parse_toc(yaml: &str) -> serde_yaml::Result<Vec<TocEntry>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(yaml)
}

/// YAML scalars such as `title: 2023` or `url: 12345` arrive as numbers;
/// read every scalar as its textual form.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
