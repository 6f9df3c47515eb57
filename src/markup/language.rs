//! Code-language inference for fenced code blocks.
//!
//! Inference is a pure function over [`CodeBlock`], so it does not depend on
//! how the renderer represents elements.

use std::sync::LazyLock;

use regex::Regex;

use super::dom::NodeRef;

static LANGUAGE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:language|lang)-([A-Za-z0-9_+\-]+)").expect("valid language class pattern")
});

/// What a code block exposes for language inference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    pub data_language: Option<String>,
    pub data_lang: Option<String>,
    pub classes: Vec<String>,
    /// Class tokens of an immediate nested `code` element, if any
    pub nested_classes: Option<Vec<String>>,
}

impl CodeBlock {
    /// Capture the capability from a `pre` element
    pub fn from_node(pre: &NodeRef) -> Self {
        let nested_classes = pre
            .children()
            .into_iter()
            .find(|c| c.is_tag("code"))
            .map(|code| code.classes());

        Self {
            data_language: pre.attr("data-language"),
            data_lang: pre.attr("data-lang"),
            classes: pre.classes(),
            nested_classes,
        }
    }
}

/// Resolve the language tag: `data-language`, `data-lang`, block classes,
/// then nested `code` classes. First match wins.
pub fn infer_language(block: &CodeBlock) -> Option<String> {
    [&block.data_language, &block.data_lang]
        .into_iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| language_from_classes(&block.classes))
        .or_else(|| {
            block
                .nested_classes
                .as_deref()
                .and_then(language_from_classes)
        })
}

/// First `language-*`/`lang-*` match anywhere in the class tokens, in order.
/// The match is not anchored: `language-c#` yields `c`.
fn language_from_classes(classes: &[String]) -> Option<String> {
    classes.iter().find_map(|token| {
        LANGUAGE_CLASS
            .captures(token)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
