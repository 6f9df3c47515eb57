//! Vendor markup normalization.
//!
//! Rewrites Yuque-specific constructs into plain HTML that renders to the
//! intended Markdown. The passes run in a fixed order (highlights, alerts,
//! checkboxes); later passes assume earlier ones already ran.

use tracing::debug;

use super::dom::{Markup, NodeRef};
use crate::constants::markdown::HIGHLIGHT_MARKER;

/// Class marking a Yuque alert container
const ALERT_CLASS: &str = "ne-alert";

/// Class of the element holding a checkbox item's text
const CHECKBOX_TEXT_CLASS: &str = "ne-text";

/// Background values that do not paint anything
const NON_COLOURS: [&str; 5] = ["transparent", "none", "initial", "inherit", "unset"];

/// How many elements each pass rewrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub highlights: usize,
    pub callouts: usize,
    pub checkboxes: usize,
}

/// Run all normalization passes in order
pub fn normalize(markup: &Markup) -> NormalizeStats {
    let stats = NormalizeStats {
        highlights: convert_highlights(markup),
        callouts: convert_alerts(markup),
        checkboxes: convert_checkboxes(markup),
    };
    debug!(
        highlights = stats.highlights,
        callouts = stats.callouts,
        checkboxes = stats.checkboxes,
        "Normalized markup"
    );
    stats
}

// =============================================================================
// Highlights
// =============================================================================

/// Unwrap background-coloured spans, bracketing their content with `==`
pub fn convert_highlights(markup: &Markup) -> usize {
    let spans: Vec<NodeRef> = markup
        .elements("span")
        .into_iter()
        .filter(|span| span.attr("style").is_some_and(|s| declares_background(&s)))
        .collect();

    for span in &spans {
        span.insert_before(&NodeRef::text_node(HIGHLIGHT_MARKER));
        span.insert_after(&NodeRef::text_node(HIGHLIGHT_MARKER));
        span.unwrap();
    }
    spans.len()
}

fn declares_background(style: &str) -> bool {
    style.split(';').any(|declaration| {
        let Some((property, value)) = declaration.split_once(':') else {
            return false;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        matches!(property.as_str(), "background-color" | "background")
            && !value.is_empty()
            && !NON_COLOURS.contains(&value.as_str())
    })
}

// =============================================================================
// Alerts
// =============================================================================

/// Callout keyword for an alert's `data-type`
pub fn callout_type(data_type: Option<&str>) -> &'static str {
    match data_type {
        Some("info") => "INFO",
        Some("tips") => "TIP",
        Some("success") => "SUCCESS",
        Some("warning") => "WARNING",
        Some("danger") => "DANGER",
        Some("color1") => "NOTE",
        Some("color2") => "SUCCESS",
        Some("color3") => "WARNING",
        Some("color4") => "DANGER",
        Some("color5") => "ABSTRACT",
        _ => "NOTE",
    }
}

/// Replace alert containers with `[!TYPE]` quote blocks
pub fn convert_alerts(markup: &Markup) -> usize {
    let alerts: Vec<NodeRef> = markup
        .elements("div")
        .into_iter()
        .filter(|div| div.has_class(ALERT_CLASS))
        .collect();

    for alert in &alerts {
        let marker = format!("[!{}]", callout_type(alert.attr("data-type").as_deref()));
        let lines: Vec<String> = alert
            .children()
            .into_iter()
            .filter(|child| child.is_tag("p"))
            .map(|p| p.flattened_text())
            .filter(|line| !line.is_empty())
            .collect();

        let quote = NodeRef::element("blockquote");
        for line in std::iter::once(marker.as_str()).chain(lines.iter().map(String::as_str)) {
            quote.append(&NodeRef::text_node(line));
            quote.append(&NodeRef::element("br"));
        }

        alert.insert_before(&NodeRef::text_node("\n"));
        alert.replace_with(&quote);
        quote.insert_after(&NodeRef::text_node("\n"));
    }
    alerts.len()
}

// =============================================================================
// Checkboxes
// =============================================================================

/// Turn checkbox inputs into `- [x] text` / `- [ ] text` lines
///
/// The line goes right before the enclosing list item. The input and its
/// text holder are removed; the emptied list item is left in place.
pub fn convert_checkboxes(markup: &Markup) -> usize {
    let inputs: Vec<NodeRef> = markup
        .elements("input")
        .into_iter()
        .filter(|input| {
            input
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
        })
        .collect();

    for input in &inputs {
        let item = input.closest("li");
        let holder = item
            .as_ref()
            .and_then(|li| li.find(|n| n.is_tag("span") && n.has_class(CHECKBOX_TEXT_CLASS)));

        let mark = if input.has_attr("checked") { "- [x]" } else { "- [ ]" };
        let text = holder.as_ref().map(NodeRef::flattened_text).unwrap_or_default();

        let anchor = item.as_ref().unwrap_or(input);
        anchor.insert_before(&NodeRef::text_node(&format!("{} {}\n", mark, text)));

        input.detach();
        if let Some(holder) = holder {
            holder.detach();
        }
    }
    inputs.len()
}
