//! Markdown rendering of normalized markup.
//!
//! Covers the subset of HTML produced by the Yuque exporter after
//! normalization. Block elements are emitted surrounded by blank lines and
//! [`tidy_markdown`](super::postprocess::tidy_markdown) collapses the
//! surplus afterwards, so each element renders independently of its
//! neighbours.

use super::dom::{Markup, NodeKind, NodeRef};
use super::language::{CodeBlock, infer_language};
use crate::config::MarkdownConfig;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "html", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

const SILENT_TAGS: &[&str] = &[
    "head", "input", "noscript", "script", "style", "template", "title", "colgroup", "col",
];

/// Rendering switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Escape `*` and `_` in text
    pub escape_emphasis: bool,
    /// Code fence (three or more backticks or tildes)
    pub code_fence: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self::from(&MarkdownConfig::default())
    }
}

impl From<&MarkdownConfig> for MarkdownOptions {
    fn from(config: &MarkdownConfig) -> Self {
        Self {
            escape_emphasis: config.escape_emphasis,
            code_fence: config.code_fence.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Number of enclosing list items
    list_depth: usize,
}

/// Converts a normalized document to Markdown text
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    /// Render the document body. The result has no leading or trailing
    /// blank lines and ends with a single newline when non-empty.
    pub fn render(&self, markup: &Markup) -> String {
        let body = self.render_children(markup.root(), Context::default());
        let body = body.trim_matches(|c: char| c == '\n' || c == ' ');
        if body.is_empty() {
            String::new()
        } else {
            format!("{}\n", body)
        }
    }

    fn render_children(&self, node: &NodeRef, ctx: Context) -> String {
        let children = node.children();
        let mut out = String::new();

        for (i, child) in children.iter().enumerate() {
            if is_blank_text(child) {
                let prev_is_block = match i.checked_sub(1) {
                    Some(prev) => is_block(&children[prev]),
                    None => is_block(node),
                };
                let next_is_block = children.get(i + 1).map_or(is_block(node), is_block);
                if prev_is_block || next_is_block {
                    continue;
                }
            }
            out.push_str(&self.render_node(child, ctx));
        }
        out
    }

    fn render_node(&self, node: &NodeRef, ctx: Context) -> String {
        match node.kind() {
            NodeKind::Text => self.render_text(&node.text().unwrap_or_default()),
            NodeKind::Element => self.render_element(node, ctx),
            NodeKind::Document => self.render_children(node, ctx),
            NodeKind::Comment | NodeKind::Other => String::new(),
        }
    }

    fn render_text(&self, text: &str) -> String {
        let collapsed = collapse_whitespace(text);
        if self.options.escape_emphasis {
            escape_emphasis(&collapsed)
        } else {
            collapsed
        }
    }

    fn render_element(&self, node: &NodeRef, ctx: Context) -> String {
        let tag = node.tag().unwrap_or_default().to_ascii_lowercase();
        if SILENT_TAGS.contains(&tag.as_str()) {
            return String::new();
        }

        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                let text = single_line(&self.render_children(node, ctx));
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level), text)
                }
            }
            "br" => "\n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "pre" => self.render_code_block(node),
            "blockquote" => self.render_quote(node, ctx),
            "ul" => self.render_list(node, None, ctx),
            "ol" => {
                let start = node
                    .attr("start")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(1);
                self.render_list(node, Some(start), ctx)
            }
            "table" => self.render_table(node, ctx),
            "code" | "kbd" | "samp" | "tt" => inline_code(&node.text_content()),
            "strong" | "b" => wrap_inline(&self.render_children(node, ctx), "**"),
            "em" | "i" | "cite" => wrap_inline(&self.render_children(node, ctx), "*"),
            "del" | "s" | "strike" => wrap_inline(&self.render_children(node, ctx), "~~"),
            "a" => self.render_link(node, ctx),
            "img" => render_image(node),
            _ if is_block(node) => {
                let inner = self.render_children(node, ctx);
                let inner = inner.trim();
                if inner.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{}\n\n", inner)
                }
            }
            _ => self.render_children(node, ctx),
        }
    }

    fn render_code_block(&self, pre: &NodeRef) -> String {
        let language = infer_language(&CodeBlock::from_node(pre)).unwrap_or_default();

        let mut code = String::new();
        collect_preformatted(pre, &mut code);
        let code = code.strip_suffix('\n').unwrap_or(&code);

        let fence = fence_for(code, &self.options.code_fence);
        format!("\n\n{}{}\n{}\n{}\n\n", fence, language, code, fence)
    }

    fn render_quote(&self, node: &NodeRef, ctx: Context) -> String {
        let inner = self.render_children(node, ctx);
        let inner = inner.trim_matches(|c: char| c == '\n' || c == ' ');
        if inner.is_empty() {
            return String::new();
        }

        let quoted = inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("\n\n{}\n\n", quoted)
    }

    fn render_list(&self, node: &NodeRef, start: Option<usize>, ctx: Context) -> String {
        let item_ctx = Context {
            list_depth: ctx.list_depth + 1,
        };
        let mut index = start.unwrap_or(1);
        let mut lines: Vec<String> = Vec::new();

        for child in node.children() {
            if child.is_tag("li") {
                let bullet = match start {
                    Some(_) => format!("{}.", index),
                    None => "-".to_string(),
                };
                index += 1;

                let body = self.render_children(&child, item_ctx);
                let body = body.trim_matches(|c: char| c == '\n' || c == ' ');
                lines.push(indent_item(&bullet, body));
            } else {
                // Checkbox lines and other loose content between items
                let rendered = self.render_node(&child, item_ctx);
                let rendered = rendered.trim();
                if !rendered.is_empty() {
                    lines.push(rendered.to_string());
                }
            }
        }

        if lines.is_empty() {
            return String::new();
        }
        let body = lines.join("\n");
        if ctx.list_depth > 0 {
            format!("\n{}\n", body)
        } else {
            format!("\n\n{}\n\n", body)
        }
    }

    fn render_table(&self, table: &NodeRef, ctx: Context) -> String {
        let rows: Vec<Vec<String>> = table
            .find_all(|n| n.is_tag("tr"))
            .into_iter()
            .filter(|tr| tr.closest("table").is_some_and(|t| t.ptr_eq(table)))
            .map(|tr| {
                tr.children()
                    .into_iter()
                    .filter(|cell| cell.is_tag("td") || cell.is_tag("th"))
                    .map(|cell| single_line(&self.render_children(&cell, ctx)).replace('|', r"\|"))
                    .collect()
            })
            .filter(|cells: &Vec<String>| !cells.is_empty())
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }

        let format_row = |cells: &[String]| {
            let padded: Vec<&str> = (0..columns)
                .map(|i| cells.get(i).map_or("", String::as_str))
                .collect();
            format!("| {} |", padded.join(" | "))
        };

        let mut out = vec![format_row(rows[0].as_slice())];
        out.push(format!("|{}", " --- |".repeat(columns)));
        out.extend(rows[1..].iter().map(|row| format_row(row.as_slice())));
        format!("\n\n{}\n\n", out.join("\n"))
    }

    fn render_link(&self, node: &NodeRef, ctx: Context) -> String {
        let inner = self.render_children(node, ctx);
        let Some(href) = node.attr("href").filter(|h| !h.trim().is_empty()) else {
            return inner;
        };

        let (prefix, text, suffix) = chomp(&inner);
        if text.is_empty() {
            return inner;
        }

        let title = node.attr("title").filter(|t| !t.is_empty());
        if title.is_none() && text.replace('\\', "") == href {
            return format!("{}<{}>{}", prefix, href, suffix);
        }

        match title {
            Some(title) => format!(
                "{}[{}]({} \"{}\"){}",
                prefix,
                text,
                href,
                title.replace('"', "\\\""),
                suffix
            ),
            None => format!("{}[{}]({}){}", prefix, text, href, suffix),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_block(node: &NodeRef) -> bool {
    node.tag()
        .is_some_and(|tag| BLOCK_TAGS.contains(&tag.to_ascii_lowercase().as_str()))
}

fn is_blank_text(node: &NodeRef) -> bool {
    node.text()
        .is_some_and(|t| t.chars().all(|c| c.is_ascii_whitespace()))
}

/// Collapse runs of HTML whitespace to a single space
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn escape_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '*' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Join lines with spaces and squeeze whitespace (headings, table cells)
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split leading and trailing whitespace off so markers hug the text
fn chomp(text: &str) -> (&str, &str, &str) {
    let trimmed_start = text.trim_start();
    let prefix = &text[..text.len() - trimmed_start.len()];
    let core = trimmed_start.trim_end();
    let suffix = &trimmed_start[core.len()..];
    (
        if prefix.is_empty() { "" } else { " " },
        core,
        if suffix.is_empty() { "" } else { " " },
    )
}

fn wrap_inline(inner: &str, marker: &str) -> String {
    let (prefix, core, suffix) = chomp(inner);
    if core.is_empty() {
        return inner.to_string();
    }
    format!("{}{}{}{}{}", prefix, marker, core, marker, suffix)
}

fn inline_code(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let longest_run = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let delimiter = "`".repeat(longest_run + 1);
    if longest_run > 0 {
        format!("{} {} {}", delimiter, text, delimiter)
    } else {
        format!("{}{}{}", delimiter, text, delimiter)
    }
}

fn render_image(node: &NodeRef) -> String {
    let Some(src) = node.attr("src").filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let alt = node.attr("alt").unwrap_or_default();
    match node.attr("title").filter(|t| !t.is_empty()) {
        Some(title) => format!("![{}]({} \"{}\")", alt, src, title.replace('"', "\\\"")),
        None => format!("![{}]({})", alt, src),
    }
}

/// Raw text of a code block, with `br` as newlines
fn collect_preformatted(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        match child.kind() {
            NodeKind::Text => out.push_str(&child.text().unwrap_or_default()),
            NodeKind::Element if child.is_tag("br") => out.push('\n'),
            NodeKind::Element => collect_preformatted(&child, out),
            _ => {}
        }
    }
}

/// Lengthen the fence until it does not occur in the code
fn fence_for(code: &str, fence: &str) -> String {
    let fence_char = fence.chars().next().unwrap_or('`');
    let mut fence = fence.to_string();
    while code.contains(&fence) {
        fence.push(fence_char);
    }
    fence
}

/// First line after the bullet, continuation lines indented under it
fn indent_item(bullet: &str, body: &str) -> String {
    if body.is_empty() {
        return bullet.to_string();
    }
    let indent = " ".repeat(bullet.len() + 1);
    body.lines()
        .enumerate()
        .map(|(i, line)| match (i, line.is_empty()) {
            (0, _) => format!("{} {}", bullet, line),
            (_, true) => String::new(),
            (_, false) => format!("{}{}", indent, line),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::postprocess::tidy_markdown;

    fn md(html: &str) -> String {
        tidy_markdown(&MarkdownRenderer::default().render(&Markup::parse(html)))
    }

    #[test]
    fn test_headings_and_paragraphs() {
        assert_eq!(
            md("<h1>Title</h1><p>First  paragraph\nwrapped</p><h3> Sub </h3><p>Second</p>"),
            "# Title\n\nFirst paragraph wrapped\n\n### Sub\n\nSecond\n"
        );
    }

    #[test]
    fn test_inline_formatting() {
        assert_eq!(
            md("<p>a <strong>bold </strong>and <em>it</em> <del>gone</del> <code>x_y</code></p>"),
            "a **bold** and *it* ~~gone~~ `x_y`\n"
        );
    }

    #[test]
    fn test_escapes_emphasis_characters() {
        assert_eq!(md("<p>snake_case *star*</p>"), "snake\\_case \\*star\\*\n");

        let renderer = MarkdownRenderer::new(MarkdownOptions {
            escape_emphasis: false,
            ..Default::default()
        });
        let out = renderer.render(&Markup::parse("<p>snake_case</p>"));
        assert_eq!(out, "snake_case\n");
    }

    #[test]
    fn test_code_block_with_language() {
        let out = md(r#"<pre data-language="rust" class="ne-codeblock"><code>fn main() {
    println!("hi");
}
</code></pre>"#);
        assert_eq!(out, "```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n");
    }

    #[test]
    fn test_code_block_from_nested_class_and_br() {
        let out = md(r#"<pre><code class="language-sh">ls<br>pwd</code></pre>"#);
        assert_eq!(out, "```sh\nls\npwd\n```\n");
    }

    #[test]
    fn test_code_fence_lengthened() {
        let out = md("<pre>```\ninner\n```</pre>");
        assert_eq!(out, "````\n```\ninner\n```\n````\n");
    }

    #[test]
    fn test_unordered_and_nested_lists() {
        let out = md("<ul><li>one</li><li>two<ul><li>deep</li></ul></li></ul>");
        assert_eq!(out, "- one\n- two\n  - deep\n");
    }

    #[test]
    fn test_ordered_list_start() {
        let out = md(r#"<ol start="3"><li><p>c</p></li><li>d</li></ol>"#);
        assert_eq!(out, "3. c\n4. d\n");
    }

    #[test]
    fn test_blockquote_lines() {
        let out = md("<blockquote>[!WARNING]<br>line one<br>line two<br></blockquote>");
        assert_eq!(out, "> [!WARNING]\n> line one\n> line two\n");
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            md(r#"<p>see <a href="https://example.com" title="Ex">the site</a></p>"#),
            "see [the site](https://example.com \"Ex\")\n"
        );
        assert_eq!(
            md(r#"<p><a href="https://example.com">https://example.com</a></p>"#),
            "<https://example.com>\n"
        );
        assert_eq!(
            md(r#"<p><img src="./attachments/Doc_001.png" alt="diagram"></p>"#),
            "![diagram](./attachments/Doc_001.png)\n"
        );
    }

    #[test]
    fn test_table() {
        let out = md(concat!(
            "<table><tbody>",
            "<tr><td><p>Name</p></td><td>Value</td></tr>",
            "<tr><td>a|b</td><td>1</td></tr>",
            "<tr><td>only</td></tr>",
            "</tbody></table>"
        ));
        assert_eq!(
            out,
            "| Name | Value |\n| --- | --- |\n| a\\|b | 1 |\n| only |  |\n"
        );
    }

    #[test]
    fn test_silent_elements_and_whitespace_between_blocks() {
        let out = md("<style>p{}</style>\n  <p>a</p>\n  <!-- c -->\n<p>b</p>");
        assert_eq!(out, "a\n\nb\n");
    }

    #[test]
    fn test_loose_list_content_kept_as_lines() {
        let out = md("<ul>- [x] done\n<li></li>- [ ] open\n<li></li></ul>");
        assert_eq!(out, "- [x] done\n-\n- [ ] open\n-\n");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(MarkdownRenderer::default().render(&Markup::parse("")), "");
        assert_eq!(md("<p> </p><div></div>"), "");
    }
}
