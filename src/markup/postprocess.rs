//! Whitespace normalization of rendered Markdown.

use crate::constants::markdown::MAX_COLLAPSE_ITERATIONS;

/// Trim trailing whitespace on every line, then collapse runs of three or
/// more newlines to a single blank line.
pub fn tidy_markdown(text: &str) -> String {
    let mut output = text
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    for _ in 0..MAX_COLLAPSE_ITERATIONS {
        if !output.contains("\n\n\n") {
            break;
        }
        output = output.replace("\n\n\n", "\n\n");
    }

    output
}
