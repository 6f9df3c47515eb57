use std::path::Path;

use console::style;

/// Styled terminal messages; silent when quiet
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    /// Errors are printed even when quiet
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold());
            println!("{}", "─".repeat(40));
        }
    }

    /// Indented secondary line under the previous message
    pub fn detail(&self, label: &str, path: &Path) {
        if !self.quiet {
            println!("  {} {}", style(label).dim(), path.display());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(false)
    }
}
