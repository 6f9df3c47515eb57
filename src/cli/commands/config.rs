//! Config Command
//!
//! Show where configuration is read from and the merged result.
//!
//! Usage:
//!   lakedown --print-config [--config FILE]

use std::path::Path;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Print config file locations and the effective configuration
pub fn show(explicit: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(explicit)?;

    match ConfigLoader::global_config_path() {
        Some(path) => println!("# Global config:  {}{}", path.display(), found(&path)),
        None => println!("# Global config:  (no config directory on this platform)"),
    }
    let project = ConfigLoader::project_config_path();
    println!("# Project config: {}{}", project.display(), found(&project));
    if let Some(path) = explicit {
        println!("# Explicit:       {}", path.display());
    }
    println!();
    print!("{}", ConfigLoader::render(&config)?);
    Ok(())
}

fn found(path: &Path) -> &'static str {
    if path.exists() { "" } else { " (not found)" }
}
