//! cosmogen CLI library
//!
//! Programmatic access to the commands behind the `cosmogen` binary, plus the
//! project configuration and environment checks they share.

pub mod commands;
pub mod utils;

// Re-export command types for advanced usage
pub use commands::{
    Command,
    check::CheckCommand,
    generate::GenCommand,
    tools::ToolsCommand,
};
pub use utils::config::{ConfigManager, CosmogenConfig};
pub use utils::proxy::Tool;

use anyhow::Result;
use cosmogen_sdk::GenerationReport;
use std::path::Path;

/// Blocking generation for build scripts, reporting through cargo warnings
pub fn generate_code<P: AsRef<Path>>(project_dir: P) -> Result<GenerationReport> {
    let (project_root, config) = utils::config::load_project_config(project_dir)?;
    let options = config.to_generate_options(&project_root)?;

    match cosmogen_sdk::generate_sync(options) {
        Ok(report) => {
            let total_files = report.files_generated().len();
            if total_files > 0 {
                println!("cargo:warning=✅ Code generation completed: {} files generated", total_files);
            }
            Ok(report)
        }
        Err(e) => {
            println!("cargo:warning=❌ Code generation failed: {}", e);
            Err(e.into())
        }
    }
}
