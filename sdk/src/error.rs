//! Error type shared by every stage of a generation run

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by discovery, include resolution, generation and merge
#[derive(Error, Debug)]
pub enum GenerateError {
    /// A proto source could not be read or parsed
    #[error("Failed to discover proto packages at '{}': {message}", .path.display())]
    Discovery {
        path: PathBuf,
        message: String,
    },

    /// No directory holding the well-known protobuf types could be found
    #[error("Standard protobuf include directory not found (searched: {})", display_paths(.searched))]
    MissingInclude {
        searched: Vec<PathBuf>,
    },

    /// Generation options are unusable
    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    /// The compiler process could not be started
    #[error("Failed to run '{command}' for package '{package}': {source}")]
    Spawn {
        package: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler exited unsuccessfully
    #[error("Code generation failed for package '{package}' ({}): {stderr}", display_code(.code))]
    Compiler {
        package: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        stderr: String,
    },

    /// Copying staged output into the project failed
    #[error("Failed to merge generated code at '{}': {source}", .path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The staging directory could not be created or removed
    #[error("Staging directory error: {0}")]
    Staging(#[source] std::io::Error),

    /// The blocking wrapper could not start its runtime
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The run was cancelled before it finished
    #[error("Code generation cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Package the error is attributed to, if any
    pub fn package(&self) -> Option<&str> {
        match self {
            GenerateError::Spawn { package, .. } | GenerateError::Compiler { package, .. } => {
                Some(package)
            }
            _ => None,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type GenerateResult<T> = std::result::Result<T, GenerateError>;
