//! Staged code generation for a whole project
//!
//! A run resolves include paths, discovers proto packages, compiles every
//! package into a private staging directory and finally merges the part of
//! the staged output that belongs to the project back into its source tree.
//! The staging directory is removed on every exit path, and nothing is merged
//! unless every package compiled.

use crate::discovery::{ProtoPackage, discover};
use crate::driver;
use crate::error::{GenerateError, GenerateResult};
use crate::include::IncludeResolver;
use crate::merge::{MergeOutcome, merge, validate_target_mapping};
use crate::protoc::{Compiler, DEFAULT_PROTOC, Protoc, default_output_directives};
use crate::staging::StagingArea;
use derive_builder::Builder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default proto source directory, relative to the project root
pub const DEFAULT_PROTO_DIR: &str = "proto";

/// Inputs of a generation run
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct GenerateOptions {
    /// Project source root; merged output lands here
    pub project_root: PathBuf,
    /// Proto sources, relative to the project root
    #[builder(default = "PathBuf::from(DEFAULT_PROTO_DIR)")]
    pub proto_dir: PathBuf,
    /// Staged subtree that maps onto the project root (usually the Go module path)
    pub target_mapping: PathBuf,
    #[builder(default = "default_output_directives()")]
    pub directives: Vec<String>,
    /// Additional include directories, relative to the project root
    #[builder(default)]
    pub include_dirs: Vec<PathBuf>,
    /// Well-known types directory; relative paths resolve against the project root
    #[builder(default)]
    pub standard_include: Option<PathBuf>,
    #[builder(default = "DEFAULT_PROTOC.to_string()")]
    pub protoc: String,
    /// Look for the well-known types in the environment and system dirs
    #[builder(default = "true")]
    pub system_include_search: bool,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub packages: Vec<ProtoPackage>,
    pub include_paths: Vec<PathBuf>,
    pub outcome: MergeOutcome,
}

impl GenerationReport {
    pub fn files_generated(&self) -> &[PathBuf] {
        self.outcome.files()
    }
}

/// Generation runner
pub struct Codegen {
    options: GenerateOptions,
    compiler: Box<dyn Compiler>,
}

impl Codegen {
    /// Runner that invokes the configured `protoc`
    pub fn new(options: GenerateOptions) -> Self {
        let compiler = Box::new(Protoc::new(options.protoc.clone()));
        Self { options, compiler }
    }

    /// Replace the compiler
    pub fn with_compiler(mut self, compiler: Box<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Include resolver for the project at `root`
    pub fn include_resolver(&self, root: &Path) -> IncludeResolver {
        IncludeResolver::new(self.options.proto_dir.clone())
            .with_extra_dirs(self.options.include_dirs.clone())
            .with_standard_include(self.options.standard_include.as_ref().map(|dir| root.join(dir)))
            .with_protoc(self.options.protoc.clone())
            .with_system_search(self.options.system_include_search)
    }

    /// Run discovery, generation and merge
    pub async fn run(&self, cancel: &CancellationToken) -> GenerateResult<GenerationReport> {
        // The compiler runs inside the staging dir, so every path handed to it must be absolute
        let root = std::path::absolute(&self.options.project_root).map_err(|e| {
            GenerateError::InvalidConfig(format!(
                "cannot resolve project root {}: {}",
                self.options.project_root.display(),
                e
            ))
        })?;
        let root = root.as_path();
        validate_target_mapping(&self.options.target_mapping)?;
        if self.options.directives.is_empty() {
            return Err(GenerateError::InvalidConfig("no output directives configured".to_string()));
        }

        let include_paths = self.include_resolver(root).resolve(root)?;
        let packages = discover(root.join(&self.options.proto_dir))?;
        info!("Found {} proto package(s) in {}", packages.len(), root.display());

        if packages.is_empty() {
            return Ok(GenerationReport {
                packages,
                include_paths,
                outcome: MergeOutcome::Skipped,
            });
        }

        let staging = StagingArea::acquire()?;
        let result = self
            .generate_and_merge(root, &packages, &include_paths, staging.path(), cancel)
            .await;

        // An error from the run wins over a failed cleanup
        let released = staging.release();
        let outcome = match (result, released) {
            (Err(e), released) => {
                if let Err(cleanup) = released {
                    warn!("{}", cleanup);
                }
                return Err(e);
            }
            (Ok(_), Err(cleanup)) => return Err(cleanup),
            (Ok(outcome), Ok(())) => outcome,
        };

        if outcome == MergeOutcome::Skipped {
            warn!(
                "No generated code found under {} for {} package(s)",
                self.options.target_mapping.display(),
                packages.len()
            );
        }

        Ok(GenerationReport {
            packages,
            include_paths,
            outcome,
        })
    }

    async fn generate_and_merge(
        &self,
        root: &Path,
        packages: &[ProtoPackage],
        include_paths: &[PathBuf],
        staging_dir: &Path,
        cancel: &CancellationToken,
    ) -> GenerateResult<MergeOutcome> {
        driver::generate(
            self.compiler.as_ref(),
            packages,
            include_paths,
            &self.options.directives,
            staging_dir,
            cancel,
        )
        .await?;

        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        merge(staging_dir, root, &self.options.target_mapping)
    }
}

/// Blocking wrapper for build scripts
pub fn generate_sync(options: GenerateOptions) -> GenerateResult<GenerationReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(GenerateError::Runtime)?;

    runtime.block_on(Codegen::new(options).run(&CancellationToken::new()))
}
