use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use cosmogen_sdk::{CancellationToken, Codegen, GenerationReport, MergeOutcome};
use std::path::PathBuf;
use tracing::{debug, warn};
use super::Command;
use crate::utils::{config::load_project_config, tool_validator::ToolValidator};

pub struct GenCommand {
    pub path: PathBuf,
    pub module_path: Option<String>,
    pub proto_dir: Option<String>,
    /// Treat "nothing generated for this module" as a failure
    pub require_output: bool,
    pub json: bool,
}

impl GenCommand {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            module_path: None,
            proto_dir: None,
            require_output: false,
            json: false,
        }
    }
}

#[async_trait]
impl Command for GenCommand {
    async fn execute(&self) -> Result<()> {
        let (project_root, mut config) = load_project_config(&self.path)?;
        if let Some(module_path) = &self.module_path {
            config.module_path = Some(module_path.clone());
        }
        if let Some(proto_dir) = &self.proto_dir {
            config.proto_dir = proto_dir.clone();
        }
        config.validate()?;

        let tools = ToolValidator::new().validate_tools(&config.protoc).await?;
        if tools.has_errors() {
            println!("{}", tools);
            return Err(anyhow!("Required tools are missing"));
        }

        let options = config.to_generate_options(&project_root)?;
        debug!("Generation options: {:?}", options);

        println!("Generating code for {}", project_root.display());

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping code generation");
                interrupt.cancel();
            }
        });

        let result = Codegen::new(options).run(&cancel).await;
        signal_task.abort();
        let report = result.context("Code generation failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_summary(&report);
        }

        if self.require_output && report.outcome == MergeOutcome::Skipped && !report.packages.is_empty() {
            return Err(anyhow!(
                "No code was generated for module {}",
                config.resolve_module_path(&project_root)?
            ));
        }

        Ok(())
    }
}

fn print_summary(report: &GenerationReport) {
    if report.packages.is_empty() {
        println!("No proto packages found, nothing to generate");
        return;
    }

    for package in &report.packages {
        println!("  • {} ({} file(s))", package.display_name(), package.files.len());
    }

    match &report.outcome {
        MergeOutcome::Skipped => println!("✓ Generation finished, no files belong to this module"),
        MergeOutcome::Merged { files } => {
            println!("✓ Generated {} file(s)", files.len());
        }
    }
}
