use anyhow::{Context, Result};
use std::process::Command;
use crate::utils::validator::{ValidationIssue, ValidationResults};

/// Tool validator for checking external generation dependencies
pub struct ToolValidator;

impl Default for ToolValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the compiler used for generation
    pub async fn validate_tools(&self, protoc: &str) -> Result<ValidationResults> {
        let mut results = ValidationResults::new();
        self.check_protoc_installed(protoc, &mut results).await?;
        Ok(results)
    }

    /// Validate node's npx, which runs the default relayer tools
    pub async fn validate_relayer_tools(&self) -> Result<ValidationResults> {
        let mut results = ValidationResults::new();
        self.check_node_installed(&mut results).await?;
        Ok(results)
    }

    /// Check that the compiler runs and report its version
    async fn check_protoc_installed(&self, protoc: &str, results: &mut ValidationResults) -> Result<()> {
        match self.run_command(&[protoc, "--version"]).await {
            Ok(output) => {
                results.add_issue(ValidationIssue::info(format!("✓ {} is installed", output.trim())));
            }
            Err(_) => {
                results.add_issue(
                    ValidationIssue::error(format!("{} is not installed", protoc))
                        .with_suggestion(self.get_platform_install_suggestions("protoc"))
                );
            }
        }
        Ok(())
    }

    /// Check if npx is available for the relayer tools
    async fn check_node_installed(&self, results: &mut ValidationResults) -> Result<()> {
        match self.run_command(&["npx", "--version"]).await {
            Ok(_) => {
                results.add_issue(ValidationIssue::info("✓ npx is installed".to_string()));
            }
            Err(_) => {
                results.add_issue(
                    ValidationIssue::error("npx is not installed".to_string())
                        .with_suggestion(self.get_platform_install_suggestions("node"))
                );
            }
        }
        Ok(())
    }

    /// Run a command and return its output
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("No command provided"));
        }

        let output = Command::new(args[0])
            .args(&args[1..])
            .output()
            .context(format!("Failed to execute command: {}", args.join(" ")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(anyhow::anyhow!(
                "Command failed: {} - {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            ))
        }
    }

    /// Get platform-specific suggestions for missing tools
    pub fn get_platform_install_suggestions(&self, tool: &str) -> String {
        match tool {
            "protoc" => Self::get_protoc_install_command(),
            "node" => "Install Node.js (which ships npx) from https://nodejs.org/".to_string(),
            _ => format!("Please install {} for your platform", tool),
        }
    }

    #[cfg(target_os = "macos")]
    fn get_protoc_install_command() -> String {
        r#"macOS:
  brew install protobuf"#.to_string()
    }

    #[cfg(target_os = "linux")]
    fn get_protoc_install_command() -> String {
        r#"Linux (Ubuntu/Debian):
  sudo apt-get install protobuf-compiler libprotobuf-dev

Linux (Arch):
  sudo pacman -S protobuf

Or download a release archive from https://github.com/protocolbuffers/protobuf/releases
and set PROTOC_INCLUDE to its include/ directory"#.to_string()
    }

    #[cfg(target_os = "windows")]
    fn get_protoc_install_command() -> String {
        r#"Windows:
  choco install protoc

  # Or with Scoop:
  scoop install protobuf"#.to_string()
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    fn get_protoc_install_command() -> String {
        "Please install protoc from https://github.com/protocolbuffers/protobuf/releases".to_string()
    }
}
