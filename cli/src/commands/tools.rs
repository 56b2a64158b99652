use anyhow::{anyhow, Result};
use std::path::PathBuf;
use crate::utils::{
    config::{load_project_config, CosmogenConfig},
    proxy::{resolve_tool, run_proxy, Tool},
    tool_validator::ToolValidator,
};

/// Forward arguments verbatim to an external tool
pub struct ToolsCommand {
    pub tool: Tool,
    pub args: Vec<String>,
    pub path: PathBuf,
}

impl ToolsCommand {
    pub fn new(tool: Tool, args: Vec<String>) -> Self {
        Self {
            tool,
            args,
            path: PathBuf::from("."),
        }
    }

    /// Run the tool and return its exit code
    pub async fn run(&self) -> Result<i32> {
        let (project_root, config) = load_project_config(&self.path)?;

        if needs_node(self.tool, &config) {
            let results = ToolValidator::new().validate_relayer_tools().await?;
            if results.has_errors() {
                println!("{}", results);
                return Err(anyhow!("Cannot run {}: npx is missing", self.tool.name()));
            }
        }

        let command = resolve_tool(self.tool, &config, &project_root)?;
        run_proxy(&command, &self.args).await
    }
}

/// Whether the tool resolves to its default npx command
fn needs_node(tool: Tool, config: &CosmogenConfig) -> bool {
    tool.uses_node() && !config.tools.contains_key(tool.name())
}
