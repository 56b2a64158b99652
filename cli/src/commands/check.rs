use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use super::Command;
use crate::utils::{
    config::ConfigManager,
    tool_validator::ToolValidator,
    validator::ProjectValidator,
};

/// Report whether a project is ready for code generation
pub struct CheckCommand {
    pub path: PathBuf,
}

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self) -> Result<()> {
        let project_root = ConfigManager::find_project_root(&self.path).unwrap_or_else(|| self.path.clone());
        println!("Checking {}", project_root.display());

        let project = ProjectValidator::new().validate_project_detailed(&project_root)?;

        let mut manager = ConfigManager::new(&project_root);
        let protoc = match manager.load().and_then(|_| manager.get_effective_config()) {
            Ok(config) => config.protoc,
            Err(_) => "protoc".to_string(),
        };
        let tools = ToolValidator::new().validate_tools(&protoc).await?;

        println!("{}", project);
        println!("{}", tools);

        let errors = project.error_count() + tools.error_count();
        if errors > 0 {
            return Err(anyhow!("Found {} problem(s)", errors));
        }

        println!("✓ Ready to generate");
        Ok(())
    }
}
