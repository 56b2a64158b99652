//! Pass-through execution of external tools

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

use crate::utils::config::CosmogenConfig;
use cosmogen_sdk::IncludeResolver;

/// npm package shipping the relayer binaries
const RELAYER_PACKAGE: &str = "@confio/relayer";

/// Tools reachable through `cosmogen tools`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    IbcSetup,
    IbcRelayer,
    Protoc,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::IbcSetup => "ibc-setup",
            Tool::IbcRelayer => "ibc-relayer",
            Tool::Protoc => "protoc",
        }
    }

    /// Whether the default command runs through node's npx
    pub fn uses_node(&self) -> bool {
        !matches!(self, Tool::Protoc)
    }
}

/// Command line a tool resolves to, before user arguments
pub fn resolve_tool(tool: Tool, config: &CosmogenConfig, project_root: &Path) -> Result<Vec<String>> {
    if let Some(command) = config.tools.get(tool.name()) {
        return Ok(command.clone());
    }

    match tool {
        Tool::IbcSetup | Tool::IbcRelayer => Ok(vec![
            "npx".to_string(),
            "--yes".to_string(),
            "-p".to_string(),
            RELAYER_PACKAGE.to_string(),
            tool.name().to_string(),
        ]),
        Tool::Protoc => protoc_command(config, project_root),
    }
}

/// The compiler with the standard include directory already on its search path
pub fn protoc_command(config: &CosmogenConfig, project_root: &Path) -> Result<Vec<String>> {
    let standard = IncludeResolver::new(&config.proto_dir)
        .with_standard_include(config.standard_include.as_ref().map(|dir| project_root.join(dir)))
        .with_protoc(config.protoc.clone())
        .standard_include_dir()?;

    Ok(vec![
        config.protoc.clone(),
        format!("--proto_path={}", standard.display()),
    ])
}

/// Run `command` followed by `args` with inherited stdio, returning the tool's exit code
pub async fn run_proxy(command: &[String], args: &[String]) -> Result<i32> {
    let (program, base_args) = command
        .split_first()
        .ok_or_else(|| anyhow!("No command provided"))?;

    debug!("Proxying to {} {:?} {:?}", program, base_args, args);

    let status = Command::new(program)
        .args(base_args)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("Failed to execute command: {}", program))?;

    if !status.success() {
        debug!("{} exited with {}", program, status);
    }

    Ok(exit_code(status))
}

/// Exit code to propagate; signals map to `128 + signal` like a shell does
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
