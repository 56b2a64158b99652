use anyhow::Result;
use clap::{Parser, Subcommand};
use cosmogen_cli::{CheckCommand, Command, GenCommand, Tool, ToolsCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cosmogen")]
#[command(about = "Generate code from a project's protobuf packages")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every proto package and merge the generated code into the project
    Generate {
        /// Path inside the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Module path the generated code is merged from (default: go.mod module)
        #[arg(long)]
        module: Option<String>,
        /// Proto source directory, relative to the project root
        #[arg(long)]
        proto_dir: Option<String>,
        /// Fail when nothing was generated for the module
        #[arg(long)]
        require_output: bool,
        /// Print the generation report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the project and its tools are ready for generation
    Check {
        /// Path inside the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Tools for advanced users
    Tools {
        #[command(subcommand)]
        tool: ToolsCommands,
    },
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// Collection of commands to quickly setup a relayer
    #[command(name = "ibc-setup", after_help = "Example: cosmogen tools ibc-setup -- init --src relayer_test_1 --dest relayer_test_2")]
    IbcSetup {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Typescript implementation of an IBC relayer
    #[command(name = "ibc-relayer", after_help = "Example: cosmogen tools ibc-relayer -- -h")]
    IbcRelayer {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Execute the protoc command
    #[command(
        long_about = "The protoc command. You don't need to setup the global protoc include folder with -I, it's automatically handled",
        after_help = "Example: cosmogen tools protoc -- --version"
    )]
    Protoc {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Initialize logging based on the verbose flag
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command: Box<dyn Command> = match cli.command {
        Commands::Generate { path, module, proto_dir, require_output, json } => Box::new(GenCommand {
            module_path: module,
            proto_dir,
            require_output,
            json,
            ..GenCommand::new(path)
        }),
        Commands::Check { path } => Box::new(CheckCommand { path }),
        Commands::Tools { tool } => {
            let (tool, args) = match tool {
                ToolsCommands::IbcSetup { args } => (Tool::IbcSetup, args),
                ToolsCommands::IbcRelayer { args } => (Tool::IbcRelayer, args),
                ToolsCommands::Protoc { args } => (Tool::Protoc, args),
            };

            // The proxied tool's exit code becomes ours
            let code = ToolsCommand::new(tool, args).run().await?;
            std::process::exit(code);
        }
    };

    command.execute().await
}
