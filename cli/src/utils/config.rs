use anyhow::{anyhow, Context, Result};
use cosmogen_sdk::{default_output_directives, GenerateOptions, GenerateOptionsBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILE: &str = "cosmogen.yaml";
pub const GO_MOD_FILE: &str = "go.mod";

/// Main configuration structure for cosmogen projects
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CosmogenConfig {
    /// Proto sources, relative to the project root
    pub proto_dir: String,
    /// Go module path; read from go.mod when unset
    pub module_path: Option<String>,
    /// Compiler command
    pub protoc: String,
    /// Extra include directories
    pub include_dirs: Vec<String>,
    /// Directory holding google/protobuf/*.proto
    pub standard_include: Option<String>,
    pub output_directives: Vec<String>,
    /// Proxy tool name -> command line
    pub tools: BTreeMap<String, Vec<String>>,
}

/// Configuration manager that handles loading project configurations
pub struct ConfigManager {
    project_config: Option<CosmogenConfig>,
    project_path: PathBuf,
}

impl Default for CosmogenConfig {
    fn default() -> Self {
        Self {
            proto_dir: "proto".to_string(),
            module_path: None,
            protoc: "protoc".to_string(),
            include_dirs: vec![],
            standard_include: None,
            output_directives: default_output_directives(),
            tools: BTreeMap::new(),
        }
    }
}

impl CosmogenConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref().join(CONFIG_FILE);

        if !config_path.exists() {
            return Err(anyhow!(
                "Configuration file not found at: {}",
                config_path.display()
            ));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CosmogenConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref().join(CONFIG_FILE);

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.proto_dir.is_empty() {
            return Err(anyhow!("Proto directory cannot be empty"));
        }

        if self.protoc.is_empty() {
            return Err(anyhow!("Compiler command cannot be empty"));
        }

        if self.output_directives.is_empty() {
            return Err(anyhow!("At least one output directive is required"));
        }

        if let Some(module_path) = &self.module_path {
            validate_module_path(module_path)?;
        }

        for (name, command) in &self.tools {
            if command.is_empty() {
                return Err(anyhow!("Tool '{}' has an empty command", name));
            }
        }

        Ok(())
    }

    /// Module path from the config, falling back to go.mod
    pub fn resolve_module_path<P: AsRef<Path>>(&self, project_root: P) -> Result<String> {
        if let Some(module_path) = &self.module_path {
            return Ok(module_path.clone());
        }

        let go_mod = project_root.as_ref().join(GO_MOD_FILE);
        let content = fs::read_to_string(&go_mod)
            .with_context(|| format!("Failed to read {} (set module_path in {} instead)", go_mod.display(), CONFIG_FILE))?;

        let module_path = parse_go_module(&content)
            .ok_or_else(|| anyhow!("No module directive found in {}", go_mod.display()))?;
        validate_module_path(&module_path)?;
        Ok(module_path)
    }

    /// Build generation options for a project rooted at `project_root`
    pub fn to_generate_options<P: AsRef<Path>>(&self, project_root: P) -> Result<GenerateOptions> {
        let project_root = project_root.as_ref();
        let module_path = self.resolve_module_path(project_root)?;

        GenerateOptionsBuilder::default()
            .project_root(project_root.to_path_buf())
            .proto_dir(PathBuf::from(&self.proto_dir))
            .target_mapping(PathBuf::from(module_path))
            .directives(self.output_directives.clone())
            .include_dirs(self.include_dirs.iter().map(PathBuf::from).collect::<Vec<_>>())
            .standard_include(self.standard_include.as_ref().map(|dir| project_root.join(dir)))
            .protoc(self.protoc.clone())
            .build()
            .context("Failed to build generation options")
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(protoc) = lookup("COSMOGEN_PROTOC") {
            self.protoc = protoc;
        }

        if let Some(proto_dir) = lookup("COSMOGEN_PROTO_DIR") {
            self.proto_dir = proto_dir;
        }

        if let Some(module_path) = lookup("COSMOGEN_MODULE_PATH") {
            self.module_path = Some(module_path);
        }
    }
}

/// Extract the module path from go.mod contents
pub fn parse_go_module(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

fn validate_module_path(module_path: &str) -> Result<()> {
    let path = Path::new(module_path);
    if module_path.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(anyhow!(
            "Module path must be a relative path without '..': {}",
            module_path
        ));
    }
    Ok(())
}

impl ConfigManager {
    /// Create a new configuration manager for a project
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_config: None,
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Load project configuration
    pub fn load(&mut self) -> Result<()> {
        if self.project_path.join(CONFIG_FILE).exists() {
            self.project_config = Some(CosmogenConfig::load_from_path(&self.project_path)?);
        }

        Ok(())
    }

    /// Get the effective configuration with environment variable overrides
    pub fn get_effective_config(&self) -> Result<CosmogenConfig> {
        let mut config = self.project_config.clone().unwrap_or_default();
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Get the project configuration
    pub fn get_project_config(&self) -> Option<&CosmogenConfig> {
        self.project_config.as_ref()
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Check if we're in a cosmogen project directory
    pub fn is_cosmogen_project(&self) -> bool {
        self.project_path.join(CONFIG_FILE).exists() || self.project_path.join(GO_MOD_FILE).exists()
    }

    /// Find the project root by looking for cosmogen.yaml or go.mod
    pub fn find_project_root<P: AsRef<Path>>(start_path: P) -> Option<PathBuf> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(CONFIG_FILE).exists() || current.join(GO_MOD_FILE).exists() {
                return Some(current);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }
}

/// Locate the project containing `start` and load its effective configuration
pub fn load_project_config<P: AsRef<Path>>(start: P) -> Result<(PathBuf, CosmogenConfig)> {
    let start = std::path::absolute(start.as_ref())
        .with_context(|| format!("Failed to resolve {}", start.as_ref().display()))?;
    let root = ConfigManager::find_project_root(&start).unwrap_or_else(|| start.clone());

    let mut manager = ConfigManager::new(&root);
    manager.load()?;
    let config = manager.get_effective_config()?;

    Ok((root, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_config() -> CosmogenConfig {
        CosmogenConfig {
            proto_dir: "proto".to_string(),
            module_path: Some("github.com/acme/chain".to_string()),
            protoc: "/opt/protoc/bin/protoc".to_string(),
            include_dirs: vec!["third_party/cosmos".to_string()],
            standard_include: None,
            output_directives: vec!["--gocosmos_out=plugins=grpc:.".to_string()],
            tools: BTreeMap::from([(
                "ibc-setup".to_string(),
                vec!["ibc-setup".to_string()],
            )]),
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();
        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let deserialized: CosmogenConfig = serde_yaml::from_str(&yaml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CosmogenConfig = serde_yaml::from_str("module_path: github.com/acme/chain\n").unwrap();

        assert_eq!(config.proto_dir, "proto");
        assert_eq!(config.protoc, "protoc");
        assert_eq!(config.output_directives, default_output_directives());
        assert_eq!(config.module_path.as_deref(), Some("github.com/acme/chain"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        assert!(config.validate().is_ok());

        config.proto_dir = "".to_string();
        assert!(config.validate().is_err());

        config = create_test_config();
        config.protoc = "".to_string();
        assert!(config.validate().is_err());

        config = create_test_config();
        config.output_directives.clear();
        assert!(config.validate().is_err());

        config = create_test_config();
        config.module_path = Some("../escape".to_string());
        assert!(config.validate().is_err());

        config = create_test_config();
        config.tools.insert("broken".to_string(), vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_go_module() {
        assert_eq!(
            parse_go_module("module github.com/acme/chain\n\ngo 1.21\n").as_deref(),
            Some("github.com/acme/chain")
        );
        assert_eq!(
            parse_go_module("// header\nmodule \"example.com/quoted\" // trailing\n").as_deref(),
            Some("example.com/quoted")
        );
        assert_eq!(parse_go_module("go 1.21\n"), None);
        assert_eq!(parse_go_module("modulex foo\n"), None);
    }

    #[test]
    fn test_resolve_module_path_from_go_mod() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(GO_MOD_FILE), "module github.com/acme/chain\n").unwrap();

        let config = CosmogenConfig::default();
        assert_eq!(
            config.resolve_module_path(temp_dir.path()).unwrap(),
            "github.com/acme/chain"
        );
    }

    #[test]
    fn test_resolve_module_path_prefers_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(GO_MOD_FILE), "module github.com/acme/chain\n").unwrap();

        let config = CosmogenConfig {
            module_path: Some("github.com/acme/override".to_string()),
            ..CosmogenConfig::default()
        };
        assert_eq!(
            config.resolve_module_path(temp_dir.path()).unwrap(),
            "github.com/acme/override"
        );
    }

    #[test]
    fn test_resolve_module_path_without_go_mod() {
        let temp_dir = TempDir::new().unwrap();
        let result = CosmogenConfig::default().resolve_module_path(temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_to_generate_options() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config();

        let options = config.to_generate_options(temp_dir.path()).unwrap();
        assert_eq!(options.project_root, temp_dir.path());
        assert_eq!(options.proto_dir, PathBuf::from("proto"));
        assert_eq!(options.target_mapping, PathBuf::from("github.com/acme/chain"));
        assert_eq!(options.protoc, "/opt/protoc/bin/protoc");
        assert_eq!(options.include_dirs, vec![PathBuf::from("third_party/cosmos")]);
        assert_eq!(options.directives, config.output_directives);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config();

        assert!(config.save_to_path(temp_dir.path()).is_ok());

        let loaded_config = CosmogenConfig::load_from_path(temp_dir.path()).unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = CosmogenConfig::load_from_path(temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_config_manager() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config();
        config.save_to_path(temp_dir.path()).unwrap();

        let mut manager = ConfigManager::new(temp_dir.path());
        assert!(manager.load().is_ok());
        assert_eq!(manager.get_project_config(), Some(&config));
    }

    #[test]
    fn test_config_manager_without_file() {
        let temp_dir = TempDir::new().unwrap();

        let mut manager = ConfigManager::new(temp_dir.path());
        assert!(manager.load().is_ok());
        assert!(manager.get_project_config().is_none());
    }

    #[test]
    fn test_find_project_root() {
        let temp_dir = TempDir::new().unwrap();
        let project_dir = temp_dir.path().join("chain");
        let nested_dir = project_dir.join("x").join("bank").join("keeper");

        fs::create_dir_all(&nested_dir).unwrap();
        fs::write(project_dir.join(GO_MOD_FILE), "module github.com/acme/chain\n").unwrap();

        let found_root = ConfigManager::find_project_root(&nested_dir);
        assert_eq!(found_root, Some(project_dir));
    }

    #[test]
    fn test_is_cosmogen_project() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());

        assert!(!manager.is_cosmogen_project());

        fs::write(temp_dir.path().join(CONFIG_FILE), "proto_dir: proto\n").unwrap();
        assert!(manager.is_cosmogen_project());
    }

    #[test]
    fn test_load_project_config_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let project_dir = temp_dir.path().join("chain");
        fs::create_dir_all(project_dir.join("x/bank")).unwrap();
        fs::write(project_dir.join(CONFIG_FILE), "proto_dir: api/proto\n").unwrap();

        let (root, config) = load_project_config(project_dir.join("x/bank")).unwrap();
        assert_eq!(root, project_dir);
        assert_eq!(config.proto_dir, "api/proto");
    }

    #[test]
    fn test_load_project_config_resolves_relative_start() {
        let (root, _) = load_project_config(".").unwrap();

        assert!(root.is_absolute(), "{} is relative", root.display());
        assert!(std::env::current_dir().unwrap().starts_with(&root));
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = create_test_config();
        let vars = HashMap::from([
            ("COSMOGEN_PROTOC", "/usr/bin/protoc"),
            ("COSMOGEN_MODULE_PATH", "github.com/acme/other"),
        ]);

        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.protoc, "/usr/bin/protoc");
        assert_eq!(config.module_path.as_deref(), Some("github.com/acme/other"));
        assert_eq!(config.proto_dir, "proto");
    }
}
