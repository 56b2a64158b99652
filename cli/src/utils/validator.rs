use anyhow::{anyhow, Result};
use std::path::Path;
use crate::utils::config::{ConfigManager, CosmogenConfig, CONFIG_FILE, GO_MOD_FILE};
use cosmogen_sdk::{discover, IncludeResolver};

/// Validation issue severity
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

/// Validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    pub suggestion: Option<String>,
    pub file_path: Option<String>,
}

impl ValidationIssue {
    pub fn error(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            message,
            suggestion: None,
            file_path: None,
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            message,
            suggestion: None,
            file_path: None,
        }
    }

    pub fn info(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Info,
            message,
            suggestion: None,
            file_path: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_file(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity_str = match self.severity {
            ValidationSeverity::Error => "ERROR",
            ValidationSeverity::Warning => "WARNING",
            ValidationSeverity::Info => "INFO",
        };

        write!(f, "[{}] {}", severity_str, self.message)?;

        if let Some(file_path) = &self.file_path {
            write!(f, " (in {})", file_path)?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

/// Validation results
#[derive(Debug)]
pub struct ValidationResults {
    pub issues: Vec<ValidationIssue>,
}

impl Default for ValidationResults {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResults {
    pub fn new() -> Self {
        Self { issues: vec![] }
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == ValidationSeverity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == ValidationSeverity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == ValidationSeverity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == ValidationSeverity::Warning).count()
    }

}

impl std::fmt::Display for ValidationResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "No validation issues found");
        }

        for issue in &self.issues {
            writeln!(f, "{}", issue)?;
        }

        let error_count = self.error_count();
        let warning_count = self.warning_count();

        write!(f, "\nSummary: {} error(s), {} warning(s)", error_count, warning_count)
    }
}

pub struct ProjectValidator;

impl Default for ProjectValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a project and fail when any error was found
    pub fn validate_project(&self, project_path: &Path) -> Result<()> {
        let results = self.validate_project_detailed(project_path)?;

        if !results.issues.is_empty() {
            println!("{}", results);
        }

        if results.has_errors() {
            return Err(anyhow!("Project validation failed with {} error(s)", results.error_count()));
        }

        if results.has_warnings() {
            println!("⚠️  Project validation completed with {} warning(s)", results.warning_count());
        }

        Ok(())
    }

    /// Validate project and return detailed results
    pub fn validate_project_detailed(&self, project_path: &Path) -> Result<ValidationResults> {
        let mut results = ValidationResults::new();

        if !project_path.exists() {
            results.add_issue(ValidationIssue::error(
                format!("Project path does not exist: {}", project_path.display())
            ));
            return Ok(results);
        }

        let Some(config) = self.validate_config(project_path, &mut results) else {
            return Ok(results);
        };

        self.validate_module_path(project_path, &config, &mut results);
        self.validate_proto_sources(project_path, &config, &mut results);
        self.validate_includes(project_path, &config, &mut results);

        Ok(results)
    }

    /// Load the effective configuration, recording problems
    fn validate_config(&self, project_path: &Path, results: &mut ValidationResults) -> Option<CosmogenConfig> {
        let mut config_manager = ConfigManager::new(project_path);

        if let Err(e) = config_manager.load() {
            results.add_issue(
                ValidationIssue::error(format!("Failed to load configuration: {:#}", e))
                    .with_file(CONFIG_FILE.to_string())
            );
            return None;
        }

        if config_manager.get_project_config().is_none() {
            results.add_issue(
                ValidationIssue::info("No cosmogen configuration found, using defaults".to_string())
                    .with_suggestion(format!("Create {} to customize generation settings", CONFIG_FILE))
            );
        }

        match config_manager.get_effective_config() {
            Ok(config) => Some(config),
            Err(e) => {
                results.add_issue(
                    ValidationIssue::error(format!("Invalid configuration: {}", e))
                        .with_file(CONFIG_FILE.to_string())
                );
                None
            }
        }
    }

    fn validate_module_path(&self, project_path: &Path, config: &CosmogenConfig, results: &mut ValidationResults) {
        match config.resolve_module_path(project_path) {
            Ok(module_path) => {
                results.add_issue(ValidationIssue::info(format!("Generated code is merged from {}", module_path)));
            }
            Err(e) => {
                results.add_issue(
                    ValidationIssue::error(format!("Cannot determine module path: {:#}", e))
                        .with_suggestion(format!("Add a {} or set module_path in {}", GO_MOD_FILE, CONFIG_FILE))
                );
            }
        }
    }

    fn validate_proto_sources(&self, project_path: &Path, config: &CosmogenConfig, results: &mut ValidationResults) {
        let proto_root = project_path.join(&config.proto_dir);

        if !proto_root.is_dir() {
            results.add_issue(
                ValidationIssue::warning(format!("Proto directory not found: {}", config.proto_dir))
                    .with_suggestion("Nothing will be generated until proto files are added".to_string())
            );
            return;
        }

        match discover(&proto_root) {
            Ok(packages) if packages.is_empty() => {
                results.add_issue(ValidationIssue::warning(format!("No proto files found in {}", config.proto_dir)));
            }
            Ok(packages) => {
                results.add_issue(ValidationIssue::info(format!("Found {} proto package(s)", packages.len())));
            }
            Err(e) => {
                results.add_issue(ValidationIssue::error(e.to_string()));
            }
        }
    }

    fn validate_includes(&self, project_path: &Path, config: &CosmogenConfig, results: &mut ValidationResults) {
        let resolver = IncludeResolver::new(&config.proto_dir)
            .with_standard_include(config.standard_include.as_ref().map(|dir| project_path.join(dir)))
            .with_protoc(config.protoc.clone());

        if let Err(e) = resolver.standard_include_dir() {
            results.add_issue(
                ValidationIssue::error(e.to_string())
                    .with_suggestion("Set PROTOC_INCLUDE or standard_include to the protoc include/ directory".to_string())
            );
        }
    }
}
