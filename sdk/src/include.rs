//! Include path resolution for the proto compiler

use crate::error::{GenerateError, GenerateResult};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the well-known types directory
pub const PROTOC_INCLUDE_ENV: &str = "PROTOC_INCLUDE";

/// Vendored third-party protos, relative to the project root
pub const THIRD_PARTY_PROTO_DIR: &str = "third_party/proto";

/// File every standard include directory must contain
const WELL_KNOWN_MARKER: &str = "google/protobuf/descriptor.proto";

const SYSTEM_INCLUDE_DIRS: &[&str] = &["/usr/local/include", "/usr/include"];

/// Computes the ordered `-I` directories for a project
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    proto_dir: PathBuf,
    extra_dirs: Vec<PathBuf>,
    standard_include: Option<PathBuf>,
    protoc: String,
    system_search: bool,
}

impl IncludeResolver {
    pub fn new<P: Into<PathBuf>>(proto_dir: P) -> Self {
        Self {
            proto_dir: proto_dir.into(),
            extra_dirs: Vec::new(),
            standard_include: None,
            protoc: "protoc".to_string(),
            system_search: true,
        }
    }

    pub fn with_extra_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.extra_dirs = dirs;
        self
    }

    pub fn with_standard_include(mut self, dir: Option<PathBuf>) -> Self {
        self.standard_include = dir;
        self
    }

    pub fn with_protoc<S: Into<String>>(mut self, protoc: S) -> Self {
        self.protoc = protoc.into();
        self
    }

    /// Only consult the explicitly configured standard include directory
    pub fn with_system_search(mut self, enabled: bool) -> Self {
        self.system_search = enabled;
        self
    }

    /// Resolve include directories for `project_root`.
    ///
    /// The project's own proto root always comes first and the standard
    /// include directory last; duplicates keep their first position.
    pub fn resolve<P: AsRef<Path>>(&self, project_root: P) -> GenerateResult<Vec<PathBuf>> {
        let project_root = project_root.as_ref();
        let mut dirs = vec![project_root.join(&self.proto_dir)];

        let third_party = project_root.join(THIRD_PARTY_PROTO_DIR);
        if third_party.is_dir() {
            dirs.push(third_party);
        }

        dirs.extend(self.extra_dirs.iter().map(|d| project_root.join(d)));
        dirs.push(self.standard_include_dir()?);

        let resolved = dedup_preserving_order(dirs);
        debug!("Resolved include paths: {:?}", resolved);
        Ok(resolved)
    }

    /// Locate the directory holding the well-known protobuf types
    pub fn standard_include_dir(&self) -> GenerateResult<PathBuf> {
        let candidates = self.standard_include_candidates();

        candidates
            .iter()
            .find(|dir| dir.join(WELL_KNOWN_MARKER).is_file())
            .map(|dir| std::path::absolute(dir).unwrap_or_else(|_| dir.clone()))
            .ok_or(GenerateError::MissingInclude { searched: candidates })
    }

    fn standard_include_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(dir) = &self.standard_include {
            candidates.push(dir.clone());
        }

        if !self.system_search {
            return candidates;
        }

        if let Some(dir) = env::var_os(PROTOC_INCLUDE_ENV) {
            candidates.push(PathBuf::from(dir));
        }

        // protoc release archives ship `bin/protoc` next to `include/`
        if let Ok(binary) = which::which(&self.protoc) {
            let binary = fs::canonicalize(&binary).unwrap_or(binary);
            if let Some(prefix) = binary.parent().and_then(Path::parent) {
                candidates.push(prefix.join("include"));
            }
        }

        candidates.extend(SYSTEM_INCLUDE_DIRS.iter().map(PathBuf::from));
        candidates
    }
}

/// Drop repeated directories, keeping the first occurrence
pub fn dedup_preserving_order(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    dirs.into_iter()
        .filter(|dir| {
            let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            seen.insert(key)
        })
        .collect()
}
