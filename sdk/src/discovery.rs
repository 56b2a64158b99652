//! Proto package discovery
//!
//! Walks a proto source tree and groups `.proto` files by the directory they
//! live in and the `package` they declare. Every file is parsed, so a single
//! malformed file fails the whole scan instead of silently dropping a package.

use crate::error::{GenerateError, GenerateResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A group of proto files sharing one declared package and directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtoPackage {
    /// Declared package name, e.g. `chain.bank.v1`. Empty when undeclared.
    pub name: String,
    /// Directory of the package relative to the discovery root, `/` separated
    pub path: String,
    /// Absolute directory holding the package files
    pub dir: PathBuf,
    /// Source files, sorted
    pub files: Vec<PathBuf>,
}

impl ProtoPackage {
    /// Identity used in logs and errors
    pub fn display_name(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

/// Discover all proto packages below `root`.
///
/// A missing root or a tree without proto files yields an empty list.
pub fn discover<P: AsRef<Path>>(root: P) -> GenerateResult<Vec<ProtoPackage>> {
    let root = root.as_ref();
    if !root.is_dir() {
        debug!("Proto root {} does not exist, nothing to discover", root.display());
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<(String, String), ProtoPackage> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| GenerateError::Discovery {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("proto") {
            continue;
        }

        let name = declared_package(root, path)?;
        let dir = path.parent().unwrap_or(root).to_path_buf();
        let rel_dir = relative_slash_path(root, &dir);

        groups
            .entry((rel_dir.clone(), name.clone()))
            .or_insert_with(|| ProtoPackage {
                name,
                path: rel_dir,
                dir,
                files: Vec::new(),
            })
            .files
            .push(path.to_path_buf());
    }

    let packages: Vec<ProtoPackage> = groups
        .into_values()
        .map(|mut pkg| {
            pkg.files.sort();
            pkg
        })
        .collect();

    debug!("Discovered {} proto package(s) under {}", packages.len(), root.display());
    Ok(packages)
}

/// Parse one file and return its declared package
fn declared_package(root: &Path, path: &Path) -> GenerateResult<String> {
    let source = fs::read_to_string(path).map_err(|e| GenerateError::Discovery {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let name = relative_slash_path(root, path);
    let descriptor = protox_parse::parse(&name, &source).map_err(|e| GenerateError::Discovery {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(descriptor.package().to_string())
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
