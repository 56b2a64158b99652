//! Merge staged compiler output into the project tree

use crate::error::{GenerateError, GenerateResult};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// What a merge did to the project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Nothing was generated under the target mapping
    Skipped,
    /// Files written, relative to the project root
    Merged { files: Vec<PathBuf> },
}

impl MergeOutcome {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            MergeOutcome::Skipped => &[],
            MergeOutcome::Merged { files } => files,
        }
    }
}

/// Reject mappings that would escape the staging directory
pub fn validate_target_mapping(target_mapping: &Path) -> GenerateResult<()> {
    if target_mapping.as_os_str().is_empty() {
        return Err(GenerateError::InvalidConfig("target mapping cannot be empty".to_string()));
    }

    let escapes = target_mapping
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(GenerateError::InvalidConfig(format!(
            "target mapping must be a relative path without '..': {}",
            target_mapping.display()
        )));
    }

    Ok(())
}

/// Copy `staging_dir/target_mapping` into `project_root`.
///
/// A missing subtree is not an error and leaves the project untouched.
/// Colliding files in the project are overwritten. Symlinks in the staged
/// tree are followed and their targets copied.
pub fn merge(staging_dir: &Path, project_root: &Path, target_mapping: &Path) -> GenerateResult<MergeOutcome> {
    validate_target_mapping(target_mapping)?;
    let generated = staging_dir.join(target_mapping);

    match fs::metadata(&generated) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(GenerateError::InvalidConfig(format!(
                "generated path {} is not a directory",
                generated.display()
            )));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No generated code under {}", generated.display());
            return Ok(MergeOutcome::Skipped);
        }
        Err(source) => return Err(GenerateError::Merge { path: generated, source }),
    }

    let files = copy_tree(&generated, project_root)?;
    info!("Merged {} generated file(s) into {}", files.len(), project_root.display());
    Ok(MergeOutcome::Merged { files })
}

fn copy_tree(src: &Path, dst: &Path) -> GenerateResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(src).min_depth(1).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| GenerateError::Merge {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf()),
            source: e.into_io_error().unwrap_or_else(|| std::io::Error::other("directory walk failed")),
        })?;

        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path()).to_path_buf();
        let target = dst.join(&rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|source| GenerateError::Merge {
                path: target.clone(),
                source,
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| GenerateError::Merge {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(entry.path(), &target).map_err(|source| GenerateError::Merge {
            path: target.clone(),
            source,
        })?;
        files.push(rel);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_absent_subtree_is_skipped() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&staging.path().join("other/module/x.pb.go"), "package x");
        write(&project.path().join("go.mod"), "module example.com/app");

        let outcome = merge(staging.path(), project.path(), Path::new("example.com/app")).unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);

        let entries: Vec<_> = fs::read_dir(project.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_copies_subtree_byte_identical() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let mapping = Path::new("example.com/app");
        write(&staging.path().join("example.com/app/x/bank/types/tx.pb.go"), "package types // tx");
        write(&staging.path().join("example.com/app/x/bank/types/query.pb.gw.go"), "package types // gw");
        write(&staging.path().join("github.com/other/dep.pb.go"), "package dep");

        let outcome = merge(staging.path(), project.path(), mapping).unwrap();
        assert_eq!(
            outcome.files(),
            &[
                PathBuf::from("x/bank/types/query.pb.gw.go"),
                PathBuf::from("x/bank/types/tx.pb.go"),
            ]
        );

        assert_eq!(
            fs::read(project.path().join("x/bank/types/tx.pb.go")).unwrap(),
            fs::read(staging.path().join("example.com/app/x/bank/types/tx.pb.go")).unwrap()
        );
        assert!(!project.path().join("github.com").exists());
    }

    #[test]
    fn test_overwrites_colliding_files() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&staging.path().join("out/a/v1/types.gen"), "fresh");
        write(&project.path().join("a/v1/types.gen"), "stale output that is longer");
        write(&project.path().join("a/v1/keeper.go"), "handwritten");

        merge(staging.path(), project.path(), Path::new("out")).unwrap();

        assert_eq!(fs::read_to_string(project.path().join("a/v1/types.gen")).unwrap(), "fresh");
        assert_eq!(fs::read_to_string(project.path().join("a/v1/keeper.go")).unwrap(), "handwritten");
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinked_directories() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&staging.path().join("shared/types.gen"), "shared");
        fs::create_dir_all(staging.path().join("out/a")).unwrap();
        std::os::unix::fs::symlink(staging.path().join("shared"), staging.path().join("out/a/v1")).unwrap();

        let outcome = merge(staging.path(), project.path(), Path::new("out")).unwrap();

        assert_eq!(outcome.files(), &[PathBuf::from("a/v1/types.gen")]);
        assert!(project.path().join("a/v1").is_dir());
        assert_eq!(fs::read_to_string(project.path().join("a/v1/types.gen")).unwrap(), "shared");
    }

    #[test]
    fn test_rejects_escaping_mapping() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        for mapping in ["../outside", "/abs/path", ""] {
            let err = merge(staging.path(), project.path(), Path::new(mapping)).unwrap_err();
            assert!(matches!(err, GenerateError::InvalidConfig(_)), "mapping {:?}", mapping);
        }
    }

    #[test]
    fn test_mapping_pointing_at_file_is_error() {
        let staging = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&staging.path().join("out"), "not a dir");

        let err = merge(staging.path(), project.path(), Path::new("out")).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidConfig(_)));
    }
}
