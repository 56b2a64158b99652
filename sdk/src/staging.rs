//! Run-scoped staging directory for compiler output

use crate::error::{GenerateError, GenerateResult};
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

const STAGING_PREFIX: &str = "cosmogen-";

/// Uniquely named temporary directory owned by a single generation run.
///
/// `release` removes the directory and reports failures. Dropping the handle
/// without releasing it (early return, cancellation, panic) removes it too,
/// so compiler output never outlives the run.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
}

impl StagingArea {
    /// Create a new, empty staging directory
    pub fn acquire() -> GenerateResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(GenerateError::Staging)?;

        debug!("Acquired staging directory {}", dir.path().display());
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => unreachable!("staging directory used after release"),
        }
    }

    /// Recursively delete the staging directory
    pub fn release(mut self) -> GenerateResult<()> {
        match self.dir.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(GenerateError::Staging)?;
                debug!("Released staging directory {}", path.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove staging directory {}: {}", path.display(), e);
            }
        }
    }
}
