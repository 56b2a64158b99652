//! Sequential per-package code generation into the staging directory

use crate::discovery::ProtoPackage;
use crate::error::{GenerateError, GenerateResult};
use crate::protoc::{Compiler, ProtocInvocation};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Compile every package into `staging_dir`, one at a time, in order.
///
/// Stops at the first failure; remaining packages are not attempted.
/// Cancellation is checked before each package starts and is handed to the
/// compiler so a running invocation can be killed.
pub async fn generate(
    compiler: &dyn Compiler,
    packages: &[ProtoPackage],
    include_paths: &[PathBuf],
    directives: &[String],
    staging_dir: &Path,
    cancel: &CancellationToken,
) -> GenerateResult<()> {
    for (idx, package) in packages.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        info!(
            "Generating package {} ({}/{})",
            package.display_name(),
            idx + 1,
            packages.len()
        );

        let invocation = ProtocInvocation {
            package,
            include_paths,
            directives,
            out_dir: staging_dir,
        };
        compiler.compile(&invocation, cancel).await?;
    }

    Ok(())
}
