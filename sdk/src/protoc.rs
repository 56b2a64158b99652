//! Proto compiler invocation

use crate::discovery::ProtoPackage;
use crate::error::{GenerateError, GenerateResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default compiler command
pub const DEFAULT_PROTOC: &str = "protoc";

/// Output directives used when none are configured: gogoproto messages with
/// gRPC services, plus grpc-gateway handlers.
pub fn default_output_directives() -> Vec<String> {
    vec![
        "--gocosmos_out=plugins=interfacetype+grpc,Mgoogle/protobuf/any.proto=github.com/cosmos/cosmos-sdk/codec/types:.".to_string(),
        "--grpc-gateway_out=logtostderr=true:.".to_string(),
    ]
}

/// Arguments for compiling one package
#[derive(Debug, Clone)]
pub struct ProtocInvocation<'a> {
    pub package: &'a ProtoPackage,
    pub include_paths: &'a [PathBuf],
    pub directives: &'a [String],
    /// Working directory of the compiler; `.` in directives resolves here
    pub out_dir: &'a Path,
}

impl ProtocInvocation<'_> {
    /// Include flags, then output directives, then the package sources
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = include_args(self.include_paths);
        args.extend(self.directives.iter().map(OsString::from));
        args.extend(self.package.files.iter().map(|f| f.as_os_str().to_os_string()));
        args
    }
}

/// `--proto_path` flag per include directory, order preserved
pub fn include_args(include_paths: &[PathBuf]) -> Vec<OsString> {
    include_paths
        .iter()
        .map(|dir| {
            let mut flag = OsString::from("--proto_path=");
            flag.push(dir.as_os_str());
            flag
        })
        .collect()
}

/// Something that turns one proto package into generated files
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Command name, used in error messages
    fn command(&self) -> &str;

    /// Compile one package, returning once the output is fully written.
    /// Must give up with `GenerateError::Cancelled` when `cancel` fires.
    async fn compile(&self, invocation: &ProtocInvocation<'_>, cancel: &CancellationToken) -> GenerateResult<()>;
}

#[async_trait]
impl<C: Compiler + ?Sized> Compiler for Arc<C> {
    fn command(&self) -> &str {
        (**self).command()
    }

    async fn compile(&self, invocation: &ProtocInvocation<'_>, cancel: &CancellationToken) -> GenerateResult<()> {
        (**self).compile(invocation, cancel).await
    }
}

/// The external `protoc` executable
#[derive(Debug, Clone)]
pub struct Protoc {
    command: String,
}

impl Protoc {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self { command: command.into() }
    }
}

impl Default for Protoc {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOC)
    }
}

#[async_trait]
impl Compiler for Protoc {
    fn command(&self) -> &str {
        &self.command
    }

    async fn compile(&self, invocation: &ProtocInvocation<'_>, cancel: &CancellationToken) -> GenerateResult<()> {
        let package = invocation.package.display_name().to_string();
        let args = invocation.args();
        debug!("Running {} {:?}", self.command, args);

        let child = Command::new(&self.command)
            .args(&args)
            .current_dir(invocation.out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GenerateError::Spawn {
                package: package.clone(),
                command: self.command.clone(),
                source,
            })?;

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| GenerateError::Spawn {
                package: package.clone(),
                command: self.command.clone(),
                source,
            })?,
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
        };

        if !output.status.success() {
            return Err(GenerateError::Compiler {
                package,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> ProtoPackage {
        ProtoPackage {
            name: "a.v1".to_string(),
            path: "a/v1".to_string(),
            dir: PathBuf::from("/app/proto/a/v1"),
            files: vec![
                PathBuf::from("/app/proto/a/v1/genesis.proto"),
                PathBuf::from("/app/proto/a/v1/query.proto"),
            ],
        }
    }

    #[test]
    fn test_invocation_args_order() {
        let package = package();
        let includes = vec![PathBuf::from("/app/proto"), PathBuf::from("/usr/include")];
        let directives = vec!["--go_out=.".to_string()];
        let out_dir = PathBuf::from("/tmp/stage");

        let invocation = ProtocInvocation {
            package: &package,
            include_paths: &includes,
            directives: &directives,
            out_dir: &out_dir,
        };

        assert_eq!(
            invocation.args(),
            vec![
                OsString::from("--proto_path=/app/proto"),
                OsString::from("--proto_path=/usr/include"),
                OsString::from("--go_out=."),
                OsString::from("/app/proto/a/v1/genesis.proto"),
                OsString::from("/app/proto/a/v1/query.proto"),
            ]
        );
    }

    #[test]
    fn test_default_directives() {
        let directives = default_output_directives();
        assert_eq!(directives.len(), 2);
        assert!(directives[0].starts_with("--gocosmos_out="));
        assert!(directives[1].starts_with("--grpc-gateway_out="));
    }

    #[tokio::test]
    async fn test_missing_compiler_is_spawn_error() {
        let package = package();
        let out_dir = std::env::temp_dir();
        let invocation = ProtocInvocation {
            package: &package,
            include_paths: &[],
            directives: &[],
            out_dir: &out_dir,
        };

        let protoc = Protoc::new("this-command-should-not-exist-12345");
        let err = protoc.compile(&invocation, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, GenerateError::Spawn { .. }));
        assert_eq!(err.package(), Some("a/v1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_compiler_error() {
        let package = package();
        let out_dir = std::env::temp_dir();
        let invocation = ProtocInvocation {
            package: &package,
            include_paths: &[],
            directives: &[],
            out_dir: &out_dir,
        };

        // `false` ignores its arguments and exits 1
        let err = Protoc::new("false")
            .compile(&invocation, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            GenerateError::Compiler { package, code, .. } => {
                assert_eq!(package, "a/v1");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_running_compiler() {
        let package = ProtoPackage { files: vec![], ..package() };
        let out_dir = std::env::temp_dir();
        let directives = vec!["30".to_string()];
        let invocation = ProtocInvocation {
            package: &package,
            include_paths: &[],
            directives: &directives,
            out_dir: &out_dir,
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        // Runs `sleep 30`
        let started = std::time::Instant::now();
        let err = Protoc::new("sleep").compile(&invocation, &cancel).await.unwrap_err();
        assert!(matches!(err, GenerateError::Cancelled));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
