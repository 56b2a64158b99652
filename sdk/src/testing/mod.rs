//! Test doubles for code generation runs
//!
//! [`RecordingCompiler`] stands in for `protoc`: it records which packages it
//! was asked to compile, writes canned output files into the staging
//! directory, and can be told to fail on a chosen package.
//!
//! ```rust
//! use cosmogen_sdk::testing::RecordingCompiler;
//!
//! let compiler = RecordingCompiler::new()
//!     .emit("a/v1", "github.com/acme/chain/x/a/types/a.pb.go", "package types")
//!     .fail_on("b/v1");
//! ```

use crate::error::{GenerateError, GenerateResult};
use crate::protoc::{Compiler, ProtocInvocation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Fake compiler that records every invocation
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    calls: Mutex<Vec<(String, PathBuf)>>,
    outputs: HashMap<String, Vec<(PathBuf, String)>>,
    fail_on: Option<String>,
    cancel_after: Option<(String, CancellationToken)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `contents` to `rel_path` under the output dir when `package` compiles
    pub fn emit<P: Into<PathBuf>>(mut self, package: &str, rel_path: P, contents: &str) -> Self {
        self.outputs
            .entry(package.to_string())
            .or_default()
            .push((rel_path.into(), contents.to_string()));
        self
    }

    /// Exit unsuccessfully for `package`, after writing its output
    pub fn fail_on(mut self, package: &str) -> Self {
        self.fail_on = Some(package.to_string());
        self
    }

    /// Cancel `token` once `package` has compiled
    pub fn cancel_after(mut self, package: &str, token: CancellationToken) -> Self {
        self.cancel_after = Some((package.to_string(), token));
        self
    }

    /// Packages compiled so far, in invocation order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(package, _)| package.clone()).collect())
            .unwrap_or_default()
    }

    /// Output directories handed to each invocation
    pub fn out_dirs(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, dir)| dir.clone()).collect())
            .unwrap_or_default()
    }

    /// Highest number of overlapping invocations seen
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for RecordingCompiler {
    fn command(&self) -> &str {
        "recording-compiler"
    }

    async fn compile(&self, invocation: &ProtocInvocation<'_>, cancel: &CancellationToken) -> GenerateResult<()> {
        let package = invocation.package.display_name().to_string();
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Ok(mut calls) = self.calls.lock() {
            calls.push((package.clone(), invocation.out_dir.to_path_buf()));
        }

        // Give an overlapping caller the chance to show up
        tokio::task::yield_now().await;

        let result = self.write_outputs(&package, invocation);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result?;

        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        if self.fail_on.as_deref() == Some(package.as_str()) {
            return Err(GenerateError::Compiler {
                package,
                code: Some(1),
                stderr: "recording-compiler: induced failure".to_string(),
            });
        }

        if let Some((after, token)) = &self.cancel_after {
            if after == &package {
                token.cancel();
            }
        }

        Ok(())
    }
}

impl RecordingCompiler {
    fn write_outputs(&self, package: &str, invocation: &ProtocInvocation<'_>) -> GenerateResult<()> {
        let Some(outputs) = self.outputs.get(package) else {
            return Ok(());
        };

        for (rel_path, contents) in outputs {
            let path = invocation.out_dir.join(rel_path);
            let write = |path: &PathBuf| -> std::io::Result<()> {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, contents)
            };
            write(&path).map_err(|source| GenerateError::Spawn {
                package: package.to_string(),
                command: self.command().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
