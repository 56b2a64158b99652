pub mod codegen;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod include;
pub mod merge;
pub mod protoc;
pub mod staging;
pub mod testing;

// Re-export commonly used types for convenience
pub use codegen::{Codegen, GenerateOptions, GenerateOptionsBuilder, GenerationReport, generate_sync};
pub use discovery::{ProtoPackage, discover};
pub use error::{GenerateError, GenerateResult};
pub use include::IncludeResolver;
pub use merge::{MergeOutcome, merge};
pub use protoc::{Compiler, Protoc, ProtocInvocation, default_output_directives};
pub use staging::StagingArea;

// Re-exported so callers can cancel runs without a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
