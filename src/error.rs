//! Error taxonomy for dependency resolution.
//!
//! Per-dependency and per-bucket failures (`UnresolvedVersion`,
//! `ArtifactUnavailable`, `SubprocessFailure`) are normally logged and
//! recovered inside a resolver. The others reach the scanner as scan-level
//! failures.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no build descriptor found at {}", path.display())]
    NoDescriptorFound { path: PathBuf },

    #[error("failed to parse descriptor {}: {reason}", path.display())]
    DescriptorParse { path: PathBuf, reason: String },

    #[error("cyclic parent/import chain: {}", chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("unresolved version for {coordinate}: {expression}")]
    UnresolvedVersion { coordinate: String, expression: String },

    #[error("artifact {coordinate} unavailable: {reason}")]
    ArtifactUnavailable { coordinate: String, reason: String },

    #[error("{command} failed for bucket '{bucket}': {reason}")]
    SubprocessFailure {
        bucket: String,
        command: String,
        reason: String,
    },

    #[error("{tool} executable not found\n{guidance}")]
    ToolNotFound { tool: String, guidance: String },

    #[error("no resolver supports {}", path.display())]
    NoResolverFound { path: PathBuf },

    #[error("{ecosystem} resolution failed for every bucket: {}", failures.join("; "))]
    AllBucketsFailed {
        ecosystem: String,
        failures: Vec<String>,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolveError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
