//! `depscope` — resolve the full dependency tree of a Maven or Gradle project.
//!
//! # Flow
//! 1. Detect descriptors ([`detector`]).
//! 2. Pick the highest-priority adapter ([`resolver::ResolverRegistry`]).
//! 3. Resolve a forest of [`models::DependencyNode`]s, either declaratively
//!    from `pom.xml` ([`resolver::maven`]) or by running the build tool
//!    ([`resolver::gradle`], [`tool`]).
//! 4. Flatten into deduplicated [`models::PackageCoordinate`]s ([`scanner`]).

pub mod config;
pub mod detector;
pub mod error;
pub mod models;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod tool;

pub use error::{ResolveError, Result};
pub use scanner::{flatten, ScanReport, Scanner};
