//! Report renderers for scan results.
//!
//! - [`terminal`] — summary box and coordinate tables; respects `--verbose` / `--quiet`.
//! - [`tree`] — the resolved forest, indented the way Gradle prints it.
//!
//! JSON output is the serialized [`crate::scanner::ScanReport`].

pub mod terminal;
pub mod tree;
