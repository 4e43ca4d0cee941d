//! Build-tool plumbing shared by the Gradle resolvers.
//!
//! - [`runner`] — time-bounded subprocess execution with a scrubbed environment.
//! - [`locator`] — prioritized discovery of the tool executable.

pub mod locator;
pub mod runner;
