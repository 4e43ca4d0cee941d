//! Descriptor sources for the declarative resolver.
//!
//! [`maven::PomRepository`] reads the local package cache and falls back to
//! a plain HTTP GET against the remote artifact host.

pub mod maven;
