use std::path::{Path, PathBuf};

use crate::models::Ecosystem;

pub const MAVEN_DESCRIPTORS: &[&str] = &["pom.xml"];
pub const GRADLE_DESCRIPTORS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
];

/// Find a descriptor named in `names`, either `path` itself or a file inside it.
pub fn descriptor_in(path: &Path, names: &[&str]) -> Option<PathBuf> {
    if path.is_file() {
        let file_name = path.file_name()?.to_str()?;
        return names
            .iter()
            .any(|n| *n == file_name)
            .then(|| path.to_path_buf());
    }

    names
        .iter()
        .map(|name| path.join(name))
        .find(|candidate| candidate.is_file())
}

/// Directory a resolver should work in: `path` itself, or the parent of a descriptor file.
pub fn project_root(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        path.to_path_buf()
    }
}

/// Auto-detect supported ecosystems by scanning for known descriptor files.
pub fn detect_ecosystems(path: &Path) -> Vec<Ecosystem> {
    let mut ecosystems = Vec::new();

    if descriptor_in(path, GRADLE_DESCRIPTORS).is_some() {
        ecosystems.push(Ecosystem::Gradle);
    }

    if descriptor_in(path, MAVEN_DESCRIPTORS).is_some() {
        ecosystems.push(Ecosystem::Maven);
    }

    ecosystems
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detects_both() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        std::fs::write(dir.path().join("build.gradle.kts"), "").unwrap();
        assert_eq!(
            detect_ecosystems(dir.path()),
            vec![Ecosystem::Gradle, Ecosystem::Maven]
        );
    }

    #[test]
    fn test_descriptor_file_path() {
        let dir = TempDir::new().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(&pom, "<project/>").unwrap();
        assert_eq!(descriptor_in(&pom, MAVEN_DESCRIPTORS), Some(pom.clone()));
        assert_eq!(descriptor_in(&pom, GRADLE_DESCRIPTORS), None);
        assert_eq!(project_root(&pom), dir.path());
    }

    #[test]
    fn test_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(detect_ecosystems(dir.path()).is_empty());
    }
}
