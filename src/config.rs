use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::models::Scope;

/// Name of the hidden per-project directory (config and extracted tools).
pub const PROJECT_DIR: &str = ".depscope";

/// Root configuration structure, deserialized from `.depscope/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub maven: MavenSettings,
    pub gradle: GradleSettings,
}

/// Declarative (Maven) resolver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MavenSettings {
    /// Local descriptor cache. Defaults to `~/.m2/repository`.
    pub local_repository: Option<PathBuf>,
    /// Remote artifact host used when a descriptor is not cached locally.
    pub remote_repository: String,
    /// Never go to the network.
    pub offline: bool,
    /// Maximum transitive depth explored below the project.
    pub max_depth: usize,
    pub http_timeout_secs: u64,
}

impl Default for MavenSettings {
    fn default() -> Self {
        Self {
            local_repository: None,
            remote_repository: "https://repo1.maven.org/maven2".to_string(),
            offline: false,
            max_depth: 32,
            http_timeout_secs: 10,
        }
    }
}

impl MavenSettings {
    /// Configured local repository, falling back to `~/.m2/repository`.
    pub fn local_repository(&self) -> Option<PathBuf> {
        self.local_repository
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".m2").join("repository")))
    }
}

/// One independently resolved dependency bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BucketConfig {
    /// Build-tool configuration name, e.g. `runtimeClasspath`.
    pub configuration: String,
    pub scope: Scope,
}

impl BucketConfig {
    pub fn new(configuration: &str, scope: Scope) -> Self {
        Self {
            configuration: configuration.to_string(),
            scope,
        }
    }
}

/// Execution-based (Gradle) resolver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GradleSettings {
    /// Buckets in priority order; the first one wins scope conflicts on merge.
    pub buckets: Vec<BucketConfig>,
    /// Upper bound for one bucket invocation.
    pub timeout_secs: u64,
    /// Upper bound for the `--version` probe of a system installation.
    pub probe_timeout_secs: u64,
    pub parallel_buckets: bool,
    /// System-wide command used by the locator probe and the plain fallback.
    pub system_command: PathBuf,
    /// Distribution shipped with this application, copied into the project
    /// on demand. Defaults to `gradle/` next to the running executable.
    pub bundled_distribution: Option<PathBuf>,
    /// Register the legacy line-parser instead of the execution resolver.
    pub legacy_parser: bool,
}

impl Default for GradleSettings {
    fn default() -> Self {
        Self {
            buckets: vec![
                BucketConfig::new("compileClasspath", Scope::Compile),
                BucketConfig::new("runtimeClasspath", Scope::Runtime),
                BucketConfig::new("testRuntimeClasspath", Scope::Test),
            ],
            timeout_secs: 300,
            probe_timeout_secs: 5,
            parallel_buckets: false,
            system_command: PathBuf::from(if cfg!(windows) { "gradle.bat" } else { "gradle" }),
            bundled_distribution: None,
            legacy_parser: false,
        }
    }
}

impl GradleSettings {
    /// Configured bundled distribution, or `gradle/` beside the executable.
    pub fn bundled_distribution(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.bundled_distribution {
            return Some(dir.clone());
        }
        let exe = std::env::current_exe().ok()?;
        let candidate = exe.parent()?.join("gradle");
        candidate.is_dir().then_some(candidate)
    }

    /// Probe timeout, never more than five seconds.
    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.probe_timeout_secs.clamp(1, 5))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.depscope/config.toml`
/// 3. `~/.config/depscope/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        let content = std::fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }

    let project_dir = if project_path.is_file() {
        project_path.parent().unwrap_or(project_path)
    } else {
        project_path
    };
    let project_config = project_dir.join(PROJECT_DIR).join("config.toml");
    if project_config.exists() {
        let content = std::fs::read_to_string(&project_config)?;
        return Ok(toml::from_str(&content)?);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("depscope").join("config.toml");
        if home_config.exists() {
            let content = std::fs::read_to_string(&home_config)?;
            return Ok(toml::from_str(&content)?);
        }
    }

    Ok(Config::default())
}
