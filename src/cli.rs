use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "depscope",
    about = "Resolve the complete dependency tree of a Maven or Gradle project",
    version
)]
pub struct Cli {
    /// Project directory or descriptor file to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Config file [default: ./.depscope/config.toml, fallback ~/.config/depscope/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show transitive dependencies too
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,

    /// Resolve Maven descriptors from the local repository only
    #[arg(long)]
    pub offline: bool,

    /// Use the single-pass Gradle line-parser instead of per-bucket execution
    #[arg(long)]
    pub legacy_gradle: bool,

    /// Debug logging on stderr (overridden by RUST_LOG)
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Tree,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["depscope"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.report, ReportFormat::Terminal);
        assert!(!cli.offline && !cli.legacy_gradle);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "depscope",
            "demo/pom.xml",
            "--report",
            "json",
            "--offline",
            "--legacy-gradle",
            "-q",
        ]);
        assert_eq!(cli.path, PathBuf::from("demo/pom.xml"));
        assert_eq!(cli.report, ReportFormat::Json);
        assert!(cli.offline && cli.legacy_gradle && cli.quiet);
    }
}
