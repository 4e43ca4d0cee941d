mod cli;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, ReportFormat};
use depscope::config::load_config;
use depscope::report;
use depscope::Scanner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "depscope=debug" } else { "depscope=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Resolve project path
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let mut config = load_config(&path, cli.config.as_deref())?;
    if cli.offline {
        config.maven.offline = true;
    }
    if cli.legacy_gradle {
        config.gradle.legacy_parser = true;
    }

    let spinner = if !cli.quiet && cli.report != ReportFormat::Json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?,
        );
        pb.set_message(format!("Resolving {}", path.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let outcome = Scanner::new(&config).scan(&path).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let scan = match outcome {
        Ok(scan) => scan,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    match cli.report {
        ReportFormat::Terminal => report::terminal::render(&scan, cli.verbose, cli.quiet)?,
        ReportFormat::Tree => report::tree::render(&scan, cli.quiet)?,
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&scan)?),
    }

    Ok(())
}
