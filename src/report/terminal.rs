use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::models::{PackageCoordinate, ResolutionConfidence};
use crate::scanner::ScanReport;

/// Render a colored terminal report.
pub fn render(report: &ScanReport, verbose: bool, quiet: bool) -> Result<()> {
    let total = report.coordinates.len();
    let direct_count = report.direct_count();
    let transitive_count = total - direct_count;
    let unresolved_count = report.unresolved_count();
    let confidence = confidence_label(report.confidence);

    if quiet {
        println!(
            "Total: {}  Direct: {}  Transitive: {}  Unresolved: {}  Confidence: {}",
            total,
            direct_count.to_string().green(),
            transitive_count,
            unresolved_count.to_string().red(),
            confidence,
        );
        return Ok(());
    }

    println!("\n {} v{}", "depscope".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Scanning: {}\n", report.project.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(
        " │  {:<48} │",
        format!("Resolver           : {} ({})", report.resolver, report.ecosystem)
    );
    println!(" │  {:<48} │", format!("Confidence         : {}", confidence));
    println!(" │  {:<48} │", format!("Total coordinates  : {}", total));
    println!(
        " │  {:<48} │",
        format!(
            "{}  Direct          : {:>4}  {}",
            "●".green(),
            direct_count,
            summarize_scopes(&report.coordinates, true)
        )
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Transitive      : {:>4}  {}",
            "○".cyan(),
            transitive_count,
            summarize_scopes(&report.coordinates, false)
        )
    );
    println!(
        " │  {:<48} │",
        format!("{}  Unresolved      : {:>4}", "?".red(), unresolved_count)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if unresolved_count > 0 {
        println!(" {} Coordinates with placeholder fields:\n", "[UNRESOLVED]".red().bold());
        render_table(report.coordinates.iter().filter(|c| !c.is_resolved()));
        println!();
    }

    if direct_count > 0 {
        println!(" {} Direct dependencies:\n", "[DIRECT]".green().bold());
        render_table(report.coordinates.iter().filter(|c| c.is_direct));
        println!();
    }

    if verbose && transitive_count > 0 {
        println!(" {} Transitive dependencies:\n", "[TRANSITIVE]".cyan().bold());
        render_table(report.coordinates.iter().filter(|c| !c.is_direct));
        println!();
    }

    Ok(())
}

fn render_table<'a>(coordinates: impl Iterator<Item = &'a PackageCoordinate>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Group").add_attribute(Attribute::Bold),
            Cell::new("Artifact").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Scope").add_attribute(Attribute::Bold),
            Cell::new("Direct").add_attribute(Attribute::Bold),
        ]);

    for coordinate in coordinates {
        let version_color = if coordinate.is_resolved() {
            Color::Reset
        } else {
            Color::Red
        };
        let (direct_str, direct_color) = if coordinate.is_direct {
            ("● yes", Color::Green)
        } else {
            ("○ no", Color::DarkGrey)
        };

        table.add_row(vec![
            Cell::new(&coordinate.namespace),
            Cell::new(&coordinate.name),
            Cell::new(&coordinate.version).fg(version_color),
            Cell::new(coordinate.scope.to_string()),
            Cell::new(direct_str)
                .fg(direct_color)
                .set_alignment(CellAlignment::Center),
        ]);
    }

    println!("{}", table);
}

pub(crate) fn confidence_label(confidence: Option<ResolutionConfidence>) -> ColoredString {
    match confidence {
        Some(ResolutionConfidence::High) => "HIGH".green(),
        Some(ResolutionConfidence::Medium) => "MEDIUM".yellow(),
        Some(ResolutionConfidence::Low) => "LOW".red(),
        None => "n/a".dimmed(),
    }
}

/// Top scopes among direct (or transitive) coordinates, e.g. `[compile (4), test (2)]`.
fn summarize_scopes(coordinates: &[PackageCoordinate], direct: bool) -> String {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for coordinate in coordinates.iter().filter(|c| c.is_direct == direct) {
        *counts.entry(coordinate.scope.to_string()).or_insert(0) += 1;
    }

    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(scope, cnt)| format!("{} ({})", scope, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecosystem, Scope};

    fn coord(name: &str, scope: Scope, direct: bool) -> PackageCoordinate {
        PackageCoordinate::new("g", name, "1", Ecosystem::Maven, scope, direct)
    }

    #[test]
    fn test_summarize_scopes() {
        let coordinates = vec![
            coord("a", Scope::Compile, true),
            coord("b", Scope::Test, true),
            coord("c", Scope::Compile, true),
            coord("d", Scope::Runtime, false),
        ];
        assert_eq!(summarize_scopes(&coordinates, true), "[compile (2), test (1)]");
        assert_eq!(summarize_scopes(&coordinates, false), "[runtime (1)]");
        assert_eq!(summarize_scopes(&[], true), "");
    }
}
