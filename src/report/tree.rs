use std::fmt::Write as _;

use anyhow::Result;
use colored::*;

use crate::models::{DependencyNode, ResolutionConfidence};
use crate::scanner::ScanReport;

use super::terminal::confidence_label;

/// Print the resolved forest as an indented tree.
pub fn render(report: &ScanReport, quiet: bool) -> Result<()> {
    if !quiet {
        println!(
            "\n {} ({}, {}, confidence {})\n",
            report.project.display().to_string().bold(),
            report.ecosystem,
            report.resolver,
            confidence_label(report.confidence),
        );
    }

    let mut out = String::new();
    for (i, root) in report.forest.iter().enumerate() {
        write_node(&mut out, root, "", i + 1 == report.forest.len())?;
    }
    print!("{}", out);
    Ok(())
}

fn write_node(out: &mut String, node: &DependencyNode, prefix: &str, last: bool) -> Result<()> {
    let connector = if last { "\\--- " } else { "+--- " };
    let label = if node.coordinate.is_resolved() {
        node.coordinate.to_string().normal()
    } else {
        node.coordinate.to_string().red()
    };
    let marker = match node.confidence {
        ResolutionConfidence::High => String::new(),
        other => format!(" [{}]", other).yellow().to_string(),
    };
    writeln!(out, "{}{}{} ({}){}", prefix, connector, label, node.scope, marker)?;

    let child_prefix = format!("{}{}", prefix, if last { "     " } else { "|    " });
    for (i, child) in node.children.iter().enumerate() {
        write_node(out, child, &child_prefix, i + 1 == node.children.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecosystem, PackageCoordinate, Scope};

    fn node(name: &str, confidence: ResolutionConfidence) -> DependencyNode {
        let coordinate =
            PackageCoordinate::new("g", name, "1", Ecosystem::Gradle, Scope::Runtime, false);
        DependencyNode::new(coordinate, Vec::new(), confidence)
    }

    #[test]
    fn test_tree_layout() {
        colored::control::set_override(false);

        let mut a = node("a", ResolutionConfidence::High);
        let mut b = node("b", ResolutionConfidence::High);
        b.children.push(node("c", ResolutionConfidence::Medium));
        a.children.push(b);
        a.children.push(node("d", ResolutionConfidence::High));

        let mut out = String::new();
        write_node(&mut out, &a, "", false).unwrap();
        write_node(&mut out, &node("e", ResolutionConfidence::High), "", true).unwrap();

        let expected = [
            "+--- g:a:1 (runtime)",
            "|    +--- g:b:1 (runtime)",
            "|    |    \\--- g:c:1 (runtime) [MEDIUM]",
            "|    \\--- g:d:1 (runtime)",
            "\\--- g:e:1 (runtime)",
        ];
        assert_eq!(out.lines().collect::<Vec<_>>(), expected);
    }
}
