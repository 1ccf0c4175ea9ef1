//! Human-readable text output formatter

use crate::branch::{BranchMatch, InventorySummary};
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::session::{LocationReport, NearbyResult};

/// Text formatter - outputs human-readable summary
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format_report(&self, report: &LocationReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("{}\n", report.display));
        output.push_str(&format!("Source: {}\n", report.location.source));
        if let Some(coords) = report.location.coords {
            output.push_str(&format!("Coordinates: {}\n", coords));
        }
        if let Some(message) = &report.gps_message {
            output.push_str(&format!("GPS: {}\n", message));
        }
        output.push('\n');

        let scope = match &report.region {
            Some(region) => format!("in {}", region),
            None => format!("within {}km", report.radius_km),
        };
        push_branches(&mut output, &scope, &report.branches);
        push_summary(&mut output, &report.summary);
        output.push_str(&format!(
            "\nLast updated: {}\n",
            report.synced_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        Ok(output)
    }

    fn format_nearby(&self, result: &NearbyResult) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("Center: {}\n\n", result.center));
        push_branches(&mut output, &format!("within {}km", result.radius_km), &result.branches);
        push_summary(&mut output, &result.summary);

        Ok(output)
    }
}

fn push_branches(output: &mut String, scope: &str, branches: &[BranchMatch]) {
    if branches.is_empty() {
        output.push_str(&format!("No branches {}\n", scope));
        return;
    }

    output.push_str(&format!("Branches {}:\n", scope));
    for m in branches {
        let distance = match m.distance_km {
            Some(km) => format!("{:>6.2}km", km),
            None => format!("{:>8}", "-"),
        };
        output.push_str(&format!(
            "  {}  {} [{}] {}  {}\n",
            distance,
            m.branch.name,
            m.branch.classification.korean_label(),
            m.branch.phone_number,
            m.branch.address
        ));
    }
}

fn push_summary(output: &mut String, summary: &InventorySummary) {
    output.push_str(&format!(
        "\nSummary: {} branches, {} items, {} total quantity\n",
        summary.total_branches, summary.total_items, summary.total_quantity
    ));
}
