//! JSON output formatter

use crate::error::Result;
use crate::format::OutputFormatter;
use crate::session::{LocationReport, NearbyResult};

/// JSON formatter - outputs the full structure as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON response"
    }

    fn format_report(&self, report: &LocationReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    fn format_nearby(&self, result: &NearbyResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}
