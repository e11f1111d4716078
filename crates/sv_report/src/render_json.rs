//! JSON rendering of the vote report. Keys keep struct declaration order
//! (serde_json `preserve_order`), so the output reads cover → bodies →
//! totals → consistency → integrity.

use serde_json::Value;

use crate::{ReportError, VotesReport};

/// The report as a JSON value.
pub fn to_json_value(report: &VotesReport) -> Result<Value, ReportError> {
    serde_json::to_value(report).map_err(|e| ReportError::Render(e.to_string()))
}

/// Pretty-printed JSON with a trailing newline.
pub fn render_json(report: &VotesReport) -> Result<String, ReportError> {
    let mut out = serde_json::to_string_pretty(report).map_err(|e| ReportError::Render(e.to_string()))?;
    out.push('\n');
    Ok(out)
}
