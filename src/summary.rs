//! Human-readable run summary for the most recent result of an input.

use std::fmt::Write as _;

use serde_json::Value;

use crate::pipeline::types::Intent;
use crate::store::ResultLogEntry;

/// Printed when the log holds nothing for the requested input.
pub const NO_SUMMARY: &str = "No summary found for this input.";

/// Render a log entry as a multi-line summary.
pub fn render_summary(entry: Option<&ResultLogEntry>) -> String {
    let Some(entry) = entry else {
        return NO_SUMMARY.to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "=== Run Summary ===");
    let _ = writeln!(out, "Timestamp: {}", entry.timestamp.to_rfc3339());
    let _ = writeln!(out, "Agent: {}", entry.agent);
    let _ = writeln!(out, "Source: {}", entry.input_id());
    let _ = writeln!(out, "Format: {}", entry.input_meta.format);
    if let Some(ts) = &entry.input_meta.timestamp {
        let _ = writeln!(out, "Input timestamp: {ts}");
    }

    let _ = writeln!(out, "Extracted fields:");
    if let Value::Object(map) = &entry.extracted {
        for (key, value) in map {
            let _ = writeln!(out, "  {key}: {}", render_field(key, value));
        }
    }

    let _ = writeln!(out, "Actions:");
    if entry.actions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for action in &entry.actions {
        let _ = writeln!(out, "  - {action}");
    }

    let _ = write!(out, "Trace: {}", entry.trace);
    out
}

fn render_field(key: &str, value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if key != "intent" {
        return text;
    }
    match Intent::from_label(&text).and_then(|i| i.description()) {
        Some(description) => format!("{text} ({description})"),
        None => text,
    }
}
