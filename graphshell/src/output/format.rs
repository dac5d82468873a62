// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Rendering of query results

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde_json::Value;

use crate::config::Format;
use crate::driver::QueryOutcome;

/// Column separator of the plain format
pub const PLAIN_SEPARATOR: &str = ", ";

/// Turns a [`QueryOutcome`] into text
pub struct ResultFormatter;

impl ResultFormatter {
    /// Render with the given format; `Auto` renders as `Plain`
    pub fn format(outcome: &QueryOutcome, format: Format) -> String {
        match format {
            Format::Verbose => Self::format_table(outcome),
            Format::Plain | Format::Auto => Self::format_plain(outcome),
        }
    }

    /// Table followed by a summary line
    pub fn format_table(outcome: &QueryOutcome) -> String {
        if outcome.keys.is_empty() {
            return Self::summary(outcome);
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(outcome.keys.iter().cloned().collect::<Vec<_>>());
        for record in &outcome.records {
            table.add_row(record.iter().map(render_value).collect::<Vec<_>>());
        }

        format!("{}\n\n{}", table, Self::summary(outcome))
    }

    /// Header line then one line per record, values separated by [`PLAIN_SEPARATOR`]
    pub fn format_plain(outcome: &QueryOutcome) -> String {
        if outcome.keys.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(outcome.records.len() + 1);
        lines.push(outcome.keys.join(PLAIN_SEPARATOR));
        for record in &outcome.records {
            lines.push(
                record
                    .iter()
                    .map(render_value)
                    .collect::<Vec<_>>()
                    .join(PLAIN_SEPARATOR),
            );
        }
        lines.join("\n")
    }

    pub fn summary(outcome: &QueryOutcome) -> String {
        let rows = outcome.records.len();
        let mut summary = format!("{} row{}", rows, if rows == 1 { "" } else { "s" });
        if let Some(database) = &outcome.summary.database {
            summary.push_str(&format!(" (database: {})", database));
        }
        summary
    }
}

/// Strings are quoted, null is `NULL`, everything else is compact JSON
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
