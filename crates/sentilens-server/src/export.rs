//! Tabular download rendering

use sentilens_core::ExportRow;
use serde::Deserialize;

/// Download format for result tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Render rows as CSV with a header line.
///
/// The `source` column is present only when at least one row has a source.
pub fn to_csv(rows: &[ExportRow]) -> String {
    let with_source = rows.iter().any(|r| r.source.is_some());

    let mut out = String::new();
    if with_source {
        out.push_str("text,source,label,confidence,manually_corrected\r\n");
    } else {
        out.push_str("text,label,confidence,manually_corrected\r\n");
    }

    for row in rows {
        let mut fields = Vec::with_capacity(5);
        fields.push(escape(&row.text));
        if with_source {
            fields.push(escape(row.source.as_deref().unwrap_or("")));
        }
        fields.push(row.label.map(|l| l.to_string()).unwrap_or_default());
        fields.push(row.confidence.to_string());
        fields.push(row.manually_corrected.to_string());

        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }

    out
}

fn escape(field: &str) -> String {
    if field.contains(&[',', '"', '\r', '\n'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
