//! Optional CSV log of what happened to each item.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::Serialize;

use crate::harvest::ItemRecord;

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Detail URL")]
    detail_url: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Source URL")]
    source_url: &'a str,
    #[serde(rename = "Outcome")]
    outcome: &'a str,
    #[serde(rename = "File")]
    file: String,
    #[serde(rename = "Error")]
    error: String,
    #[serde(rename = "Finished")]
    finished_at: DateTime<Utc>,
}

impl<'a> From<&'a ItemRecord> for ReportRow<'a> {
    fn from(record: &'a ItemRecord) -> Self {
        Self {
            detail_url: &record.detail_url,
            title: &record.title,
            source_url: &record.source_url,
            outcome: record.outcome.label(),
            file: record
                .outcome
                .file()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            error: record
                .outcome
                .error()
                .map(|e| e.to_string())
                .unwrap_or_default(),
            finished_at: record.finished_at,
        }
    }
}

/// Writes one row per record to `path`, replacing any existing file.
pub fn write_report(path: &Path, records: &[ItemRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }

    let mut csv_writer = Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    for record in records {
        csv_writer
            .serialize(ReportRow::from(record))
            .context("Failed to write CSV record")?;
    }

    csv_writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}
