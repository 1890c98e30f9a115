//! JSON export of analysis rows.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Excel,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" => Ok(Self::Excel),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One caller-supplied row. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportItem {
    pub url: String,
    pub result: Option<String>,
    pub reason: Option<String>,
    pub company_name: Option<String>,
    pub emails: Vec<String>,
    pub email_sources: Vec<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub index: usize,
    pub url: String,
    pub result: String,
    pub reason: String,
    pub company_name: String,
    pub emails: String,
    pub email_sources: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_time: String,
    pub total_count: usize,
    pub data: Vec<ExportRow>,
}

fn rfc3339(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

impl ExportRow {
    fn from_item(index: usize, item: ExportItem) -> Self {
        Self {
            index,
            url: item.url,
            result: item.result.unwrap_or_default(),
            reason: item.reason.unwrap_or_default(),
            company_name: item.company_name.unwrap_or_default(),
            emails: item.emails.join("; "),
            email_sources: item.email_sources.join("; "),
            status: item.status.unwrap_or_default(),
            created_at: rfc3339(item.created_at),
            updated_at: rfc3339(item.updated_at),
        }
    }
}

/// Builds the export document. Only JSON is supported.
pub fn build_export(
    format: ExportFormat,
    items: Vec<ExportItem>,
    now: DateTime<Utc>,
) -> Result<ExportDocument, ExportError> {
    match format {
        ExportFormat::Json => {}
        ExportFormat::Csv => return Err(ExportError::UnsupportedFormat("csv".into())),
        ExportFormat::Excel => return Err(ExportError::UnsupportedFormat("excel".into())),
    }

    let data: Vec<ExportRow> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| ExportRow::from_item(i + 1, item))
        .collect();

    Ok(ExportDocument {
        export_time: rfc3339(Some(now)),
        total_count: data.len(),
        data,
    })
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("prospector-results-{}.json", now.format("%Y-%m-%d"))
}

/// Rows for a task: retained results first, then per-URL errors.
pub fn items_from_task(task: &Task) -> Vec<ExportItem> {
    let results = task.results.iter().map(|r| ExportItem {
        url: r.url.clone(),
        result: r.classification.as_ref().map(|c| c.result.to_string()),
        reason: r.classification.as_ref().map(|c| c.reason.clone()),
        status: Some("completed".into()),
        created_at: Some(task.created_at),
        updated_at: Some(r.completed_at),
        ..Default::default()
    });

    let errors = task
        .errors
        .iter()
        .filter_map(|e| e.url.as_ref().map(|url| (url, e)))
        .map(|(url, e)| ExportItem {
            url: url.clone(),
            reason: Some(e.message.clone()),
            status: Some("failed".into()),
            created_at: Some(task.created_at),
            updated_at: Some(e.timestamp),
            ..Default::default()
        });

    results.chain(errors).collect()
}
