// Export rendering for a run's candidate set

use crate::data::{CandidateFilter, Database};
use linkmesh_engine::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportFormat {
    Text,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ExportFormat::Text),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub run_id: String,
    pub project_id: String,
    pub status: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
    pub candidates: Vec<CandidateExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateExport {
    pub source_url: String,
    pub target_url: String,
    pub anchor: String,
    #[serde(rename = "type")]
    pub candidate_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

fn storage(error: rusqlite::Error) -> EngineError {
    EngineError::Storage(error.to_string())
}

/// Gather the full candidate set (all statuses) for a run.
pub fn gather_export_data(db: &Database, run_id: &str) -> Result<ExportData> {
    let run = db
        .get_run(run_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))?;
    let candidates = db
        .list_candidates(run_id, &CandidateFilter::default())
        .map_err(storage)?;

    Ok(ExportData {
        run_id: run.id,
        project_id: run.project_id,
        status: run.status.as_str().to_string(),
        created_at: run.created_at,
        completed_at: run.completed_at,
        stats: run
            .stats
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok()),
        candidates: candidates
            .into_iter()
            .map(|c| CandidateExport {
                source_url: c.source_url,
                target_url: c.target_url,
                anchor: c.anchor,
                candidate_type: c.strategy.as_str().to_string(),
                status: c.status.as_str().to_string(),
                rejection_reason: c.rejection_reason.map(|r| r.as_str().to_string()),
            })
            .collect(),
    })
}

pub fn generate_text_report(data: &ExportData) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                        LINKMESH RUN REPORT\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Run ID:       {}\n", data.run_id));
    report.push_str(&format!("Status:       {}\n", data.status));
    report.push_str(&format!("Created:      {}\n", format_timestamp(data.created_at)));
    if let Some(completed_at) = data.completed_at {
        report.push_str(&format!("Completed:    {}\n", format_timestamp(completed_at)));
    }
    report.push_str(&format!("Candidates:   {}\n", data.candidates.len()));
    report.push('\n');

    if let Some(stats) = &data.stats {
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str("SUMMARY\n");
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
        if let Some(added) = stats.get("links_added").and_then(|v| v.as_u64()) {
            report.push_str(&format!("  Links added (pending review): {}\n", added));
        }
        if let Some(rejected) = stats.get("rejected").and_then(|v| v.as_u64()) {
            report.push_str(&format!("  Rejected:                     {}\n", rejected));
        }
        if let Some(pages) = stats.get("pages_processed").and_then(|v| v.as_u64()) {
            report.push_str(&format!("  Pages processed:              {}\n", pages));
        }
        if let Some(orphans) = stats.get("orphans_linked").and_then(|v| v.as_u64()) {
            report.push_str(&format!("  Orphans linked:               {}\n", orphans));
        }
        if let Some(reasons) = stats.get("rejected_reasons").and_then(|v| v.as_object())
            && !reasons.is_empty()
        {
            report.push_str("\n  Rejections by reason:\n");
            for (reason, count) in reasons {
                report.push_str(&format!("    {:<18} {}\n", reason, count));
            }
        }
        report.push('\n');
    }

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("CANDIDATES\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for candidate in &data.candidates {
        report.push_str(&format!(
            "  [{}] {} -> {}\n",
            candidate.status, candidate.source_url, candidate.target_url
        ));
        report.push_str(&format!(
            "      anchor: \"{}\"  type: {}\n",
            candidate.anchor, candidate.candidate_type
        ));
        if let Some(reason) = &candidate.rejection_reason {
            report.push_str(&format!("      rejected: {}\n", reason));
        }
        report.push('\n');
    }

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                          End of Report\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    report
}

pub fn generate_csv_report(data: &ExportData) -> String {
    let mut out = String::new();
    out.push_str("source_url,target_url,anchor,type,status,rejection_reason\n");
    for candidate in &data.candidates {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&candidate.source_url),
            csv_field(&candidate.target_url),
            csv_field(&candidate.anchor),
            csv_field(&candidate.candidate_type),
            csv_field(&candidate.status),
            csv_field(candidate.rejection_reason.as_deref().unwrap_or("")),
        ));
    }
    out
}

pub fn generate_json_report(data: &ExportData) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Linkmesh",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "id": data.run_id,
                "project_id": data.project_id,
                "status": data.status,
                "created_at": format_iso8601_timestamp(data.created_at),
                "completed_at": data.completed_at.map(format_iso8601_timestamp),
                "stats": data.stats
            },
            "candidates": data.candidates
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}
