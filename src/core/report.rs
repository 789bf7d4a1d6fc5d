use crate::domain::model::SprintMetrics;
use crate::utils::error::{MetricsError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const FORMAT_JSON: &str = "json";
pub const FORMAT_CSV: &str = "csv";
pub const SUPPORTED_FORMATS: &[&str] = &[FORMAT_JSON, FORMAT_CSV];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportFile {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Serialize)]
struct WorkloadRow<'a> {
    id: &'a str,
    name: &'a str,
    role: &'a str,
    planned_points: f64,
    completed_points: f64,
    item_count: usize,
}

/// 檔名前綴，只保留英數字
pub fn file_prefix(metrics: &SprintMetrics) -> String {
    let id: String = metrics
        .sprint_id
        .as_deref()
        .unwrap_or("unknown")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("sprint-{}", id)
}

pub fn render_json(metrics: &SprintMetrics) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(metrics)?)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| MetricsError::IoError(e.into_error()))
}

pub fn render_burndown_csv(metrics: &SprintMetrics) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for point in &metrics.burndown_data {
        writer.serialize(point)?;
    }
    finish_csv(writer)
}

pub fn render_workload_csv(metrics: &SprintMetrics) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if metrics.team_members.is_empty() {
        writer.write_record([
            "id",
            "name",
            "role",
            "planned_points",
            "completed_points",
            "item_count",
        ])?;
    }
    for member in &metrics.team_members {
        writer.serialize(WorkloadRow {
            id: &member.id,
            name: &member.name,
            role: &member.role,
            planned_points: member.planned_points,
            completed_points: member.completed_points,
            item_count: member.items.len(),
        })?;
    }
    finish_csv(writer)
}

/// Renders every requested format. Unknown formats are rejected by config
/// validation before we get here; they are skipped with a warning.
pub fn render_report(metrics: &SprintMetrics, formats: &[String]) -> Result<Vec<ReportFile>> {
    let prefix = file_prefix(metrics);
    let mut files = Vec::new();

    for format in formats {
        match format.as_str() {
            FORMAT_JSON => files.push(ReportFile {
                name: format!("{}-metrics.json", prefix),
                data: render_json(metrics)?,
            }),
            FORMAT_CSV => {
                files.push(ReportFile {
                    name: format!("{}-burndown.csv", prefix),
                    data: render_burndown_csv(metrics)?,
                });
                files.push(ReportFile {
                    name: format!("{}-workload.csv", prefix),
                    data: render_workload_csv(metrics)?,
                });
            }
            other => tracing::warn!("Skipping unsupported output format: {}", other),
        }
    }

    Ok(files)
}

pub fn bundle_zip(files: &[ReportFile]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for file in files {
        zip.start_file(file.name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(&file.data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
