use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::summary::SummaryReport;
use crate::compare::{DiffRecord, NodeKind};
use crate::error::{Error, Result};

pub const REPORT_FILE: &str = "report.toml";

/// report.toml 的元数据部分
#[derive(Debug, Serialize)]
pub struct Metadata {
    pub version: String,
    pub created_at: String,
    pub left: String,
    pub right: String,
    pub elapsed_secs: f64,
}

impl Metadata {
    pub fn new(left: &Path, right: &Path, elapsed_secs: f64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            left: left.display().to_string(),
            right: right.display().to_string(),
            elapsed_secs,
        }
    }
}

/// 机器可读的对比结果
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    metadata: &'a Metadata,
    counts: BTreeMap<&'a str, usize>,
    records: Vec<RecordEntry<'a>>,
    suppressed: Vec<RecordEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct RecordEntry<'a> {
    path: String,
    status: &'static str,
    kind: NodeKind,
    extension: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    left_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    right_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl<'a> From<&'a DiffRecord> for RecordEntry<'a> {
    fn from(record: &'a DiffRecord) -> Self {
        Self {
            path: record.path.to_string_lossy().to_string(),
            status: record.status.label(),
            kind: record.kind,
            extension: &record.extension,
            left_size: record.left.size,
            right_size: record.right.size,
            detail: record.status.detail(),
        }
    }
}

pub fn write_report_file(
    report: &SummaryReport,
    metadata: &Metadata,
    output_dir: &Path,
) -> Result<()> {
    let file = ReportFile {
        metadata,
        counts: report
            .counts
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count))
            .collect(),
        records: report.records.iter().map(RecordEntry::from).collect(),
        suppressed: report.suppressed.iter().map(RecordEntry::from).collect(),
    };

    let path = output_dir.join(REPORT_FILE);
    let content = toml::to_string_pretty(&file)
        .map_err(|e| Error::persist(&path, std::io::Error::other(e)))?;
    fs::write(&path, content).map_err(|e| Error::persist(&path, e))?;
    Ok(())
}
