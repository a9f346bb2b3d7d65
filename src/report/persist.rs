use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::cert::ApkCertDiff;
use super::summary::{SummaryReport, render_summary};
use crate::compare::{DiffRecord, DiffStatus, NodeKind};
use crate::error::{Error, Result};
use crate::utils::{copy_path, is_text_file};

pub const SUMMARY_FILE: &str = "summary.txt";
pub const DIFFS_DIR: &str = "diffs";

/// 写入 `summary.txt` 和只包含差异文件的 `diffs/` 目录树
///
/// 给出 `certs` 时，apk 签名证书的差异改用 apksigner 的输出表示。
pub fn persist(
    report: &SummaryReport,
    output_dir: &Path,
    certs: Option<&ApkCertDiff>,
) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| Error::persist(output_dir, e))?;

    let diffs_root = output_dir.join(DIFFS_DIR);
    if diffs_root.exists() {
        fs::remove_dir_all(&diffs_root).map_err(|e| Error::persist(&diffs_root, e))?;
    }
    fs::create_dir_all(&diffs_root).map_err(|e| Error::persist(&diffs_root, e))?;

    for record in &report.records {
        write_artifact(record, &diffs_root, certs)?;
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    fs::write(&summary_path, render_summary(report))
        .map_err(|e| Error::persist(&summary_path, e))?;

    info!("差异已写入 {}", diffs_root.display());
    Ok(())
}

fn write_artifact(
    record: &DiffRecord,
    diffs_root: &Path,
    certs: Option<&ApkCertDiff>,
) -> Result<()> {
    let target = diffs_root.join(&record.path);

    if let Some(source) = record.artifact() {
        debug!("{} -> {}", source.display(), target.display());
        copy_path(source, &target).map_err(|e| Error::persist(&target, e))?;
    }

    let (Some(left), Some(right)) = (&record.left.location, &record.right.location) else {
        return Ok(());
    };

    let patch = match record.status {
        DiffStatus::Differing => differing_patch(record, left, right, certs)?,
        DiffStatus::Anomaly(_) => location_note(left, right),
        _ => return Ok(()),
    };

    let patch_path = unified_diff_path(&target);
    fs::write(&patch_path, patch).map_err(|e| Error::persist(&patch_path, e))?;
    Ok(())
}

fn differing_patch(
    record: &DiffRecord,
    left: &Path,
    right: &Path,
    certs: Option<&ApkCertDiff>,
) -> Result<String> {
    // is_text_file 会打开文件，只对普通文件调用
    let text = record.kind == NodeKind::File
        && left.is_file()
        && right.is_file()
        && is_text_file(left)
        && is_text_file(right);

    let mut patch = if text {
        String::new()
    } else {
        location_note(left, right)
    };

    if let Some(cert_diff) = certs.and_then(|c| c.diff(record)) {
        patch.push_str(&cert_diff);
    } else if text {
        patch.push_str(&unified_diff(record, left, right)?);
    }
    Ok(patch)
}

/// 二进制文件无法给出文本差异，只记录两侧在磁盘上的位置
fn location_note(left: &Path, right: &Path) -> String {
    format!(
        "文件位置:\n左侧: {}\n右侧: {}\n\n",
        left.display(),
        right.display()
    )
}

fn unified_diff_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".diff");
    target.with_file_name(name)
}

fn unified_diff(record: &DiffRecord, left: &Path, right: &Path) -> Result<String> {
    let old = fs::read(left).map_err(|e| Error::io(left, e))?;
    let new = fs::read(right).map_err(|e| Error::io(right, e))?;
    let old = String::from_utf8_lossy(&old);
    let new = String::from_utf8_lossy(&new);

    let path = record.path.to_string_lossy();
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());
    Ok(diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string())
}
