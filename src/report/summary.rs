use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use crate::compare::{CompareStats, DiffRecord, DiffStatus};

/// 对比结果汇总，生成后不再修改
#[derive(Debug, Clone)]
pub struct SummaryReport {
    /// 扩展名与差异数量，按数量降序、扩展名升序排列
    pub counts: Vec<(String, usize)>,
    pub records: Vec<DiffRecord>,
    /// 与已有差异内容完全相同而被过滤的记录
    pub suppressed: Vec<DiffRecord>,
    pub stats: CompareStats,
}

impl SummaryReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiffRecord> {
        self.records.iter().filter(|r| r.is_error())
    }

    pub fn count_for(&self, extension: &str) -> usize {
        self.counts
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "差异: {} 个文件, 无法比较: {} 个文件, 重复差异: {} 个",
            self.total(),
            self.errors().count(),
            self.suppressed.len()
        )
    }
}

/// 汇总差异记录
pub fn report(
    records: Vec<DiffRecord>,
    stats: CompareStats,
    filter_duplicates: bool,
) -> SummaryReport {
    let (records, suppressed) = if filter_duplicates {
        split_duplicates(records)
    } else {
        (records, Vec::new())
    };

    let mut by_extension: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *by_extension.entry(record.extension.as_str()).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = by_extension
        .into_iter()
        .map(|(ext, count)| (ext.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    SummaryReport {
        counts,
        records,
        suppressed,
        stats,
    }
}

/// 同一对内容 (两侧校验和都相同) 的修改只保留第一次出现
fn split_duplicates(records: Vec<DiffRecord>) -> (Vec<DiffRecord>, Vec<DiffRecord>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut suppressed = Vec::new();

    for record in records {
        let key = match (&record.status, &record.left.digest, &record.right.digest) {
            (DiffStatus::Differing, Some(left), Some(right)) => Some((left.clone(), right.clone())),
            _ => None,
        };

        match key {
            Some(key) if seen.contains(&key) => suppressed.push(record),
            Some(key) => {
                seen.insert(key);
                kept.push(record);
            }
            None => kept.push(record),
        }
    }

    (kept, suppressed)
}

/// 生成 summary.txt 的内容，同样的输入总是得到同样的输出
pub fn render_summary(report: &SummaryReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== 差异文件扩展名统计 ===");
    if report.counts.is_empty() {
        let _ = writeln!(out, "(无)");
    }
    for (ext, count) in &report.counts {
        let _ = writeln!(out, "{}: {}", ext, count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== 总计 ===");
    let _ = writeln!(
        out,
        "比较节点: {}, 相同: {}, 解包容器: {}",
        report.stats.nodes, report.stats.identical, report.stats.containers
    );
    let _ = writeln!(out, "{}", report.summary());
    let _ = writeln!(out);

    let _ = writeln!(out, "=== 差异文件 ({}) ===", report.total());
    for record in &report.records {
        let _ = writeln!(out, "{}", describe(record));
    }
    let _ = writeln!(out);

    let errors: Vec<_> = report.errors().collect();
    if !errors.is_empty() {
        let _ = writeln!(out, "=== 无法比较的文件 ({}) ===", errors.len());
        for record in errors {
            let _ = writeln!(
                out,
                "{}: {}",
                record.path.display(),
                record.status.detail().unwrap_or_default()
            );
        }
        let _ = writeln!(out);
    }

    if !report.suppressed.is_empty() {
        let _ = writeln!(out, "=== 已过滤的重复差异 ({}) ===", report.suppressed.len());
        for record in &report.suppressed {
            let _ = writeln!(out, "{}", describe(record));
        }
        let _ = writeln!(out);
    }

    out
}

fn describe(record: &DiffRecord) -> String {
    let mut line = format!("{} {}", record.status.symbol(), record.path.display());

    match (record.left.size, record.right.size) {
        (Some(left), Some(right)) => {
            let _ = write!(line, " ({} -> {} bytes)", left, right);
        }
        (Some(size), None) | (None, Some(size)) => {
            let _ = write!(line, " ({} bytes)", size);
        }
        (None, None) => {}
    }
    if let Some(detail) = record.status.detail() {
        let _ = write!(line, ": {}", detail);
    }
    line
}
