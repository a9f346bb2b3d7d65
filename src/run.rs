use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use crate::compare::{Comparator, NoiseFilter};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{RunWorkspace, Side, format_build_date, prepare_target, read_build_props};
use crate::report::{ApkCertDiff, Metadata, SummaryReport, persist, report, write_report_file};
use crate::unpack::{Unpacker, UnpackerChain};

/// 默认输出的构建属性
pub const DEFAULT_BUILD_PROPS: &[&str] = &["ro.system.build.date.utc"];

/// 一次对比的结果
#[derive(Debug)]
pub struct CompareOutcome {
    pub report: SummaryReport,
    pub elapsed: Duration,
}

/// 对比两个目标文件，结果写入 `config.output_dir`
pub fn compare_targets(config: &Config, target1: &Path, target2: &Path) -> Result<CompareOutcome> {
    let unpacker = UnpackerChain::from_config(&config.tools);
    compare_targets_with(config, target1, target2, &unpacker)
}

/// 使用指定的解包器对比两个目标文件
pub fn compare_targets_with(
    config: &Config,
    target1: &Path,
    target2: &Path,
    unpacker: &dyn Unpacker,
) -> Result<CompareOutcome> {
    for target in [target1, target2] {
        if target.extension().is_none_or(|ext| ext != "zip") {
            return Err(Error::InvalidInput(format!(
                "目标文件必须是 zip 文件: {}",
                target.display()
            )));
        }
        if !target.is_file() {
            return Err(Error::extraction(target, "文件不存在"));
        }
    }

    let noise = NoiseFilter::new(&config.compare)?;
    let start = Instant::now();

    let workspace = RunWorkspace::create(&config.work_dir, config.keep_workspace)?;
    let left_root = prepare_target(
        target1,
        &workspace.target_dir(Side::Left, target1),
        config.force_clean,
    )?;
    let right_root = prepare_target(
        target2,
        &workspace.target_dir(Side::Right, target2),
        config.force_clean,
    )?;

    let comparator = Comparator::new(
        &config.compare,
        &noise,
        unpacker,
        &workspace.scratch_dir(Side::Left),
        &workspace.scratch_dir(Side::Right),
    );
    let (records, stats) = comparator.compare(&left_root, &right_root)?;
    let elapsed = start.elapsed();

    let report = report(records, stats, config.filter_duplicates);
    // 工作目录释放前写出，diffs/ 需要复制其中的文件
    let certs = ApkCertDiff::from_config(&config.tools);
    persist(&report, &config.output_dir, certs.as_ref())?;

    let metadata = Metadata::new(target1, target2, elapsed.as_secs_f64());
    write_report_file(&report, &metadata, &config.output_dir)?;

    info!("对比完成，用时 {:.1} 秒", elapsed.as_secs_f64());
    drop(workspace);

    Ok(CompareOutcome { report, elapsed })
}

/// 读取目标文件中的指定构建属性，缺失的属性不出现在结果中
pub fn extract_build_info(target: &Path, props: &[String]) -> Result<BTreeMap<String, String>> {
    let all_props = read_build_props(target)?;

    let wanted: Vec<&str> = if props.is_empty() {
        DEFAULT_BUILD_PROPS.to_vec()
    } else {
        props.iter().map(String::as_str).collect()
    };

    let mut found = BTreeMap::new();
    for name in wanted {
        if let Some(value) = all_props.get(name) {
            if name.ends_with(".date.utc")
                && let Some(date) = format_build_date(value)
            {
                info!("{} 对应 {}", name, date);
            }
            found.insert(name.to_string(), value.clone());
        }
    }
    Ok(found)
}
