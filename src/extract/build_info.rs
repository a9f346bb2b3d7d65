use chrono::DateTime;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// 目标文件中的系统属性文件
pub const BUILD_PROP_PATH: &str = "SYSTEM/build.prop";

/// 不解压整个归档，直接读取 `SYSTEM/build.prop`
pub fn read_build_props(archive: &Path) -> Result<BTreeMap<String, String>> {
    if !archive.is_file() {
        return Err(Error::extraction(archive, "文件不存在"));
    }

    let file = File::open(archive).map_err(|e| Error::extraction(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::extraction(archive, e))?;
    let mut entry = zip
        .by_name(BUILD_PROP_PATH)
        .map_err(|e| Error::extraction(archive, format!("{}: {}", BUILD_PROP_PATH, e)))?;

    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| Error::extraction(archive, e))?;

    Ok(parse_build_props(&String::from_utf8_lossy(&content)))
}

/// 解析 `name=value` 格式，跳过注释和空行
pub fn parse_build_props(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// 将 `ro.*.build.date.utc` 的秒数转换为可读时间
pub fn format_build_date(value: &str) -> Option<String> {
    let secs: i64 = value.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
