use regex::Regex;
use std::fs;
use std::path::Path;

use crate::config::CompareConfig;
use crate::error::{Error, Result};
use crate::utils::is_text_file;

/// 过滤构建元数据噪声 (时间戳、主机名、空白)
pub struct NoiseFilter {
    ignore_whitespace: bool,
    patterns: Vec<Regex>,
    sort_line_extensions: Vec<String>,
}

impl NoiseFilter {
    pub fn new(config: &CompareConfig) -> Result<Self> {
        let patterns = config
            .ignore_line_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::Config(format!("{}: {}", p, e))))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ignore_whitespace: config.ignore_whitespace,
            patterns,
            sort_line_extensions: config.sort_line_extensions.clone(),
        })
    }

    /// 两个字节不同的文件是否只在噪声上有区别
    pub fn equivalent(&self, left: &Path, right: &Path) -> Result<bool> {
        if !is_text_file(left) || !is_text_file(right) {
            return Ok(false);
        }

        let sort = left
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.sort_line_extensions.iter().any(|s| s == e));

        // 非 UTF-8 内容按字节比较，不做任何归一化
        let (Some(left_text), Some(right_text)) = (read_utf8(left)?, read_utf8(right)?) else {
            return Ok(false);
        };

        Ok(self.normalize(&left_text, sort) == self.normalize(&right_text, sort))
    }

    pub fn normalize(&self, content: &str, sort: bool) -> Vec<String> {
        let mut lines: Vec<String> = content
            .lines()
            .filter(|line| !self.patterns.iter().any(|p| p.is_match(line)))
            .map(|line| {
                if self.ignore_whitespace {
                    line.split_whitespace().collect::<String>()
                } else {
                    line.to_string()
                }
            })
            .filter(|line: &String| !(self.ignore_whitespace && line.is_empty()))
            .collect();

        if sort {
            lines.sort();
        }
        lines
    }
}

fn read_utf8(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8(bytes).ok())
}
